// SPDX-License-Identifier: CEPL-1.0
mod input;
mod metrics;

pub use input::InputState;
pub use metrics::WindowMetrics;
pub use winit;
