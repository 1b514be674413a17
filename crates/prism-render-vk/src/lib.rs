// SPDX-License-Identifier: CEPL-1.0
//! Vulkan renderer for the mesh viewer.
//!
//! [`Engine`] holds the frame pipeline, presentation surface, resource
//! ownership, bindings and mesh registry. It talks to the device only through
//! [`Gpu`]; [`AshGpu`] is the Vulkan implementation used by [`VkRenderer`].

use std::sync::Arc;

use anyhow::Result;
use prism_render::{FramebufferSource, RendererConfig};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

mod bindings;
mod device;
mod engine;
mod frame;
mod gpu;
mod instance;
mod meshes;
mod negotiate;
mod pipeline;
mod resources;
mod surface;
mod uniforms;

#[cfg(test)]
mod mock;

pub use device::AshGpu;
pub use engine::Engine;
pub use frame::FRAMES_IN_FLIGHT;
pub use gpu::{
    BarrierMasks, FrameSubmit, Gpu, ImageDesc, LayoutTransition, QueueFamilies, SurfaceSupport,
    SwapchainDesc,
};
pub use uniforms::UniformBlock;

/// The engine on a real device.
pub type VkRenderer = Engine<AshGpu>;

impl Engine<AshGpu> {
    /// Brings up the device against `window` and builds the first surface.
    ///
    /// `source` reports the framebuffer size and resize events for the same window.
    pub fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        source: Arc<dyn FramebufferSource>,
        config: RendererConfig,
    ) -> Result<Self> {
        let gpu = AshGpu::new(window, display, config.validation)?;
        tracing::info!("renderer on {}", gpu.device_name());
        Engine::with_gpu(gpu, source, config)
    }
}
