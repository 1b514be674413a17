// SPDX-License-Identifier: CEPL-1.0
mod camera;

pub use camera::{look_at, perspective_flipped, FreeCamera, MoveIntent};
pub use glam::{Mat4, Vec2, Vec3, Vec4};
