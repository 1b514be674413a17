// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use glam::{Mat4, Vec2, Vec3};

mod error;
mod mesh;

pub use error::RenderError;
pub use mesh::{MeshData, PixelBuffer, Vertex};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// What the renderer needs to know about the window it draws into.
pub trait FramebufferSource {
    /// Current framebuffer size in physical pixels. May be zero while minimised.
    fn framebuffer_size(&self) -> RenderSize;
    /// Returns true once per resize, clearing the flag.
    fn take_resized(&self) -> bool;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PresentPreference {
    /// Low-latency triple buffering when available, vsync otherwise.
    #[default]
    Mailbox,
    /// Always vsync.
    Fifo,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RendererConfig {
    pub clear_color: [f32; 4],
    pub present: PresentPreference,
    pub validation: bool,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.05, 0.05, 0.05, 1.0],
            present: PresentPreference::Mailbox,
            validation: cfg!(debug_assertions),
            fov_y_degrees: 90.0,
            near: 0.01,
            far: 1000.0,
        }
    }
}

/// Frame-oriented drawing surface used by the application loop.
///
/// A frame is `begin_frame` (skip everything else when it returns false),
/// any number of `draw`s, then `end_frame`.
pub trait Renderer {
    fn begin_frame(&mut self) -> Result<bool>;
    /// Out-of-range meshes and draws outside a frame are ignored.
    fn draw(&mut self, mesh: usize, model: Mat4);
    fn end_frame(&mut self) -> Result<()>;

    fn set_camera(&mut self, eye: Vec3, target: Vec3, up: Vec3);
    fn set_light(&mut self, position: Vec3, color: Vec3, specular: f32);
    fn set_uv(&mut self, offset: Vec2, scale: Vec2);
    fn set_clear_color(&mut self, rgba: [f32; 4]);

    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<usize>;
    fn upload_texture(&mut self, pixels: &PixelBuffer) -> Result<()>;
    fn mesh_count(&self) -> usize;
    fn clear_meshes(&mut self) -> Result<()>;

    /// Marks the surface stale; it is rebuilt at the next frame boundary.
    fn resize(&mut self, size: RenderSize);
}
