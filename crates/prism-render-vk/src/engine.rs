// SPDX-License-Identifier: CEPL-1.0
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use ash::vk;
use glam::{Mat4, Vec2, Vec3};
use prism_render::{FramebufferSource, MeshData, PixelBuffer, RenderSize, Renderer, RendererConfig};
use tracing::{debug, info, warn};

use crate::bindings::Bindings;
use crate::frame::{create_frame_slots, FrameSlot};
use crate::gpu::Gpu;
use crate::meshes::MeshRegistry;
use crate::resources::{Owned, OwnedResources};
use crate::surface::{choose_surface_format, pick_depth_format, PresentationSurface, SurfacePhase};
use crate::uniforms::SceneParams;

/// Render pass and graphics pipeline. Rebuilt when the swapchain color format changes.
#[derive(Debug)]
pub(crate) struct PipelineObjects {
    pub render_pass: vk::RenderPass,
    pub color_format: vk::Format,
    pub layout: vk::PipelineLayout,
    pub pipeline: vk::Pipeline,
}

impl PipelineObjects {
    fn create<G: Gpu>(
        gpu: &G,
        color_format: vk::Format,
        depth_format: vk::Format,
        set_layout: vk::DescriptorSetLayout,
    ) -> Result<Self> {
        let render_pass = gpu
            .create_render_pass(color_format, depth_format)
            .context("create_render_pass")?;
        let (layout, pipeline) = match gpu.create_pipeline(render_pass, set_layout) {
            Ok(p) => p,
            Err(e) => {
                gpu.destroy_render_pass(render_pass);
                return Err(e).context("create_graphics_pipelines");
            }
        };
        Ok(Self {
            render_pass,
            color_format,
            layout,
            pipeline,
        })
    }

    fn destroy<G: Gpu>(&self, gpu: &G) {
        gpu.destroy_pipeline(self.layout, self.pipeline);
        gpu.destroy_render_pass(self.render_pass);
    }
}

/// The rendering engine, generic over the device it drives.
pub struct Engine<G: Gpu> {
    pub(crate) gpu: G,
    pub(crate) window: Arc<dyn FramebufferSource>,
    pub(crate) config: RendererConfig,
    pub(crate) surface: PresentationSurface,
    pub(crate) pipeline: PipelineObjects,
    pub(crate) set_layout: vk::DescriptorSetLayout,
    pub(crate) frames: Vec<FrameSlot>,
    pub(crate) frame_index: usize,
    /// Swapchain image of the frame being recorded.
    pub(crate) recording: Option<u32>,
    pub(crate) bindings: Bindings,
    pub(crate) meshes: MeshRegistry,
    pub(crate) scene: SceneParams,
    pub(crate) owned: OwnedResources,
    /// Set by `resize`; consumed by the next rebuild.
    pub(crate) stale: bool,
    /// Window size at which the surface last reported a zero extent.
    pub(crate) suspended_at: Option<RenderSize>,
}

impl<G: Gpu> Engine<G> {
    // STRICT ORDER (setup):
    // 1) depth format + color format (render pass needs both)
    // 2) frame set layout, then render pass + pipeline
    // 3) frame slots (fence, semaphores, cmd, mapped uniforms)
    // 4) fallback texture, descriptor pool, per-slot sets
    // 5) swapchain + views + depth + framebuffers (may suspend at zero size)
    pub fn with_gpu(
        gpu: G,
        window: Arc<dyn FramebufferSource>,
        config: RendererConfig,
    ) -> Result<Self> {
        let families = gpu.queue_families();
        let depth_format = pick_depth_format(|f| gpu.format_properties(f))?;
        let support = gpu
            .surface_support()
            .context("query surface support")?;
        let color_format = choose_surface_format(&support.formats)?.format;
        info!(
            "queues: graphics={} present={}; depth {:?}",
            families.graphics, families.present, depth_format
        );

        let mut owned = OwnedResources::default();
        let set_layout = gpu
            .create_frame_set_layout()
            .context("create_descriptor_set_layout")?;
        owned.push(Owned::SetLayout(set_layout));
        let pipeline = PipelineObjects::create(&gpu, color_format, depth_format, set_layout)?;

        let frames = create_frame_slots(&gpu, &mut owned)?;
        let uniform_buffers: Vec<vk::Buffer> = frames.iter().map(|f| f.uniform_buffer).collect();
        let bindings = Bindings::new(&gpu, set_layout, &uniform_buffers, &mut owned)?;

        let mut engine = Self {
            surface: PresentationSurface::new(depth_format, families, config.present),
            gpu,
            window,
            config,
            pipeline,
            set_layout,
            frames,
            frame_index: 0,
            recording: None,
            bindings,
            meshes: MeshRegistry::default(),
            scene: SceneParams::default(),
            owned,
            stale: false,
            suspended_at: None,
        };
        engine.build_surface()?;
        Ok(engine)
    }

    fn build_surface(&mut self) -> Result<()> {
        let size = self.window.framebuffer_size();
        if !self.surface.build(&self.gpu, size)? {
            self.suspended_at = Some(size);
            return Ok(());
        }
        self.suspended_at = None;
        if let Some(color) = self.surface.color_format() {
            if color != self.pipeline.color_format {
                info!(
                    "color format {:?} -> {:?}, rebuilding pipeline",
                    self.pipeline.color_format, color
                );
                let fresh = PipelineObjects::create(
                    &self.gpu,
                    color,
                    self.surface.depth_format(),
                    self.set_layout,
                )?;
                let old = std::mem::replace(&mut self.pipeline, fresh);
                old.destroy(&self.gpu);
            }
        }
        self.surface
            .attach_framebuffers(&self.gpu, self.pipeline.render_pass)?;
        if let SurfacePhase::Live { generation } = self.surface.phase() {
            debug!("surface generation {generation} ready");
        }
        Ok(())
    }

    // STRICT ORDER (rebuild):
    // 1) device_wait_idle (frame fences stay as they are)
    // 2) destroy depth, framebuffers, views, swapchain
    // 3) build again from the live framebuffer size (zero => Suspended)
    pub(crate) fn rebuild_surface(&mut self, reason: &str) -> Result<()> {
        info!("rebuilding surface: {reason}");
        self.gpu
            .device_wait_idle()
            .context("device_wait_idle(rebuild)")?;
        self.surface.invalidate(&self.gpu);
        self.stale = false;
        // the new chain is sized from the current framebuffer, so a pending resize is covered
        self.window.take_resized();
        self.build_surface()
    }

    /// View matrix derived from the last `set_camera`.
    pub fn view_matrix(&self) -> Mat4 {
        self.scene.view()
    }

    /// Current swapchain extent; zero while presentation is suspended.
    pub fn surface_size(&self) -> RenderSize {
        let e = self.surface.extent();
        RenderSize {
            width: e.width,
            height: e.height,
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.surface.phase() == SurfacePhase::Suspended
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }
}

// STRICT TEARDOWN ORDER:
// - device_wait_idle (nothing in flight may reference what follows)
// - meshes, then the replaceable texture
// - surface (framebuffers reference the render pass)
// - render pass + pipeline
// - ownership list, newest first (fallback texture, pool, frame slots, set layout)
// The device itself goes when `gpu` drops, after this.
impl<G: Gpu> Drop for Engine<G> {
    fn drop(&mut self) {
        if let Err(e) = self.gpu.device_wait_idle() {
            warn!("device_wait_idle during teardown: {e}");
        }
        self.meshes.destroy_all(&self.gpu);
        self.bindings.release_active(&self.gpu);
        self.surface.destroy(&self.gpu);
        self.pipeline.destroy(&self.gpu);
        self.owned.release_all(&self.gpu);
    }
}

impl<G: Gpu> Renderer for Engine<G> {
    fn begin_frame(&mut self) -> Result<bool> {
        self.begin()
    }

    fn draw(&mut self, mesh: usize, model: Mat4) {
        self.record_draw(mesh, model);
    }

    fn end_frame(&mut self) -> Result<()> {
        self.finish()
    }

    fn set_camera(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.scene.set_camera(eye, target, up);
    }

    fn set_light(&mut self, position: Vec3, color: Vec3, specular: f32) {
        self.scene.set_light(position, color, specular);
    }

    fn set_uv(&mut self, offset: Vec2, scale: Vec2) {
        self.scene.set_uv(offset, scale);
    }

    fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.config.clear_color = rgba;
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<usize> {
        ensure!(self.recording.is_none(), "mesh upload while a frame is recording");
        self.meshes.upload(&self.gpu, mesh)
    }

    fn upload_texture(&mut self, pixels: &PixelBuffer) -> Result<()> {
        ensure!(self.recording.is_none(), "texture upload while a frame is recording");
        self.bindings.register_texture(&self.gpu, pixels)
    }

    fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    fn clear_meshes(&mut self) -> Result<()> {
        ensure!(self.recording.is_none(), "clearing meshes while a frame is recording");
        self.meshes.clear(&self.gpu)
    }

    fn resize(&mut self, size: RenderSize) {
        debug!("resize to {}x{} requested", size.width, size.height);
        self.stale = true;
    }
}
