// SPDX-License-Identifier: CEPL-1.0
//! Frames in flight: acquire, record, submit, present.

use std::ptr::NonNull;

use anyhow::{anyhow, bail, Context, Result};
use ash::vk;
use glam::Mat4;
use prism_math::perspective_flipped;
use tracing::debug;

use crate::engine::Engine;
use crate::gpu::{FrameSubmit, Gpu};
use crate::resources::{allocate_buffer, Owned, OwnedResources};
use crate::uniforms::{UniformBlock, UNIFORM_BLOCK_SIZE};

/// At most this many frames have GPU work outstanding.
pub const FRAMES_IN_FLIGHT: usize = 2;

/// Per-slot sync objects, command buffer and persistently mapped uniforms.
#[derive(Debug)]
pub(crate) struct FrameSlot {
    pub fence: vk::Fence,
    pub image_acquired: vk::Semaphore,
    pub render_done: vk::Semaphore,
    pub cmd: vk::CommandBuffer,
    pub uniform_buffer: vk::Buffer,
    pub uniform_memory: vk::DeviceMemory,
    uniforms: NonNull<u8>,
}

impl FrameSlot {
    fn create<G: Gpu>(gpu: &G, owned: &mut OwnedResources) -> Result<Self> {
        // signaled so the first wait on this slot returns immediately
        let fence = gpu.create_fence(true).context("create_fence")?;
        owned.push(Owned::Fence(fence));
        let image_acquired = gpu.create_semaphore().context("create_semaphore")?;
        owned.push(Owned::Semaphore(image_acquired));
        let render_done = gpu.create_semaphore().context("create_semaphore")?;
        owned.push(Owned::Semaphore(render_done));
        let cmd = gpu
            .allocate_command_buffers(1)
            .context("allocate_command_buffers(frame)")?
            .pop()
            .ok_or_else(|| anyhow!("driver returned no command buffer"))?;
        owned.push(Owned::CommandBuffer(cmd));

        let (uniform_buffer, uniform_memory) = allocate_buffer(
            gpu,
            UNIFORM_BLOCK_SIZE,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        owned.push(Owned::Memory(uniform_memory));
        owned.push(Owned::Buffer(uniform_buffer));
        // Stays mapped for the slot's lifetime; freeing the memory unmaps it.
        let uniforms = NonNull::new(gpu.map_memory(uniform_memory).context("map_memory(uniforms)")?)
            .ok_or_else(|| anyhow!("map_memory returned null"))?;

        Ok(Self {
            fence,
            image_acquired,
            render_done,
            cmd,
            uniform_buffer,
            uniform_memory,
            uniforms,
        })
    }

    /// Coherent memory: visible to the GPU without a flush.
    fn write_uniforms(&self, block: &UniformBlock) {
        let bytes = bytemuck::bytes_of(block);
        // SAFETY: the mapping spans UNIFORM_BLOCK_SIZE bytes and lives as long as the slot.
        // The slot's fence was waited on in begin_frame, so the GPU is not reading it.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.uniforms.as_ptr(), bytes.len())
        };
    }

    #[cfg(test)]
    pub fn read_uniforms(&self) -> UniformBlock {
        // SAFETY: see write_uniforms.
        let bytes = unsafe {
            std::slice::from_raw_parts(self.uniforms.as_ptr(), UNIFORM_BLOCK_SIZE as usize)
        };
        bytemuck::pod_read_unaligned(bytes)
    }
}

pub(crate) fn create_frame_slots<G: Gpu>(
    gpu: &G,
    owned: &mut OwnedResources,
) -> Result<Vec<FrameSlot>> {
    (0..FRAMES_IN_FLIGHT)
        .map(|_| FrameSlot::create(gpu, owned))
        .collect()
}

// STRICT PER-FRAME ORDER:
// 1) wait this slot's fence (frame k-2 done with its cmd buffer + uniforms)
// 2) acquire (signals image_acquired); out of date => rebuild, skip, fence untouched
// 3) reset fence, reset + begin cmd, render pass, pipeline, viewport
// 4) draws write uniforms through the mapping and record indexed draws
// 5) end, submit (wait image_acquired @ COLOR_ATTACHMENT_OUTPUT, signal render_done + fence)
// 6) present (wait render_done); out of date / suboptimal / resize => rebuild after submit
// 7) advance slot
impl<G: Gpu> Engine<G> {
    pub(crate) fn begin(&mut self) -> Result<bool> {
        if self.recording.is_some() {
            debug!("begin_frame while a frame is recording; ignored");
            return Ok(true);
        }
        if !self.surface.is_live() {
            let size = self.window.framebuffer_size();
            if size.is_zero() {
                return Ok(false);
            }
            // the surface already refused this size; wait for the window to change
            if !self.stale && self.suspended_at == Some(size) && !self.window.take_resized() {
                return Ok(false);
            }
        }
        if self.stale || !self.surface.is_live() {
            let reason = if self.stale {
                "resize requested"
            } else {
                "framebuffer is back"
            };
            self.rebuild_surface(reason)?;
            if !self.surface.is_live() {
                return Ok(false);
            }
        }

        let (fence, image_acquired, cmd) = {
            let slot = &self.frames[self.frame_index];
            (slot.fence, slot.image_acquired, slot.cmd)
        };
        self.gpu
            .wait_for_fence(fence)
            .context("wait_for_fence(frame)")?;

        let image_index = match self
            .gpu
            .acquire_next_image(self.surface.swapchain(), image_acquired)
        {
            // suboptimal still presents; the present result triggers the rebuild
            Ok((index, _suboptimal)) => index,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.rebuild_surface("acquire: out of date")?;
                return Ok(false);
            }
            Err(e) => return Err(e).context("acquire_next_image"),
        };
        let Some(framebuffer) = self.surface.framebuffer(image_index) else {
            bail!("acquired image {image_index} has no framebuffer");
        };

        self.gpu.reset_fence(fence).context("reset_fence(frame)")?;
        self.gpu
            .reset_command_buffer(cmd)
            .context("reset_command_buffer")?;
        self.gpu
            .begin_command_buffer(cmd, false)
            .context("begin_command_buffer")?;

        let extent = self.surface.extent();
        self.gpu.cmd_begin_render_pass(
            cmd,
            self.pipeline.render_pass,
            framebuffer,
            extent,
            self.config.clear_color,
        );
        self.gpu.cmd_bind_pipeline(cmd, self.pipeline.pipeline);
        self.gpu.cmd_set_viewport_scissor(cmd, extent);

        self.recording = Some(image_index);
        Ok(true)
    }

    pub(crate) fn record_draw(&self, mesh: usize, model: Mat4) {
        if self.recording.is_none() {
            return;
        }
        let Some(mesh) = self.meshes.get(mesh) else {
            return;
        };

        let extent = self.surface.extent();
        let aspect = extent.width as f32 / extent.height.max(1) as f32;
        let proj = perspective_flipped(
            self.config.fov_y_degrees.to_radians(),
            aspect,
            self.config.near,
            self.config.far,
        );

        let slot = &self.frames[self.frame_index];
        slot.write_uniforms(&self.scene.block(model, proj));
        self.gpu.cmd_bind_descriptor_set(
            slot.cmd,
            self.pipeline.layout,
            self.bindings.set(self.frame_index),
        );
        self.gpu
            .cmd_bind_mesh_buffers(slot.cmd, mesh.vertex_buffer, mesh.index_buffer);
        self.gpu.cmd_draw_indexed(slot.cmd, mesh.index_count);
    }

    pub(crate) fn finish(&mut self) -> Result<()> {
        let Some(image_index) = self.recording.take() else {
            return Ok(());
        };
        let slot = &self.frames[self.frame_index];
        let submit = FrameSubmit {
            wait: slot.image_acquired,
            wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal: slot.render_done,
            fence: slot.fence,
        };
        let cmd = slot.cmd;

        self.gpu.cmd_end_render_pass(cmd);
        self.gpu
            .end_command_buffer(cmd)
            .context("end_command_buffer")?;
        self.gpu
            .submit_graphics(cmd, Some(&submit))
            .context("queue_submit(frame)")?;

        let presented =
            self.gpu
                .queue_present(self.surface.swapchain(), image_index, submit.signal);
        self.frame_index = (self.frame_index + 1) % FRAMES_IN_FLIGHT;

        let resized = self.window.take_resized();
        let reason = match presented {
            Ok(false) if !resized => return Ok(()),
            Ok(false) => "window resized",
            Ok(true) => "present: suboptimal",
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => "present: out of date",
            Err(e) => return Err(e).context("queue_present"),
        };
        self.rebuild_surface(reason)
    }

    #[cfg(test)]
    pub(crate) fn slot(&self, index: usize) -> &FrameSlot {
        &self.frames[index]
    }
}
