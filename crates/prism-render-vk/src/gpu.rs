// SPDX-License-Identifier: CEPL-1.0
//! Device seam. Everything the engine asks of the GPU goes through [`Gpu`],
//! so the frame/surface/upload state machines can run against a recording
//! double in tests. [`crate::AshGpu`] is the real implementation.

use ash::prelude::VkResult;
use ash::vk;

/// Queue families chosen for the device. They may coincide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    pub fn distinct(&self) -> bool {
        self.graphics != self.present
    }
}

/// Everything the surface reports about itself for one build.
#[derive(Clone, Debug, Default)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwapchainDesc {
    pub min_image_count: u32,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub sharing_mode: vk::SharingMode,
    /// Only read when `sharing_mode` is CONCURRENT.
    pub queue_family_indices: Vec<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageDesc {
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub tiling: vk::ImageTiling,
    pub usage: vk::ImageUsageFlags,
}

/// Semaphores and fence attached to a frame submission.
#[derive(Clone, Copy, Debug)]
pub struct FrameSubmit {
    pub wait: vk::Semaphore,
    pub wait_stage: vk::PipelineStageFlags,
    pub signal: vk::Semaphore,
    pub fence: vk::Fence,
}

/// The image layout changes the engine performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutTransition {
    UndefinedToTransferDst,
    TransferDstToShaderRead,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BarrierMasks {
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
}

impl LayoutTransition {
    pub fn masks(self) -> BarrierMasks {
        match self {
            LayoutTransition::UndefinedToTransferDst => BarrierMasks {
                old_layout: vk::ImageLayout::UNDEFINED,
                new_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                src_access: vk::AccessFlags::empty(),
                dst_access: vk::AccessFlags::TRANSFER_WRITE,
                src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
                dst_stage: vk::PipelineStageFlags::TRANSFER,
            },
            LayoutTransition::TransferDstToShaderRead => BarrierMasks {
                old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
            },
        }
    }
}

/// Device operations used by the engine.
///
/// Creation calls return the raw Vulkan status so callers can tell the
/// transient presentation codes apart from fatal ones. Destroy calls take
/// handles by value and must not be called twice for the same handle.
pub trait Gpu {
    // --- capabilities ---
    fn queue_families(&self) -> QueueFamilies;
    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties;
    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties;
    fn surface_support(&self) -> VkResult<SurfaceSupport>;

    // --- memory and resources ---
    fn create_buffer(&self, size: vk::DeviceSize, usage: vk::BufferUsageFlags)
        -> VkResult<vk::Buffer>;
    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements;
    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> VkResult<()>;
    fn destroy_buffer(&self, buffer: vk::Buffer);

    fn create_image(&self, desc: &ImageDesc) -> VkResult<vk::Image>;
    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements;
    fn bind_image_memory(&self, image: vk::Image, memory: vk::DeviceMemory) -> VkResult<()>;
    fn destroy_image(&self, image: vk::Image);

    fn allocate_memory(&self, size: vk::DeviceSize, type_index: u32)
        -> VkResult<vk::DeviceMemory>;
    fn free_memory(&self, memory: vk::DeviceMemory);
    /// Maps the whole allocation. The pointer stays valid until unmapped or freed.
    fn map_memory(&self, memory: vk::DeviceMemory) -> VkResult<*mut u8>;
    fn unmap_memory(&self, memory: vk::DeviceMemory);

    fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        aspect: vk::ImageAspectFlags,
    ) -> VkResult<vk::ImageView>;
    fn destroy_image_view(&self, view: vk::ImageView);
    /// Linear filtering, repeat addressing, device-clamped anisotropy.
    fn create_sampler(&self) -> VkResult<vk::Sampler>;
    fn destroy_sampler(&self, sampler: vk::Sampler);

    // --- pipeline objects ---
    fn create_render_pass(
        &self,
        color: vk::Format,
        depth: vk::Format,
    ) -> VkResult<vk::RenderPass>;
    fn destroy_render_pass(&self, render_pass: vk::RenderPass);
    /// Binding 0: uniform block (vertex + fragment). Binding 1: texture (fragment).
    fn create_frame_set_layout(&self) -> VkResult<vk::DescriptorSetLayout>;
    fn destroy_set_layout(&self, layout: vk::DescriptorSetLayout);
    fn create_pipeline(
        &self,
        render_pass: vk::RenderPass,
        set_layout: vk::DescriptorSetLayout,
    ) -> VkResult<(vk::PipelineLayout, vk::Pipeline)>;
    fn destroy_pipeline(&self, layout: vk::PipelineLayout, pipeline: vk::Pipeline);
    /// Pool sized for `sets` frame sets.
    fn create_descriptor_pool(&self, sets: u32) -> VkResult<vk::DescriptorPool>;
    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool);
    fn allocate_descriptor_sets(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
        count: u32,
    ) -> VkResult<Vec<vk::DescriptorSet>>;
    fn write_frame_bindings(
        &self,
        set: vk::DescriptorSet,
        uniforms: vk::DescriptorBufferInfo,
        texture: vk::DescriptorImageInfo,
    );
    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VkResult<vk::Framebuffer>;
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    // --- presentation ---
    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
    ) -> VkResult<(vk::SwapchainKHR, Vec<vk::Image>)>;
    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);
    /// `(image index, suboptimal)`.
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    ) -> VkResult<(u32, bool)>;
    /// Presents on the present queue. `Ok(true)` means suboptimal.
    fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool>;

    // --- synchronisation ---
    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence>;
    fn destroy_fence(&self, fence: vk::Fence);
    fn wait_for_fence(&self, fence: vk::Fence) -> VkResult<()>;
    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()>;
    fn create_semaphore(&self) -> VkResult<vk::Semaphore>;
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);
    fn device_wait_idle(&self) -> VkResult<()>;
    fn graphics_queue_wait_idle(&self) -> VkResult<()>;

    // --- commands ---
    fn allocate_command_buffers(&self, count: u32) -> VkResult<Vec<vk::CommandBuffer>>;
    fn free_command_buffers(&self, buffers: &[vk::CommandBuffer]);
    fn begin_command_buffer(&self, cmd: vk::CommandBuffer, one_time: bool) -> VkResult<()>;
    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()>;
    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()>;
    /// Submits on the graphics queue. `None` means no semaphores and no fence.
    fn submit_graphics(&self, cmd: vk::CommandBuffer, sync: Option<&FrameSubmit>)
        -> VkResult<()>;

    fn cmd_copy_buffer(
        &self,
        cmd: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Buffer,
        size: vk::DeviceSize,
    );
    fn cmd_copy_buffer_to_image(
        &self,
        cmd: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Image,
        extent: vk::Extent2D,
    );
    fn cmd_transition_image(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        transition: LayoutTransition,
    );
    fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_color: [f32; 4],
    );
    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer);
    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline);
    fn cmd_set_viewport_scissor(&self, cmd: vk::CommandBuffer, extent: vk::Extent2D);
    fn cmd_bind_descriptor_set(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    );
    fn cmd_bind_mesh_buffers(&self, cmd: vk::CommandBuffer, vertex: vk::Buffer, index: vk::Buffer);
    fn cmd_draw_indexed(&self, cmd: vk::CommandBuffer, index_count: u32);
}
