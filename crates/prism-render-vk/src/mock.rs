// SPDX-License-Identifier: CEPL-1.0
//! Recording device double. Handles are counters, memory is host boxes,
//! fences follow a small state machine that panics on misuse.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use prism_render::{FramebufferSource, RenderSize};

use crate::gpu::{
    FrameSubmit, Gpu, ImageDesc, LayoutTransition, QueueFamilies, SurfaceSupport, SwapchainDesc,
};

pub(crate) const DEVICE_LOCAL_TYPE: u32 = 0;
pub(crate) const HOST_VISIBLE_TYPE: u32 = 1;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    CreateBuffer { buffer: u64, size: u64 },
    DestroyBuffer(u64),
    CreateImage(u64),
    DestroyImage(u64),
    AllocateMemory { memory: u64, type_index: u32 },
    FreeMemory(u64),
    MapMemory(u64),
    UnmapMemory(u64),
    CreateImageView(u64),
    DestroyImageView(u64),
    CreateSampler(u64),
    DestroySampler(u64),
    CreateRenderPass { render_pass: u64, color: vk::Format },
    DestroyRenderPass(u64),
    CreateSetLayout(u64),
    DestroySetLayout(u64),
    CreatePipeline(u64),
    DestroyPipeline(u64),
    CreateDescriptorPool(u64),
    DestroyDescriptorPool(u64),
    WriteBindings { set: u64, buffer: u64, view: u64, sampler: u64 },
    CreateFramebuffer(u64),
    DestroyFramebuffer(u64),
    CreateSwapchain { swapchain: u64, desc: SwapchainDesc },
    DestroySwapchain(u64),
    Acquire { swapchain: u64, semaphore: u64 },
    Present { swapchain: u64, image_index: u32, wait: u64 },
    CreateFence(u64),
    DestroyFence(u64),
    WaitFence(u64),
    ResetFence(u64),
    CreateSemaphore(u64),
    DestroySemaphore(u64),
    DeviceWaitIdle,
    QueueWaitIdle,
    AllocateCommandBuffer(u64),
    FreeCommandBuffer(u64),
    Begin { cmd: u64, one_time: bool },
    Reset(u64),
    End(u64),
    Submit { cmd: u64, wait: u64, signal: u64, fence: u64 },
    CopyBuffer { src: u64, dst: u64, size: u64 },
    CopyBufferToImage { src: u64, dst: u64 },
    Transition { image: u64, transition: LayoutTransition },
    BeginRenderPass { framebuffer: u64, extent: vk::Extent2D },
    EndRenderPass,
    BindPipeline(u64),
    SetViewport(vk::Extent2D),
    BindSet(u64),
    BindMesh { vertex: u64, index: u64 },
    DrawIndexed(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FenceState {
    Signaled,
    Unsignaled,
    /// Submitted; becomes signaled the next time someone waits on it.
    Pending,
}

pub(crate) struct MockGpu {
    next_handle: Cell<u64>,
    calls: RefCell<Vec<Call>>,
    fences: RefCell<HashMap<u64, FenceState>>,
    waited: RefCell<HashSet<u64>>,
    sizes: RefCell<HashMap<u64, u64>>,
    memory: RefCell<HashMap<u64, Box<[u8]>>>,
    swapchain_images: RefCell<HashMap<u64, u32>>,
    next_image: Cell<u32>,
    pub families: Cell<QueueFamilies>,
    pub support: RefCell<SurfaceSupport>,
    pub depth_formats: RefCell<Vec<vk::Format>>,
    pub acquire_script: RefCell<VecDeque<VkResult<(u32, bool)>>>,
    pub present_script: RefCell<VecDeque<VkResult<bool>>>,
    fail_allocation: Cell<Option<usize>>,
    allocations: Cell<usize>,
    pub fail_sampler: Cell<bool>,
    pub fail_queue_idle: Cell<bool>,
}

impl Default for MockGpu {
    fn default() -> Self {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        };
        Self {
            next_handle: Cell::new(0x1000),
            calls: RefCell::default(),
            fences: RefCell::default(),
            waited: RefCell::default(),
            sizes: RefCell::default(),
            memory: RefCell::default(),
            swapchain_images: RefCell::default(),
            next_image: Cell::new(0),
            fail_allocation: Cell::new(None),
            allocations: Cell::new(0),
            fail_sampler: Cell::new(false),
            fail_queue_idle: Cell::new(false),
            families: Cell::new(QueueFamilies {
                graphics: 0,
                present: 0,
            }),
            support: RefCell::new(SurfaceSupport {
                capabilities,
                formats: vec![
                    vk::SurfaceFormatKHR {
                        format: vk::Format::B8G8R8A8_UNORM,
                        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                    },
                    vk::SurfaceFormatKHR {
                        format: vk::Format::B8G8R8A8_SRGB,
                        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                    },
                ],
                present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            }),
            depth_formats: RefCell::new(vec![vk::Format::D32_SFLOAT]),
            acquire_script: RefCell::default(),
            present_script: RefCell::default(),
        }
    }
}

impl MockGpu {
    fn handle<H: Handle>(&self) -> H {
        let raw = self.next_handle.get() + 1;
        self.next_handle.set(raw);
        H::from_raw(raw)
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// The `n`-th `allocate_memory` from now reports out of device memory.
    pub fn fail_nth_allocation(&self, n: usize) {
        self.fail_allocation.set(Some(self.allocations.get() + n));
    }

    /// Creations minus destructions of buffers, images and memory in the trace.
    pub fn live_objects(&self) -> (isize, isize, isize) {
        let net = |make: fn(&Call) -> bool, kill: fn(&Call) -> bool| {
            self.count(make) as isize - self.count(kill) as isize
        };
        (
            net(
                |c| matches!(c, Call::CreateBuffer { .. }),
                |c| matches!(c, Call::DestroyBuffer(_)),
            ),
            net(
                |c| matches!(c, Call::CreateImage(_)),
                |c| matches!(c, Call::DestroyImage(_)),
            ),
            net(
                |c| matches!(c, Call::AllocateMemory { .. }),
                |c| matches!(c, Call::FreeMemory(_)),
            ),
        )
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn fence_state(&self, fence: vk::Fence) -> Option<FenceState> {
        self.fences.borrow().get(&fence.as_raw()).copied()
    }

    pub fn memory_bytes(&self, memory: vk::DeviceMemory) -> Vec<u8> {
        self.memory.borrow()[&memory.as_raw()].to_vec()
    }
}

fn raw<H: Handle>(h: H) -> u64 {
    h.as_raw()
}

impl Gpu for MockGpu {
    fn queue_families(&self) -> QueueFamilies {
        self.families.get()
    }

    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: 2,
            memory_heap_count: 1,
            ..Default::default()
        };
        props.memory_types[DEVICE_LOCAL_TYPE as usize] = vk::MemoryType {
            property_flags: vk::MemoryPropertyFlags::DEVICE_LOCAL,
            heap_index: 0,
        };
        props.memory_types[HOST_VISIBLE_TYPE as usize] = vk::MemoryType {
            property_flags: vk::MemoryPropertyFlags::HOST_VISIBLE
                | vk::MemoryPropertyFlags::HOST_COHERENT,
            heap_index: 0,
        };
        props
    }

    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        let mut props = vk::FormatProperties::default();
        if self.depth_formats.borrow().contains(&format) {
            props.optimal_tiling_features = vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
        }
        props
    }

    fn surface_support(&self) -> VkResult<SurfaceSupport> {
        Ok(self.support.borrow().clone())
    }

    fn create_buffer(
        &self,
        size: vk::DeviceSize,
        _usage: vk::BufferUsageFlags,
    ) -> VkResult<vk::Buffer> {
        let buffer: vk::Buffer = self.handle();
        self.sizes.borrow_mut().insert(raw(buffer), size);
        self.record(Call::CreateBuffer {
            buffer: raw(buffer),
            size,
        });
        Ok(buffer)
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        vk::MemoryRequirements {
            size: self.sizes.borrow()[&raw(buffer)],
            alignment: 16,
            memory_type_bits: 0b11,
        }
    }

    fn bind_buffer_memory(&self, _buffer: vk::Buffer, _memory: vk::DeviceMemory) -> VkResult<()> {
        Ok(())
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        self.record(Call::DestroyBuffer(raw(buffer)));
    }

    fn create_image(&self, desc: &ImageDesc) -> VkResult<vk::Image> {
        let image: vk::Image = self.handle();
        let bytes = desc.extent.width as u64 * desc.extent.height as u64 * 4;
        self.sizes.borrow_mut().insert(raw(image), bytes);
        self.record(Call::CreateImage(raw(image)));
        Ok(image)
    }

    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements {
        vk::MemoryRequirements {
            size: self.sizes.borrow()[&raw(image)],
            alignment: 256,
            memory_type_bits: 0b01,
        }
    }

    fn bind_image_memory(&self, _image: vk::Image, _memory: vk::DeviceMemory) -> VkResult<()> {
        Ok(())
    }

    fn destroy_image(&self, image: vk::Image) {
        self.record(Call::DestroyImage(raw(image)));
    }

    fn allocate_memory(
        &self,
        size: vk::DeviceSize,
        type_index: u32,
    ) -> VkResult<vk::DeviceMemory> {
        let nth = self.allocations.get() + 1;
        self.allocations.set(nth);
        if self.fail_allocation.get() == Some(nth) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        let memory: vk::DeviceMemory = self.handle();
        self.memory
            .borrow_mut()
            .insert(raw(memory), vec![0u8; size as usize].into_boxed_slice());
        self.record(Call::AllocateMemory {
            memory: raw(memory),
            type_index,
        });
        Ok(memory)
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        self.record(Call::FreeMemory(raw(memory)));
    }

    fn map_memory(&self, memory: vk::DeviceMemory) -> VkResult<*mut u8> {
        self.record(Call::MapMemory(raw(memory)));
        self.memory
            .borrow_mut()
            .get_mut(&raw(memory))
            .map(|bytes| bytes.as_mut_ptr())
            .ok_or(vk::Result::ERROR_MEMORY_MAP_FAILED)
    }

    fn unmap_memory(&self, memory: vk::DeviceMemory) {
        self.record(Call::UnmapMemory(raw(memory)));
    }

    fn create_image_view(
        &self,
        _image: vk::Image,
        _format: vk::Format,
        _aspect: vk::ImageAspectFlags,
    ) -> VkResult<vk::ImageView> {
        let view: vk::ImageView = self.handle();
        self.record(Call::CreateImageView(raw(view)));
        Ok(view)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.record(Call::DestroyImageView(raw(view)));
    }

    fn create_sampler(&self) -> VkResult<vk::Sampler> {
        if self.fail_sampler.get() {
            return Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        }
        let sampler: vk::Sampler = self.handle();
        self.record(Call::CreateSampler(raw(sampler)));
        Ok(sampler)
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        self.record(Call::DestroySampler(raw(sampler)));
    }

    fn create_render_pass(
        &self,
        color: vk::Format,
        _depth: vk::Format,
    ) -> VkResult<vk::RenderPass> {
        let render_pass: vk::RenderPass = self.handle();
        self.record(Call::CreateRenderPass {
            render_pass: raw(render_pass),
            color,
        });
        Ok(render_pass)
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.record(Call::DestroyRenderPass(raw(render_pass)));
    }

    fn create_frame_set_layout(&self) -> VkResult<vk::DescriptorSetLayout> {
        let layout: vk::DescriptorSetLayout = self.handle();
        self.record(Call::CreateSetLayout(raw(layout)));
        Ok(layout)
    }

    fn destroy_set_layout(&self, layout: vk::DescriptorSetLayout) {
        self.record(Call::DestroySetLayout(raw(layout)));
    }

    fn create_pipeline(
        &self,
        _render_pass: vk::RenderPass,
        _set_layout: vk::DescriptorSetLayout,
    ) -> VkResult<(vk::PipelineLayout, vk::Pipeline)> {
        let layout: vk::PipelineLayout = self.handle();
        let pipeline: vk::Pipeline = self.handle();
        self.record(Call::CreatePipeline(raw(pipeline)));
        Ok((layout, pipeline))
    }

    fn destroy_pipeline(&self, _layout: vk::PipelineLayout, pipeline: vk::Pipeline) {
        self.record(Call::DestroyPipeline(raw(pipeline)));
    }

    fn create_descriptor_pool(&self, _sets: u32) -> VkResult<vk::DescriptorPool> {
        let pool: vk::DescriptorPool = self.handle();
        self.record(Call::CreateDescriptorPool(raw(pool)));
        Ok(pool)
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        self.record(Call::DestroyDescriptorPool(raw(pool)));
    }

    fn allocate_descriptor_sets(
        &self,
        _pool: vk::DescriptorPool,
        _layout: vk::DescriptorSetLayout,
        count: u32,
    ) -> VkResult<Vec<vk::DescriptorSet>> {
        Ok((0..count).map(|_| self.handle()).collect())
    }

    fn write_frame_bindings(
        &self,
        set: vk::DescriptorSet,
        uniforms: vk::DescriptorBufferInfo,
        texture: vk::DescriptorImageInfo,
    ) {
        self.record(Call::WriteBindings {
            set: raw(set),
            buffer: raw(uniforms.buffer),
            view: raw(texture.image_view),
            sampler: raw(texture.sampler),
        });
    }

    fn create_framebuffer(
        &self,
        _render_pass: vk::RenderPass,
        _attachments: &[vk::ImageView],
        _extent: vk::Extent2D,
    ) -> VkResult<vk::Framebuffer> {
        let framebuffer: vk::Framebuffer = self.handle();
        self.record(Call::CreateFramebuffer(raw(framebuffer)));
        Ok(framebuffer)
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.record(Call::DestroyFramebuffer(raw(framebuffer)));
    }

    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
    ) -> VkResult<(vk::SwapchainKHR, Vec<vk::Image>)> {
        let swapchain: vk::SwapchainKHR = self.handle();
        let images: Vec<vk::Image> = (0..desc.min_image_count).map(|_| self.handle()).collect();
        self.swapchain_images
            .borrow_mut()
            .insert(raw(swapchain), desc.min_image_count);
        self.next_image.set(0);
        self.record(Call::CreateSwapchain {
            swapchain: raw(swapchain),
            desc: desc.clone(),
        });
        Ok((swapchain, images))
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        self.record(Call::DestroySwapchain(raw(swapchain)));
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        self.record(Call::Acquire {
            swapchain: raw(swapchain),
            semaphore: raw(signal),
        });
        if let Some(scripted) = self.acquire_script.borrow_mut().pop_front() {
            return scripted;
        }
        let count = self.swapchain_images.borrow()[&raw(swapchain)];
        let index = self.next_image.get();
        self.next_image.set((index + 1) % count);
        Ok((index, false))
    }

    fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool> {
        self.record(Call::Present {
            swapchain: raw(swapchain),
            image_index,
            wait: raw(wait),
        });
        self.present_script
            .borrow_mut()
            .pop_front()
            .unwrap_or(Ok(false))
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let fence: vk::Fence = self.handle();
        let state = if signaled {
            FenceState::Signaled
        } else {
            FenceState::Unsignaled
        };
        self.fences.borrow_mut().insert(raw(fence), state);
        self.record(Call::CreateFence(raw(fence)));
        Ok(fence)
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        self.record(Call::DestroyFence(raw(fence)));
    }

    fn wait_for_fence(&self, fence: vk::Fence) -> VkResult<()> {
        let mut fences = self.fences.borrow_mut();
        let state = fences.get_mut(&raw(fence)).expect("wait on unknown fence");
        assert_ne!(
            *state,
            FenceState::Unsignaled,
            "wait on a fence that nothing will signal"
        );
        *state = FenceState::Signaled;
        self.waited.borrow_mut().insert(raw(fence));
        self.record(Call::WaitFence(raw(fence)));
        Ok(())
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        let mut fences = self.fences.borrow_mut();
        let state = fences.get_mut(&raw(fence)).expect("reset of unknown fence");
        assert_eq!(*state, FenceState::Signaled, "reset of an unsignaled fence");
        assert!(
            self.waited.borrow_mut().remove(&raw(fence)),
            "fence reset without being waited on first"
        );
        *state = FenceState::Unsignaled;
        self.record(Call::ResetFence(raw(fence)));
        Ok(())
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        let semaphore: vk::Semaphore = self.handle();
        self.record(Call::CreateSemaphore(raw(semaphore)));
        Ok(semaphore)
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.record(Call::DestroySemaphore(raw(semaphore)));
    }

    fn device_wait_idle(&self) -> VkResult<()> {
        for state in self.fences.borrow_mut().values_mut() {
            if *state == FenceState::Pending {
                *state = FenceState::Signaled;
            }
        }
        self.record(Call::DeviceWaitIdle);
        Ok(())
    }

    fn graphics_queue_wait_idle(&self) -> VkResult<()> {
        if self.fail_queue_idle.get() {
            return Err(vk::Result::ERROR_DEVICE_LOST);
        }
        self.record(Call::QueueWaitIdle);
        Ok(())
    }

    fn allocate_command_buffers(&self, count: u32) -> VkResult<Vec<vk::CommandBuffer>> {
        Ok((0..count)
            .map(|_| {
                let cmd: vk::CommandBuffer = self.handle();
                self.record(Call::AllocateCommandBuffer(raw(cmd)));
                cmd
            })
            .collect())
    }

    fn free_command_buffers(&self, buffers: &[vk::CommandBuffer]) {
        for &cmd in buffers {
            self.record(Call::FreeCommandBuffer(raw(cmd)));
        }
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer, one_time: bool) -> VkResult<()> {
        self.record(Call::Begin {
            cmd: raw(cmd),
            one_time,
        });
        Ok(())
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.record(Call::Reset(raw(cmd)));
        Ok(())
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.record(Call::End(raw(cmd)));
        Ok(())
    }

    fn submit_graphics(
        &self,
        cmd: vk::CommandBuffer,
        sync: Option<&FrameSubmit>,
    ) -> VkResult<()> {
        let (wait, signal, fence) = match sync {
            Some(s) => (raw(s.wait), raw(s.signal), raw(s.fence)),
            None => (0, 0, 0),
        };
        if fence != 0 {
            let mut fences = self.fences.borrow_mut();
            let state = fences.get_mut(&fence).expect("submit with unknown fence");
            assert_eq!(*state, FenceState::Unsignaled, "submit with a signaled fence");
            *state = FenceState::Pending;
        }
        self.record(Call::Submit {
            cmd: raw(cmd),
            wait,
            signal,
            fence,
        });
        Ok(())
    }

    fn cmd_copy_buffer(
        &self,
        _cmd: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Buffer,
        size: vk::DeviceSize,
    ) {
        self.record(Call::CopyBuffer {
            src: raw(src),
            dst: raw(dst),
            size,
        });
    }

    fn cmd_copy_buffer_to_image(
        &self,
        _cmd: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Image,
        _extent: vk::Extent2D,
    ) {
        self.record(Call::CopyBufferToImage {
            src: raw(src),
            dst: raw(dst),
        });
    }

    fn cmd_transition_image(
        &self,
        _cmd: vk::CommandBuffer,
        image: vk::Image,
        transition: LayoutTransition,
    ) {
        self.record(Call::Transition {
            image: raw(image),
            transition,
        });
    }

    fn cmd_begin_render_pass(
        &self,
        _cmd: vk::CommandBuffer,
        _render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        _clear_color: [f32; 4],
    ) {
        self.record(Call::BeginRenderPass {
            framebuffer: raw(framebuffer),
            extent,
        });
    }

    fn cmd_end_render_pass(&self, _cmd: vk::CommandBuffer) {
        self.record(Call::EndRenderPass);
    }

    fn cmd_bind_pipeline(&self, _cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        self.record(Call::BindPipeline(raw(pipeline)));
    }

    fn cmd_set_viewport_scissor(&self, _cmd: vk::CommandBuffer, extent: vk::Extent2D) {
        self.record(Call::SetViewport(extent));
    }

    fn cmd_bind_descriptor_set(
        &self,
        _cmd: vk::CommandBuffer,
        _layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    ) {
        self.record(Call::BindSet(raw(set)));
    }

    fn cmd_bind_mesh_buffers(&self, _cmd: vk::CommandBuffer, vertex: vk::Buffer, index: vk::Buffer) {
        self.record(Call::BindMesh {
            vertex: raw(vertex),
            index: raw(index),
        });
    }

    fn cmd_draw_indexed(&self, _cmd: vk::CommandBuffer, index_count: u32) {
        self.record(Call::DrawIndexed(index_count));
    }
}

/// Window stand-in with a settable size and resize flag.
#[derive(Debug)]
pub(crate) struct TestWindow {
    size: Cell<RenderSize>,
    resized: Cell<bool>,
}

impl TestWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Cell::new(RenderSize { width, height }),
            resized: Cell::new(false),
        }
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.size.set(RenderSize { width, height });
        self.resized.set(true);
    }
}

impl FramebufferSource for TestWindow {
    fn framebuffer_size(&self) -> RenderSize {
        self.size.get()
    }

    fn take_resized(&self) -> bool {
        self.resized.replace(false)
    }
}
