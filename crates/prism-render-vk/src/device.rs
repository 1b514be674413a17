// SPDX-License-Identifier: CEPL-1.0
//! [`AshGpu`]: the [`Gpu`] seam backed by a real Vulkan device.
//!
//! Every method is a thin translation to one or two ash calls. Handle
//! validity is the engine's responsibility; the `unsafe` blocks here only
//! forward handles the engine created through this same object.

use std::ffi::CStr;

use anyhow::{ensure, Context, Result};
use ash::khr::{surface, swapchain};
use ash::prelude::VkResult;
use ash::{vk, Entry, Instance};
use prism_render::RenderError;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::info;

use crate::gpu::{
    FrameSubmit, Gpu, ImageDesc, LayoutTransition, QueueFamilies, SurfaceSupport, SwapchainDesc,
};
use crate::instance::{create_instance, create_surface, DebugMessenger};
use crate::negotiate::{resolve_queue_families, select_device, Candidate};
use crate::pipeline::{self, ShaderCode};

const REQUIRED_DEVICE_EXTENSIONS: [&CStr; 1] = [swapchain::NAME];
const MAX_ANISOTROPY: f32 = 16.0;

/// Bring-up steps in the only order that works.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum InitStage {
    Nothing,
    Instance,
    Surface,
    Device,
    CommandPool,
}

impl InitStage {
    fn name(self) -> &'static str {
        match self {
            InitStage::Nothing => "nothing",
            InitStage::Instance => "instance",
            InitStage::Surface => "surface",
            InitStage::Device => "device",
            InitStage::CommandPool => "command pool",
        }
    }

    fn requires(self) -> InitStage {
        match self {
            InitStage::Nothing | InitStage::Instance => InitStage::Nothing,
            InitStage::Surface => InitStage::Instance,
            InitStage::Device => InitStage::Surface,
            InitStage::CommandPool => InitStage::Device,
        }
    }
}

#[derive(Debug)]
pub(crate) struct InitTracker {
    reached: InitStage,
}

impl Default for InitTracker {
    fn default() -> Self {
        Self {
            reached: InitStage::Nothing,
        }
    }
}

impl InitTracker {
    /// Records `step`; fails if its predecessor is not the last completed step.
    pub fn advance(&mut self, step: InitStage) -> Result<()> {
        let requires = step.requires();
        ensure!(
            self.reached == requires && step != InitStage::Nothing,
            RenderError::InitOrder {
                step: step.name(),
                requires: requires.name(),
                reached: self.reached.name(),
            }
        );
        self.reached = step;
        Ok(())
    }

    pub fn reached(&self) -> InitStage {
        self.reached
    }
}

/// Instance-level objects that must outlive the device.
struct InstanceSide {
    _entry: Entry,
    instance: Instance,
    debug: Option<DebugMessenger>,
    surface_loader: surface::Instance,
    surface: vk::SurfaceKHR,
}

impl InstanceSide {
    // STRICT TEARDOWN ORDER: surface, messenger, instance.
    unsafe fn destroy(&self) {
        self.surface_loader.destroy_surface(self.surface, None);
        if let Some(debug) = &self.debug {
            debug.destroy();
        }
        self.instance.destroy_instance(None);
    }
}

pub struct AshGpu {
    side: InstanceSide,
    phys: vk::PhysicalDevice,
    families: QueueFamilies,
    memory: vk::PhysicalDeviceMemoryProperties,
    device: ash::Device,
    swapchain_loader: swapchain::Device,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    cmd_pool: vk::CommandPool,
    max_anisotropy: f32,
    shaders: ShaderCode,
    name: String,
}

unsafe fn probe(
    instance: &Instance,
    surface_loader: &surface::Instance,
    surface: vk::SurfaceKHR,
    phys: vk::PhysicalDevice,
) -> Result<Candidate> {
    let props = instance.get_physical_device_properties(phys);
    let name = props
        .device_name_as_c_str()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "<unnamed device>".into());

    let queue_props = instance.get_physical_device_queue_family_properties(phys);
    let families = resolve_queue_families(&queue_props, |i| {
        surface_loader
            .get_physical_device_surface_support(phys, i, surface)
            .unwrap_or(false)
    });

    let available = instance
        .enumerate_device_extension_properties(phys)
        .context("enumerate_device_extension_properties")?;
    let missing_extensions = REQUIRED_DEVICE_EXTENSIONS
        .iter()
        .filter(|&&req| {
            !available
                .iter()
                .any(|e| e.extension_name_as_c_str() == Ok(req))
        })
        .map(|req| req.to_string_lossy().into_owned())
        .collect();

    let surface_formats = surface_loader
        .get_physical_device_surface_formats(phys, surface)
        .map(|f| f.len())
        .unwrap_or(0);
    let present_modes = surface_loader
        .get_physical_device_surface_present_modes(phys, surface)
        .map(|m| m.len())
        .unwrap_or(0);
    let features = instance.get_physical_device_features(phys);

    Ok(Candidate {
        name,
        families,
        missing_extensions,
        surface_formats,
        present_modes,
        sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
    })
}

unsafe fn pick_physical_device(
    side: &InstanceSide,
) -> Result<(vk::PhysicalDevice, QueueFamilies, String)> {
    let devices = side
        .instance
        .enumerate_physical_devices()
        .context("enumerate_physical_devices")?;
    let mut candidates = Vec::with_capacity(devices.len());
    for &phys in &devices {
        candidates.push(probe(&side.instance, &side.surface_loader, side.surface, phys)?);
    }
    let chosen = select_device(&candidates)?;
    let candidate = &candidates[chosen];
    let families = candidate.families.ok_or(RenderError::NoSuitableDevice)?;
    Ok((devices[chosen], families, candidate.name.clone()))
}

unsafe fn create_logical_device(
    instance: &Instance,
    phys: vk::PhysicalDevice,
    families: QueueFamilies,
) -> Result<ash::Device> {
    let priorities = [1.0_f32];
    let mut unique = vec![families.graphics];
    if families.distinct() {
        unique.push(families.present);
    }
    let queue_infos: Vec<vk::DeviceQueueCreateInfo> = unique
        .iter()
        .map(|&family| vk::DeviceQueueCreateInfo {
            s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
            queue_family_index: family,
            queue_count: 1,
            p_queue_priorities: priorities.as_ptr(),
            ..Default::default()
        })
        .collect();
    let features = vk::PhysicalDeviceFeatures {
        sampler_anisotropy: vk::TRUE,
        ..Default::default()
    };
    let extensions: Vec<*const std::ffi::c_char> =
        REQUIRED_DEVICE_EXTENSIONS.iter().map(|e| e.as_ptr()).collect();

    let ci = vk::DeviceCreateInfo {
        s_type: vk::StructureType::DEVICE_CREATE_INFO,
        queue_create_info_count: queue_infos.len() as u32,
        p_queue_create_infos: queue_infos.as_ptr(),
        enabled_extension_count: extensions.len() as u32,
        pp_enabled_extension_names: extensions.as_ptr(),
        p_enabled_features: &features,
        ..Default::default()
    };
    instance
        .create_device(phys, &ci, None)
        .context("create_device")
}

impl AshGpu {
    // STRICT ORDER:
    // 1) instance (platform WSI + optional debug utils)
    // 2) surface from THIS instance
    // 3) physical device + queue families judged AGAINST this surface
    // 4) logical device + queues, then the command pool
    // Anything created after a failed step is unwound in reverse.
    pub fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        validation: bool,
    ) -> Result<Self> {
        let dh = display
            .display_handle()
            .map_err(|e| anyhow::anyhow!("{e}"))?
            .as_raw();
        let wh = window
            .window_handle()
            .map_err(|e| anyhow::anyhow!("{e}"))?
            .as_raw();
        let shaders = ShaderCode::builtin()?;
        let mut init = InitTracker::default();

        unsafe {
            let entry = Entry::linked();
            let (instance, validation) = create_instance(&entry, dh, validation)?;
            init.advance(InitStage::Instance)?;

            let debug = if validation {
                match DebugMessenger::new(&entry, &instance) {
                    Ok(d) => Some(d),
                    Err(e) => {
                        tracing::warn!("debug messenger unavailable: {e:#}");
                        None
                    }
                }
            } else {
                None
            };
            let surface_loader = surface::Instance::new(&entry, &instance);
            let surface = match create_surface(&entry, &instance, dh, wh) {
                Ok(s) => s,
                Err(e) => {
                    if let Some(d) = &debug {
                        d.destroy();
                    }
                    instance.destroy_instance(None);
                    return Err(e);
                }
            };
            let side = InstanceSide {
                _entry: entry,
                instance,
                debug,
                surface_loader,
                surface,
            };
            init.advance(InitStage::Surface)?;

            let device_parts = pick_physical_device(&side).and_then(|(phys, families, name)| {
                let device = create_logical_device(&side.instance, phys, families)?;
                Ok((phys, families, name, device))
            });
            let (phys, families, name, device) = match device_parts {
                Ok(parts) => parts,
                Err(e) => {
                    side.destroy();
                    return Err(e);
                }
            };
            init.advance(InitStage::Device)?;

            let pool_info = vk::CommandPoolCreateInfo {
                s_type: vk::StructureType::COMMAND_POOL_CREATE_INFO,
                queue_family_index: families.graphics,
                flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
                ..Default::default()
            };
            let cmd_pool = match device.create_command_pool(&pool_info, None) {
                Ok(p) => p,
                Err(e) => {
                    device.destroy_device(None);
                    side.destroy();
                    return Err(e).context("create_command_pool");
                }
            };
            init.advance(InitStage::CommandPool)?;

            let props = side.instance.get_physical_device_properties(phys);
            let max_anisotropy = props.limits.max_sampler_anisotropy.min(MAX_ANISOTROPY);
            let memory = side.instance.get_physical_device_memory_properties(phys);
            let swapchain_loader = swapchain::Device::new(&side.instance, &device);
            let graphics_queue = device.get_device_queue(families.graphics, 0);
            let present_queue = device.get_device_queue(families.present, 0);

            info!(
                "GPU: {name} (graphics family {}, present family {}, anisotropy {max_anisotropy}x)",
                families.graphics, families.present
            );
            debug_assert_eq!(init.reached(), InitStage::CommandPool);

            Ok(Self {
                side,
                phys,
                families,
                memory,
                device,
                swapchain_loader,
                graphics_queue,
                present_queue,
                cmd_pool,
                max_anisotropy,
                shaders,
                name,
            })
        }
    }

    pub fn device_name(&self) -> &str {
        &self.name
    }
}

// STRICT TEARDOWN ORDER:
// - device_wait_idle
// - command pool, device
// - surface, debug messenger, instance
// The engine has already released everything it created through this object.
impl Drop for AshGpu {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_command_pool(self.cmd_pool, None);
            self.device.destroy_device(None);
            self.side.destroy();
        }
    }
}

impl Gpu for AshGpu {
    fn queue_families(&self) -> QueueFamilies {
        self.families
    }

    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        self.memory
    }

    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        unsafe {
            self.side
                .instance
                .get_physical_device_format_properties(self.phys, format)
        }
    }

    fn surface_support(&self) -> VkResult<SurfaceSupport> {
        let loader = &self.side.surface_loader;
        let surface = self.side.surface;
        unsafe {
            Ok(SurfaceSupport {
                capabilities: loader.get_physical_device_surface_capabilities(self.phys, surface)?,
                formats: loader.get_physical_device_surface_formats(self.phys, surface)?,
                present_modes: loader.get_physical_device_surface_present_modes(self.phys, surface)?,
            })
        }
    }

    fn create_buffer(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    ) -> VkResult<vk::Buffer> {
        let ci = vk::BufferCreateInfo {
            s_type: vk::StructureType::BUFFER_CREATE_INFO,
            size,
            usage,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            ..Default::default()
        };
        unsafe { self.device.create_buffer(&ci, None) }
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        unsafe { self.device.get_buffer_memory_requirements(buffer) }
    }

    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> VkResult<()> {
        unsafe { self.device.bind_buffer_memory(buffer, memory, 0) }
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        unsafe { self.device.destroy_buffer(buffer, None) }
    }

    fn create_image(&self, desc: &ImageDesc) -> VkResult<vk::Image> {
        let ci = vk::ImageCreateInfo {
            s_type: vk::StructureType::IMAGE_CREATE_INFO,
            image_type: vk::ImageType::TYPE_2D,
            format: desc.format,
            extent: vk::Extent3D {
                width: desc.extent.width,
                height: desc.extent.height,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            tiling: desc.tiling,
            usage: desc.usage,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            ..Default::default()
        };
        unsafe { self.device.create_image(&ci, None) }
    }

    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements {
        unsafe { self.device.get_image_memory_requirements(image) }
    }

    fn bind_image_memory(&self, image: vk::Image, memory: vk::DeviceMemory) -> VkResult<()> {
        unsafe { self.device.bind_image_memory(image, memory, 0) }
    }

    fn destroy_image(&self, image: vk::Image) {
        unsafe { self.device.destroy_image(image, None) }
    }

    fn allocate_memory(
        &self,
        size: vk::DeviceSize,
        type_index: u32,
    ) -> VkResult<vk::DeviceMemory> {
        let ai = vk::MemoryAllocateInfo {
            s_type: vk::StructureType::MEMORY_ALLOCATE_INFO,
            allocation_size: size,
            memory_type_index: type_index,
            ..Default::default()
        };
        unsafe { self.device.allocate_memory(&ai, None) }
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        unsafe { self.device.free_memory(memory, None) }
    }

    fn map_memory(&self, memory: vk::DeviceMemory) -> VkResult<*mut u8> {
        unsafe {
            self.device
                .map_memory(memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
                .map(|p| p.cast::<u8>())
        }
    }

    fn unmap_memory(&self, memory: vk::DeviceMemory) {
        unsafe { self.device.unmap_memory(memory) }
    }

    fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        aspect: vk::ImageAspectFlags,
    ) -> VkResult<vk::ImageView> {
        let ci = vk::ImageViewCreateInfo {
            s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
            image,
            view_type: vk::ImageViewType::TYPE_2D,
            format,
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            },
            ..Default::default()
        };
        unsafe { self.device.create_image_view(&ci, None) }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) }
    }

    fn create_sampler(&self) -> VkResult<vk::Sampler> {
        let ci = vk::SamplerCreateInfo {
            s_type: vk::StructureType::SAMPLER_CREATE_INFO,
            mag_filter: vk::Filter::LINEAR,
            min_filter: vk::Filter::LINEAR,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            address_mode_u: vk::SamplerAddressMode::REPEAT,
            address_mode_v: vk::SamplerAddressMode::REPEAT,
            address_mode_w: vk::SamplerAddressMode::REPEAT,
            anisotropy_enable: vk::TRUE,
            max_anisotropy: self.max_anisotropy,
            compare_enable: vk::FALSE,
            compare_op: vk::CompareOp::ALWAYS,
            border_color: vk::BorderColor::INT_OPAQUE_BLACK,
            unnormalized_coordinates: vk::FALSE,
            ..Default::default()
        };
        unsafe { self.device.create_sampler(&ci, None) }
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        unsafe { self.device.destroy_sampler(sampler, None) }
    }

    fn create_render_pass(
        &self,
        color: vk::Format,
        depth: vk::Format,
    ) -> VkResult<vk::RenderPass> {
        unsafe { pipeline::create_render_pass(&self.device, color, depth) }
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.device.destroy_render_pass(render_pass, None) }
    }

    fn create_frame_set_layout(&self) -> VkResult<vk::DescriptorSetLayout> {
        unsafe { pipeline::create_frame_set_layout(&self.device) }
    }

    fn destroy_set_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe { self.device.destroy_descriptor_set_layout(layout, None) }
    }

    fn create_pipeline(
        &self,
        render_pass: vk::RenderPass,
        set_layout: vk::DescriptorSetLayout,
    ) -> VkResult<(vk::PipelineLayout, vk::Pipeline)> {
        unsafe { pipeline::create_pipeline(&self.device, &self.shaders, render_pass, set_layout) }
    }

    fn destroy_pipeline(&self, layout: vk::PipelineLayout, pipeline: vk::Pipeline) {
        unsafe {
            self.device.destroy_pipeline(pipeline, None);
            self.device.destroy_pipeline_layout(layout, None);
        }
    }

    fn create_descriptor_pool(&self, sets: u32) -> VkResult<vk::DescriptorPool> {
        let sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: sets,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: sets,
            },
        ];
        let ci = vk::DescriptorPoolCreateInfo {
            s_type: vk::StructureType::DESCRIPTOR_POOL_CREATE_INFO,
            max_sets: sets,
            pool_size_count: sizes.len() as u32,
            p_pool_sizes: sizes.as_ptr(),
            ..Default::default()
        };
        unsafe { self.device.create_descriptor_pool(&ci, None) }
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.device.destroy_descriptor_pool(pool, None) }
    }

    fn allocate_descriptor_sets(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
        count: u32,
    ) -> VkResult<Vec<vk::DescriptorSet>> {
        let layouts = vec![layout; count as usize];
        let ai = vk::DescriptorSetAllocateInfo {
            s_type: vk::StructureType::DESCRIPTOR_SET_ALLOCATE_INFO,
            descriptor_pool: pool,
            descriptor_set_count: count,
            p_set_layouts: layouts.as_ptr(),
            ..Default::default()
        };
        unsafe { self.device.allocate_descriptor_sets(&ai) }
    }

    fn write_frame_bindings(
        &self,
        set: vk::DescriptorSet,
        uniforms: vk::DescriptorBufferInfo,
        texture: vk::DescriptorImageInfo,
    ) {
        let writes = [
            vk::WriteDescriptorSet {
                s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
                dst_set: set,
                dst_binding: 0,
                descriptor_count: 1,
                descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                p_buffer_info: &uniforms,
                ..Default::default()
            },
            vk::WriteDescriptorSet {
                s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
                dst_set: set,
                dst_binding: 1,
                descriptor_count: 1,
                descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                p_image_info: &texture,
                ..Default::default()
            },
        ];
        unsafe { self.device.update_descriptor_sets(&writes, &[]) }
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VkResult<vk::Framebuffer> {
        let ci = vk::FramebufferCreateInfo {
            s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
            render_pass,
            attachment_count: attachments.len() as u32,
            p_attachments: attachments.as_ptr(),
            width: extent.width,
            height: extent.height,
            layers: 1,
            ..Default::default()
        };
        unsafe { self.device.create_framebuffer(&ci, None) }
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.device.destroy_framebuffer(framebuffer, None) }
    }

    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
    ) -> VkResult<(vk::SwapchainKHR, Vec<vk::Image>)> {
        let ci = vk::SwapchainCreateInfoKHR {
            s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
            surface: self.side.surface,
            min_image_count: desc.min_image_count,
            image_format: desc.format.format,
            image_color_space: desc.format.color_space,
            image_extent: desc.extent,
            image_array_layers: 1,
            image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            image_sharing_mode: desc.sharing_mode,
            queue_family_index_count: desc.queue_family_indices.len() as u32,
            p_queue_family_indices: desc.queue_family_indices.as_ptr(),
            pre_transform: desc.pre_transform,
            composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
            present_mode: desc.present_mode,
            clipped: vk::TRUE,
            old_swapchain: vk::SwapchainKHR::null(),
            ..Default::default()
        };
        unsafe {
            let swapchain = self.swapchain_loader.create_swapchain(&ci, None)?;
            match self.swapchain_loader.get_swapchain_images(swapchain) {
                Ok(images) => Ok((swapchain, images)),
                Err(e) => {
                    self.swapchain_loader.destroy_swapchain(swapchain, None);
                    Err(e)
                }
            }
        }
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) }
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        unsafe {
            self.swapchain_loader
                .acquire_next_image(swapchain, u64::MAX, signal, vk::Fence::null())
        }
    }

    fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool> {
        let info = vk::PresentInfoKHR {
            s_type: vk::StructureType::PRESENT_INFO_KHR,
            wait_semaphore_count: 1,
            p_wait_semaphores: &wait,
            swapchain_count: 1,
            p_swapchains: &swapchain,
            p_image_indices: &image_index,
            ..Default::default()
        };
        unsafe { self.swapchain_loader.queue_present(self.present_queue, &info) }
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let ci = vk::FenceCreateInfo {
            s_type: vk::StructureType::FENCE_CREATE_INFO,
            flags: if signaled {
                vk::FenceCreateFlags::SIGNALED
            } else {
                vk::FenceCreateFlags::empty()
            },
            ..Default::default()
        };
        unsafe { self.device.create_fence(&ci, None) }
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) }
    }

    fn wait_for_fence(&self, fence: vk::Fence) -> VkResult<()> {
        unsafe { self.device.wait_for_fences(&[fence], true, u64::MAX) }
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        unsafe { self.device.reset_fences(&[fence]) }
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        let ci = vk::SemaphoreCreateInfo {
            s_type: vk::StructureType::SEMAPHORE_CREATE_INFO,
            ..Default::default()
        };
        unsafe { self.device.create_semaphore(&ci, None) }
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) }
    }

    fn device_wait_idle(&self) -> VkResult<()> {
        unsafe { self.device.device_wait_idle() }
    }

    fn graphics_queue_wait_idle(&self) -> VkResult<()> {
        unsafe { self.device.queue_wait_idle(self.graphics_queue) }
    }

    fn allocate_command_buffers(&self, count: u32) -> VkResult<Vec<vk::CommandBuffer>> {
        let ai = vk::CommandBufferAllocateInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
            command_pool: self.cmd_pool,
            level: vk::CommandBufferLevel::PRIMARY,
            command_buffer_count: count,
            ..Default::default()
        };
        unsafe { self.device.allocate_command_buffers(&ai) }
    }

    fn free_command_buffers(&self, buffers: &[vk::CommandBuffer]) {
        unsafe { self.device.free_command_buffers(self.cmd_pool, buffers) }
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer, one_time: bool) -> VkResult<()> {
        let bi = vk::CommandBufferBeginInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
            flags: if one_time {
                vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT
            } else {
                vk::CommandBufferUsageFlags::empty()
            },
            ..Default::default()
        };
        unsafe { self.device.begin_command_buffer(cmd, &bi) }
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        unsafe {
            self.device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
        }
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        unsafe { self.device.end_command_buffer(cmd) }
    }

    fn submit_graphics(
        &self,
        cmd: vk::CommandBuffer,
        sync: Option<&FrameSubmit>,
    ) -> VkResult<()> {
        let mut submit = vk::SubmitInfo {
            s_type: vk::StructureType::SUBMIT_INFO,
            command_buffer_count: 1,
            p_command_buffers: &cmd,
            ..Default::default()
        };
        let fence = match sync {
            Some(s) => {
                submit.wait_semaphore_count = 1;
                submit.p_wait_semaphores = &s.wait;
                submit.p_wait_dst_stage_mask = &s.wait_stage;
                submit.signal_semaphore_count = 1;
                submit.p_signal_semaphores = &s.signal;
                s.fence
            }
            None => vk::Fence::null(),
        };
        unsafe {
            self.device
                .queue_submit(self.graphics_queue, std::slice::from_ref(&submit), fence)
        }
    }

    fn cmd_copy_buffer(
        &self,
        cmd: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Buffer,
        size: vk::DeviceSize,
    ) {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe { self.device.cmd_copy_buffer(cmd, src, dst, &[region]) }
    }

    fn cmd_copy_buffer_to_image(
        &self,
        cmd: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Image,
        extent: vk::Extent2D,
    ) {
        let region = vk::BufferImageCopy {
            buffer_offset: 0,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            },
            image_offset: vk::Offset3D::default(),
            image_extent: vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            },
        };
        unsafe {
            self.device.cmd_copy_buffer_to_image(
                cmd,
                src,
                dst,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            )
        }
    }

    fn cmd_transition_image(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        transition: LayoutTransition,
    ) {
        let m = transition.masks();
        let barrier = vk::ImageMemoryBarrier {
            s_type: vk::StructureType::IMAGE_MEMORY_BARRIER,
            src_access_mask: m.src_access,
            dst_access_mask: m.dst_access,
            old_layout: m.old_layout,
            new_layout: m.new_layout,
            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            image,
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            },
            ..Default::default()
        };
        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd,
                m.src_stage,
                m.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            )
        }
    }

    fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_color: [f32; 4],
    ) {
        let clears = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];
        let bi = vk::RenderPassBeginInfo {
            s_type: vk::StructureType::RENDER_PASS_BEGIN_INFO,
            render_pass,
            framebuffer,
            render_area: vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent,
            },
            clear_value_count: clears.len() as u32,
            p_clear_values: clears.as_ptr(),
            ..Default::default()
        };
        unsafe {
            self.device
                .cmd_begin_render_pass(cmd, &bi, vk::SubpassContents::INLINE)
        }
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        unsafe { self.device.cmd_end_render_pass(cmd) }
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline)
        }
    }

    fn cmd_set_viewport_scissor(&self, cmd: vk::CommandBuffer, extent: vk::Extent2D) {
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent,
        };
        unsafe {
            self.device.cmd_set_viewport(cmd, 0, &[viewport]);
            self.device.cmd_set_scissor(cmd, 0, &[scissor]);
        }
    }

    fn cmd_bind_descriptor_set(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    ) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                &[set],
                &[],
            )
        }
    }

    fn cmd_bind_mesh_buffers(&self, cmd: vk::CommandBuffer, vertex: vk::Buffer, index: vk::Buffer) {
        unsafe {
            self.device.cmd_bind_vertex_buffers(cmd, 0, &[vertex], &[0]);
            self.device
                .cmd_bind_index_buffer(cmd, index, 0, vk::IndexType::UINT32);
        }
    }

    fn cmd_draw_indexed(&self, cmd: vk::CommandBuffer, index_count: u32) {
        unsafe { self.device.cmd_draw_indexed(cmd, index_count, 1, 0, 0, 0) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_steps_must_run_in_order() {
        let mut init = InitTracker::default();
        init.advance(InitStage::Instance).unwrap();
        let err = init.advance(InitStage::Device).unwrap_err();
        assert_eq!(
            err.downcast_ref::<RenderError>(),
            Some(&RenderError::InitOrder {
                step: "device",
                requires: "surface",
                reached: "instance",
            })
        );
        assert_eq!(init.reached(), InitStage::Instance);

        init.advance(InitStage::Surface).unwrap();
        init.advance(InitStage::Device).unwrap();
        init.advance(InitStage::CommandPool).unwrap();
        assert_eq!(init.reached(), InitStage::CommandPool);
    }

    #[test]
    fn no_step_runs_twice() {
        let mut init = InitTracker::default();
        init.advance(InitStage::Instance).unwrap();
        assert!(init.advance(InitStage::Instance).is_err());
    }
}
