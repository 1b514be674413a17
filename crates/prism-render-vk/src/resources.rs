// SPDX-License-Identifier: CEPL-1.0
//! Allocation, staged uploads and the long-lived ownership list.

use anyhow::{anyhow, Context, Result};
use ash::vk;
use prism_render::{PixelBuffer, RenderError};

use crate::gpu::{Gpu, ImageDesc, LayoutTransition};

const STAGING_PROPS: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
    vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw() | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
);

/// First memory type allowed by `type_bits` that has every flag in `required`.
pub(crate) fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Result<u32, RenderError> {
    (0..props.memory_type_count)
        .find(|&i| {
            type_bits & (1 << i) != 0
                && props.memory_types[i as usize]
                    .property_flags
                    .contains(required)
        })
        .ok_or_else(|| RenderError::NoMemoryType {
            type_bits,
            required: format!("{required:?}"),
        })
}

pub(crate) fn allocate_buffer<G: Gpu>(
    gpu: &G,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    props: vk::MemoryPropertyFlags,
) -> Result<(vk::Buffer, vk::DeviceMemory)> {
    let buffer = gpu.create_buffer(size, usage).context("create_buffer")?;
    let req = gpu.buffer_memory_requirements(buffer);
    let memory = find_memory_type(&gpu.memory_properties(), req.memory_type_bits, props)
        .map_err(anyhow::Error::from)
        .and_then(|ty| gpu.allocate_memory(req.size, ty).context("allocate_memory(buffer)"));
    let memory = match memory {
        Ok(m) => m,
        Err(e) => {
            gpu.destroy_buffer(buffer);
            return Err(e);
        }
    };
    if let Err(e) = gpu.bind_buffer_memory(buffer, memory) {
        destroy_buffer_pair(gpu, (buffer, memory));
        return Err(e).context("bind_buffer_memory");
    }
    Ok((buffer, memory))
}

pub(crate) fn allocate_image<G: Gpu>(
    gpu: &G,
    desc: &ImageDesc,
    props: vk::MemoryPropertyFlags,
) -> Result<(vk::Image, vk::DeviceMemory)> {
    let image = gpu.create_image(desc).context("create_image")?;
    let req = gpu.image_memory_requirements(image);
    let memory = find_memory_type(&gpu.memory_properties(), req.memory_type_bits, props)
        .map_err(anyhow::Error::from)
        .and_then(|ty| gpu.allocate_memory(req.size, ty).context("allocate_memory(image)"));
    let memory = match memory {
        Ok(m) => m,
        Err(e) => {
            gpu.destroy_image(image);
            return Err(e);
        }
    };
    if let Err(e) = gpu.bind_image_memory(image, memory) {
        destroy_image_pair(gpu, (image, memory));
        return Err(e).context("bind_image_memory");
    }
    Ok((image, memory))
}

/// Host-visible buffer filled with `bytes`.
fn create_staging<G: Gpu>(gpu: &G, bytes: &[u8]) -> Result<(vk::Buffer, vk::DeviceMemory)> {
    let (buffer, memory) = allocate_buffer(
        gpu,
        bytes.len() as vk::DeviceSize,
        vk::BufferUsageFlags::TRANSFER_SRC,
        STAGING_PROPS,
    )?;
    let dst = match gpu.map_memory(memory) {
        Ok(ptr) => ptr,
        Err(e) => {
            destroy_buffer_pair(gpu, (buffer, memory));
            return Err(e).context("map_memory(staging)");
        }
    };
    // SAFETY: the mapping covers the whole allocation, which is at least bytes.len().
    unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len()) };
    gpu.unmap_memory(memory);
    Ok((buffer, memory))
}

fn destroy_buffer_pair<G: Gpu>(gpu: &G, (buffer, memory): (vk::Buffer, vk::DeviceMemory)) {
    gpu.destroy_buffer(buffer);
    gpu.free_memory(memory);
}

fn destroy_image_pair<G: Gpu>(gpu: &G, (image, memory): (vk::Image, vk::DeviceMemory)) {
    gpu.destroy_image(image);
    gpu.free_memory(memory);
}

/// Records `record` into a throwaway command buffer, submits it on the
/// graphics queue and blocks until the queue drains. The command buffer is
/// freed on every path.
fn one_shot<G: Gpu>(gpu: &G, record: impl FnOnce(vk::CommandBuffer)) -> Result<()> {
    let cmd = gpu
        .allocate_command_buffers(1)
        .context("allocate_command_buffers(one-shot)")?
        .pop()
        .ok_or_else(|| anyhow!("driver returned no command buffer"))?;
    let run = || -> Result<()> {
        gpu.begin_command_buffer(cmd, true)
            .context("begin_command_buffer(one-shot)")?;
        record(cmd);
        gpu.end_command_buffer(cmd)
            .context("end_command_buffer(one-shot)")?;
        gpu.submit_graphics(cmd, None)
            .context("queue_submit(one-shot)")?;
        gpu.graphics_queue_wait_idle()
            .context("queue_wait_idle(one-shot)")
    };
    let result = run();
    gpu.free_command_buffers(std::slice::from_ref(&cmd));
    result
}

// STRICT ORDER (staged upload):
// 1) staging buffer (HOST_VISIBLE|COHERENT), map, copy, unmap
// 2) destination (DEVICE_LOCAL)
// 3) one-shot copy, submit, wait for the graphics queue
// 4) only then free staging
// A failure at any step frees everything created before it.
// Load-time only. Never call while a frame is recording.

/// Copies `bytes` into a new device-local buffer with `usage` (+ TRANSFER_DST).
pub(crate) fn upload_via_staging<G: Gpu>(
    gpu: &G,
    bytes: &[u8],
    usage: vk::BufferUsageFlags,
) -> Result<(vk::Buffer, vk::DeviceMemory)> {
    let size = bytes.len() as vk::DeviceSize;
    let staging = create_staging(gpu, bytes)?;
    let dst = allocate_buffer(
        gpu,
        size,
        usage | vk::BufferUsageFlags::TRANSFER_DST,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )
    .and_then(|dst| {
        match one_shot(gpu, |cmd| gpu.cmd_copy_buffer(cmd, staging.0, dst.0, size)) {
            Ok(()) => Ok(dst),
            Err(e) => {
                destroy_buffer_pair(gpu, dst);
                Err(e)
            }
        }
    });
    destroy_buffer_pair(gpu, staging);
    dst
}

/// Uploads RGBA8 pixels into a sampled image left in SHADER_READ_ONLY_OPTIMAL.
pub(crate) fn upload_image_via_staging<G: Gpu>(
    gpu: &G,
    pixels: &PixelBuffer,
    format: vk::Format,
) -> Result<(vk::Image, vk::DeviceMemory)> {
    let extent = vk::Extent2D {
        width: pixels.width(),
        height: pixels.height(),
    };
    let staging = create_staging(gpu, pixels.bytes())?;
    let desc = ImageDesc {
        extent,
        format,
        tiling: vk::ImageTiling::OPTIMAL,
        usage: vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
    };
    let dst = allocate_image(gpu, &desc, vk::MemoryPropertyFlags::DEVICE_LOCAL).and_then(
        |(image, memory)| {
            let copied = one_shot(gpu, |cmd| {
                gpu.cmd_transition_image(cmd, image, LayoutTransition::UndefinedToTransferDst);
                gpu.cmd_copy_buffer_to_image(cmd, staging.0, image, extent);
                gpu.cmd_transition_image(cmd, image, LayoutTransition::TransferDstToShaderRead);
            });
            match copied {
                Ok(()) => Ok((image, memory)),
                Err(e) => {
                    destroy_image_pair(gpu, (image, memory));
                    Err(e)
                }
            }
        },
    );
    destroy_buffer_pair(gpu, staging);
    dst
}

/// A handle whose lifetime matches the engine's.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Owned {
    Buffer(vk::Buffer),
    Memory(vk::DeviceMemory),
    Image(vk::Image),
    ImageView(vk::ImageView),
    Sampler(vk::Sampler),
    Fence(vk::Fence),
    Semaphore(vk::Semaphore),
    CommandBuffer(vk::CommandBuffer),
    DescriptorPool(vk::DescriptorPool),
    SetLayout(vk::DescriptorSetLayout),
}

/// Long-lived handles in creation order, released newest first.
#[derive(Debug, Default)]
pub(crate) struct OwnedResources {
    items: Vec<Owned>,
}

impl OwnedResources {
    pub fn push(&mut self, item: Owned) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Caller guarantees the device is idle.
    pub fn release_all<G: Gpu>(&mut self, gpu: &G) {
        while let Some(item) = self.items.pop() {
            match item {
                Owned::Buffer(h) => gpu.destroy_buffer(h),
                Owned::Memory(h) => gpu.free_memory(h),
                Owned::Image(h) => gpu.destroy_image(h),
                Owned::ImageView(h) => gpu.destroy_image_view(h),
                Owned::Sampler(h) => gpu.destroy_sampler(h),
                Owned::Fence(h) => gpu.destroy_fence(h),
                Owned::Semaphore(h) => gpu.destroy_semaphore(h),
                Owned::CommandBuffer(h) => gpu.free_command_buffers(std::slice::from_ref(&h)),
                Owned::DescriptorPool(h) => gpu.destroy_descriptor_pool(h),
                Owned::SetLayout(h) => gpu.destroy_set_layout(h),
            }
        }
    }
}
