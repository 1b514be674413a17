// SPDX-License-Identifier: CEPL-1.0
//! Swapchain, its views, the depth target and framebuffers.

use anyhow::{Context, Result};
use ash::vk;
use prism_render::{PresentPreference, RenderError, RenderSize};
use tracing::{info, warn};

use crate::gpu::{Gpu, ImageDesc, QueueFamilies, SurfaceSupport, SwapchainDesc};
use crate::resources::allocate_image;

const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Most precise first.
const DEPTH_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Preferred 8-bit sRGB, otherwise whatever the surface lists first.
pub(crate) fn choose_surface_format(
    formats: &[vk::SurfaceFormatKHR],
) -> Result<vk::SurfaceFormatKHR, RenderError> {
    if formats.contains(&PREFERRED_FORMAT) {
        return Ok(PREFERRED_FORMAT);
    }
    let first = formats.first().copied().ok_or(RenderError::NoSurfaceFormat)?;
    warn!(
        "B8G8R8A8_SRGB/SRGB_NONLINEAR unavailable, using {:?}/{:?}",
        first.format, first.color_space
    );
    Ok(first)
}

/// MAILBOX when asked for and offered, FIFO otherwise. FIFO is always supported.
pub(crate) fn choose_present_mode(
    modes: &[vk::PresentModeKHR],
    preference: PresentPreference,
) -> Result<vk::PresentModeKHR, RenderError> {
    if modes.is_empty() {
        return Err(RenderError::NoPresentMode);
    }
    match preference {
        PresentPreference::Mailbox if modes.contains(&vk::PresentModeKHR::MAILBOX) => {
            Ok(vk::PresentModeKHR::MAILBOX)
        }
        _ => Ok(vk::PresentModeKHR::FIFO),
    }
}

/// `current_extent` unless the surface leaves it to us (u32::MAX).
pub(crate) fn extent_from_caps(caps: &vk::SurfaceCapabilitiesKHR, want: RenderSize) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: want
                .width
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: want
                .height
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

/// One more than the minimum, capped by max (0 == no max).
pub(crate) fn image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let want = caps.min_image_count + 1;
    if caps.max_image_count == 0 {
        want
    } else {
        want.min(caps.max_image_count)
    }
}

pub(crate) fn pick_depth_format(
    props: impl Fn(vk::Format) -> vk::FormatProperties,
) -> Result<vk::Format, RenderError> {
    DEPTH_CANDIDATES
        .into_iter()
        .find(|&f| {
            props(f)
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
        .ok_or(RenderError::NoDepthFormat)
}

/// Exclusive when one family does everything, concurrent across two otherwise.
pub(crate) fn sharing_for(families: QueueFamilies) -> (vk::SharingMode, Vec<u32>) {
    if families.distinct() {
        (
            vk::SharingMode::CONCURRENT,
            vec![families.graphics, families.present],
        )
    } else {
        (vk::SharingMode::EXCLUSIVE, Vec::new())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SurfacePhase {
    Uninitialized,
    Live { generation: u64 },
    /// Framebuffer is zero-sized; nothing is allocated.
    Suspended,
    Destroyed,
}

#[derive(Debug)]
struct DepthTarget {
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
}

/// The live swapchain and everything sized to it.
#[derive(Debug)]
struct Chain {
    swapchain: vk::SwapchainKHR,
    format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
    views: Vec<vk::ImageView>,
    depth: DepthTarget,
    framebuffers: Vec<vk::Framebuffer>,
}

#[derive(Debug)]
pub(crate) struct PresentationSurface {
    phase: SurfacePhase,
    chain: Option<Chain>,
    depth_format: vk::Format,
    families: QueueFamilies,
    preference: PresentPreference,
    generation: u64,
}

impl PresentationSurface {
    pub fn new(depth_format: vk::Format, families: QueueFamilies, preference: PresentPreference) -> Self {
        Self {
            phase: SurfacePhase::Uninitialized,
            chain: None,
            depth_format,
            families,
            preference,
            generation: 0,
        }
    }

    pub fn phase(&self) -> SurfacePhase {
        self.phase
    }

    pub fn is_live(&self) -> bool {
        matches!(self.phase, SurfacePhase::Live { .. })
    }

    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    pub fn swapchain(&self) -> vk::SwapchainKHR {
        self.chain.as_ref().map_or(vk::SwapchainKHR::null(), |c| c.swapchain)
    }

    /// Zero while not live.
    pub fn extent(&self) -> vk::Extent2D {
        self.chain.as_ref().map_or(vk::Extent2D::default(), |c| c.extent)
    }

    pub fn color_format(&self) -> Option<vk::Format> {
        self.chain.as_ref().map(|c| c.format.format)
    }

    pub fn framebuffer(&self, image_index: u32) -> Option<vk::Framebuffer> {
        self.chain
            .as_ref()
            .and_then(|c| c.framebuffers.get(image_index as usize).copied())
    }

    // STRICT ORDER (build):
    // 1) query capabilities / formats / present modes
    // 2) swapchain + images
    // 3) one color view per image
    // 4) depth image sized to the swapchain extent
    // Framebuffers come later in `attach_framebuffers`, once the render pass
    // matches the chosen color format.

    /// Builds the swapchain. Leaves the surface `Suspended` and returns false
    /// when the framebuffer or the surface extent is zero.
    pub fn build<G: Gpu>(&mut self, gpu: &G, want: RenderSize) -> Result<bool> {
        debug_assert!(self.chain.is_none(), "build over a live chain");

        let SurfaceSupport {
            capabilities: caps,
            formats,
            present_modes,
        } = gpu.surface_support().context("query surface support")?;

        let format = choose_surface_format(&formats)?;
        let present_mode = choose_present_mode(&present_modes, self.preference)?;
        let extent = extent_from_caps(&caps, want);
        if want.is_zero() || extent.width == 0 || extent.height == 0 {
            info!("surface is zero-sized, suspending presentation");
            self.phase = SurfacePhase::Suspended;
            return Ok(false);
        }

        let pre_transform = if caps
            .supported_transforms
            .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
        {
            vk::SurfaceTransformFlagsKHR::IDENTITY
        } else {
            caps.current_transform
        };
        let (sharing_mode, queue_family_indices) = sharing_for(self.families);
        let desc = SwapchainDesc {
            min_image_count: image_count(&caps),
            format,
            extent,
            present_mode,
            pre_transform,
            sharing_mode,
            queue_family_indices,
        };
        let (swapchain, images) = gpu.create_swapchain(&desc).context("create_swapchain")?;

        let mut views = Vec::with_capacity(images.len());
        for &image in &images {
            views.push(
                gpu.create_image_view(image, format.format, vk::ImageAspectFlags::COLOR)
                    .context("create_image_view(swapchain)")?,
            );
        }

        let (image, memory) = allocate_image(
            gpu,
            &ImageDesc {
                extent,
                format: self.depth_format,
                tiling: vk::ImageTiling::OPTIMAL,
                usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            },
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        let view = gpu
            .create_image_view(image, self.depth_format, vk::ImageAspectFlags::DEPTH)
            .context("create_image_view(depth)")?;

        self.generation += 1;
        info!(
            "surface #{}: {:?}/{:?}, {:?}, {}x{}, {} images (min {}), sharing {:?}",
            self.generation,
            format.format,
            format.color_space,
            present_mode,
            extent.width,
            extent.height,
            images.len(),
            caps.min_image_count,
            desc.sharing_mode,
        );

        self.chain = Some(Chain {
            swapchain,
            format,
            present_mode,
            extent,
            views,
            depth: DepthTarget {
                image,
                memory,
                view,
            },
            framebuffers: Vec::new(),
        });
        self.phase = SurfacePhase::Live {
            generation: self.generation,
        };
        Ok(true)
    }

    /// One framebuffer per swapchain image: color view + shared depth view.
    pub fn attach_framebuffers<G: Gpu>(&mut self, gpu: &G, render_pass: vk::RenderPass) -> Result<()> {
        let Some(chain) = self.chain.as_mut() else {
            return Ok(());
        };
        for &view in &chain.views {
            let fb = gpu
                .create_framebuffer(render_pass, &[view, chain.depth.view], chain.extent)
                .context("create_framebuffer")?;
            chain.framebuffers.push(fb);
        }
        Ok(())
    }

    // STRICT ORDER (teardown): depth, framebuffers, views, swapchain.
    // Caller has already waited for the device to go idle.
    fn release<G: Gpu>(&mut self, gpu: &G) {
        if let Some(chain) = self.chain.take() {
            gpu.destroy_image_view(chain.depth.view);
            gpu.destroy_image(chain.depth.image);
            gpu.free_memory(chain.depth.memory);
            for fb in chain.framebuffers {
                gpu.destroy_framebuffer(fb);
            }
            for view in chain.views {
                gpu.destroy_image_view(view);
            }
            gpu.destroy_swapchain(chain.swapchain);
            tracing::debug!("released surface with present mode {:?}", chain.present_mode);
        }
    }

    /// Drops the current chain ahead of a rebuild.
    pub fn invalidate<G: Gpu>(&mut self, gpu: &G) {
        self.release(gpu);
        if self.is_live() {
            self.phase = SurfacePhase::Uninitialized;
        }
    }

    pub fn destroy<G: Gpu>(&mut self, gpu: &G) {
        self.release(gpu);
        self.phase = SurfacePhase::Destroyed;
    }
}
