// SPDX-License-Identifier: CEPL-1.0
//! Device selection. The Vulkan queries live in `device.rs`; the decisions
//! live here so they can be checked without a driver.

use ash::vk;
use prism_render::RenderError;

use crate::gpu::QueueFamilies;

/// Finds a graphics family and a present family.
///
/// A single family that does both wins. Otherwise the first graphics family
/// is paired with the first present family.
pub(crate) fn resolve_queue_families(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: impl FnMut(u32) -> bool,
) -> Option<QueueFamilies> {
    let mut graphics = None;
    let mut present = None;
    for (i, props) in families.iter().enumerate() {
        let i = i as u32;
        let is_graphics =
            props.queue_count > 0 && props.queue_flags.contains(vk::QueueFlags::GRAPHICS);
        let is_present = props.queue_count > 0 && supports_present(i);
        if is_graphics && is_present {
            return Some(QueueFamilies {
                graphics: i,
                present: i,
            });
        }
        if is_graphics && graphics.is_none() {
            graphics = Some(i);
        }
        if is_present && present.is_none() {
            present = Some(i);
        }
    }
    Some(QueueFamilies {
        graphics: graphics?,
        present: present?,
    })
}

/// What was learned about one physical device.
#[derive(Clone, Debug)]
pub(crate) struct Candidate {
    pub name: String,
    pub families: Option<QueueFamilies>,
    pub missing_extensions: Vec<String>,
    pub surface_formats: usize,
    pub present_modes: usize,
    pub sampler_anisotropy: bool,
}

impl Candidate {
    pub fn rejection(&self) -> Option<String> {
        if self.families.is_none() {
            return Some("no graphics or present queue family".into());
        }
        if !self.missing_extensions.is_empty() {
            return Some(format!("missing {}", self.missing_extensions.join(", ")));
        }
        if self.surface_formats == 0 || self.present_modes == 0 {
            return Some("surface offers no format or present mode".into());
        }
        if !self.sampler_anisotropy {
            return Some("no anisotropic sampling".into());
        }
        None
    }
}

/// Index of the first acceptable candidate.
pub(crate) fn select_device(candidates: &[Candidate]) -> Result<usize, RenderError> {
    for (i, c) in candidates.iter().enumerate() {
        match c.rejection() {
            None => return Ok(i),
            Some(why) => tracing::info!("skipping device {}: {}", c.name, why),
        }
    }
    Err(RenderError::NoSuitableDevice)
}
