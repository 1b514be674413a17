// SPDX-License-Identifier: CEPL-1.0
use anyhow::{Context, Result};
use ash::vk;
use prism_render::PixelBuffer;
use tracing::info;

use crate::gpu::Gpu;
use crate::resources::{upload_image_via_staging, Owned, OwnedResources};
use crate::uniforms::UNIFORM_BLOCK_SIZE;

pub(crate) const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Texture {
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub view: vk::ImageView,
    pub sampler: vk::Sampler,
}

impl Texture {
    pub fn upload<G: Gpu>(gpu: &G, pixels: &PixelBuffer) -> Result<Self> {
        let (image, memory) = upload_image_via_staging(gpu, pixels, TEXTURE_FORMAT)?;
        let discard = || {
            gpu.destroy_image(image);
            gpu.free_memory(memory);
        };
        let view = match gpu.create_image_view(image, TEXTURE_FORMAT, vk::ImageAspectFlags::COLOR) {
            Ok(view) => view,
            Err(e) => {
                discard();
                return Err(e).context("create_image_view(texture)");
            }
        };
        let sampler = match gpu.create_sampler() {
            Ok(sampler) => sampler,
            Err(e) => {
                gpu.destroy_image_view(view);
                discard();
                return Err(e).context("create_sampler");
            }
        };
        Ok(Self {
            image,
            memory,
            view,
            sampler,
        })
    }

    fn destroy<G: Gpu>(self, gpu: &G) {
        gpu.destroy_sampler(self.sampler);
        gpu.destroy_image_view(self.view);
        gpu.destroy_image(self.image);
        gpu.free_memory(self.memory);
    }

    fn image_info(&self) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo {
            sampler: self.sampler,
            image_view: self.view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }
    }
}

/// One descriptor set per frame slot: that slot's uniform buffer plus the
/// scene-wide texture.
#[derive(Debug)]
pub(crate) struct Bindings {
    sets: Vec<vk::DescriptorSet>,
    uniform_buffers: Vec<vk::Buffer>,
    fallback: Texture,
    active: Option<Texture>,
}

impl Bindings {
    pub fn new<G: Gpu>(
        gpu: &G,
        layout: vk::DescriptorSetLayout,
        uniform_buffers: &[vk::Buffer],
        owned: &mut OwnedResources,
    ) -> Result<Self> {
        let fallback = Texture::upload(gpu, &PixelBuffer::white())?;
        owned.push(Owned::Memory(fallback.memory));
        owned.push(Owned::Image(fallback.image));
        owned.push(Owned::ImageView(fallback.view));
        owned.push(Owned::Sampler(fallback.sampler));

        let count = uniform_buffers.len() as u32;
        let pool = gpu
            .create_descriptor_pool(count)
            .context("create_descriptor_pool")?;
        owned.push(Owned::DescriptorPool(pool));
        let sets = gpu
            .allocate_descriptor_sets(pool, layout, count)
            .context("allocate_descriptor_sets")?;

        let bindings = Self {
            sets,
            uniform_buffers: uniform_buffers.to_vec(),
            fallback,
            active: None,
        };
        bindings.write_all(gpu);
        Ok(bindings)
    }

    pub fn set(&self, slot: usize) -> vk::DescriptorSet {
        self.sets[slot]
    }

    fn current(&self) -> &Texture {
        self.active.as_ref().unwrap_or(&self.fallback)
    }

    fn write_all<G: Gpu>(&self, gpu: &G) {
        let image = self.current().image_info();
        for (&set, &buffer) in self.sets.iter().zip(&self.uniform_buffers) {
            let uniforms = vk::DescriptorBufferInfo {
                buffer,
                offset: 0,
                range: UNIFORM_BLOCK_SIZE,
            };
            gpu.write_frame_bindings(set, uniforms, image);
        }
    }

    // STRICT ORDER (texture swap):
    // 1) upload the new image while the old one may still be sampled
    // 2) device_wait_idle: no frame in flight can still read the old texture
    // 3) destroy old sampler / view / image / memory
    // 4) point every slot at the new texture
    pub fn register_texture<G: Gpu>(&mut self, gpu: &G, pixels: &PixelBuffer) -> Result<()> {
        let fresh = Texture::upload(gpu, pixels)?;
        if let Err(e) = gpu.device_wait_idle() {
            fresh.destroy(gpu);
            return Err(e).context("device_wait_idle(texture swap)");
        }
        if let Some(old) = self.active.replace(fresh) {
            old.destroy(gpu);
        }
        self.write_all(gpu);
        info!(
            "texture {}x{} bound to {} frame slots",
            pixels.width(),
            pixels.height(),
            self.sets.len()
        );
        Ok(())
    }

    /// The fallback lives in the ownership list; only the replaceable texture is freed here.
    pub fn release_active<G: Gpu>(&mut self, gpu: &G) {
        if let Some(tex) = self.active.take() {
            tex.destroy(gpu);
        }
    }
}
