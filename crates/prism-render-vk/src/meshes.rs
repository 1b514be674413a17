// SPDX-License-Identifier: CEPL-1.0
use anyhow::{Context, Result};
use ash::vk;
use prism_render::MeshData;

use crate::gpu::Gpu;
use crate::resources::upload_via_staging;

/// Immutable device-local geometry.
#[derive(Clone, Copy, Debug)]
pub(crate) struct GpuMesh {
    pub vertex_buffer: vk::Buffer,
    pub vertex_memory: vk::DeviceMemory,
    pub index_buffer: vk::Buffer,
    pub index_memory: vk::DeviceMemory,
    pub index_count: u32,
}

/// Uploaded meshes addressed by insertion index.
#[derive(Debug, Default)]
pub(crate) struct MeshRegistry {
    meshes: Vec<GpuMesh>,
}

impl MeshRegistry {
    pub fn upload<G: Gpu>(&mut self, gpu: &G, data: &MeshData) -> Result<usize> {
        data.validate()?;
        let (vertex_buffer, vertex_memory) = upload_via_staging(
            gpu,
            bytemuck::cast_slice(&data.vertices),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )
        .context("vertex upload")?;
        let indices = upload_via_staging(
            gpu,
            bytemuck::cast_slice(&data.indices),
            vk::BufferUsageFlags::INDEX_BUFFER,
        );
        let (index_buffer, index_memory) = match indices {
            Ok(pair) => pair,
            Err(e) => {
                gpu.destroy_buffer(vertex_buffer);
                gpu.free_memory(vertex_memory);
                return Err(e.context("index upload"));
            }
        };

        let index = self.meshes.len();
        self.meshes.push(GpuMesh {
            vertex_buffer,
            vertex_memory,
            index_buffer,
            index_memory,
            index_count: data.indices.len() as u32,
        });
        tracing::debug!(
            "mesh #{index}: {} vertices, {} indices",
            data.vertices.len(),
            data.indices.len()
        );
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Option<&GpuMesh> {
        self.meshes.get(index)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Waits for the device, then frees every mesh.
    pub fn clear<G: Gpu>(&mut self, gpu: &G) -> Result<()> {
        gpu.device_wait_idle()
            .context("device_wait_idle(clear meshes)")?;
        self.destroy_all(gpu);
        Ok(())
    }

    /// Caller guarantees the device is idle.
    pub fn destroy_all<G: Gpu>(&mut self, gpu: &G) {
        for mesh in self.meshes.drain(..) {
            gpu.destroy_buffer(mesh.index_buffer);
            gpu.free_memory(mesh.index_memory);
            gpu.destroy_buffer(mesh.vertex_buffer);
            gpu.free_memory(mesh.vertex_memory);
        }
    }
}
