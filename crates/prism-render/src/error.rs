// SPDX-License-Identifier: CEPL-1.0
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("no suitable device: need graphics + present queues, swapchain support and anisotropic sampling")]
    NoSuitableDevice,
    #[error("surface reports no formats")]
    NoSurfaceFormat,
    #[error("surface reports no present modes")]
    NoPresentMode,
    #[error("no depth format usable as an optimal-tiling depth attachment")]
    NoDepthFormat,
    #[error("no memory type in mask {type_bits:#x} with properties {required}")]
    NoMemoryType { type_bits: u32, required: String },
    #[error("mesh has no vertices or no indices")]
    EmptyMesh,
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("pixel buffer {width}x{height} carries {len} bytes, expected {expected}")]
    InvalidPixelBuffer {
        width: u32,
        height: u32,
        len: usize,
        expected: usize,
    },
    #[error("init step {step} requires {requires}, but only {reached} is done")]
    InitOrder {
        step: &'static str,
        requires: &'static str,
        reached: &'static str,
    },
}
