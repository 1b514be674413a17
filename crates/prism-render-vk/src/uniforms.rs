// SPDX-License-Identifier: CEPL-1.0
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};
use prism_math::look_at;

/// std140 mirror of the shader's `Frame` block (binding 0).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct UniformBlock {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub light_pos: [f32; 4],
    /// rgb + specular exponent in w.
    pub light_color: [f32; 4],
    pub view_pos: [f32; 4],
    pub uv_offset: [f32; 2],
    pub uv_scale: [f32; 2],
}

pub const UNIFORM_BLOCK_SIZE: u64 = std::mem::size_of::<UniformBlock>() as u64;

/// Per-frame state set through the renderer API.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SceneParams {
    eye: Vec3,
    view: Mat4,
    light_pos: Vec3,
    light_color: Vec3,
    specular: f32,
    uv_offset: Vec2,
    uv_scale: Vec2,
}

impl Default for SceneParams {
    fn default() -> Self {
        let eye = Vec3::new(0.0, 1.0, 3.0);
        Self {
            eye,
            view: look_at(eye, Vec3::ZERO, Vec3::Y),
            light_pos: Vec3::new(3.0, 5.0, 3.0),
            light_color: Vec3::ONE,
            specular: 64.0,
            uv_offset: Vec2::ZERO,
            uv_scale: Vec2::ONE,
        }
    }
}

impl SceneParams {
    pub fn set_camera(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.eye = eye;
        self.view = look_at(eye, target, up);
    }

    pub fn set_light(&mut self, position: Vec3, color: Vec3, specular: f32) {
        self.light_pos = position;
        self.light_color = color;
        self.specular = specular;
    }

    pub fn set_uv(&mut self, offset: Vec2, scale: Vec2) {
        self.uv_offset = offset;
        self.uv_scale = scale;
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn block(&self, model: Mat4, proj: Mat4) -> UniformBlock {
        UniformBlock {
            model: model.to_cols_array_2d(),
            view: self.view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            light_pos: self.light_pos.extend(1.0).to_array(),
            light_color: self.light_color.extend(self.specular).to_array(),
            view_pos: self.eye.extend(1.0).to_array(),
            uv_offset: self.uv_offset.to_array(),
            uv_scale: self.uv_scale.to_array(),
        }
    }
}
