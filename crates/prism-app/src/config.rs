// SPDX-License-Identifier: CEPL-1.0
use std::fs;
use std::path::Path;

use glam::{Vec2, Vec3};
use prism_math::FreeCamera;
use prism_render::{PresentPreference, RendererConfig};
use serde::Deserialize;
use tracing::{info, warn};

pub const DEFAULT_CONFIG: &str = "prism.toml";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WindowCfg {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowCfg {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "prism".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeCfg {
    Fifo,
    #[default]
    Mailbox,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct RenderCfg {
    pub clear_color: [f32; 4],
    pub present_mode: PresentModeCfg,
    pub validation: bool,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for RenderCfg {
    fn default() -> Self {
        let engine = RendererConfig::default();
        Self {
            clear_color: engine.clear_color,
            present_mode: PresentModeCfg::Mailbox,
            validation: engine.validation,
            fov_degrees: engine.fov_y_degrees,
            near: engine.near,
            far: engine.far,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct LightCfg {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub specular: f32,
}

impl Default for LightCfg {
    fn default() -> Self {
        Self {
            position: [2.0, 4.0, 2.0],
            color: [1.0, 1.0, 1.0],
            specular: 32.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct UvCfg {
    pub offset: [f32; 2],
    pub scale: [f32; 2],
}

impl Default for UvCfg {
    fn default() -> Self {
        Self {
            offset: [0.0, 0.0],
            scale: [1.0, 1.0],
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct CameraCfg {
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub speed: f32,
    pub sensitivity: f32,
    pub boost: f32,
}

impl Default for CameraCfg {
    fn default() -> Self {
        let cam = FreeCamera::default();
        Self {
            position: cam.position.to_array(),
            yaw: cam.yaw,
            pitch: cam.pitch,
            speed: cam.speed,
            sensitivity: cam.sensitivity,
            boost: cam.boost,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct AppCfg {
    pub window: WindowCfg,
    pub render: RenderCfg,
    pub light: LightCfg,
    pub uv: UvCfg,
    pub camera: CameraCfg,
}

impl AppCfg {
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Missing file: defaults. Malformed file: a warning, then defaults.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => {
                info!("no config at {}, using defaults", path.display());
                return Self::default();
            }
        };
        match Self::parse(&text) {
            Ok(cfg) => {
                info!("config loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("ignoring malformed {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn renderer(&self) -> RendererConfig {
        RendererConfig {
            clear_color: self.render.clear_color,
            present: match self.render.present_mode {
                PresentModeCfg::Fifo => PresentPreference::Fifo,
                PresentModeCfg::Mailbox => PresentPreference::Mailbox,
            },
            validation: self.render.validation,
            fov_y_degrees: self.render.fov_degrees,
            near: self.render.near,
            far: self.render.far,
        }
    }

    pub fn camera(&self) -> FreeCamera {
        FreeCamera {
            position: Vec3::from_array(self.camera.position),
            yaw: self.camera.yaw,
            pitch: self.camera.pitch,
            speed: self.camera.speed,
            sensitivity: self.camera.sensitivity,
            boost: self.camera.boost,
        }
    }

    pub fn light(&self) -> (Vec3, Vec3, f32) {
        (
            Vec3::from_array(self.light.position),
            Vec3::from_array(self.light.color),
            self.light.specular,
        )
    }

    pub fn uv(&self) -> (Vec2, Vec2) {
        (
            Vec2::from_array(self.uv.offset),
            Vec2::from_array(self.uv.scale),
        )
    }
}
