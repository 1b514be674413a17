// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use glam::{Mat4, Vec3};
use prism_core::{init_tracing, FrameTimer};
use prism_math::{FreeCamera, MoveIntent};
use prism_platform::{InputState, WindowMetrics};
use prism_render::{FramebufferSource, RenderSize, Renderer};
use prism_render_vk::VkRenderer;
use tracing::{error, info, warn};

use prism_platform::winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

mod assets;
mod config;

use config::{AppCfg, DEFAULT_CONFIG};

#[derive(Parser, Debug)]
#[command(author, version, about = "Textured OBJ viewer on Vulkan", long_about = None)]
struct Args {
    /// OBJ model to show (default: first .obj under assets/)
    #[arg(long)]
    model: Option<PathBuf>,
    /// Texture to bind instead of the model's own
    #[arg(long)]
    texture: Option<PathBuf>,
    /// Config file
    #[arg(long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,
}

fn move_intent(input: &InputState) -> MoveIntent {
    const BINDINGS: [(KeyCode, MoveIntent); 8] = [
        (KeyCode::KeyW, MoveIntent::FORWARD),
        (KeyCode::KeyS, MoveIntent::BACK),
        (KeyCode::KeyA, MoveIntent::LEFT),
        (KeyCode::KeyD, MoveIntent::RIGHT),
        (KeyCode::Space, MoveIntent::UP),
        (KeyCode::ControlLeft, MoveIntent::DOWN),
        (KeyCode::ShiftLeft, MoveIntent::BOOST),
        (KeyCode::ShiftRight, MoveIntent::BOOST),
    ];
    BINDINGS
        .iter()
        .filter(|(key, _)| input.key_down(*key))
        .fold(MoveIntent::empty(), |acc, (_, intent)| acc | *intent)
}

struct App {
    args: Args,
    cfg: AppCfg,

    // renderer drops before the window it draws into
    renderer: Option<VkRenderer>,
    window: Option<Window>,
    metrics: Arc<WindowMetrics>,

    input: InputState,
    camera: FreeCamera,
    timer: FrameTimer,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(args: Args, cfg: AppCfg) -> Self {
        let camera = cfg.camera();
        Self {
            args,
            cfg,
            renderer: None,
            window: None,
            metrics: Arc::new(WindowMetrics::default()),
            input: InputState::default(),
            camera,
            timer: FrameTimer::new(Duration::from_millis(500)),
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.failure = Some(err);
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.renderer = None;
        self.window = None;
        event_loop.exit();
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.cfg.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.cfg.window.width,
                self.cfg.window.height,
            ));
        let window = event_loop.create_window(attrs).context("create_window")?;

        let size = window.inner_size();
        self.metrics = Arc::new(WindowMetrics::new(RenderSize {
            width: size.width,
            height: size.height,
        }));

        // Mouse look wants relative motion; not every platform can lock.
        if window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
            .is_ok()
        {
            window.set_cursor_visible(false);
        } else {
            warn!("cursor grab unavailable; mouse look still follows raw motion");
        }

        let mut renderer =
            VkRenderer::new(&window, &window, self.metrics.clone(), self.cfg.renderer())?;
        let (pos, color, specular) = self.cfg.light();
        renderer.set_light(pos, color, specular);
        let (offset, scale) = self.cfg.uv();
        renderer.set_uv(offset, scale);
        self.load_scene(&mut renderer)?;

        self.window = Some(window);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn load_scene(&self, renderer: &mut VkRenderer) -> Result<()> {
        let model = self
            .args
            .model
            .clone()
            .or_else(|| assets::find_model(Path::new("assets")));
        let meshes = match &model {
            Some(path) => assets::load_model(path)?,
            None => {
                warn!("no --model given and no .obj under assets/; nothing to draw");
                Vec::new()
            }
        };
        for mesh in &meshes {
            renderer.upload_mesh(mesh)?;
        }
        if let Some(pixels) =
            assets::resolve_texture(self.args.texture.as_deref(), &meshes, model.as_deref())
        {
            renderer.upload_texture(&pixels)?;
        }
        info!("scene ready: {} meshes", renderer.mesh_count());
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(renderer), Some(window)) = (&mut self.renderer, &self.window) else {
            return Ok(());
        };

        let dt = self.timer.tick();
        let (dx, dy) = self.input.mouse_delta();
        self.camera.look(dx, dy);
        self.camera.advance(move_intent(&self.input), dt);
        self.input.end_frame();
        renderer.set_camera(self.camera.position, self.camera.target(), Vec3::Y);

        if renderer.begin_frame()? {
            for mesh in 0..renderer.mesh_count() {
                renderer.draw(mesh, Mat4::IDENTITY);
            }
            renderer.end_frame()?;
        }

        if self.timer.sampled() {
            window.set_title(&format!(
                "{} | {:.0} fps",
                self.cfg.window.title,
                self.timer.fps()
            ));
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e.context("startup"));
            return;
        }
        event_loop.set_control_flow(ControlFlow::Poll);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        match &self.window {
            Some(window) if window.id() == window_id => {}
            _ => return,
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(size) => {
                self.metrics.set_size(RenderSize {
                    width: size.width,
                    height: size.height,
                });
            }

            WindowEvent::Focused(focused) => {
                if !focused {
                    self.input.release_all();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.input.handle_key(key, event.state);
                }
                if self.input.just_pressed(KeyCode::Escape) {
                    self.shutdown(event_loop);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e.context("frame"));
                }
            }

            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.handle_mouse_motion(dx, dy);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = &self.window else {
            return;
        };
        // Minimised: sleep until the next event instead of spinning on skipped frames.
        if self.metrics.framebuffer_size().is_zero() {
            event_loop.set_control_flow(ControlFlow::Wait);
        } else {
            event_loop.set_control_flow(ControlFlow::Poll);
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = AppCfg::load(&args.config);
    let event_loop: EventLoop<()> = EventLoop::new()?;

    let mut app = App::new(args, cfg);
    event_loop.run_app(&mut app)?;
    app.failure.take().map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_platform::winit::event::ElementState;

    #[test]
    fn keys_map_to_move_intent() {
        let mut input = InputState::default();
        assert_eq!(move_intent(&input), MoveIntent::empty());

        input.handle_key(KeyCode::KeyW, ElementState::Pressed);
        input.handle_key(KeyCode::Space, ElementState::Pressed);
        input.handle_key(KeyCode::ShiftRight, ElementState::Pressed);
        assert_eq!(
            move_intent(&input),
            MoveIntent::FORWARD | MoveIntent::UP | MoveIntent::BOOST
        );

        input.handle_key(KeyCode::KeyW, ElementState::Released);
        input.handle_key(KeyCode::ControlLeft, ElementState::Pressed);
        assert_eq!(
            move_intent(&input),
            MoveIntent::DOWN | MoveIntent::UP | MoveIntent::BOOST
        );
    }

    #[test]
    fn cli_defaults_to_prism_toml() {
        let args = Args::parse_from(["prism-app"]);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG));
        assert!(args.model.is_none());

        let args = Args::parse_from(["prism-app", "--model", "a.obj", "--texture", "t.png"]);
        assert_eq!(args.model.as_deref(), Some(Path::new("a.obj")));
        assert_eq!(args.texture.as_deref(), Some(Path::new("t.png")));
    }
}
