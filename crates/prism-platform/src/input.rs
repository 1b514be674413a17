// SPDX-License-Identifier: CEPL-1.0
use std::collections::HashSet;

use winit::event::ElementState;
use winit::keyboard::KeyCode;

/// Keyboard and mouse state owned by the application loop.
///
/// Held keys persist across frames; presses and mouse motion are
/// per-frame and dropped by `end_frame`.
#[derive(Debug, Default)]
pub struct InputState {
    /// Currently held keys.
    pub keys_down: HashSet<KeyCode>,
    /// Keys that went down since the last `end_frame`.
    pub keys_pressed: HashSet<KeyCode>,
    mouse_delta: (f64, f64),
}

impl InputState {
    pub fn handle_key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.keys_down.insert(key) {
                    self.keys_pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.keys_down.remove(&key);
            }
        }
    }

    /// Accumulates raw device motion; several events may arrive per frame.
    pub fn handle_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.mouse_delta.0 += dx;
        self.mouse_delta.1 += dy;
    }

    /// Focus loss: forget held keys so nothing sticks.
    pub fn release_all(&mut self) {
        self.keys_down.clear();
        self.keys_pressed.clear();
        self.mouse_delta = (0.0, 0.0);
    }

    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn just_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn mouse_delta(&self) -> (f32, f32) {
        (self.mouse_delta.0 as f32, self.mouse_delta.1 as f32)
    }

    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = (0.0, 0.0);
    }
}
