// SPDX-License-Identifier: CEPL-1.0
use bitflags::bitflags;
use glam::{Mat4, Vec3};

/// Right-handed view matrix.
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(eye, target, up)
}

/// Right-handed perspective with a 0..1 depth range and the Y axis flipped,
/// so that +Y in view space lands at the top of a Vulkan viewport.
pub fn perspective_flipped(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let mut proj = Mat4::perspective_rh(fov_y_radians, aspect, near, far);
    proj.y_axis.y *= -1.0;
    proj
}

bitflags! {
    /// Movement requested for one frame, already decoupled from key codes.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct MoveIntent: u8 {
        const FORWARD = 1 << 0;
        const BACK    = 1 << 1;
        const LEFT    = 1 << 2;
        const RIGHT   = 1 << 3;
        const UP      = 1 << 4;
        const DOWN    = 1 << 5;
        const BOOST   = 1 << 6;
    }
}

const PITCH_LIMIT: f32 = 89.0;

/// Yaw/pitch fly camera. Angles are in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FreeCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Units per second.
    pub speed: f32,
    /// Degrees per mouse count.
    pub sensitivity: f32,
    /// Speed multiplier while `MoveIntent::BOOST` is held.
    pub boost: f32,
}

impl Default for FreeCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 3.0),
            yaw: -90.0,
            pitch: -10.0,
            speed: 5.0,
            sensitivity: 0.12,
            boost: 3.0,
        }
    }
}

impl FreeCamera {
    pub fn front(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.front().cross(Vec3::Y).normalize()
    }

    pub fn target(&self) -> Vec3 {
        self.position + self.front()
    }

    /// Applies a mouse delta. Screen-down rotates the view down.
    pub fn look(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch - dy * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn advance(&mut self, intent: MoveIntent, dt: f32) {
        let mut velocity = self.speed * dt;
        if intent.contains(MoveIntent::BOOST) {
            velocity *= self.boost;
        }
        let (front, right) = (self.front(), self.right());
        let mut step = Vec3::ZERO;
        if intent.contains(MoveIntent::FORWARD) {
            step += front;
        }
        if intent.contains(MoveIntent::BACK) {
            step -= front;
        }
        if intent.contains(MoveIntent::RIGHT) {
            step += right;
        }
        if intent.contains(MoveIntent::LEFT) {
            step -= right;
        }
        if intent.contains(MoveIntent::UP) {
            step += Vec3::Y;
        }
        if intent.contains(MoveIntent::DOWN) {
            step -= Vec3::Y;
        }
        self.position += step * velocity;
    }

    pub fn view(&self) -> Mat4 {
        look_at(self.position, self.target(), Vec3::Y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn reference_look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let f = (target - eye).normalize();
        let s = f.cross(up).normalize();
        let u = s.cross(f);
        Mat4::from_cols(
            Vec4::new(s.x, u.x, -f.x, 0.0),
            Vec4::new(s.y, u.y, -f.y, 0.0),
            Vec4::new(s.z, u.z, -f.z, 0.0),
            Vec4::new(-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0),
        )
    }

    #[test]
    fn look_at_matches_reference() {
        let eye = Vec3::new(2.5, -1.0, 7.0);
        let target = Vec3::new(-0.5, 0.25, 1.0);
        let up = Vec3::new(0.1, 1.0, 0.0).normalize();
        let got = look_at(eye, target, up);
        let want = reference_look_at(eye, target, up);
        assert!(got.abs_diff_eq(want, 1e-5), "{got:?} != {want:?}");
    }

    #[test]
    fn perspective_flips_y_only() {
        let plain = Mat4::perspective_rh(1.2, 1.5, 0.01, 100.0);
        let flipped = perspective_flipped(1.2, 1.5, 0.01, 100.0);
        assert_eq!(flipped.y_axis.y, -plain.y_axis.y);
        assert_eq!(flipped.x_axis, plain.x_axis);
        assert_eq!(flipped.z_axis, plain.z_axis);
        assert_eq!(flipped.w_axis, plain.w_axis);

        let clip = flipped * Vec4::new(0.0, 1.0, -2.0, 1.0);
        assert!(clip.y < 0.0);
    }

    #[test]
    fn default_camera_looks_toward_origin() {
        let cam = FreeCamera::default();
        let front = cam.front();
        assert!(front.z < 0.0);
        assert!(front.y < 0.0);
        assert!(front.x.abs() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut cam = FreeCamera::default();
        cam.look(0.0, -100_000.0);
        assert_eq!(cam.pitch, PITCH_LIMIT);
        cam.look(0.0, 100_000.0);
        assert_eq!(cam.pitch, -PITCH_LIMIT);
    }

    #[test]
    fn boost_scales_travel() {
        let mut slow = FreeCamera { pitch: 0.0, ..FreeCamera::default() };
        let mut fast = slow;
        slow.advance(MoveIntent::FORWARD, 0.1);
        fast.advance(MoveIntent::FORWARD | MoveIntent::BOOST, 0.1);
        let start = FreeCamera::default().position;
        let slow_dist = (slow.position - start).length();
        let fast_dist = (fast.position - start).length();
        assert!((slow_dist - 0.5).abs() < 1e-5);
        assert!((fast_dist - 1.5).abs() < 1e-5);
    }

    #[test]
    fn vertical_moves_ignore_heading() {
        let mut cam = FreeCamera::default();
        let before = cam.position;
        cam.advance(MoveIntent::UP, 1.0);
        assert!((cam.position - (before + Vec3::Y * cam.speed)).length() < 1e-5);
    }
}
