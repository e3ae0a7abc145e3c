//! Chase cameras, one per player kart.

use kartlab_engine::Kart;
use kartlab_shared::Vec3;

/// Distance behind the kart.
const CHASE_DISTANCE: f32 = 6.0;

/// Height above the kart origin.
const CHASE_HEIGHT: f32 = 2.5;

/// How far ahead of the kart the camera aims.
const AIM_AHEAD: f32 = 4.0;

/// Vertical field of view in radians (60 degrees).
const DEFAULT_FOV_Y: f32 = std::f32::consts::FRAC_PI_3;

/// A pinhole camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Eye position.
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Farthest visible distance.
    pub far: f32,
}

/// Orthonormal view basis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraBasis {
    /// Viewing direction.
    pub forward: Vec3,
    /// Screen right.
    pub right: Vec3,
    /// Screen up.
    pub up: Vec3,
}

impl Camera {
    /// Creates a camera at `position` looking at `target`.
    #[must_use]
    pub const fn look_at(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            fov_y: DEFAULT_FOV_Y,
            far: 100.0,
        }
    }

    /// Camera behind and above a kart, looking past it.
    #[must_use]
    pub fn chase(kart: &Kart) -> Self {
        let forward = kart.forward();
        let position = kart.xyz() - forward * CHASE_DISTANCE + Vec3::Y * CHASE_HEIGHT;
        let target = kart.xyz() + forward * AIM_AHEAD;
        Self::look_at(position, target)
    }

    /// View basis. `y` is up; a camera looking straight down falls back to
    /// `+z` as screen up.
    #[must_use]
    pub fn basis(&self) -> CameraBasis {
        let forward = (self.target - self.position).normalize_or_zero();
        let mut right = Vec3::Y.cross(forward).normalize_or_zero();
        if right == Vec3::ZERO {
            right = Vec3::Z.cross(forward).normalize_or_zero();
        }
        let up = forward.cross(right);
        CameraBasis { forward, right, up }
    }

    /// Direction of the ray through the center of pixel `(x, y)` of a
    /// `width` x `height` image. Row 0 is the top of the image.
    #[must_use]
    pub fn ray_direction(&self, basis: &CameraBasis, x: u32, y: u32, width: u32, height: u32) -> Vec3 {
        let aspect = width as f32 / height as f32;
        let tan_half = (self.fov_y * 0.5).tan();
        let ndc_x = ((x as f32 + 0.5) / width as f32) * 2.0 - 1.0;
        let ndc_y = 1.0 - ((y as f32 + 0.5) / height as f32) * 2.0;
        (basis.forward + basis.right * (ndc_x * tan_half * aspect) + basis.up * (ndc_y * tan_half))
            .normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_is_right_handed_screen() {
        let camera = Camera::look_at(Vec3::ZERO, Vec3::Z);
        let basis = camera.basis();
        assert_eq!(basis.forward, Vec3::Z);
        // Facing +z, +x is on the right (matches kart steering).
        assert_eq!(basis.right, Vec3::X);
        assert_eq!(basis.up, Vec3::Y);
    }

    #[test]
    fn test_center_ray_is_forward() {
        let camera = Camera::look_at(Vec3::ZERO, Vec3::Z);
        let basis = camera.basis();
        let dir = camera.ray_direction(&basis, 1, 1, 3, 3);
        assert!((dir - Vec3::Z).length() < 1e-6);

        let top_left = camera.ray_direction(&basis, 0, 0, 3, 3);
        assert!(top_left.x < 0.0 && top_left.y > 0.0);
    }

    #[test]
    fn test_straight_down_has_a_basis() {
        let camera = Camera::look_at(Vec3::Y, Vec3::ZERO);
        let basis = camera.basis();
        assert!((basis.right.length() - 1.0).abs() < 1e-6);
        assert!((basis.up.length() - 1.0).abs() < 1e-6);
    }
}
