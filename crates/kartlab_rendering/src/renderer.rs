//! # Software Renderer
//!
//! One ray per pixel through the physics world. The closest body decides the
//! pixel: its category picks the color, the hit distance gives depth and the
//! body id goes into the instance plane.

use kartlab_engine::{BodyKind, PhysicsWorld};
use kartlab_shared::{GraphicsConfig, Vec3};

use crate::camera::Camera;
use crate::target::FramePlanes;

/// Bits the category is shifted by in an instance id.
pub const INSTANCE_CATEGORY_SHIFT: u32 = 24;

/// Mask of the body id part of an instance id.
pub const INSTANCE_ID_MASK: u32 = (1 << INSTANCE_CATEGORY_SHIFT) - 1;

const SKY: [u8; 3] = [135, 190, 235];

/// Shading toggles taken from the graphics config.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shading {
    /// Darken with distance.
    pub distance_falloff: bool,
    /// Brighten projectiles and animated objects.
    pub glow: bool,
}

impl Default for Shading {
    fn default() -> Self {
        Self {
            distance_falloff: true,
            glow: false,
        }
    }
}

impl Shading {
    /// Shading for a graphics config.
    #[must_use]
    pub const fn from_config(config: &GraphicsConfig) -> Self {
        Self {
            distance_falloff: config.dynamic_lights,
            glow: config.glow,
        }
    }
}

/// Packs a category and body id into an instance id.
#[inline]
#[must_use]
pub const fn instance_id(kind: BodyKind, body: u32) -> u32 {
    ((kind.category() as u32) << INSTANCE_CATEGORY_SHIFT) | (body & INSTANCE_ID_MASK)
}

/// Splits an instance id into category and body id.
#[inline]
#[must_use]
pub const fn split_instance_id(id: u32) -> (u8, u32) {
    ((id >> INSTANCE_CATEGORY_SHIFT) as u8, id & INSTANCE_ID_MASK)
}

const fn base_color(kind: BodyKind) -> [u8; 3] {
    match kind {
        BodyKind::Track => [96, 96, 104],
        BodyKind::Kart => [220, 64, 48],
        BodyKind::Flyable => [240, 210, 60],
        BodyKind::PhysicalObject => [72, 140, 64],
        BodyKind::Animation => [150, 90, 200],
    }
}

fn shade(kind: BodyKind, distance: f32, far: f32, shading: Shading) -> [u8; 3] {
    let mut factor = if shading.distance_falloff {
        1.0 - 0.6 * (distance / far).clamp(0.0, 1.0)
    } else {
        1.0
    };
    if shading.glow && matches!(kind, BodyKind::Flyable | BodyKind::Animation) {
        factor *= 1.25;
    }
    base_color(kind).map(|c| (f32::from(c) * factor).clamp(0.0, 255.0) as u8)
}

/// Renders `camera`'s view of `physics` into `planes`.
pub fn rasterize(planes: &mut FramePlanes, camera: &Camera, physics: &PhysicsWorld, shading: Shading) {
    let (width, height) = (planes.width(), planes.height());
    let basis = camera.basis();

    for y in 0..height {
        for x in 0..width {
            let dir = camera.ray_direction(&basis, x, y, width, height);
            let index = planes.index(x, y);
            let (rgb, depth, instance) = match trace(physics, camera.position, dir, camera.far) {
                Some((kind, body, distance)) => (
                    shade(kind, distance, camera.far, shading),
                    distance / camera.far,
                    instance_id(kind, body),
                ),
                None => (SKY, 1.0, 0),
            };
            planes.color[index * 3..index * 3 + 3].copy_from_slice(&rgb);
            planes.depth[index] = depth;
            planes.instance[index] = instance;
        }
    }
}

fn trace(physics: &PhysicsWorld, origin: Vec3, dir: Vec3, far: f32) -> Option<(BodyKind, u32, f32)> {
    physics
        .ray_cast(origin, dir, far, None)
        .map(|hit| (hit.kind, hit.body.0, hit.distance))
}
