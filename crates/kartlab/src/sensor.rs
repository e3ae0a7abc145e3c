//! # Surroundings Sensor
//!
//! Spherical ray probe around a kart.
//!
//! Rays leave the kart origin at polar angle θ (from `+y`) and azimuth ω,
//! both stepping 0°..=360° in 10° increments, and reach [`SENSOR_RADIUS`].
//! Each ray fills [`SENSOR_BUCKETS`] radial buckets of one world unit: with
//! the closest hit at distance `d`, bucket `i` holds the hit category when
//! `d >= i` and `0` otherwise. A ray without a hit leaves every bucket `0`.
//!
//! | category | bodies |
//! |---|---|
//! | 0 | nothing |
//! | 1 | track |
//! | 2 | kart |
//! | 3 | projectile |
//! | 4 | physical object |
//! | 5 | animated object |

use kartlab_engine::{BodyId, EngineError, EngineResult, PhysicsWorld, World};
use kartlab_shared::Vec3;

/// Angle between neighbouring rays, in degrees.
pub const SENSOR_ANGLE_STEP_DEG: u32 = 10;

/// Samples per angle: 0°, 10°, …, 360°.
pub const SENSOR_STEPS: usize = (360 / SENSOR_ANGLE_STEP_DEG) as usize + 1;

/// Radial buckets per ray.
pub const SENSOR_BUCKETS: usize = 5;

/// Ray length in world units.
pub const SENSOR_RADIUS: f32 = 5.0;

const BUCKET_SIZE: f32 = SENSOR_RADIUS / SENSOR_BUCKETS as f32;

/// Probe result, indexed `[theta][omega][bucket]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surroundings {
    cells: Vec<u8>,
}

impl Surroundings {
    fn empty() -> Self {
        Self {
            cells: vec![0; SENSOR_STEPS * SENSOR_STEPS * SENSOR_BUCKETS],
        }
    }

    /// Grid shape: `(theta, omega, bucket)`.
    #[must_use]
    pub const fn shape() -> (usize, usize, usize) {
        (SENSOR_STEPS, SENSOR_STEPS, SENSOR_BUCKETS)
    }

    /// Category in one cell, `None` outside the grid.
    #[must_use]
    pub fn get(&self, theta: usize, omega: usize, bucket: usize) -> Option<u8> {
        if theta >= SENSOR_STEPS || omega >= SENSOR_STEPS || bucket >= SENSOR_BUCKETS {
            return None;
        }
        self.cells.get(Self::offset(theta, omega, bucket)).copied()
    }

    /// Buckets of one ray.
    #[must_use]
    pub fn ray(&self, theta: usize, omega: usize) -> Option<&[u8]> {
        if theta >= SENSOR_STEPS || omega >= SENSOR_STEPS {
            return None;
        }
        let start = Self::offset(theta, omega, 0);
        self.cells.get(start..start + SENSOR_BUCKETS)
    }

    /// Flat row-major cells.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    #[inline]
    const fn offset(theta: usize, omega: usize, bucket: usize) -> usize {
        (theta * SENSOR_STEPS + omega) * SENSOR_BUCKETS + bucket
    }
}

/// Unit direction for polar angle `theta` and azimuth `omega` (radians).
#[inline]
#[must_use]
pub fn probe_direction(theta: f32, omega: f32) -> Vec3 {
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_o, cos_o) = omega.sin_cos();
    Vec3::new(sin_t * cos_o, cos_t, sin_t * sin_o)
}

/// Probes around kart `kart` of `world`.
///
/// # Errors
///
/// Returns [`EngineError::InvalidKartIndex`] for a kart outside the grid.
pub fn surroundings(world: &World, kart: usize) -> EngineResult<Surroundings> {
    let subject = world.kart(kart).ok_or(EngineError::InvalidKartIndex {
        index: kart,
        count: world.num_karts(),
    })?;
    Ok(probe(world.physics(), subject.xyz(), Some(subject.body())))
}

fn probe(physics: &PhysicsWorld, origin: Vec3, ignore: Option<BodyId>) -> Surroundings {
    let mut grid = Surroundings::empty();
    for t in 0..SENSOR_STEPS {
        let theta = ((t as u32 * SENSOR_ANGLE_STEP_DEG) as f32).to_radians();
        for o in 0..SENSOR_STEPS {
            let omega = ((o as u32 * SENSOR_ANGLE_STEP_DEG) as f32).to_radians();
            let dir = probe_direction(theta, omega);
            let Some(hit) = physics.ray_cast(origin, dir, SENSOR_RADIUS, ignore) else {
                continue;
            };
            let category = hit.kind.category();
            let start = Surroundings::offset(t, o, 0);
            for (i, cell) in grid.cells[start..start + SENSOR_BUCKETS].iter_mut().enumerate() {
                if hit.distance >= i as f32 * BUCKET_SIZE {
                    *cell = category;
                }
            }
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use kartlab_engine::{Aabb, BodyKind};

    #[test]
    fn test_shape() {
        assert_eq!(Surroundings::shape(), (37, 37, 5));
        assert_eq!(Surroundings::empty().as_slice().len(), 37 * 37 * 5);
    }

    #[test]
    fn test_directions_are_spherical() {
        let up = probe_direction(0.0, 1.0);
        assert!((up - Vec3::Y).length() < 1e-6);
        let down = probe_direction(std::f32::consts::PI, 0.0);
        assert!((down + Vec3::Y).length() < 1e-6);
        let side = probe_direction(std::f32::consts::FRAC_PI_2, std::f32::consts::FRAC_PI_2);
        assert!((side - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_empty_space_is_all_zero() {
        let grid = probe(&PhysicsWorld::new(), Vec3::ZERO, None);
        assert!(grid.as_slice().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_bucket_rule() {
        let mut physics = PhysicsWorld::new();
        // Wall 2.5 units along +x.
        physics.add_body(
            BodyKind::PhysicalObject,
            Aabb::new(Vec3::new(2.5, -0.1, -0.1), Vec3::new(3.0, 0.1, 0.1)),
        );
        let grid = probe(&physics, Vec3::ZERO, None);

        // theta 90° (index 9), omega 0° (index 0) points along +x.
        assert_eq!(grid.ray(9, 0).unwrap(), &[4, 4, 4, 0, 0]);
        // Straight up sees nothing.
        assert_eq!(grid.ray(0, 0).unwrap(), &[0; 5]);
        assert_eq!(grid.get(37, 0, 0), None);
    }

    #[test]
    fn test_ignored_body_is_invisible() {
        let mut physics = PhysicsWorld::new();
        let own = physics.add_body(BodyKind::Kart, Aabb::from_center(Vec3::ZERO, Vec3::new(0.5, 0.5, 0.5)));
        let grid = probe(&physics, Vec3::ZERO, Some(own));
        assert!(grid.as_slice().iter().all(|&c| c == 0));
    }
}
