//! # KARTLAB Physics World
//!
//! Category-tagged collision boxes with closest-hit ray tests.
//!
//! Features:
//! - AABB bodies tagged with what they are (track, kart, projectile, ...)
//! - Segment ray tests with an optional ignored body (a kart probing around
//!   itself must not hit its own chassis)
//! - Overlap queries for kart/object collisions

use kartlab_shared::Vec3;

// ============================================================================
// AABB (Axis-Aligned Bounding Box)
// ============================================================================

/// Axis-Aligned Bounding Box for collision detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the box.
    pub min: Vec3,
    /// Maximum corner of the box.
    pub max: Vec3,
}

impl Aabb {
    /// Creates a new AABB.
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates an AABB centered at `center` with the given half extents.
    #[must_use]
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Checks if this AABB intersects another.
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x && self.max.x > other.min.x &&
        self.min.y < other.max.y && self.max.y > other.min.y &&
        self.min.z < other.max.z && self.max.z > other.min.z
    }

    /// Moves the AABB by delta.
    #[must_use]
    pub fn translate(&self, delta: Vec3) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Distance along `dir` from `origin` to the first point inside the box,
    /// if that happens within `max_distance`. An origin inside the box hits
    /// at distance zero.
    ///
    /// `dir` must be normalized.
    #[must_use]
    pub fn ray_distance(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<f32> {
        let o = origin.to_array();
        let d = dir.to_array();
        let lo = self.min.to_array();
        let hi = self.max.to_array();

        let mut t_enter = 0.0f32;
        let mut t_exit = max_distance;

        for axis in 0..3 {
            if d[axis].abs() < 1e-8 {
                // Parallel to this slab: must already be inside it.
                if o[axis] < lo[axis] || o[axis] > hi[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d[axis];
            let mut t1 = (lo[axis] - o[axis]) * inv;
            let mut t2 = (hi[axis] - o[axis]) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_enter = t_enter.max(t1);
            t_exit = t_exit.min(t2);
            if t_enter > t_exit {
                return None;
            }
        }

        Some(t_enter)
    }
}

// ============================================================================
// BODIES
// ============================================================================

/// What a body is. The discriminant is the category reported by sensors and
/// encoded in instance ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum BodyKind {
    /// Track geometry (ground, walls).
    Track = 1,
    /// A kart chassis.
    Kart = 2,
    /// A flying projectile.
    Flyable = 3,
    /// A static physical object.
    PhysicalObject = 4,
    /// A moving, animated object.
    Animation = 5,
}

impl BodyKind {
    /// Numeric category, never zero (zero means "nothing").
    #[inline]
    #[must_use]
    pub const fn category(self) -> u8 {
        self as u8
    }

    /// Whether karts bounce off this body.
    #[inline]
    #[must_use]
    pub const fn blocks_karts(self) -> bool {
        matches!(self, Self::PhysicalObject | Self::Animation)
    }
}

/// Stable handle to a body. Ids are never reused within a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

/// A collision body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    /// Handle.
    pub id: BodyId,
    /// Category.
    pub kind: BodyKind,
    /// Current bounds.
    pub aabb: Aabb,
}

/// Result of a ray test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Body that was hit.
    pub body: BodyId,
    /// Its category.
    pub kind: BodyKind,
    /// Distance from ray origin to hit point.
    pub distance: f32,
    /// Hit position in world space.
    pub point: Vec3,
}

// ============================================================================
// PHYSICS WORLD
// ============================================================================

/// All collision bodies of one race.
///
/// Bodies are kept sorted by id, so iteration order and tie-breaking in ray
/// tests are deterministic.
#[derive(Clone, Debug, Default)]
pub struct PhysicsWorld {
    bodies: Vec<Body>,
    next_id: u32,
}

impl PhysicsWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a body and returns its handle.
    pub fn add_body(&mut self, kind: BodyKind, aabb: Aabb) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        self.bodies.push(Body { id, kind, aabb });
        id
    }

    /// Removes a body. Returns it if it existed.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let index = self.index_of(id)?;
        Some(self.bodies.remove(index))
    }

    /// Moves a body to new bounds. Returns false for an unknown id.
    pub fn set_aabb(&mut self, id: BodyId, aabb: Aabb) -> bool {
        match self.index_of(id) {
            Some(index) => {
                self.bodies[index].aabb = aabb;
                true
            }
            None => false,
        }
    }

    /// Looks up a body.
    #[must_use]
    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.index_of(id).map(|index| &self.bodies[index])
    }

    /// All bodies in id order.
    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Number of bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the world has no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    fn index_of(&self, id: BodyId) -> Option<usize> {
        self.bodies.binary_search_by_key(&id, |body| body.id).ok()
    }

    /// Closest hit along the segment `from -> to`, skipping `ignore`.
    #[must_use]
    pub fn ray_test(&self, from: Vec3, to: Vec3, ignore: Option<BodyId>) -> Option<RayHit> {
        let delta = to - from;
        let length = delta.length();
        if length < 1e-6 {
            return None;
        }
        self.ray_cast(from, delta * (1.0 / length), length, ignore)
    }

    /// Closest hit along a normalized direction up to `max_distance`.
    #[must_use]
    pub fn ray_cast(
        &self,
        origin: Vec3,
        dir: Vec3,
        max_distance: f32,
        ignore: Option<BodyId>,
    ) -> Option<RayHit> {
        let mut best: Option<(f32, &Body)> = None;

        for body in &self.bodies {
            if Some(body.id) == ignore {
                continue;
            }
            let Some(distance) = body.aabb.ray_distance(origin, dir, max_distance) else {
                continue;
            };
            // Strict comparison keeps the lowest id on ties.
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, body));
            }
        }

        best.map(|(distance, body)| RayHit {
            body: body.id,
            kind: body.kind,
            distance,
            point: origin + dir * distance,
        })
    }

    /// Bodies overlapping `aabb`, skipping `ignore`.
    pub fn overlapping<'a>(
        &'a self,
        aabb: &'a Aabb,
        ignore: Option<BodyId>,
    ) -> impl Iterator<Item = &'a Body> + 'a {
        self.bodies
            .iter()
            .filter(move |body| Some(body.id) != ignore && body.aabb.intersects(aabb))
    }
}
