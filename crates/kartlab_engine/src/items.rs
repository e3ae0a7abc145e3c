//! # Items & Powerups
//!
//! Item boxes on the track hand out powerups; firing a powerup spawns a
//! projectile or boosts the kart.
//!
//! Both random streams (which powerup a box gives, how long a box stays
//! empty) come from seeded `ChaCha8Rng`s, so a race replays identically for
//! the same seed and inputs.

use kartlab_shared::{RaceMode, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::physics::BodyId;

/// Distance within which a kart picks up an item box.
pub const PICKUP_RADIUS: f32 = 1.5;

/// Shortest and longest time an item box stays empty (seconds).
pub const RESPAWN_RANGE: (f32, f32) = (2.0, 4.0);

// ============================================================================
// POWERUPS
// ============================================================================

/// A usable item held by a kart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Powerup {
    /// Heavy ball rolling straight ahead.
    Bowling,
    /// Homes in on the nearest kart.
    Cake,
    /// Instant speed boost.
    Zipper,
    /// Sticky blob dropped behind the kart.
    Bubblegum,
}

impl Powerup {
    /// Every powerup, in draw order.
    pub const ALL: [Self; 4] = [Self::Bowling, Self::Cake, Self::Zipper, Self::Bubblegum];

    /// Projectile launched on use, if any.
    #[must_use]
    pub const fn projectile(self) -> Option<ProjectileKind> {
        match self {
            Self::Bowling => Some(ProjectileKind::Bowling),
            Self::Cake => Some(ProjectileKind::Cake),
            Self::Bubblegum => Some(ProjectileKind::Bubblegum),
            Self::Zipper => None,
        }
    }
}

/// Chooses powerups for item box pickups.
#[derive(Clone, Debug)]
pub struct PowerupManager {
    rng: ChaCha8Rng,
}

impl PowerupManager {
    /// Creates a manager seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Restarts the random stream.
    pub fn set_random_seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Draws a powerup. Battles never hand out zippers.
    pub fn random_powerup(&mut self, mode: RaceMode) -> Powerup {
        let pool: &[Powerup] = if mode.is_lap_race() {
            &Powerup::ALL
        } else {
            &[Powerup::Bowling, Powerup::Cake, Powerup::Bubblegum]
        };
        pool[self.rng.gen_range(0..pool.len())]
    }
}

// ============================================================================
// ITEM BOXES
// ============================================================================

/// One item box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemBox {
    /// Position on the track.
    pub position: Vec3,
    /// Seconds until the box is back; zero when available.
    pub respawn_in: f32,
}

impl ItemBox {
    /// Whether the box can be picked up.
    #[inline]
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.respawn_in <= 0.0
    }
}

/// All item boxes of a race.
#[derive(Clone, Debug)]
pub struct ItemManager {
    boxes: Vec<ItemBox>,
    rng: ChaCha8Rng,
}

impl ItemManager {
    /// Creates a manager with boxes at `positions`.
    #[must_use]
    pub fn new(positions: impl IntoIterator<Item = Vec3>, seed: u64) -> Self {
        Self {
            boxes: positions
                .into_iter()
                .map(|position| ItemBox {
                    position,
                    respawn_in: 0.0,
                })
                .collect(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Restarts the respawn random stream.
    pub fn update_random_seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Makes every box available again.
    pub fn reset(&mut self) {
        for item_box in &mut self.boxes {
            item_box.respawn_in = 0.0;
        }
    }

    /// Counts respawn timers down.
    pub fn update(&mut self, dt: f32) {
        for item_box in &mut self.boxes {
            if item_box.respawn_in > 0.0 {
                item_box.respawn_in = (item_box.respawn_in - dt).max(0.0);
            }
        }
    }

    /// Picks up the first available box within reach of `position`.
    ///
    /// Returns the box index.
    pub fn collect(&mut self, position: Vec3) -> Option<usize> {
        let index = self
            .boxes
            .iter()
            .position(|b| b.is_available() && b.position.distance_xz(position) <= PICKUP_RADIUS)?;
        self.boxes[index].respawn_in = self.rng.gen_range(RESPAWN_RANGE.0..RESPAWN_RANGE.1);
        Some(index)
    }

    /// All boxes.
    #[must_use]
    pub fn boxes(&self) -> &[ItemBox] {
        &self.boxes
    }
}

// ============================================================================
// PROJECTILES
// ============================================================================

/// Kind of a flying object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    /// Straight roller.
    Bowling,
    /// Homing cake.
    Cake,
    /// Stationary blob.
    Bubblegum,
}

impl ProjectileKind {
    /// Launch speed.
    #[must_use]
    pub const fn speed(self) -> f32 {
        match self {
            Self::Bowling => 35.0,
            Self::Cake => 30.0,
            Self::Bubblegum => 0.0,
        }
    }

    /// Seconds before the projectile disappears on its own.
    #[must_use]
    pub const fn lifetime(self) -> f32 {
        match self {
            Self::Bowling => 3.0,
            Self::Cake => 4.0,
            Self::Bubblegum => 10.0,
        }
    }

    /// Half size of the projectile box.
    #[must_use]
    pub const fn half_extent(self) -> f32 {
        match self {
            Self::Bowling => 0.5,
            Self::Cake => 0.4,
            Self::Bubblegum => 0.6,
        }
    }
}

/// A live projectile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projectile {
    /// What it is.
    pub kind: ProjectileKind,
    /// Physics body (category `Flyable`).
    pub body: BodyId,
    /// Kart that fired it; never hit by its own projectile.
    pub owner: usize,
    /// Center position.
    pub position: Vec3,
    /// Travel heading.
    pub heading: f32,
    /// Seconds left.
    pub ttl: f32,
}

impl Projectile {
    /// Creates a projectile at `position`.
    #[must_use]
    pub fn new(kind: ProjectileKind, body: BodyId, owner: usize, position: Vec3, heading: f32) -> Self {
        Self {
            kind,
            body,
            owner,
            position,
            heading,
            ttl: kind.lifetime(),
        }
    }

    /// Moves the projectile. Cakes turn towards `target` at a limited rate.
    pub fn advance(&mut self, dt: f32, target: Option<Vec3>) {
        const CAKE_TURN_RATE: f32 = 3.0;

        if let (ProjectileKind::Cake, Some(target)) = (self.kind, target) {
            let wanted = (target - self.position).heading();
            let diff = kartlab_shared::math::wrap_angle(wanted - self.heading);
            let max_turn = CAKE_TURN_RATE * dt;
            self.heading = kartlab_shared::math::wrap_angle(self.heading + diff.clamp(-max_turn, max_turn));
        }
        self.position += Vec3::from_heading(self.heading) * (self.kind.speed() * dt);
        self.ttl -= dt;
    }

    /// Whether the projectile ran out of time.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.ttl <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_powerups_are_seeded() {
        let mut a = PowerupManager::new(7);
        let mut b = PowerupManager::new(7);
        let draws_a: Vec<Powerup> = (0..32).map(|_| a.random_powerup(RaceMode::NormalRace)).collect();
        let draws_b: Vec<Powerup> = (0..32).map(|_| b.random_powerup(RaceMode::NormalRace)).collect();
        assert_eq!(draws_a, draws_b);

        a.set_random_seed(7);
        assert_eq!(a.random_powerup(RaceMode::NormalRace), draws_a[0]);
    }

    #[test]
    fn test_battles_have_no_zippers() {
        let mut manager = PowerupManager::new(1);
        for _ in 0..200 {
            assert_ne!(manager.random_powerup(RaceMode::ThreeStrikes), Powerup::Zipper);
        }
    }

    #[test]
    fn test_item_box_pickup_and_respawn() {
        let mut items = ItemManager::new([Vec3::new(10.0, 0.5, 0.0)], 3);
        assert_eq!(items.collect(Vec3::new(0.0, 0.5, 0.0)), None);
        assert_eq!(items.collect(Vec3::new(9.0, 0.5, 0.5)), Some(0));
        // Taken: nobody else gets it until it respawns.
        assert_eq!(items.collect(Vec3::new(10.0, 0.5, 0.0)), None);

        let respawn = items.boxes()[0].respawn_in;
        assert!((RESPAWN_RANGE.0..RESPAWN_RANGE.1).contains(&respawn));
        items.update(RESPAWN_RANGE.1);
        assert!(items.boxes()[0].is_available());
    }

    #[test]
    fn test_bowling_rolls_straight() {
        let mut ball = Projectile::new(ProjectileKind::Bowling, BodyId(0), 0, Vec3::ZERO, 0.0);
        ball.advance(0.5, Some(Vec3::new(50.0, 0.0, 0.0)));
        assert!(ball.position.x.abs() < 1e-5);
        assert!((ball.position.z - 17.5).abs() < 1e-4);
        assert!(!ball.expired());
        ball.advance(3.0, None);
        assert!(ball.expired());
    }

    #[test]
    fn test_cake_turns_towards_target() {
        let mut cake = Projectile::new(ProjectileKind::Cake, BodyId(0), 0, Vec3::ZERO, 0.0);
        cake.advance(0.1, Some(Vec3::new(20.0, 0.0, 0.0)));
        assert!(cake.heading > 0.0);
        assert!(cake.position.x > 0.0);
    }
}
