//! # World State
//!
//! Owned, serializable snapshot of a running race for scripts.

use kartlab_engine::{ItemBox, Kart, Powerup, Projectile, ProjectileKind, World};
use kartlab_shared::Vec3;
use serde::Serialize;

/// One kart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KartState {
    /// Grid index.
    pub index: usize,
    /// Kart identifier.
    pub ident: String,
    /// Team id.
    pub team: u8,
    /// Origin position.
    pub xyz: Vec3,
    /// Heading in radians around `+y`.
    pub heading: f32,
    /// Signed speed along the heading.
    pub speed: f32,
    /// Laps completed.
    pub lap: u32,
    /// Distance from the start line, counting laps.
    pub overall_distance: f32,
    /// Distance along the current lap.
    pub track_distance: f32,
    /// Race position, 1-based.
    pub position: usize,
    /// Race time at the finish line.
    pub finish_time: Option<f64>,
    /// Held powerup.
    pub powerup: Option<Powerup>,
    /// Nitro energy left.
    pub nitro: f32,
    /// Battle lives left.
    pub lives: u8,
    /// Out of a battle.
    pub eliminated: bool,
}

impl KartState {
    fn capture(kart: &Kart) -> Self {
        Self {
            index: kart.index(),
            ident: kart.ident().to_string(),
            team: kart.team(),
            xyz: kart.xyz(),
            heading: kart.heading(),
            speed: kart.speed(),
            lap: kart.laps_completed(),
            overall_distance: kart.overall_distance(),
            track_distance: kart.track_distance(),
            position: kart.position(),
            finish_time: kart.finish_time(),
            powerup: kart.powerup(),
            nitro: kart.nitro(),
            lives: kart.lives(),
            eliminated: kart.is_eliminated(),
        }
    }
}

/// One item box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ItemBoxState {
    /// Position.
    pub position: Vec3,
    /// Whether it can be picked up now.
    pub available: bool,
}

impl From<&ItemBox> for ItemBoxState {
    fn from(item: &ItemBox) -> Self {
        Self {
            position: item.position,
            available: item.is_available(),
        }
    }
}

/// One live projectile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ProjectileState {
    /// What it is.
    pub kind: ProjectileKind,
    /// Kart that fired it.
    pub owner: usize,
    /// Center position.
    pub position: Vec3,
}

impl From<&Projectile> for ProjectileState {
    fn from(projectile: &Projectile) -> Self {
        Self {
            kind: projectile.kind,
            owner: projectile.owner,
            position: projectile.position,
        }
    }
}

/// Snapshot of a running race.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorldState {
    /// Simulated race time in seconds.
    pub time: f64,
    /// Physics ticks run.
    pub ticks: u64,
    /// Track identifier.
    pub track: String,
    /// Every kart, in grid order.
    pub karts: Vec<KartState>,
    /// Item boxes.
    pub item_boxes: Vec<ItemBoxState>,
    /// Live projectiles.
    pub projectiles: Vec<ProjectileState>,
    /// Players past the finish.
    pub finished_players: usize,
}

impl WorldState {
    /// Captures `world`.
    #[must_use]
    pub fn capture(world: &World) -> Self {
        Self {
            time: world.time(),
            ticks: world.ticks(),
            track: world.track().ident().to_string(),
            karts: world.karts().iter().map(KartState::capture).collect(),
            item_boxes: world.items().boxes().iter().map(ItemBoxState::from).collect(),
            projectiles: world.projectiles().iter().map(ProjectileState::from).collect(),
            finished_players: world.finished_players(),
        }
    }

    /// State of kart `index`.
    #[must_use]
    pub fn kart(&self, index: usize) -> Option<&KartState> {
        self.karts.get(index)
    }
}
