//! # KARTLAB Engine
//!
//! Deterministic, headless kart racing simulation.
//!
//! ## Layout
//!
//! - [`time`]: fixed-step tick clock and the leftover-time accumulator
//! - [`physics`]: category-tagged collision boxes with ray tests
//! - [`track`], [`kart`]: installed assets and kart dynamics
//! - [`controller`]: player, AI and local-player controllers
//! - [`items`]: item boxes, powerups, projectiles
//! - [`world`]: one running race
//! - [`race_manager`]: race setup and world lifetime
//! - [`assets`]: settings and registries loaded once per runtime
//!
//! ## RULE
//!
//! No rendering here. The renderer reads the world; the world never knows
//! it is being drawn.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod assets;
pub mod controller;
pub mod error;
pub mod items;
pub mod kart;
pub mod physics;
pub mod race_manager;
pub mod time;
pub mod track;
pub mod world;

pub use assets::{EngineAssets, EngineSettings};
pub use controller::{
    AiController, CrashTarget, KartController, KartView, LocalPlayer, PlayerAction, PlayerController,
};
pub use error::{EngineError, EngineResult};
pub use items::{ItemBox, ItemManager, Powerup, PowerupManager, Projectile, ProjectileKind};
pub use kart::{Kart, KartControl, KartProperties, KartPropertiesManager, SkidControl};
pub use physics::{Aabb, Body, BodyId, BodyKind, PhysicsWorld, RayHit};
pub use race_manager::{PlayerKart, RaceManager};
pub use time::{StepAccumulator, TickClock};
pub use track::{Track, TrackDef, TrackManager, TrackProjection};
pub use world::{KartEntry, World, WorldSetup};
