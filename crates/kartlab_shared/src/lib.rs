//! # KARTLAB Shared
//!
//! Common types used by the engine substrate, the renderer and the control
//! surface.
//!
//! ## RULE
//!
//! This crate must NEVER depend on another `kartlab_*` crate. If a type needs
//! engine state, it belongs in `kartlab_engine`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod action;
pub mod config;
pub mod constants;
pub mod error;
pub mod math;

pub use action::Action;
pub use config::{
    ControllerKind, Difficulty, GraphicsConfig, PlayerConfig, RaceConfig, RaceMode,
};
pub use constants::{
    DEFAULT_KART, DEFAULT_PHYSICS_FPS, DEFAULT_STEP_SIZE, DEFAULT_TRACK, MAX_GOAL,
    RENDER_BUFFER_COUNT,
};
pub use error::{ConfigError, ConfigResult};
pub use math::Vec3;
