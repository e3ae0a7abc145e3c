//! # KARTLAB
//!
//! Scripting control surface over a headless kart racing engine.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kartlab::{Action, GraphicsConfig, Race, RaceConfig, Runtime};
//!
//! let mut runtime = Runtime::new();
//! runtime.init(GraphicsConfig::ld().with_resolution(64, 48))?;
//!
//! let mut race = Race::new(&runtime, RaceConfig::default())?;
//! race.start()?;
//! while race.step_single(&Action::FULL_THROTTLE) {
//!     let frame = race.render_data()[0].read();
//!     // ... feed the frame to an agent
//! #   drop(frame);
//! }
//! race.stop();
//! drop(race);
//!
//! runtime.clean()?;
//! # Ok::<(), kartlab::KartlabError>(())
//! ```
//!
//! ## Layout
//!
//! - [`runtime`]: init / clean and the session slot
//! - [`race`]: one session and its step loop
//! - [`sensor`]: ray probe around a kart
//! - [`state`]: serializable world snapshots

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod race;
pub mod runtime;
pub mod sensor;
pub mod state;

pub use error::{KartlabError, KartlabResult};
pub use race::Race;
pub use runtime::{EngineContext, Runtime, RuntimeConfig};
pub use sensor::{surroundings, Surroundings};
pub use state::{ItemBoxState, KartState, ProjectileState, WorldState};

pub use kartlab_engine::{EngineSettings, PlayerAction, Powerup};
pub use kartlab_rendering::{split_instance_id, FramePlanes, RenderData};
pub use kartlab_shared::{
    Action, ControllerKind, Difficulty, GraphicsConfig, PlayerConfig, RaceConfig, RaceMode,
};
