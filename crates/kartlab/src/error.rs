//! # Control Surface Error Types
//!
//! Lifecycle misuse and everything the lower layers can raise.

use kartlab_engine::EngineError;
use kartlab_rendering::RenderError;
use kartlab_shared::ConfigError;
use thiserror::Error;

/// Errors raised by [`crate::Runtime`] and [`crate::Race`].
#[derive(Error, Debug)]
pub enum KartlabError {
    /// `init` called on an initialized runtime.
    #[error("runtime is already initialized")]
    AlreadyInitialized,

    /// A session was requested before `init`.
    #[error("runtime is not initialized")]
    NotInitialized,

    /// `init` or `clean` called while a race session is live.
    #[error("a race session is active; stop it first")]
    SessionActive,

    /// A second race session was requested.
    #[error("only one race session may exist at a time")]
    SessionAlreadyActive,

    /// The race configuration cannot start a session.
    #[error("invalid race config: {0}")]
    InvalidConfig(String),

    /// Engine failure (assets, tracks, karts).
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Config file failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Render device or target failure.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Result type for control surface operations.
pub type KartlabResult<T> = Result<T, KartlabError>;
