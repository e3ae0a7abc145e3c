//! # Engine Error Types
//!
//! All errors that can occur while loading assets or driving a world.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The requested track is not installed.
    #[error("unknown track: {0}")]
    UnknownTrack(String),

    /// The requested kart is not installed.
    #[error("unknown kart: {0}")]
    UnknownKart(String),

    /// A kart index outside the grid.
    #[error("kart index {index} out of range ({count} karts)")]
    InvalidKartIndex {
        /// Requested index.
        index: usize,
        /// Karts in the world.
        count: usize,
    },

    /// An asset directory or file could not be read.
    #[error("cannot load assets from {path}: {reason}")]
    AssetLoad {
        /// Path that failed.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// An asset parsed but is unusable.
    #[error("invalid asset: {0}")]
    InvalidAsset(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
