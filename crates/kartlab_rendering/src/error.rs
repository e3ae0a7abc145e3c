//! # Rendering Error Types

use kartlab_shared::ConfigError;
use thiserror::Error;

/// Errors that can occur while setting up rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The graphics configuration cannot drive a device.
    #[error("invalid graphics config: {0}")]
    Config(#[from] ConfigError),

    /// A render target was requested with a zero dimension.
    #[error("render target '{name}' has zero size ({width}x{height})")]
    ZeroSizedTarget {
        /// Target name.
        name: String,
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;
