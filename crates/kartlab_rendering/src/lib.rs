//! # KARTLAB Rendering
//!
//! Headless rendering for the race session: a device, one off-screen target
//! per player and a double-buffered readback ring per target.
//!
//! ## Frame Flow
//!
//! 1. [`Camera::chase`] places each player's camera behind their kart
//! 2. [`RenderTarget::render`] ray-casts the view into the target surface
//! 3. [`RenderTarget::fetch`] copies the surface into the next ring slot and
//!    points the player's [`RenderData`] at it
//! 4. [`RenderDevice::run`] pumps events and reports whether to keep going
//!
//! ## RULE
//!
//! Rendering reads the world. It never mutates it.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod camera;
pub mod device;
pub mod error;
pub mod renderer;
pub mod target;

pub use camera::{Camera, CameraBasis};
pub use device::{CloseHandle, RenderDevice};
pub use error::{RenderError, RenderResult};
pub use renderer::{instance_id, split_instance_id, Shading};
pub use target::{FramePlanes, RenderData, RenderTarget, SharedFrame};
