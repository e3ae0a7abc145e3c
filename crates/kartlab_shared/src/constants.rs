//! # Engine Constants
//!
//! Defaults baked into the engine substrate and the control surface.

// =============================================================================
// TIMING
// =============================================================================

/// Physics updates per simulated second.
pub const DEFAULT_PHYSICS_FPS: u32 = 120;

/// Default simulated time advanced by one `Race::step` call (seconds).
pub const DEFAULT_STEP_SIZE: f32 = 0.1;

// =============================================================================
// ASSETS
// =============================================================================

/// Kart used when a player asks for no kart or an unknown one.
pub const DEFAULT_KART: &str = "tux";

/// Track used when the race config leaves the track empty.
pub const DEFAULT_TRACK: &str = "lighthouse";

// =============================================================================
// RACE
// =============================================================================

/// Goal limit for goal-based modes. Large enough that they never end on goals.
pub const MAX_GOAL: u32 = 1 << 30;

/// Number of buffer sets in each render target's readback ring.
pub const RENDER_BUFFER_COUNT: usize = 2;
