//! # Kart Action
//!
//! The per-step input a script hands to a player kart. Copied into engine
//! control state each step and read back afterwards, so the echoed value is
//! what the engine actually executed (clamped steering, for example).

use serde::{Deserialize, Serialize};

/// One player's input for a single step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Action {
    /// Steering, `-1.0` full left to `1.0` full right.
    pub steer: f32,
    /// Throttle in `[0.0, 1.0]`.
    pub acceleration: f32,
    /// Brake (reverses when stopped).
    pub brake: bool,
    /// Burn nitro if any is left.
    pub nitro: bool,
    /// Skid in the steering direction.
    pub drift: bool,
    /// Ask to be rescued back onto the track.
    pub rescue: bool,
    /// Use the held powerup.
    pub fire: bool,
}

impl Action {
    /// Full throttle, straight ahead.
    pub const FULL_THROTTLE: Self = Self {
        steer: 0.0,
        acceleration: 1.0,
        brake: false,
        nitro: false,
        drift: false,
        rescue: false,
        fire: false,
    };

    /// Throttle only.
    #[must_use]
    pub fn accelerate(acceleration: f32) -> Self {
        Self {
            acceleration,
            ..Self::default()
        }
    }

    /// Returns a copy with the given steering.
    #[must_use]
    pub const fn with_steer(mut self, steer: f32) -> Self {
        self.steer = steer;
        self
    }

    /// Returns a copy with the fire flag set.
    #[must_use]
    pub const fn firing(mut self) -> Self {
        self.fire = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        let action = Action::default();
        assert_eq!(action.steer, 0.0);
        assert_eq!(action.acceleration, 0.0);
        assert!(!action.brake && !action.nitro && !action.drift && !action.rescue && !action.fire);
    }

    #[test]
    fn test_builders() {
        let action = Action::accelerate(0.5).with_steer(-0.25).firing();
        assert_eq!(action.acceleration, 0.5);
        assert_eq!(action.steer, -0.25);
        assert!(action.fire);
    }
}
