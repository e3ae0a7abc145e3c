//! # Kart Controllers
//!
//! A controller decides what a kart does each tick by writing its
//! [`KartControl`]. The world calls back into controllers when something
//! happens to their kart (new lap, crash, item pickup, finish).
//!
//! - [`PlayerController`]: controls come from outside (script actions).
//! - [`AiController`]: pure-pursuit driving along the track centerline.
//! - [`LocalPlayer`]: wraps any controller and reports it as a local player,
//!   so an AI can drive a player slot (camera, render target, finish count).

use std::fmt::Debug;

use kartlab_shared::{math::wrap_angle, Difficulty, Vec3};

use crate::items::Powerup;
use crate::kart::{KartControl, SkidControl};
use crate::track::Track;

// ============================================================================
// CALLBACK TYPES
// ============================================================================

/// What a kart crashed into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrashTarget {
    /// Another kart, by world index.
    Kart(usize),
    /// A static or animated track object.
    Object,
}

/// Discrete input events, as sent by a keyboard or gamepad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerAction {
    /// Steer left; value is strength in `0..=32768`.
    SteerLeft,
    /// Steer right; value is strength in `0..=32768`.
    SteerRight,
    /// Throttle; value is strength in `0..=32768`.
    Accel,
    /// Brake while value is non-zero.
    Brake,
    /// Nitro while value is non-zero.
    Nitro,
    /// Skid while value is non-zero.
    Drift,
    /// Rescue while value is non-zero.
    Rescue,
    /// Fire while value is non-zero.
    Fire,
}

/// Full strength of an analog [`PlayerAction`] value.
pub const ACTION_MAX_VALUE: i32 = 32768;

/// What a controller can see of its kart.
#[derive(Clone, Copy, Debug)]
pub struct KartView<'a> {
    /// Kart origin.
    pub xyz: Vec3,
    /// Heading in radians.
    pub heading: f32,
    /// Signed speed.
    pub speed: f32,
    /// Held powerup.
    pub powerup: Option<Powerup>,
    /// Whether the kart already finished.
    pub finished: bool,
    /// The track being driven.
    pub track: &'a Track,
}

// ============================================================================
// CONTROLLER TRAIT
// ============================================================================

/// Drives one kart.
pub trait KartController: Debug + Send {
    /// Called when the race is (re)started.
    fn reset(&mut self);

    /// Called every tick before the kart moves.
    fn update(&mut self, kart: &KartView<'_>, controls: &mut KartControl, dt: f32);

    /// The kart drove over a zipper.
    fn handle_zipper(&mut self) {}

    /// The kart picked up an item box.
    fn collected_item(&mut self, _powerup: Option<Powerup>) {}

    /// The kart crashed into something.
    fn crashed(&mut self, _target: CrashTarget) {}

    /// The kart's race position changed (1-based).
    fn set_position(&mut self, _position: usize) {}

    /// Whether the kart gets a camera and counts as a local player.
    fn is_local_player(&self) -> bool;

    /// Whether the kart is driven by a player rather than the AI.
    fn is_player(&self) -> bool;

    /// Whether slipstream bonuses are disabled for this kart.
    fn disable_slipstream_bonus(&self) -> bool {
        false
    }

    /// A discrete input event. Returns true if the controller consumed it.
    /// With `dry_run`, only reports whether it would be consumed.
    fn action(&mut self, controls: &mut KartControl, action: PlayerAction, value: i32, dry_run: bool) -> bool;

    /// A new lap started (1-based).
    fn new_lap(&mut self, _lap: u32) {}

    /// A long skid was released into a boost.
    fn skid_bonus_triggered(&mut self) {}

    /// The kart finished at race time `time`.
    fn finished_race(&mut self, _time: f64) {}

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

// ============================================================================
// PLAYER CONTROLLER
// ============================================================================

/// Leaves the controls to whoever writes them from outside.
#[derive(Clone, Debug, Default)]
pub struct PlayerController {
    position: usize,
    laps_started: u32,
    finish_time: Option<f64>,
}

impl PlayerController {
    /// Creates a player controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last race position reported by the world.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Last lap started (1-based); zero until the first lap is completed.
    #[must_use]
    pub const fn lap(&self) -> u32 {
        self.laps_started
    }

    /// Finish time, once finished.
    #[must_use]
    pub const fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }
}

impl KartController for PlayerController {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn update(&mut self, _kart: &KartView<'_>, _controls: &mut KartControl, _dt: f32) {}

    fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    fn is_local_player(&self) -> bool {
        true
    }

    fn is_player(&self) -> bool {
        true
    }

    fn action(&mut self, controls: &mut KartControl, action: PlayerAction, value: i32, dry_run: bool) -> bool {
        if dry_run {
            return true;
        }
        let strength = value.clamp(0, ACTION_MAX_VALUE) as f32 / ACTION_MAX_VALUE as f32;
        let on = value != 0;
        match action {
            PlayerAction::SteerLeft => controls.set_steer(-strength),
            PlayerAction::SteerRight => controls.set_steer(strength),
            PlayerAction::Accel => controls.set_accel(strength),
            PlayerAction::Brake => controls.set_brake(on),
            PlayerAction::Nitro => controls.set_nitro(on),
            PlayerAction::Drift => controls.set_skid(match (on, controls.steer() > 0.0) {
                (false, _) => SkidControl::None,
                (true, true) => SkidControl::Right,
                (true, false) => SkidControl::Left,
            }),
            PlayerAction::Rescue => controls.set_rescue(on),
            PlayerAction::Fire => controls.set_fire(on),
        }
        true
    }

    fn new_lap(&mut self, lap: u32) {
        self.laps_started = lap;
    }

    fn finished_race(&mut self, time: f64) {
        self.finish_time = Some(time);
    }

    fn name(&self) -> &'static str {
        "player"
    }
}

// ============================================================================
// AI CONTROLLER
// ============================================================================

/// Minimum look-ahead along the centerline.
const AI_LOOKAHEAD: f32 = 6.0;

/// Extra look-ahead per unit of speed.
const AI_LOOKAHEAD_PER_SPEED: f32 = 0.4;

/// Steering gain on the heading error.
const AI_STEER_GAIN: f32 = 2.5;

/// Heading error above which the AI lifts off the throttle.
const AI_COAST_ANGLE: f32 = 0.35;

/// Seconds nearly stopped before the AI asks for a rescue.
const AI_STUCK_TIME: f32 = 2.0;

/// Seconds the AI holds a powerup before using it.
const AI_FIRE_DELAY: f32 = 1.0;

/// Follows the centerline at a difficulty-scaled throttle.
#[derive(Clone, Debug)]
pub struct AiController {
    difficulty: Difficulty,
    stuck_time: f32,
    holding_time: f32,
    lap: u32,
    crashes: u32,
    position: usize,
}

impl AiController {
    /// Creates an AI for `difficulty`.
    #[must_use]
    pub const fn new(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            stuck_time: 0.0,
            holding_time: 0.0,
            lap: 0,
            crashes: 0,
            position: 0,
        }
    }

    /// Difficulty tier.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Crashes since the last reset.
    #[must_use]
    pub const fn crashes(&self) -> u32 {
        self.crashes
    }

    /// Lap the AI believes it is on.
    #[must_use]
    pub const fn lap(&self) -> u32 {
        self.lap
    }

    /// Last race position reported by the world.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }
}

impl KartController for AiController {
    fn reset(&mut self) {
        *self = Self::new(self.difficulty);
    }

    fn update(&mut self, kart: &KartView<'_>, controls: &mut KartControl, dt: f32) {
        let track = kart.track;
        let here = track.project(kart.xyz).distance;
        let lookahead = AI_LOOKAHEAD + kart.speed.max(0.0) * AI_LOOKAHEAD_PER_SPEED;
        let target = track.point_at(here + lookahead);
        let error = wrap_angle((target - kart.xyz).heading() - kart.heading);

        controls.set_steer(error * AI_STEER_GAIN);
        controls.set_skid(SkidControl::None);
        controls.set_brake(false);
        controls.set_nitro(false);
        if error.abs() > AI_COAST_ANGLE && kart.speed > 8.0 {
            controls.set_accel(0.0);
        } else {
            controls.set_accel(self.difficulty.ai_throttle());
        }

        if kart.speed.abs() < 0.5 {
            self.stuck_time += dt;
        } else {
            self.stuck_time = 0.0;
        }
        controls.set_rescue(self.stuck_time > AI_STUCK_TIME);
        if controls.rescue() {
            self.stuck_time = 0.0;
        }

        if kart.powerup.is_some() {
            self.holding_time += dt;
        } else {
            self.holding_time = 0.0;
        }
        controls.set_fire(kart.powerup.is_some() && self.holding_time >= AI_FIRE_DELAY);
    }

    fn crashed(&mut self, _target: CrashTarget) {
        self.crashes += 1;
    }

    fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    fn is_local_player(&self) -> bool {
        false
    }

    fn is_player(&self) -> bool {
        false
    }

    fn action(&mut self, _controls: &mut KartControl, _action: PlayerAction, _value: i32, _dry_run: bool) -> bool {
        // Input events are meant for players.
        false
    }

    fn new_lap(&mut self, lap: u32) {
        self.lap = lap;
    }

    fn name(&self) -> &'static str {
        "ai"
    }
}

// ============================================================================
// LOCAL PLAYER DECORATOR
// ============================================================================

/// Forwards every callback to `inner` but reports a local player.
#[derive(Clone, Debug)]
pub struct LocalPlayer<C: KartController> {
    inner: C,
}

impl<C: KartController> LocalPlayer<C> {
    /// Wraps `inner`.
    #[must_use]
    pub const fn new(inner: C) -> Self {
        Self { inner }
    }

    /// The wrapped controller.
    #[must_use]
    pub const fn inner(&self) -> &C {
        &self.inner
    }

    /// Unwraps the controller.
    #[must_use]
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: KartController> KartController for LocalPlayer<C> {
    fn reset(&mut self) {
        self.inner.reset();
    }

    fn update(&mut self, kart: &KartView<'_>, controls: &mut KartControl, dt: f32) {
        self.inner.update(kart, controls, dt);
    }

    fn handle_zipper(&mut self) {
        self.inner.handle_zipper();
    }

    fn collected_item(&mut self, powerup: Option<Powerup>) {
        self.inner.collected_item(powerup);
    }

    fn crashed(&mut self, target: CrashTarget) {
        self.inner.crashed(target);
    }

    fn set_position(&mut self, position: usize) {
        self.inner.set_position(position);
    }

    fn is_local_player(&self) -> bool {
        true
    }

    fn is_player(&self) -> bool {
        true
    }

    fn disable_slipstream_bonus(&self) -> bool {
        self.inner.disable_slipstream_bonus()
    }

    fn action(&mut self, controls: &mut KartControl, action: PlayerAction, value: i32, dry_run: bool) -> bool {
        self.inner.action(controls, action, value, dry_run)
    }

    fn new_lap(&mut self, lap: u32) {
        self.inner.new_lap(lap);
    }

    fn skid_bonus_triggered(&mut self) {
        self.inner.skid_bonus_triggered();
    }

    fn finished_race(&mut self, time: f64) {
        self.inner.finished_race(time);
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackManager;

    fn view(track: &Track, xyz: Vec3, heading: f32, speed: f32) -> KartView<'_> {
        KartView {
            xyz,
            heading,
            speed,
            powerup: None,
            finished: false,
            track,
        }
    }

    #[test]
    fn test_ai_steers_towards_centerline() {
        let track = TrackManager::with_builtins().unwrap().get("lighthouse").unwrap();
        let mut ai = AiController::new(Difficulty::Expert);
        let mut controls = KartControl::default();

        let start = track.point_at(0.0);
        let heading = track.direction_at(0.0).heading();
        // Facing straight along the road: throttle, mild steering.
        ai.update(&view(&track, start, heading, 10.0), &mut controls, 0.01);
        assert!((controls.accel() - 0.9).abs() < 1e-6);
        assert!(controls.steer().abs() < 0.8);

        // Turned far to the left: steer right.
        ai.update(&view(&track, start, heading - 1.0, 10.0), &mut controls, 0.01);
        assert!(controls.steer() > 0.9);
    }

    #[test]
    fn test_ai_rescues_when_stuck() {
        let track = TrackManager::with_builtins().unwrap().get("lighthouse").unwrap();
        let mut ai = AiController::new(Difficulty::Novice);
        let mut controls = KartControl::default();
        let here = view(&track, track.point_at(0.0), 0.0, 0.0);
        let mut rescued = false;
        for _ in 0..30 {
            ai.update(&here, &mut controls, 0.1);
            rescued |= controls.rescue();
        }
        assert!(rescued);
    }

    #[test]
    fn test_player_actions() {
        let mut player = PlayerController::new();
        let mut controls = KartControl::default();
        assert!(player.action(&mut controls, PlayerAction::SteerLeft, ACTION_MAX_VALUE, false));
        assert!(player.action(&mut controls, PlayerAction::Accel, ACTION_MAX_VALUE / 2, false));
        assert!(player.action(&mut controls, PlayerAction::Fire, 1, false));
        assert_eq!(controls.steer(), -1.0);
        assert_eq!(controls.accel(), 0.5);
        assert!(controls.fire());

        let before = controls;
        assert!(player.action(&mut controls, PlayerAction::Brake, 1, true));
        assert_eq!(controls, before);
    }

    #[test]
    fn test_local_player_decorator_forwards() {
        let mut wrapped = LocalPlayer::new(AiController::new(Difficulty::Intermediate));
        assert!(wrapped.is_local_player());
        assert!(wrapped.is_player());
        assert_eq!(wrapped.name(), "ai");

        wrapped.crashed(CrashTarget::Object);
        wrapped.new_lap(2);
        assert_eq!(wrapped.inner().crashes(), 1);
        assert_eq!(wrapped.inner().lap(), 2);

        let mut controls = KartControl::default();
        assert!(!wrapped.action(&mut controls, PlayerAction::Accel, 1, false));

        wrapped.reset();
        assert_eq!(wrapped.into_inner().crashes(), 0);
    }

    #[test]
    fn test_plain_ai_is_not_a_player() {
        let ai = AiController::new(Difficulty::SuperTux);
        assert!(!ai.is_local_player());
        assert!(!ai.is_player());
        assert!(!ai.disable_slipstream_bonus());
    }
}
