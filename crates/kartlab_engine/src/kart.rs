//! # Karts
//!
//! Kart properties (from the built-in catalogue or `*.toml` addons), the
//! per-kart control state written by controllers and scripts, and the kart's
//! simulation state with its ground-plane dynamics.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use kartlab_shared::{Action, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assets::load_dir;
use crate::error::{EngineError, EngineResult};
use crate::items::Powerup;
use crate::physics::{Aabb, BodyId};
use crate::track::{right_of, Track};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Height of the kart origin above the ground.
pub const RIDE_HEIGHT: f32 = 0.5;

/// Seconds between asking for rescue and being put back on the track.
pub const RESCUE_TIME: f32 = 1.0;

/// Seconds a kart stays stunned after a projectile hit.
pub const STUN_TIME: f32 = 1.0;

/// Seconds of boost from a zipper.
pub const ZIPPER_TIME: f32 = 1.0;

/// Lives in three-strikes battles.
pub const BATTLE_LIVES: u8 = 3;

/// Speed factor while off the road.
const OFF_ROAD_FACTOR: f32 = 0.4;

/// Speed factor while zipping or burning nitro.
const BOOST_FACTOR: f32 = 1.3;

/// Turn rate multiplier while skidding.
const SKID_TURN_FACTOR: f32 = 1.4;

/// Deceleration when neither throttle nor brake is applied.
const ROLLING_DRAG: f32 = 5.0;

/// Fraction of top speed reachable in reverse.
const REVERSE_FACTOR: f32 = 0.3;

/// Speed at which steering reaches full authority.
const FULL_STEER_SPEED: f32 = 5.0;

// ============================================================================
// PROPERTIES
// ============================================================================

/// Static characteristics of a kart model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KartProperties {
    /// Identifier used in race configs.
    pub ident: String,
    /// Display name.
    pub name: String,
    /// Top speed on the road.
    pub max_speed: f32,
    /// Acceleration at full throttle.
    pub acceleration: f32,
    /// Braking deceleration.
    pub braking: f32,
    /// Yaw rate at full steer (radians per second).
    pub turn_rate: f32,
    /// Seconds of nitro at race start.
    pub nitro: f32,
    /// Half size of the chassis box.
    pub half_extents: [f32; 3],
}

impl Default for KartProperties {
    fn default() -> Self {
        Self {
            ident: String::new(),
            name: String::new(),
            max_speed: 25.0,
            acceleration: 12.0,
            braking: 20.0,
            turn_rate: 2.2,
            nitro: 2.0,
            half_extents: [0.6, RIDE_HEIGHT, 0.9],
        }
    }
}

impl KartProperties {
    fn builtin(ident: &str, name: &str, max_speed: f32, acceleration: f32, turn_rate: f32) -> Self {
        Self {
            ident: ident.to_string(),
            name: name.to_string(),
            max_speed,
            acceleration,
            turn_rate,
            ..Self::default()
        }
    }

    /// Checks that the kart can be simulated.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidAsset`] describing the first problem.
    pub fn validate(&self) -> EngineResult<()> {
        let positive = [
            self.max_speed,
            self.acceleration,
            self.braking,
            self.turn_rate,
            self.half_extents[0],
            self.half_extents[1],
            self.half_extents[2],
        ];
        if self.ident.is_empty() {
            return Err(EngineError::InvalidAsset("kart with empty identifier".into()));
        }
        if positive.iter().any(|v| !v.is_finite() || *v <= 0.0) || !(self.nitro >= 0.0) {
            return Err(EngineError::InvalidAsset(format!(
                "kart '{}': physical values must be positive",
                self.ident
            )));
        }
        Ok(())
    }

    /// Horizontal collision radius.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.half_extents[0].max(self.half_extents[2])
    }
}

/// The karts that ship with the engine.
#[must_use]
pub fn builtin_karts() -> Vec<KartProperties> {
    vec![
        KartProperties::builtin("tux", "Tux", 25.0, 12.0, 2.2),
        KartProperties::builtin("gnu", "Gnu", 26.0, 11.0, 2.0),
        KartProperties::builtin("nolok", "Nolok", 27.0, 10.0, 1.9),
        KartProperties::builtin("puffy", "Puffy", 28.0, 9.0, 1.8),
        KartProperties::builtin("konqi", "Konqi", 24.0, 13.0, 2.4),
        KartProperties::builtin("adiumy", "Adiumy", 23.0, 14.0, 2.6),
    ]
}

/// Installed karts, keyed by identifier.
#[derive(Clone, Debug, Default)]
pub struct KartPropertiesManager {
    karts: BTreeMap<String, Arc<KartProperties>>,
}

impl KartPropertiesManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager holding the built-in karts.
    ///
    /// # Errors
    ///
    /// Only fails if a built-in kart is broken.
    pub fn with_builtins() -> EngineResult<Self> {
        let mut manager = Self::new();
        for kart in builtin_karts() {
            manager.insert(kart)?;
        }
        Ok(manager)
    }

    /// Installs a kart, replacing one with the same identifier.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidAsset`] if the properties are unusable.
    pub fn insert(&mut self, kart: KartProperties) -> EngineResult<()> {
        kart.validate()?;
        if self.karts.insert(kart.ident.clone(), Arc::new(kart)).is_some() {
            debug!("Kart replaced by addon");
        }
        Ok(())
    }

    /// Loads every `*.toml` descriptor in `dir`. Broken files are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AssetLoad`] if the directory cannot be read.
    pub fn add_search_dir(&mut self, dir: &Path) -> EngineResult<usize> {
        let mut count = 0;
        for (path, kart) in load_dir::<KartProperties>(dir)? {
            match self.insert(kart) {
                Ok(()) => count += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping kart"),
            }
        }
        Ok(count)
    }

    /// Looks up a kart.
    #[must_use]
    pub fn get(&self, ident: &str) -> Option<Arc<KartProperties>> {
        self.karts.get(ident).cloned()
    }

    /// Whether a kart is installed.
    #[must_use]
    pub fn contains(&self, ident: &str) -> bool {
        self.karts.contains_key(ident)
    }

    /// Sorted identifiers of all installed karts.
    #[must_use]
    pub fn identifiers(&self) -> Vec<String> {
        self.karts.keys().cloned().collect()
    }

    /// Number of installed karts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.karts.len()
    }

    /// Whether no karts are installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.karts.is_empty()
    }
}

// ============================================================================
// CONTROLS
// ============================================================================

/// Skid request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SkidControl {
    /// Not skidding.
    #[default]
    None,
    /// Skidding into a left turn.
    Left,
    /// Skidding into a right turn.
    Right,
}

/// What the kart is being asked to do. Setters clamp to the valid range.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KartControl {
    steer: f32,
    accel: f32,
    brake: bool,
    nitro: bool,
    rescue: bool,
    fire: bool,
    skid: SkidControl,
}

/// Clamps to `[lo, hi]`, mapping NaN to zero.
fn clamp_or_zero(value: f32, lo: f32, hi: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(lo, hi)
    }
}

impl KartControl {
    /// Steering in `[-1, 1]`.
    #[inline]
    #[must_use]
    pub const fn steer(&self) -> f32 {
        self.steer
    }

    /// Sets steering, clamped to `[-1, 1]`.
    pub fn set_steer(&mut self, steer: f32) {
        self.steer = clamp_or_zero(steer, -1.0, 1.0);
    }

    /// Throttle in `[0, 1]`.
    #[inline]
    #[must_use]
    pub const fn accel(&self) -> f32 {
        self.accel
    }

    /// Sets throttle, clamped to `[0, 1]`.
    pub fn set_accel(&mut self, accel: f32) {
        self.accel = clamp_or_zero(accel, 0.0, 1.0);
    }

    /// Brake flag.
    #[inline]
    #[must_use]
    pub const fn brake(&self) -> bool {
        self.brake
    }

    /// Sets the brake flag.
    pub fn set_brake(&mut self, brake: bool) {
        self.brake = brake;
    }

    /// Nitro flag.
    #[inline]
    #[must_use]
    pub const fn nitro(&self) -> bool {
        self.nitro
    }

    /// Sets the nitro flag.
    pub fn set_nitro(&mut self, nitro: bool) {
        self.nitro = nitro;
    }

    /// Rescue flag.
    #[inline]
    #[must_use]
    pub const fn rescue(&self) -> bool {
        self.rescue
    }

    /// Sets the rescue flag.
    pub fn set_rescue(&mut self, rescue: bool) {
        self.rescue = rescue;
    }

    /// Fire flag.
    #[inline]
    #[must_use]
    pub const fn fire(&self) -> bool {
        self.fire
    }

    /// Sets the fire flag.
    pub fn set_fire(&mut self, fire: bool) {
        self.fire = fire;
    }

    /// Skid request.
    #[inline]
    #[must_use]
    pub const fn skid(&self) -> SkidControl {
        self.skid
    }

    /// Sets the skid request.
    pub fn set_skid(&mut self, skid: SkidControl) {
        self.skid = skid;
    }

    /// Writes a script action into the controls.
    ///
    /// Drifting skids right for positive steering and left otherwise.
    pub fn apply_action(&mut self, action: &Action) {
        self.set_accel(action.acceleration);
        self.set_brake(action.brake);
        self.set_fire(action.fire);
        self.set_nitro(action.nitro);
        self.set_rescue(action.rescue);
        self.set_steer(action.steer);
        self.set_skid(match (action.drift, action.steer > 0.0) {
            (false, _) => SkidControl::None,
            (true, true) => SkidControl::Right,
            (true, false) => SkidControl::Left,
        });
    }

    /// Reads the controls back as an action.
    #[must_use]
    pub fn action(&self) -> Action {
        Action {
            steer: self.steer,
            acceleration: self.accel,
            brake: self.brake,
            nitro: self.nitro,
            drift: self.skid != SkidControl::None,
            rescue: self.rescue,
            fire: self.fire,
        }
    }

    /// Clears every input.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// KART STATE
// ============================================================================

/// One kart in a running world.
#[derive(Clone, Debug)]
pub struct Kart {
    index: usize,
    properties: Arc<KartProperties>,
    team: u8,
    body: BodyId,
    controls: KartControl,

    grid: (Vec3, f32),
    xyz: Vec3,
    heading: f32,
    speed: f32,

    track_distance: f32,
    overall_distance: f32,
    laps_completed: u32,
    position: usize,
    finish_time: Option<f64>,

    nitro: f32,
    powerup: Option<Powerup>,
    rescue_timer: f32,
    stun_timer: f32,
    zipper_timer: f32,
    skid_time: f32,
    lives: u8,
    eliminated: bool,
}

/// What happened to a kart during one integration step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KartEvents {
    /// A new lap was started (1-based lap number).
    pub new_lap: Option<u32>,
    /// A long skid was released.
    pub skid_bonus: bool,
    /// The kart was put back on the track.
    pub rescued: bool,
}

/// Seconds of skidding needed for a boost on release.
const SKID_BONUS_TIME: f32 = 1.0;

impl Kart {
    /// Places a kart on grid slot `index`.
    #[must_use]
    pub fn new(index: usize, properties: Arc<KartProperties>, team: u8, body: BodyId, track: &Track) -> Self {
        let (position, heading) = track.start_position(index);
        let mut kart = Self {
            index,
            nitro: properties.nitro,
            properties,
            team,
            body,
            controls: KartControl::default(),
            grid: (position, heading),
            xyz: Vec3::ZERO,
            heading: 0.0,
            speed: 0.0,
            track_distance: 0.0,
            overall_distance: 0.0,
            laps_completed: 0,
            position: index + 1,
            finish_time: None,
            powerup: None,
            rescue_timer: 0.0,
            stun_timer: 0.0,
            zipper_timer: 0.0,
            skid_time: 0.0,
            lives: BATTLE_LIVES,
            eliminated: false,
        };
        kart.reset(track);
        kart
    }

    /// Back to the grid with a clean state.
    pub fn reset(&mut self, track: &Track) {
        let (position, heading) = self.grid;
        self.xyz = Vec3::new(position.x, RIDE_HEIGHT, position.z);
        self.heading = heading;
        self.speed = 0.0;
        self.controls.reset();
        let projection = track.project(self.xyz);
        self.track_distance = projection.distance;
        // Grid slots sit behind the line: start with a negative distance.
        self.overall_distance = projection.distance - track.length();
        if self.overall_distance < -track.length() * 0.5 {
            self.overall_distance += track.length();
        }
        self.laps_completed = 0;
        self.position = self.index + 1;
        self.finish_time = None;
        self.nitro = self.properties.nitro;
        self.powerup = None;
        self.rescue_timer = 0.0;
        self.stun_timer = 0.0;
        self.zipper_timer = 0.0;
        self.skid_time = 0.0;
        self.lives = BATTLE_LIVES;
        self.eliminated = false;
    }

    /// World index.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Kart model.
    #[must_use]
    pub fn properties(&self) -> &KartProperties {
        &self.properties
    }

    /// Kart model identifier.
    #[must_use]
    pub fn ident(&self) -> &str {
        &self.properties.ident
    }

    /// Team id.
    #[inline]
    #[must_use]
    pub const fn team(&self) -> u8 {
        self.team
    }

    /// Chassis body.
    #[inline]
    #[must_use]
    pub const fn body(&self) -> BodyId {
        self.body
    }

    /// Control state.
    #[must_use]
    pub fn controls(&self) -> &KartControl {
        &self.controls
    }

    /// Mutable control state.
    pub fn controls_mut(&mut self) -> &mut KartControl {
        &mut self.controls
    }

    /// Kart origin (chassis center).
    #[inline]
    #[must_use]
    pub const fn xyz(&self) -> Vec3 {
        self.xyz
    }

    /// Heading in radians; 0 faces `+z`.
    #[inline]
    #[must_use]
    pub const fn heading(&self) -> f32 {
        self.heading
    }

    /// Forward direction on the ground plane.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        Vec3::from_heading(self.heading)
    }

    /// Signed speed along the heading.
    #[inline]
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Chassis box at the current position.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        chassis_aabb(&self.properties, self.xyz)
    }

    /// Centerline distance of the last projection.
    #[inline]
    #[must_use]
    pub const fn track_distance(&self) -> f32 {
        self.track_distance
    }

    /// Distance driven since the start line, negative on the grid.
    #[inline]
    #[must_use]
    pub const fn overall_distance(&self) -> f32 {
        self.overall_distance
    }

    /// Completed laps.
    #[inline]
    #[must_use]
    pub const fn laps_completed(&self) -> u32 {
        self.laps_completed
    }

    /// Race position, 1-based.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Race time at which the kart finished.
    #[inline]
    #[must_use]
    pub const fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    /// Whether the kart finished.
    #[inline]
    #[must_use]
    pub const fn has_finished(&self) -> bool {
        self.finish_time.is_some()
    }

    pub(crate) fn finish(&mut self, time: f64) {
        if self.finish_time.is_none() {
            self.finish_time = Some(time);
        }
    }

    /// Seconds of nitro left.
    #[inline]
    #[must_use]
    pub const fn nitro(&self) -> f32 {
        self.nitro
    }

    /// Held powerup.
    #[inline]
    #[must_use]
    pub const fn powerup(&self) -> Option<Powerup> {
        self.powerup
    }

    pub(crate) fn set_powerup(&mut self, powerup: Option<Powerup>) {
        self.powerup = powerup;
    }

    /// Battle lives left.
    #[inline]
    #[must_use]
    pub const fn lives(&self) -> u8 {
        self.lives
    }

    /// Whether the kart was knocked out of a battle.
    #[inline]
    #[must_use]
    pub const fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    /// Whether the kart is waiting to be rescued.
    #[inline]
    #[must_use]
    pub fn is_rescuing(&self) -> bool {
        self.rescue_timer > 0.0
    }

    /// Whether the kart is stunned by a hit.
    #[inline]
    #[must_use]
    pub fn is_stunned(&self) -> bool {
        self.stun_timer > 0.0
    }

    /// Starts a zipper boost.
    pub fn zip(&mut self) {
        self.zipper_timer = ZIPPER_TIME;
        self.speed = self.speed.max(self.properties.max_speed);
    }

    /// Applies a projectile hit. Returns true if this knocked the kart out.
    pub fn hit(&mut self, battle: bool) -> bool {
        self.stun_timer = STUN_TIME;
        self.speed = 0.0;
        if battle && !self.eliminated {
            self.lives = self.lives.saturating_sub(1);
            if self.lives == 0 {
                self.eliminated = true;
                return true;
            }
        }
        false
    }

    /// Stops the kart at `xyz` after hitting something solid.
    pub fn crash_back(&mut self, xyz: Vec3) {
        self.xyz = xyz;
        self.speed = 0.0;
    }

    /// Advances the kart by `dt` seconds. Collisions are resolved by the
    /// caller, which may move the kart back with [`Kart::crash_back`].
    pub fn integrate(&mut self, dt: f32, track: &Track) -> KartEvents {
        let mut events = KartEvents::default();

        if self.eliminated {
            self.speed = 0.0;
            return events;
        }

        if self.rescue_timer > 0.0 {
            self.rescue_timer -= dt;
            if self.rescue_timer <= 0.0 {
                self.rescue_timer = 0.0;
                self.rescue(track);
                events.rescued = true;
            }
            return events;
        }
        if self.controls.rescue {
            self.rescue_timer = RESCUE_TIME;
            self.speed = 0.0;
            return events;
        }

        if self.stun_timer > 0.0 {
            self.stun_timer = (self.stun_timer - dt).max(0.0);
            self.speed = 0.0;
            return events;
        }

        let props = &self.properties;
        let on_road = track.is_on_road(self.xyz);
        let mut max_speed = props.max_speed;
        let mut accel = props.acceleration;
        if !on_road {
            max_speed *= OFF_ROAD_FACTOR;
        }
        if self.zipper_timer > 0.0 {
            self.zipper_timer = (self.zipper_timer - dt).max(0.0);
            max_speed *= BOOST_FACTOR;
        }
        if self.controls.nitro && self.nitro > 0.0 {
            self.nitro = (self.nitro - dt).max(0.0);
            max_speed *= BOOST_FACTOR;
            accel *= 2.0;
        }

        if self.controls.brake {
            if self.speed > 0.0 {
                self.speed = (self.speed - props.braking * dt).max(0.0);
            } else {
                self.speed = (self.speed - accel * 0.5 * dt).max(-max_speed * REVERSE_FACTOR);
            }
        } else if self.controls.accel > 0.0 {
            self.speed += accel * self.controls.accel * dt;
        } else if self.speed > 0.0 {
            self.speed = (self.speed - ROLLING_DRAG * dt).max(0.0);
        } else {
            self.speed = (self.speed + ROLLING_DRAG * dt).min(0.0);
        }
        if self.speed > max_speed {
            // Off-road and boost endings bleed speed instead of snapping.
            self.speed = (self.speed - props.braking * dt).max(max_speed);
        }

        let authority = (self.speed / FULL_STEER_SPEED).clamp(-1.0, 1.0);
        let skidding = self.controls.skid != SkidControl::None;
        let skid_factor = if skidding { SKID_TURN_FACTOR } else { 1.0 };
        self.heading = kartlab_shared::math::wrap_angle(
            self.heading + self.controls.steer * props.turn_rate * authority * skid_factor * dt,
        );

        if skidding && self.speed > 0.0 {
            self.skid_time += dt;
        } else {
            if self.skid_time >= SKID_BONUS_TIME {
                self.zipper_timer = self.zipper_timer.max(ZIPPER_TIME * 0.5);
                events.skid_bonus = true;
            }
            self.skid_time = 0.0;
        }

        self.xyz += Vec3::from_heading(self.heading) * (self.speed * dt);
        self.xyz.y = RIDE_HEIGHT;
        events
    }

    /// Puts the kart back on the centerline, facing the driving direction.
    pub fn rescue(&mut self, track: &Track) {
        let distance = track.project(self.xyz).distance;
        let point = track.point_at(distance);
        self.xyz = Vec3::new(point.x, RIDE_HEIGHT, point.z);
        self.heading = track.direction_at(distance).heading();
        self.speed = 0.0;
        self.controls.set_rescue(false);
    }

    /// Updates lap progress from the current position. Returns the 1-based
    /// number of a lap that just started, if any.
    pub fn update_progress(&mut self, track: &Track) -> Option<u32> {
        let length = track.length();
        let distance = track.project(self.xyz).distance;
        let mut delta = distance - self.track_distance;
        if delta > length * 0.5 {
            delta -= length;
        } else if delta < -length * 0.5 {
            delta += length;
        }
        self.track_distance = distance;
        self.overall_distance += delta;

        let laps = if self.overall_distance < 0.0 {
            0
        } else {
            (self.overall_distance / length) as u32
        };
        if laps > self.laps_completed {
            self.laps_completed = laps;
            return Some(laps + 1);
        }
        None
    }

    /// A point beside the kart, used to drop things behind or ahead of it.
    #[must_use]
    pub fn offset_point(&self, forward: f32, right: f32) -> Vec3 {
        let dir = self.forward();
        self.xyz + dir * forward + right_of(dir) * right
    }
}

/// Chassis box of a kart model centered at `xyz`.
#[must_use]
pub fn chassis_aabb(properties: &KartProperties, xyz: Vec3) -> Aabb {
    let r = properties.radius();
    Aabb::from_center(xyz, Vec3::new(r, properties.half_extents[1], r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackManager;

    fn track() -> Arc<Track> {
        TrackManager::with_builtins().unwrap().get("lighthouse").unwrap()
    }

    /// Start line in the middle of a long straight along `+z`.
    fn straight() -> Track {
        Track::from_def(crate::track::TrackDef {
            ident: "straight".into(),
            name: String::new(),
            width: 8.0,
            centerline: vec![[0.0, 0.0], [0.0, 50.0], [30.0, 50.0], [30.0, -50.0], [0.0, -50.0]],
            objects: Vec::new(),
            item_boxes: Vec::new(),
        })
        .unwrap()
    }

    fn tux() -> Arc<KartProperties> {
        KartPropertiesManager::with_builtins().unwrap().get("tux").unwrap()
    }

    #[test]
    fn test_control_clamping() {
        let mut controls = KartControl::default();
        controls.set_steer(3.0);
        controls.set_accel(-1.0);
        assert_eq!(controls.steer(), 1.0);
        assert_eq!(controls.accel(), 0.0);
        controls.set_steer(f32::NAN);
        assert_eq!(controls.steer(), 0.0);
    }

    #[test]
    fn test_action_round_trip_clamps() {
        let mut controls = KartControl::default();
        let action = Action {
            steer: -2.5,
            acceleration: 1.5,
            drift: true,
            fire: true,
            ..Action::default()
        };
        controls.apply_action(&action);
        assert_eq!(controls.skid(), SkidControl::Left);

        let echoed = controls.action();
        assert_eq!(echoed.steer, -1.0);
        assert_eq!(echoed.acceleration, 1.0);
        assert!(echoed.drift && echoed.fire);
    }

    #[test]
    fn test_drift_direction_follows_steer() {
        let mut controls = KartControl::default();
        controls.apply_action(&Action {
            steer: 0.5,
            drift: true,
            ..Action::default()
        });
        assert_eq!(controls.skid(), SkidControl::Right);
        controls.apply_action(&Action {
            steer: 0.5,
            ..Action::default()
        });
        assert_eq!(controls.skid(), SkidControl::None);
    }

    #[test]
    fn test_kart_starts_behind_line() {
        let track = track();
        let kart = Kart::new(0, tux(), 0, BodyId(0), &track);
        assert!(kart.overall_distance() < 0.0);
        assert!(kart.overall_distance() > -10.0);
        assert_eq!(kart.xyz().y, RIDE_HEIGHT);
        assert_eq!(kart.position(), 1);
    }

    #[test]
    fn test_throttle_accelerates_and_crosses_line() {
        let track = straight();
        let mut kart = Kart::new(0, tux(), 0, BodyId(0), &track);
        kart.controls_mut().set_accel(1.0);

        let mut new_lap = None;
        for _ in 0..240 {
            kart.integrate(1.0 / 120.0, &track);
            if let Some(lap) = kart.update_progress(&track) {
                new_lap = Some(lap);
            }
        }
        assert!(kart.speed() > 10.0);
        assert!(kart.overall_distance() > 0.0);
        // Crossing the start line does not complete a lap.
        assert_eq!(kart.laps_completed(), 0);
        assert_eq!(new_lap, None);
    }

    #[test]
    fn test_rescue_returns_to_centerline() {
        let track = track();
        let mut kart = Kart::new(0, tux(), 0, BodyId(0), &track);
        kart.controls_mut().set_rescue(true);
        kart.integrate(0.1, &track);
        assert!(kart.is_rescuing());

        let mut rescued = false;
        for _ in 0..20 {
            rescued |= kart.integrate(0.1, &track).rescued;
        }
        assert!(rescued);
        assert!(!kart.is_rescuing());
        assert!(track.project(kart.xyz()).lateral.abs() < 1e-3);
        assert!(!kart.controls().rescue());
    }

    #[test]
    fn test_battle_hits_eliminate() {
        let track = track();
        let mut kart = Kart::new(0, tux(), 0, BodyId(0), &track);
        assert!(!kart.hit(true));
        assert!(!kart.hit(true));
        assert!(kart.hit(true));
        assert!(kart.is_eliminated());
        assert_eq!(kart.lives(), 0);
        // Race hits never cost lives.
        let mut other = Kart::new(1, tux(), 0, BodyId(1), &track);
        assert!(!other.hit(false));
        assert_eq!(other.lives(), BATTLE_LIVES);
    }

    #[test]
    fn test_builtin_karts() {
        let manager = KartPropertiesManager::with_builtins().unwrap();
        assert_eq!(manager.len(), 6);
        assert_eq!(manager.identifiers()[0], "adiumy");
        let mut bad = KartProperties::default();
        bad.ident = "ghost".into();
        bad.max_speed = 0.0;
        assert!(KartPropertiesManager::new().insert(bad).is_err());
    }
}
