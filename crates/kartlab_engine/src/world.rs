//! # World
//!
//! One running race: karts, their controllers, track objects, item boxes and
//! projectiles, all registered in a [`PhysicsWorld`].
//!
//! ## Tick order
//!
//! ```text
//! update_world(1):
//!   1. animate track objects
//!   2. per kart: controller -> use powerup -> integrate -> collide
//!      -> lap progress -> item pickup -> finish check
//!   3. move projectiles, apply hits
//!   4. battle elimination, race positions
//! update_time(1):
//!   advance the race clock by one tick
//! ```
//!
//! Karts are processed in index order and nothing iterates a hash map, so
//! the same setup, seed and inputs always produce the same race.

use std::sync::Arc;

use kartlab_shared::{Difficulty, RaceMode, Vec3};
use tracing::{debug, info};

use crate::controller::{AiController, CrashTarget, KartController, KartView, PlayerAction, PlayerController};
use crate::error::{EngineError, EngineResult};
use crate::items::{ItemManager, PowerupManager, Powerup, Projectile};
use crate::kart::{Kart, KartProperties, RIDE_HEIGHT};
use crate::physics::{Aabb, BodyId, BodyKind, PhysicsWorld};
use crate::time::TickClock;
use crate::track::{AnimationDef, Track};

/// One kart on the grid.
#[derive(Clone, Debug)]
pub struct KartEntry {
    /// Kart model.
    pub properties: Arc<KartProperties>,
    /// Team id.
    pub team: u8,
}

/// Everything needed to build a world.
#[derive(Clone, Debug)]
pub struct WorldSetup {
    /// Track, already reversed if requested.
    pub track: Arc<Track>,
    /// Race rules.
    pub mode: RaceMode,
    /// AI difficulty.
    pub difficulty: Difficulty,
    /// Laps for lap races.
    pub laps: u32,
    /// Goal limit for goal-based modes.
    pub max_goal: u32,
    /// Tick clock.
    pub clock: TickClock,
    /// Grid, players first.
    pub karts: Vec<KartEntry>,
    /// How many of the first karts are players.
    pub num_players: usize,
}

#[derive(Clone, Debug)]
struct TrackObject {
    body: BodyId,
    rest: Vec3,
    half_extents: Vec3,
    animation: Option<AnimationDef>,
}

impl TrackObject {
    fn aabb_at(&self, time: f64) -> Aabb {
        let center = match self.animation {
            Some(animation) => {
                let phase = (time / f64::from(animation.period)).fract() as f32 * std::f32::consts::TAU;
                self.rest + Vec3::from_array(animation.amplitude) * phase.sin()
            }
            None => self.rest,
        };
        Aabb::from_center(center, self.half_extents)
    }
}

/// A running race.
#[derive(Debug)]
pub struct World {
    track: Arc<Track>,
    mode: RaceMode,
    difficulty: Difficulty,
    laps: u32,
    max_goal: u32,
    clock: TickClock,

    physics: PhysicsWorld,
    objects: Vec<TrackObject>,
    karts: Vec<Kart>,
    controllers: Vec<Box<dyn KartController>>,
    num_players: usize,

    items: ItemManager,
    powerups: PowerupManager,
    projectiles: Vec<Projectile>,

    time: f64,
    ticks: u64,
    finished_players: usize,
}

impl World {
    /// Builds the world and puts every kart on the grid.
    ///
    /// Player slots get a [`PlayerController`], all other karts an
    /// [`AiController`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidKartIndex`] if there are fewer karts
    /// than players or no karts at all.
    pub fn new(setup: WorldSetup) -> EngineResult<Self> {
        if setup.karts.is_empty() || setup.num_players > setup.karts.len() {
            return Err(EngineError::InvalidKartIndex {
                index: setup.num_players,
                count: setup.karts.len(),
            });
        }

        let track = setup.track;
        let mut physics = PhysicsWorld::new();
        physics.add_body(BodyKind::Track, track.ground_aabb());

        let objects: Vec<TrackObject> = track
            .objects()
            .iter()
            .map(|def| {
                let kind = if def.animation.is_some() {
                    BodyKind::Animation
                } else {
                    BodyKind::PhysicalObject
                };
                let mut object = TrackObject {
                    body: BodyId(0),
                    rest: Vec3::from_array(def.position),
                    half_extents: Vec3::from_array(def.half_extents),
                    animation: def.animation,
                };
                object.body = physics.add_body(kind, object.aabb_at(0.0));
                object
            })
            .collect();

        let karts: Vec<Kart> = setup
            .karts
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let body = physics.add_body(BodyKind::Kart, Aabb::new(Vec3::ZERO, Vec3::ZERO));
                let kart = Kart::new(index, entry.properties, entry.team, body, &track);
                physics.set_aabb(body, kart.aabb());
                kart
            })
            .collect();

        let controllers: Vec<Box<dyn KartController>> = (0..karts.len())
            .map(|index| -> Box<dyn KartController> {
                if index < setup.num_players {
                    Box::new(PlayerController::new())
                } else {
                    Box::new(AiController::new(setup.difficulty))
                }
            })
            .collect();

        let item_positions: Vec<Vec3> = if setup.mode.has_items() {
            track
                .item_boxes()
                .iter()
                .map(|b| {
                    let p = track.item_box_position(b);
                    Vec3::new(p.x, RIDE_HEIGHT, p.z)
                })
                .collect()
        } else {
            Vec::new()
        };

        info!(
            track = track.ident(),
            mode = ?setup.mode,
            karts = karts.len(),
            players = setup.num_players,
            "World created"
        );

        Ok(Self {
            track,
            mode: setup.mode,
            difficulty: setup.difficulty,
            laps: setup.laps,
            max_goal: setup.max_goal,
            clock: setup.clock,
            physics,
            objects,
            karts,
            controllers,
            num_players: setup.num_players,
            items: ItemManager::new(item_positions, 0),
            powerups: PowerupManager::new(0),
            projectiles: Vec::new(),
            time: 0.0,
            ticks: 0,
            finished_players: 0,
        })
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Track being raced.
    #[must_use]
    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Race rules.
    #[must_use]
    pub const fn mode(&self) -> RaceMode {
        self.mode
    }

    /// AI difficulty.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Laps for lap races.
    #[must_use]
    pub const fn laps(&self) -> u32 {
        self.laps
    }

    /// Goal limit for goal-based modes.
    #[must_use]
    pub const fn max_goal(&self) -> u32 {
        self.max_goal
    }

    /// Tick clock.
    #[must_use]
    pub const fn clock(&self) -> TickClock {
        self.clock
    }

    /// Race time in seconds.
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Ticks since the start.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Collision world.
    #[must_use]
    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// All karts, players first.
    #[must_use]
    pub fn karts(&self) -> &[Kart] {
        &self.karts
    }

    /// Kart by world index.
    #[must_use]
    pub fn kart(&self, index: usize) -> Option<&Kart> {
        self.karts.get(index)
    }

    /// Number of karts.
    #[must_use]
    pub fn num_karts(&self) -> usize {
        self.karts.len()
    }

    /// Number of player karts.
    #[must_use]
    pub const fn num_players(&self) -> usize {
        self.num_players
    }

    /// Player karts that finished.
    #[must_use]
    pub const fn finished_players(&self) -> usize {
        self.finished_players
    }

    /// Whether every player finished.
    #[must_use]
    pub const fn is_race_over(&self) -> bool {
        self.finished_players >= self.num_players
    }

    /// Item boxes.
    #[must_use]
    pub fn items(&self) -> &ItemManager {
        &self.items
    }

    /// Live projectiles.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    fn check_player(&self, player: usize) -> EngineResult<()> {
        if player < self.num_players {
            Ok(())
        } else {
            Err(EngineError::InvalidKartIndex {
                index: player,
                count: self.num_players,
            })
        }
    }

    /// Kart of player `player`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidKartIndex`] for an unknown player.
    pub fn player_kart(&self, player: usize) -> EngineResult<&Kart> {
        self.check_player(player)?;
        Ok(&self.karts[player])
    }

    /// Mutable kart of player `player`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidKartIndex`] for an unknown player.
    pub fn player_kart_mut(&mut self, player: usize) -> EngineResult<&mut Kart> {
        self.check_player(player)?;
        Ok(&mut self.karts[player])
    }

    /// Controller of kart `index`.
    #[must_use]
    pub fn controller(&self, index: usize) -> Option<&dyn KartController> {
        self.controllers.get(index).map(AsRef::as_ref)
    }

    /// Replaces the controller of kart `index`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidKartIndex`] for an unknown kart.
    pub fn set_controller(&mut self, index: usize, controller: Box<dyn KartController>) -> EngineResult<()> {
        let count = self.controllers.len();
        let slot = self
            .controllers
            .get_mut(index)
            .ok_or(EngineError::InvalidKartIndex { index, count })?;
        debug!(kart = index, controller = controller.name(), "Controller replaced");
        *slot = controller;
        Ok(())
    }

    /// Sends a discrete input event to player `player`'s controller.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidKartIndex`] for an unknown player.
    pub fn player_action(&mut self, player: usize, action: PlayerAction, value: i32) -> EngineResult<bool> {
        self.check_player(player)?;
        let controls = self.karts[player].controls_mut();
        Ok(self.controllers[player].action(controls, action, value, false))
    }

    // ========================================================================
    // SIMULATION
    // ========================================================================

    /// Runs `ticks` physics ticks. The race clock is advanced separately by
    /// [`World::update_time`].
    pub fn update_world(&mut self, ticks: u32) {
        let dt = self.clock.tick_duration() as f32;
        for _ in 0..ticks {
            self.tick(dt);
        }
    }

    /// Advances the race clock by `ticks`.
    pub fn update_time(&mut self, ticks: u32) {
        self.time += self.clock.ticks_to_time(ticks);
        self.ticks += u64::from(ticks);
    }

    fn tick(&mut self, dt: f32) {
        let now = self.time + f64::from(dt);

        for object in &self.objects {
            if object.animation.is_some() {
                self.physics.set_aabb(object.body, object.aabb_at(now));
            }
        }
        self.items.update(dt);

        for index in 0..self.karts.len() {
            self.update_kart(index, dt, now);
        }

        self.update_projectiles(dt, now);

        if self.mode == RaceMode::ThreeStrikes && self.karts.len() > 1 {
            let alive = self.karts.iter().filter(|k| !k.is_eliminated()).count();
            if alive <= 1 {
                for index in 0..self.karts.len() {
                    self.finish_kart(index, now);
                }
            }
        }

        self.update_positions();
    }

    fn update_kart(&mut self, index: usize, dt: f32, now: f64) {
        let kart = &mut self.karts[index];
        let controller = &mut self.controllers[index];

        let view = KartView {
            xyz: kart.xyz(),
            heading: kart.heading(),
            speed: kart.speed(),
            powerup: kart.powerup(),
            finished: kart.has_finished(),
            track: &self.track,
        };
        controller.update(&view, kart.controls_mut(), dt);

        if kart.controls().fire() && !kart.is_stunned() && !kart.is_rescuing() && !kart.is_eliminated() {
            if let Some(powerup) = kart.powerup() {
                kart.set_powerup(None);
                match powerup.projectile() {
                    Some(kind) => {
                        let forward = kart.properties().radius() + kind.half_extent() + 0.5;
                        let along = if kind.speed() > 0.0 { forward } else { -forward };
                        let position = kart.offset_point(along, 0.0);
                        let half = Vec3::new(kind.half_extent(), kind.half_extent(), kind.half_extent());
                        let body = self.physics.add_body(BodyKind::Flyable, Aabb::from_center(position, half));
                        self.projectiles
                            .push(Projectile::new(kind, body, index, position, kart.heading()));
                    }
                    None => {
                        debug_assert_eq!(powerup, Powerup::Zipper);
                        kart.zip();
                        controller.handle_zipper();
                    }
                }
            }
        }

        let previous = kart.xyz();
        let events = kart.integrate(dt, &self.track);
        let body = kart.body();
        let blocked = self
            .physics
            .overlapping(&kart.aabb(), Some(body))
            .any(|b| b.kind.blocks_karts());
        if blocked {
            kart.crash_back(previous);
            controller.crashed(CrashTarget::Object);
        }
        self.physics.set_aabb(body, kart.aabb());

        if events.skid_bonus {
            controller.skid_bonus_triggered();
        }
        if let Some(lap) = kart.update_progress(&self.track) {
            if !kart.has_finished() {
                controller.new_lap(lap);
            }
        }

        if !kart.is_eliminated() && self.items.collect(kart.xyz()).is_some() {
            let given = if kart.powerup().is_none() {
                let powerup = self.powerups.random_powerup(self.mode);
                kart.set_powerup(Some(powerup));
                Some(powerup)
            } else {
                None
            };
            controller.collected_item(given);
        }

        if self.mode.is_lap_race() && kart.laps_completed() >= self.laps {
            self.finish_kart(index, now);
        }
    }

    fn update_projectiles(&mut self, dt: f32, now: f64) {
        let battle = self.mode == RaceMode::ThreeStrikes;
        let mut index = 0;
        while index < self.projectiles.len() {
            let owner = self.projectiles[index].owner;
            let target = self.nearest_rival(owner, self.projectiles[index].position);
            let projectile = &mut self.projectiles[index];
            projectile.advance(dt, target);

            let half = projectile.kind.half_extent();
            let aabb = Aabb::from_center(projectile.position, Vec3::new(half, half, half));
            self.physics.set_aabb(projectile.body, aabb);

            let victim = self
                .karts
                .iter()
                .position(|k| k.index() != owner && !k.is_eliminated() && k.aabb().intersects(&aabb));
            let blocked = self
                .physics
                .overlapping(&aabb, Some(projectile.body))
                .any(|b| b.kind.blocks_karts());
            let expired = projectile.expired();

            if let Some(victim) = victim {
                debug!(owner, victim, kind = ?projectile.kind, "Projectile hit");
                if self.karts[victim].hit(battle) {
                    info!(kart = victim, "Kart eliminated");
                    self.finish_kart(victim, now);
                }
            }

            if victim.is_some() || blocked || expired {
                let removed = self.projectiles.remove(index);
                self.physics.remove_body(removed.body);
            } else {
                index += 1;
            }
        }
    }

    fn nearest_rival(&self, owner: usize, from: Vec3) -> Option<Vec3> {
        self.karts
            .iter()
            .filter(|k| k.index() != owner && !k.is_eliminated())
            .min_by(|a, b| a.xyz().distance(from).total_cmp(&b.xyz().distance(from)))
            .map(Kart::xyz)
    }

    fn finish_kart(&mut self, index: usize, now: f64) {
        let kart = &mut self.karts[index];
        if kart.has_finished() {
            return;
        }
        kart.finish(now);
        self.controllers[index].finished_race(now);
        if index < self.num_players {
            self.finished_players += 1;
        }
        info!(kart = index, time = now, "Kart finished");
    }

    fn update_positions(&mut self) {
        let mut order: Vec<usize> = (0..self.karts.len()).collect();
        order.sort_by(|&a, &b| {
            let (ka, kb) = (&self.karts[a], &self.karts[b]);
            let rank = |k: &Kart| match (k.finish_time(), k.is_eliminated()) {
                (Some(_), false) => 0,
                (None, _) => 1,
                (Some(_), true) => 2,
            };
            rank(ka)
                .cmp(&rank(kb))
                .then_with(|| match (ka.finish_time(), kb.finish_time()) {
                    (Some(ta), Some(tb)) if rank(ka) == 0 => ta.total_cmp(&tb),
                    _ => kb.overall_distance().total_cmp(&ka.overall_distance()),
                })
                .then(a.cmp(&b))
        });
        for (rank, &index) in order.iter().enumerate() {
            let position = rank + 1;
            if self.karts[index].position() != position {
                self.karts[index].set_position(position);
                self.controllers[index].set_position(position);
            }
        }
    }

    // ========================================================================
    // RESET
    // ========================================================================

    /// Back to the start grid: karts, controllers, items, projectiles and
    /// the clock. Random streams are left alone; see [`World::reseed`].
    pub fn reset(&mut self) {
        for projectile in self.projectiles.drain(..) {
            self.physics.remove_body(projectile.body);
        }
        for object in &self.objects {
            self.physics.set_aabb(object.body, object.aabb_at(0.0));
        }
        for (kart, controller) in self.karts.iter_mut().zip(self.controllers.iter_mut()) {
            kart.reset(&self.track);
            self.physics.set_aabb(kart.body(), kart.aabb());
            controller.reset();
        }
        self.items.reset();
        self.time = 0.0;
        self.ticks = 0;
        self.finished_players = 0;
        info!(track = self.track.ident(), "World reset");
    }

    /// Restarts item box and powerup randomness from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.items.update_random_seed(seed);
        self.powerups.set_random_seed(seed);
    }
}
