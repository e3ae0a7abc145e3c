//! # Race Session
//!
//! One race driven step by step from a script.
//!
//! ```text
//! step(actions):
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. INPUT                                                            │
//! │    └─ actions[i] -> player i's kart controls                        │
//! │                                                                     │
//! │ 2. TIME                                                             │
//! │    ├─ leftover += step_size                                         │
//! │    ├─ ticks = round(leftover * physics_fps)                         │
//! │    └─ ticks x (update_world(1), update_time(1))                     │
//! │                                                                     │
//! │ 3. ECHO                                                             │
//! │    └─ player controls -> last_action (clamped values)               │
//! │                                                                     │
//! │ 4. RENDER (if enabled)                                              │
//! │    ├─ chase camera per player -> render target                      │
//! │    ├─ fetch every target into its next ring slot                    │
//! │    └─ pump device events                                            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use kartlab_engine::{AiController, LocalPlayer, PlayerAction, RaceManager, StepAccumulator, World};
use kartlab_rendering::{Camera, RenderData, RenderTarget};
use kartlab_shared::{Action, ControllerKind, RaceConfig, MAX_GOAL};
use tracing::{debug, info};

use crate::error::{KartlabError, KartlabResult};
use crate::runtime::{EngineContext, Runtime, SessionGuard};
use crate::sensor::{self, Surroundings};
use crate::state::WorldState;

/// A race session. At most one exists per [`Runtime`]; dropping it frees the
/// slot.
#[derive(Debug)]
pub struct Race {
    context: Arc<EngineContext>,
    config: RaceConfig,
    race_manager: RaceManager,
    accumulator: StepAccumulator,
    targets: Vec<RenderTarget>,
    render_data: Vec<RenderData>,
    last_action: Vec<Action>,
    // Dropped last so the slot frees only after the session is gone.
    _session: SessionGuard,
}

impl Race {
    /// Opens a session and applies `config` to a fresh race manager.
    ///
    /// The race does not run until [`Race::start`].
    ///
    /// # Errors
    ///
    /// - [`KartlabError::NotInitialized`] before [`Runtime::init`]
    /// - [`KartlabError::SessionAlreadyActive`] if a session is live
    /// - [`KartlabError::InvalidConfig`] for no players or a non-positive
    ///   step size
    /// - [`KartlabError::Engine`] for an unknown track
    /// - [`KartlabError::Render`] if a render target cannot be allocated
    pub fn new(runtime: &Runtime, config: RaceConfig) -> KartlabResult<Self> {
        let (context, session) = runtime.open_session()?;
        config
            .validate()
            .map_err(|e| KartlabError::InvalidConfig(e.to_string()))?;

        let mut race_manager = RaceManager::new(Arc::clone(context.assets()));
        race_manager.set_difficulty(config.difficulty);
        race_manager.set_minor_mode(config.mode);
        race_manager.set_num_players(config.players.len());
        for (index, player) in config.players.iter().enumerate() {
            race_manager.set_player_kart(index, &player.kart)?;
            race_manager.set_kart_team(index, player.team)?;
        }
        race_manager.set_reverse_track(config.reverse);
        race_manager.set_track(&config.track)?;
        race_manager.set_num_laps(config.laps);
        race_manager.set_num_karts(config.total_karts());
        race_manager.set_max_goal(MAX_GOAL);

        let players = config.players.len();
        let mut race = Self {
            context,
            config,
            race_manager,
            accumulator: StepAccumulator::new(),
            targets: Vec::with_capacity(players),
            render_data: Vec::with_capacity(players),
            last_action: vec![Action::default(); players],
            _session: session,
        };
        race.allocate_targets()?;

        info!(
            track = race.race_manager.track(),
            mode = ?race.config.mode,
            players,
            karts = race.race_manager.num_karts(),
            "Race session created"
        );
        Ok(race)
    }

    fn allocate_targets(&mut self) -> KartlabResult<()> {
        if !self.targets.is_empty() {
            return Ok(());
        }
        let device = self.context.device();
        for index in 0..self.config.players.len() {
            self.targets.push(device.create_render_target(format!("player{index}"))?);
        }
        self.render_data = vec![RenderData::new(); self.targets.len()];
        Ok(())
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Builds the world and puts every kart on the grid.
    ///
    /// Player slots driven by the AI get a [`LocalPlayer`] wrapped
    /// [`AiController`]. Item and powerup randomness is seeded from the
    /// config. Starting again replaces the running world.
    ///
    /// # Errors
    ///
    /// Returns [`KartlabError::Engine`] if a kart or track disappeared and
    /// [`KartlabError::Render`] if render targets cannot be reallocated.
    pub fn start(&mut self) -> KartlabResult<()> {
        self.allocate_targets()?;
        self.race_manager.setup_player_kart_info()?;
        self.race_manager.start_new()?;

        if let Some(world) = self.race_manager.world_mut() {
            for (index, player) in self.config.players.iter().enumerate() {
                if player.controller == ControllerKind::Ai {
                    world.set_controller(
                        index,
                        Box::new(LocalPlayer::new(AiController::new(self.config.difficulty))),
                    )?;
                }
            }
            world.reseed(self.config.seed);
        }
        self.accumulator.reset();
        self.last_action.fill(Action::default());
        info!(seed = self.config.seed, "Race started");
        Ok(())
    }

    /// Back to the start grid with fresh randomness. Render targets are kept.
    /// Does nothing before [`Race::start`].
    pub fn restart(&mut self) {
        let Some(world) = self.race_manager.world_mut() else {
            return;
        };
        world.reset();
        world.reseed(self.config.seed);
        self.accumulator.reset();
        self.last_action.fill(Action::default());
        info!("Race restarted");
    }

    /// Releases render targets and render data and exits the running race.
    pub fn stop(&mut self) {
        self.targets.clear();
        self.render_data.clear();
        if self.race_manager.world().is_some() {
            self.race_manager.exit_race();
            info!(ticks = self.accumulator.total_ticks(), "Race stopped");
        }
    }

    // ========================================================================
    // STEPPING
    // ========================================================================

    /// Writes `actions[i]` into player `i`'s controls and advances one step.
    ///
    /// Extra actions are ignored; players without an action keep their
    /// previous controls. Returns `false` once every player finished, when
    /// the device asks to close, or when no race is running.
    pub fn step(&mut self, actions: &[Action]) -> bool {
        let Some(world) = self.race_manager.world_mut() else {
            return false;
        };
        for (player, action) in actions.iter().enumerate().take(self.config.players.len()) {
            if let Ok(kart) = world.player_kart_mut(player) {
                kart.controls_mut().apply_action(action);
            }
        }
        self.advance()
    }

    /// Writes `action` into player 0's controls and advances one step.
    pub fn step_single(&mut self, action: &Action) -> bool {
        self.step(std::slice::from_ref(action))
    }

    /// Advances one step without touching any controls.
    pub fn step_idle(&mut self) -> bool {
        self.step(&[])
    }

    fn advance(&mut self) -> bool {
        let clock = self.context.assets().clock();
        let ticks = self.accumulator.advance(f64::from(self.config.step_size), &clock);

        let Some(world) = self.race_manager.world_mut() else {
            return false;
        };
        for _ in 0..ticks {
            world.update_world(1);
            world.update_time(1);
        }

        let world: &World = world;
        for (player, echo) in self.last_action.iter_mut().enumerate() {
            if let Ok(kart) = world.player_kart(player) {
                *echo = kart.controls().action();
            }
        }
        debug!(ticks, time = world.time(), leftover = self.accumulator.leftover(), "Step");

        if self.config.render {
            for (player, (target, data)) in self.targets.iter_mut().zip(self.render_data.iter_mut()).enumerate() {
                if let Ok(kart) = world.player_kart(player) {
                    target.render(&Camera::chase(kart), world);
                }
                target.fetch(data);
            }
            if !self.context.device().run() {
                return false;
            }
        }

        world.finished_players() < world.num_players()
    }

    /// Sends a discrete input event to player `player`'s controller. Returns
    /// whether it was consumed; `false` without a running race.
    ///
    /// # Errors
    ///
    /// Returns [`KartlabError::Engine`] for an unknown player.
    pub fn player_action(&mut self, player: usize, action: PlayerAction, value: i32) -> KartlabResult<bool> {
        match self.race_manager.world_mut() {
            Some(world) => Ok(world.player_action(player, action, value)?),
            None => Ok(false),
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Latest fetched frame per player. Empty after [`Race::stop`].
    #[must_use]
    pub fn render_data(&self) -> &[RenderData] {
        &self.render_data
    }

    /// Controls each player's kart ran with during the last step.
    #[must_use]
    pub fn last_action(&self) -> &[Action] {
        &self.last_action
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// Running world.
    #[must_use]
    pub fn world(&self) -> Option<&World> {
        self.race_manager.world()
    }

    /// Snapshot of the running world.
    #[must_use]
    pub fn world_state(&self) -> Option<WorldState> {
        self.race_manager.world().map(WorldState::capture)
    }

    /// Ticks run since the last start or restart.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.accumulator.total_ticks()
    }

    /// Simulated time not yet turned into ticks.
    #[must_use]
    pub const fn leftover_time(&self) -> f64 {
        self.accumulator.leftover()
    }

    /// Ray probe around kart `kart`; `None` without a running race.
    ///
    /// # Errors
    ///
    /// Returns [`KartlabError::Engine`] for a kart outside the grid.
    pub fn surroundings(&self, kart: usize) -> KartlabResult<Option<Surroundings>> {
        self.race_manager
            .world()
            .map(|world| sensor::surroundings(world, kart))
            .transpose()
            .map_err(KartlabError::from)
    }
}
