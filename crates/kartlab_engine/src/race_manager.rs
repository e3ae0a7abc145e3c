//! # Race Manager
//!
//! Collects the settings of the next race (mode, track, karts, laps), builds
//! the [`World`] when the race starts and drops it when the race is exited.

use std::sync::Arc;

use kartlab_shared::{Difficulty, RaceMode, MAX_GOAL};
use tracing::{info, warn};

use crate::assets::EngineAssets;
use crate::error::{EngineError, EngineResult};
use crate::world::{KartEntry, World, WorldSetup};

/// Kart choice of one player slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerKart {
    /// Installed kart identifier.
    pub kart: String,
    /// Team id.
    pub team: u8,
}

/// Setup of the next race and owner of the running world.
#[derive(Debug)]
pub struct RaceManager {
    assets: Arc<EngineAssets>,
    difficulty: Difficulty,
    mode: RaceMode,
    players: Vec<PlayerKart>,
    track: String,
    reverse: bool,
    laps: u32,
    num_karts: usize,
    max_goal: u32,
    grid: Vec<KartEntry>,
    world: Option<World>,
}

impl RaceManager {
    /// Creates a manager with one player on the default kart and track.
    #[must_use]
    pub fn new(assets: Arc<EngineAssets>) -> Self {
        let kart = assets.settings().default_kart.clone();
        let track = assets.settings().default_track.clone();
        Self {
            assets,
            difficulty: Difficulty::default(),
            mode: RaceMode::default(),
            players: vec![PlayerKart { kart, team: 0 }],
            track,
            reverse: false,
            laps: 3,
            num_karts: 1,
            max_goal: MAX_GOAL,
            grid: Vec::new(),
            world: None,
        }
    }

    // ========================================================================
    // SETUP
    // ========================================================================

    /// Sets the AI difficulty.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    /// Sets the race rules.
    pub fn set_minor_mode(&mut self, mode: RaceMode) {
        self.mode = mode;
    }

    /// Sets the number of local players. New slots get the default kart.
    pub fn set_num_players(&mut self, count: usize) {
        let kart = self.assets.settings().default_kart.clone();
        self.players.resize(count, PlayerKart { kart, team: 0 });
        self.num_karts = self.num_karts.max(count);
    }

    /// Sets the kart of player `player`. Empty or unknown identifiers fall
    /// back to the default kart.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidKartIndex`] for an unknown player.
    pub fn set_player_kart(&mut self, player: usize, kart: &str) -> EngineResult<()> {
        let resolved = self.resolve_kart(kart);
        self.player_mut(player)?.kart = resolved;
        Ok(())
    }

    /// Sets the team of player `player`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidKartIndex`] for an unknown player.
    pub fn set_kart_team(&mut self, player: usize, team: u8) -> EngineResult<()> {
        self.player_mut(player)?.team = team;
        Ok(())
    }

    /// Drives the track backwards.
    pub fn set_reverse_track(&mut self, reverse: bool) {
        self.reverse = reverse;
    }

    /// Sets the track. An empty identifier selects the default track.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTrack`] if the track is not installed.
    pub fn set_track(&mut self, track: &str) -> EngineResult<()> {
        let ident = if track.is_empty() {
            self.assets.settings().default_track.as_str()
        } else {
            track
        };
        if !self.assets.tracks().contains(ident) {
            return Err(EngineError::UnknownTrack(ident.to_string()));
        }
        self.track = ident.to_string();
        Ok(())
    }

    /// Sets the lap count, at least one.
    pub fn set_num_laps(&mut self, laps: u32) {
        self.laps = laps.max(1);
    }

    /// Sets the total kart count; never fewer than the players.
    pub fn set_num_karts(&mut self, count: usize) {
        self.num_karts = count.max(self.players.len());
    }

    /// Sets the goal limit for goal-based modes.
    pub fn set_max_goal(&mut self, goals: u32) {
        self.max_goal = goals;
    }

    fn player_mut(&mut self, player: usize) -> EngineResult<&mut PlayerKart> {
        let count = self.players.len();
        self.players
            .get_mut(player)
            .ok_or(EngineError::InvalidKartIndex { index: player, count })
    }

    fn resolve_kart(&self, kart: &str) -> String {
        let default = &self.assets.settings().default_kart;
        if kart.is_empty() {
            return default.clone();
        }
        if self.assets.karts().contains(kart) {
            kart.to_string()
        } else {
            warn!(kart, fallback = %default, "Unknown kart, using default");
            default.clone()
        }
    }

    /// Builds the grid: players first, then AI karts cycling through the
    /// installed karts in identifier order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownKart`] if a chosen kart disappeared.
    pub fn setup_player_kart_info(&mut self) -> EngineResult<()> {
        let karts = self.assets.karts();
        let mut grid = Vec::with_capacity(self.num_karts);

        for player in &self.players {
            let properties = karts
                .get(&player.kart)
                .ok_or_else(|| EngineError::UnknownKart(player.kart.clone()))?;
            grid.push(KartEntry {
                properties,
                team: player.team,
            });
        }

        let idents = karts.identifiers();
        for slot in 0..self.num_karts.saturating_sub(self.players.len()) {
            let ident = &idents[slot % idents.len()];
            let properties = karts
                .get(ident)
                .ok_or_else(|| EngineError::UnknownKart(ident.clone()))?;
            grid.push(KartEntry {
                properties,
                team: (slot % 2) as u8,
            });
        }

        self.grid = grid;
        Ok(())
    }

    /// Starts a new race from the current setup, replacing any running one.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTrack`] or [`EngineError::UnknownKart`]
    /// if the setup names assets that are not installed.
    pub fn start_new(&mut self) -> EngineResult<()> {
        if self.grid.len() < self.players.len() {
            self.setup_player_kart_info()?;
        }
        let base = self
            .assets
            .tracks()
            .get(&self.track)
            .ok_or_else(|| EngineError::UnknownTrack(self.track.clone()))?;
        let track = if self.reverse {
            Arc::new(base.reversed())
        } else {
            base
        };

        info!(
            track = %self.track,
            reverse = self.reverse,
            mode = ?self.mode,
            laps = self.laps,
            karts = self.grid.len(),
            "Starting race"
        );
        self.world = Some(World::new(WorldSetup {
            track,
            mode: self.mode,
            difficulty: self.difficulty,
            laps: self.laps,
            max_goal: self.max_goal,
            clock: self.assets.clock(),
            karts: self.grid.clone(),
            num_players: self.players.len(),
        })?);
        Ok(())
    }

    /// Drops the running world.
    pub fn exit_race(&mut self) {
        if self.world.take().is_some() {
            info!("Race exited");
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Running world.
    #[must_use]
    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    /// Mutable running world.
    pub fn world_mut(&mut self) -> Option<&mut World> {
        self.world.as_mut()
    }

    /// Player slots.
    #[must_use]
    pub fn players(&self) -> &[PlayerKart] {
        &self.players
    }

    /// Number of local players.
    #[must_use]
    pub fn num_players(&self) -> usize {
        self.players.len()
    }

    /// Total karts on the grid.
    #[must_use]
    pub fn num_karts(&self) -> usize {
        self.num_karts
    }

    /// Players that finished the running race; zero without a world.
    #[must_use]
    pub fn finished_players(&self) -> usize {
        self.world.as_ref().map_or(0, World::finished_players)
    }

    /// Selected track identifier.
    #[must_use]
    pub fn track(&self) -> &str {
        &self.track
    }

    /// Selected race rules.
    #[must_use]
    pub const fn minor_mode(&self) -> RaceMode {
        self.mode
    }

    /// Selected difficulty.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Selected lap count.
    #[must_use]
    pub const fn num_laps(&self) -> u32 {
        self.laps
    }

    /// Whether the track is driven backwards.
    #[must_use]
    pub const fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Goal limit.
    #[must_use]
    pub const fn max_goal(&self) -> u32 {
        self.max_goal
    }
}
