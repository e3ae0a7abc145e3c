//! # Configuration
//!
//! Graphics and race configuration, loaded once per runtime/session.
//!
//! All structs carry `#[serde(default)]`, so a TOML file only needs the keys it
//! wants to change:
//!
//! ```toml
//! track = "stadium"
//! laps = 1
//! num_kart = 4
//! mode = "three_strikes"
//!
//! [[players]]
//! kart = "gnu"
//! controller = "ai"
//! team = 1
//! ```

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_STEP_SIZE;
use crate::error::{ConfigError, ConfigResult};

/// Reads and parses a TOML file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if its contents do not match `T`.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&text)?)
}

// =============================================================================
// GRAPHICS
// =============================================================================

/// Rendering toggles applied once at runtime init.
///
/// The headless renderer reads only `glow`, `dynamic_lights` and the screen
/// size. The other effect toggles are carried for scripts and presets but do
/// not change the frames.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Render target width in pixels.
    pub screen_width: u32,
    /// Render target height in pixels.
    pub screen_height: u32,
    /// Glow around items and karts.
    pub glow: bool,
    /// Bloom post effect.
    pub bloom: bool,
    /// Light shafts.
    pub light_shaft: bool,
    /// Dynamic point lights.
    pub dynamic_lights: bool,
    /// Depth of field.
    pub dof: bool,
    /// Particle detail, 0 (off) to 2 (full).
    pub particles_effects: u8,
    /// Animated kart drivers.
    pub animated_characters: bool,
    /// Motion blur.
    pub motionblur: bool,
    /// Morphological anti-aliasing.
    pub mlaa: bool,
    /// Compressed textures.
    pub texture_compression: bool,
    /// Ambient occlusion.
    pub ssao: bool,
    /// Cheaper image based lighting.
    pub degraded_ibl: bool,
    /// High definition texture bits (1 = karts, 2 = tracks).
    pub high_definition_textures: u8,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            screen_width: 600,
            screen_height: 400,
            glow: false,
            bloom: true,
            light_shaft: true,
            dynamic_lights: true,
            dof: true,
            particles_effects: 2,
            animated_characters: true,
            motionblur: true,
            mlaa: true,
            texture_compression: true,
            ssao: true,
            degraded_ibl: false,
            high_definition_textures: 1 | 2,
        }
    }
}

impl GraphicsConfig {
    /// High detail preset.
    #[must_use]
    pub fn hd() -> Self {
        Self {
            glow: true,
            bloom: true,
            light_shaft: true,
            dynamic_lights: true,
            dof: true,
            ..Self::default()
        }
    }

    /// Standard detail preset.
    #[must_use]
    pub fn sd() -> Self {
        Self {
            glow: false,
            bloom: false,
            light_shaft: false,
            dynamic_lights: false,
            dof: false,
            motionblur: false,
            ..Self::default()
        }
    }

    /// Low detail preset.
    #[must_use]
    pub fn ld() -> Self {
        Self {
            glow: false,
            bloom: false,
            light_shaft: false,
            dynamic_lights: false,
            dof: false,
            particles_effects: 0,
            animated_characters: false,
            motionblur: false,
            mlaa: false,
            texture_compression: false,
            ssao: false,
            degraded_ibl: false,
            high_definition_textures: 0,
            ..Self::default()
        }
    }

    /// Returns a copy with a different resolution.
    #[must_use]
    pub const fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.screen_width = width;
        self.screen_height = height;
        self
    }

    /// Checks the values the renderer depends on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero-sized screen or a particle
    /// level above 2.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "screen size must be non-zero, got {}x{}",
                self.screen_width, self.screen_height
            )));
        }
        if self.particles_effects > 2 {
            return Err(ConfigError::Invalid(format!(
                "particles_effects must be 0..=2, got {}",
                self.particles_effects
            )));
        }
        Ok(())
    }

    /// Number of pixels per render target.
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.screen_width as usize * self.screen_height as usize
    }
}

// =============================================================================
// RACE
// =============================================================================

/// AI difficulty tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Slow, forgiving opponents.
    Novice,
    /// Medium opponents.
    Intermediate,
    /// Fast opponents.
    #[default]
    Expert,
    /// Flat-out opponents.
    SuperTux,
}

impl Difficulty {
    /// Throttle multiplier applied by AI controllers.
    #[must_use]
    pub const fn ai_throttle(self) -> f32 {
        match self {
            Self::Novice => 0.7,
            Self::Intermediate => 0.8,
            Self::Expert => 0.9,
            Self::SuperTux => 1.0,
        }
    }
}

/// Race rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceMode {
    /// Lap race against AI karts.
    #[default]
    NormalRace,
    /// Lap race, no items.
    TimeTrial,
    /// Lap race behind a leader kart.
    FollowLeader,
    /// Battle: three projectile hits eliminate a kart.
    #[serde(alias = "elimination")]
    ThreeStrikes,
    /// Battle: free scoring, no natural end.
    FreeForAll,
    /// Team battle for flags, no natural end.
    CaptureTheFlag,
    /// Team soccer, no natural end.
    Soccer,
}

impl RaceMode {
    /// Whether finishing is decided by completed laps.
    #[must_use]
    pub const fn is_lap_race(self) -> bool {
        matches!(self, Self::NormalRace | Self::TimeTrial | Self::FollowLeader)
    }

    /// Whether item boxes are placed on the track.
    #[must_use]
    pub const fn has_items(self) -> bool {
        !matches!(self, Self::TimeTrial)
    }
}

/// Who drives a player slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    /// Driven by the actions passed to `step`.
    #[default]
    Player,
    /// Driven by the engine AI, still reported as a local player.
    Ai,
}

/// One player slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Kart identifier; empty selects the default kart.
    pub kart: String,
    /// Controller for this slot.
    pub controller: ControllerKind,
    /// Team id for team modes.
    pub team: u8,
}

impl PlayerConfig {
    /// Creates a player slot.
    #[must_use]
    pub fn new(kart: impl Into<String>, controller: ControllerKind, team: u8) -> Self {
        Self {
            kart: kart.into(),
            controller,
            team,
        }
    }
}

/// Configuration of one race session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// AI difficulty.
    pub difficulty: Difficulty,
    /// Race rules.
    pub mode: RaceMode,
    /// Player slots; each gets a camera and a render target.
    pub players: Vec<PlayerConfig>,
    /// Track identifier; empty selects the default track.
    pub track: String,
    /// Drive the track backwards.
    pub reverse: bool,
    /// Laps for lap races.
    pub laps: u32,
    /// Seed for item and powerup randomness.
    pub seed: u64,
    /// Total karts; slots beyond the players are filled with AI karts.
    pub num_kart: u32,
    /// Simulated seconds per `step` call.
    pub step_size: f32,
    /// Run a render pass every step.
    pub render: bool,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            mode: RaceMode::default(),
            players: vec![PlayerConfig::default()],
            track: String::new(),
            reverse: false,
            laps: 3,
            seed: 0,
            num_kart: 1,
            step_size: DEFAULT_STEP_SIZE,
            render: true,
        }
    }
}

impl RaceConfig {
    /// Parses a race config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads a race config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        load_toml(path.as_ref())
    }

    /// Checks the values a session depends on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty player list, a
    /// non-positive or non-finite step size. Zero laps are raised to one by
    /// the race manager.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.players.is_empty() {
            return Err(ConfigError::Invalid("at least one player is required".into()));
        }
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "step_size must be positive, got {}",
                self.step_size
            )));
        }
        Ok(())
    }

    /// Total karts on the grid: never fewer than the players.
    #[must_use]
    pub fn total_karts(&self) -> usize {
        (self.num_kart as usize).max(self.players.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_differ() {
        let hd = GraphicsConfig::hd();
        let sd = GraphicsConfig::sd();
        let ld = GraphicsConfig::ld();
        assert!(hd.glow && hd.bloom && hd.dof);
        assert!(!sd.glow && !sd.bloom && sd.mlaa);
        assert_eq!(ld.particles_effects, 0);
        assert_eq!(ld.high_definition_textures, 0);
        assert_eq!((ld.screen_width, ld.screen_height), (600, 400));
    }

    #[test]
    fn test_graphics_validation() {
        assert!(GraphicsConfig::default().validate().is_ok());
        let zero = GraphicsConfig::default().with_resolution(0, 10);
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_race_defaults() {
        let config = RaceConfig::default();
        assert_eq!(config.players.len(), 1);
        assert_eq!(config.laps, 3);
        assert_eq!(config.difficulty, Difficulty::Expert);
        assert!(config.render);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_race_validation() {
        let mut config = RaceConfig::default();
        config.players.clear();
        assert!(config.validate().is_err());

        let config = RaceConfig {
            step_size: 0.0,
            ..RaceConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RaceConfig {
            laps: 0,
            ..RaceConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_total_karts_covers_players() {
        let config = RaceConfig {
            players: vec![PlayerConfig::default(); 3],
            num_kart: 1,
            ..RaceConfig::default()
        };
        assert_eq!(config.total_karts(), 3);
    }

    #[test]
    fn test_race_from_toml() {
        let text = r#"
            track = "stadium"
            laps = 1
            num_kart = 4
            mode = "elimination"
            seed = 7

            [[players]]
            kart = "gnu"
            controller = "ai"
            team = 1
        "#;
        let config = RaceConfig::from_toml_str(text).unwrap();
        assert_eq!(config.track, "stadium");
        assert_eq!(config.mode, RaceMode::ThreeStrikes);
        assert_eq!(config.players[0].controller, ControllerKind::Ai);
        assert_eq!(config.players[0].team, 1);
        assert_eq!(config.step_size, DEFAULT_STEP_SIZE);
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = RaceConfig::from_toml_str("laps = \"three\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
