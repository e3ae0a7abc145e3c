//! # Engine Assets
//!
//! Settings and registries loaded once per runtime: the tick clock, installed
//! tracks and installed karts.

use std::path::{Path, PathBuf};

use kartlab_shared::{DEFAULT_KART, DEFAULT_PHYSICS_FPS, DEFAULT_TRACK};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::kart::KartPropertiesManager;
use crate::time::TickClock;
use crate::track::TrackManager;

/// Engine-wide settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Physics ticks per simulated second.
    pub physics_fps: u32,
    /// Kart used for empty or unknown kart identifiers.
    pub default_kart: String,
    /// Track used when a race config names none.
    pub default_track: String,
    /// Extra directories scanned for `*.toml` track descriptors.
    pub track_dirs: Vec<PathBuf>,
    /// Extra directories scanned for `*.toml` kart descriptors.
    pub kart_dirs: Vec<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            physics_fps: DEFAULT_PHYSICS_FPS,
            default_kart: DEFAULT_KART.to_string(),
            default_track: DEFAULT_TRACK.to_string(),
            track_dirs: Vec::new(),
            kart_dirs: Vec::new(),
        }
    }
}

/// Parses every `*.toml` file in `dir`, in file name order.
///
/// Files that fail to read or parse are logged and skipped.
///
/// # Errors
///
/// Returns [`EngineError::AssetLoad`] if `dir` itself cannot be listed.
pub fn load_dir<T: DeserializeOwned>(dir: &Path) -> EngineResult<Vec<(PathBuf, T)>> {
    let entries = std::fs::read_dir(dir).map_err(|e| EngineError::AssetLoad {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    let mut loaded = Vec::with_capacity(paths.len());
    for path in paths {
        match kartlab_shared::config::load_toml::<T>(&path) {
            Ok(value) => loaded.push((path, value)),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping asset file"),
        }
    }
    Ok(loaded)
}

/// Everything a race needs from disk, immutable after loading.
#[derive(Clone, Debug)]
pub struct EngineAssets {
    settings: EngineSettings,
    clock: TickClock,
    tracks: TrackManager,
    karts: KartPropertiesManager,
}

impl EngineAssets {
    /// Loads built-ins and every configured addon directory.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AssetLoad`] for an unreadable addon directory
    /// and [`EngineError::InvalidAsset`] if the default kart or track is not
    /// installed afterwards.
    pub fn load(settings: &EngineSettings) -> EngineResult<Self> {
        let mut tracks = TrackManager::with_builtins()?;
        for dir in &settings.track_dirs {
            let count = tracks.add_search_dir(dir).map_err(|e| {
                error!(error = %e, "Failed to load track directory");
                e
            })?;
            info!(dir = %dir.display(), count, "Loaded addon tracks");
        }

        let mut karts = KartPropertiesManager::with_builtins()?;
        for dir in &settings.kart_dirs {
            let count = karts.add_search_dir(dir).map_err(|e| {
                error!(error = %e, "Failed to load kart directory");
                e
            })?;
            info!(dir = %dir.display(), count, "Loaded addon karts");
        }

        if !karts.contains(&settings.default_kart) {
            return Err(EngineError::InvalidAsset(format!(
                "default kart '{}' is not installed",
                settings.default_kart
            )));
        }
        if !tracks.contains(&settings.default_track) {
            return Err(EngineError::InvalidAsset(format!(
                "default track '{}' is not installed",
                settings.default_track
            )));
        }

        Ok(Self {
            settings: settings.clone(),
            clock: TickClock::new(settings.physics_fps),
            tracks,
            karts,
        })
    }

    /// Settings these assets were loaded with.
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Tick clock.
    #[must_use]
    pub fn clock(&self) -> TickClock {
        self.clock
    }

    /// Installed tracks.
    #[must_use]
    pub fn tracks(&self) -> &TrackManager {
        &self.tracks
    }

    /// Installed karts.
    #[must_use]
    pub fn karts(&self) -> &KartPropertiesManager {
        &self.karts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kartlab-assets-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_load() {
        let assets = EngineAssets::load(&EngineSettings::default()).unwrap();
        assert_eq!(assets.clock().physics_fps(), 120);
        assert!(assets.tracks().contains("lighthouse"));
        assert!(assets.karts().contains("tux"));
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let settings = EngineSettings {
            track_dirs: vec![PathBuf::from("/nonexistent/kartlab/tracks")],
            ..EngineSettings::default()
        };
        assert!(matches!(
            EngineAssets::load(&settings),
            Err(EngineError::AssetLoad { .. })
        ));
    }

    #[test]
    fn test_unknown_default_kart_is_rejected() {
        let settings = EngineSettings {
            default_kart: "sara".into(),
            ..EngineSettings::default()
        };
        assert!(matches!(
            EngineAssets::load(&settings),
            Err(EngineError::InvalidAsset(_))
        ));
    }

    #[test]
    fn test_addon_dirs_skip_broken_files() {
        let dir = scratch_dir("tracks");
        std::fs::write(
            dir.join("ring.toml"),
            "ident = \"ring\"\nwidth = 10.0\ncenterline = [[0.0, 0.0], [40.0, 0.0], [40.0, 40.0], [0.0, 40.0]]\n",
        )
        .unwrap();
        std::fs::write(dir.join("broken.toml"), "ident = ").unwrap();
        std::fs::write(dir.join("notes.txt"), "not a track").unwrap();

        let settings = EngineSettings {
            track_dirs: vec![dir.clone()],
            ..EngineSettings::default()
        };
        let assets = EngineAssets::load(&settings).unwrap();
        assert!(assets.tracks().contains("ring"));
        assert_eq!(assets.tracks().len(), 6);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
