//! # Runtime
//!
//! Owned engine context: the render device, installed tracks and karts, and
//! the single race-session slot.
//!
//! ## State Machine
//!
//! ```text
//!                 init                      Race::new
//!  uninitialized ──────▶ initialized ─────────────────▶ initialized + session
//!        ▲                   │   ▲                              │
//!        └───── clean ───────┘   └──────── drop(Race) ──────────┘
//! ```
//!
//! `init` on an initialized runtime, `init`/`clean` with a live session and a
//! second session all fail. `clean` on an uninitialized runtime does nothing.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kartlab_engine::{EngineAssets, EngineSettings};
use kartlab_rendering::RenderDevice;
use kartlab_shared::config::load_toml;
use kartlab_shared::GraphicsConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{KartlabError, KartlabResult};

/// Everything `init` sets up.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Graphics toggles and resolution.
    pub graphics: GraphicsConfig,
    /// Tick rate, defaults and addon directories.
    pub engine: EngineSettings,
}

impl RuntimeConfig {
    /// Runtime config with the given graphics and default engine settings.
    #[must_use]
    pub fn with_graphics(graphics: GraphicsConfig) -> Self {
        Self {
            graphics,
            engine: EngineSettings::default(),
        }
    }

    /// Loads a runtime config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`KartlabError::Config`] if the file cannot be read or parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> KartlabResult<Self> {
        Ok(load_toml(path.as_ref())?)
    }
}

/// State shared by the runtime and its session. Immutable after `init`.
#[derive(Debug)]
pub struct EngineContext {
    assets: Arc<EngineAssets>,
    device: RenderDevice,
}

impl EngineContext {
    /// Installed assets.
    #[must_use]
    pub fn assets(&self) -> &Arc<EngineAssets> {
        &self.assets
    }

    /// Render device.
    #[must_use]
    pub const fn device(&self) -> &RenderDevice {
        &self.device
    }

    /// Applied graphics config.
    #[must_use]
    pub const fn graphics(&self) -> &GraphicsConfig {
        self.device.config()
    }
}

/// Holds the session slot until dropped.
#[derive(Debug)]
pub(crate) struct SessionGuard {
    slot: Arc<AtomicBool>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::Release);
    }
}

/// Engine lifecycle.
#[derive(Debug, Default)]
pub struct Runtime {
    context: Option<Arc<EngineContext>>,
    session: Arc<AtomicBool>,
}

impl Runtime {
    /// Creates an uninitialized runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Initializes with `graphics` and default engine settings.
    ///
    /// # Errors
    ///
    /// See [`Runtime::init_with`].
    pub fn init(&mut self, graphics: GraphicsConfig) -> KartlabResult<()> {
        self.init_with(RuntimeConfig::with_graphics(graphics))
    }

    /// Applies the graphics config, creates the render device and loads the
    /// track and kart registries.
    ///
    /// # Errors
    ///
    /// - [`KartlabError::SessionActive`] while a session is live
    /// - [`KartlabError::AlreadyInitialized`] if already initialized
    /// - [`KartlabError::Render`] for an invalid graphics config
    /// - [`KartlabError::Engine`] if assets fail to load
    ///
    /// On error the runtime stays uninitialized.
    pub fn init_with(&mut self, config: RuntimeConfig) -> KartlabResult<()> {
        if self.is_running() {
            return Err(KartlabError::SessionActive);
        }
        if self.context.is_some() {
            return Err(KartlabError::AlreadyInitialized);
        }

        let device = RenderDevice::new(&config.graphics)?;
        let assets = EngineAssets::load(&config.engine)?;
        info!(
            tracks = assets.tracks().len(),
            karts = assets.karts().len(),
            physics_fps = assets.clock().physics_fps(),
            "Runtime initialized"
        );
        self.context = Some(Arc::new(EngineContext {
            assets: Arc::new(assets),
            device,
        }));
        Ok(())
    }

    /// Tears down the engine context. Does nothing if not initialized.
    ///
    /// # Errors
    ///
    /// Returns [`KartlabError::SessionActive`] while a session is live.
    pub fn clean(&mut self) -> KartlabResult<()> {
        if self.is_running() {
            return Err(KartlabError::SessionActive);
        }
        if self.context.take().is_some() {
            info!("Runtime cleaned");
        }
        Ok(())
    }

    /// Whether `init` succeeded and `clean` has not run since.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    /// Whether a race session is live.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.session.load(Ordering::Acquire)
    }

    /// Installed track identifiers, sorted. Empty before `init`.
    #[must_use]
    pub fn list_tracks(&self) -> Vec<String> {
        self.context
            .as_ref()
            .map(|ctx| ctx.assets.tracks().identifiers())
            .unwrap_or_default()
    }

    /// Installed kart identifiers, sorted. Empty before `init`.
    #[must_use]
    pub fn list_karts(&self) -> Vec<String> {
        self.context
            .as_ref()
            .map(|ctx| ctx.assets.karts().identifiers())
            .unwrap_or_default()
    }

    /// Applied graphics config, if initialized.
    #[must_use]
    pub fn graphics(&self) -> Option<&GraphicsConfig> {
        self.context.as_deref().map(EngineContext::graphics)
    }

    /// Render device, if initialized.
    #[must_use]
    pub fn device(&self) -> Option<&RenderDevice> {
        self.context.as_deref().map(EngineContext::device)
    }

    /// Claims the session slot and hands out the context.
    pub(crate) fn open_session(&self) -> KartlabResult<(Arc<EngineContext>, SessionGuard)> {
        let context = self.context.as_ref().ok_or(KartlabError::NotInitialized)?;
        self.session
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| KartlabError::SessionAlreadyActive)?;
        Ok((
            Arc::clone(context),
            SessionGuard {
                slot: Arc::clone(&self.session),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graphics() -> GraphicsConfig {
        GraphicsConfig::ld().with_resolution(16, 12)
    }

    #[test]
    fn test_init_and_clean() {
        let mut runtime = Runtime::new();
        assert!(!runtime.is_initialized());
        assert!(runtime.list_tracks().is_empty());
        assert!(runtime.graphics().is_none());

        runtime.init(graphics()).unwrap();
        assert!(runtime.is_initialized());
        assert_eq!(runtime.graphics().unwrap().screen_width, 16);
        assert!(matches!(runtime.init(graphics()), Err(KartlabError::AlreadyInitialized)));

        runtime.clean().unwrap();
        assert!(!runtime.is_initialized());
        runtime.clean().unwrap();
    }

    #[test]
    fn test_session_slot_is_exclusive() {
        let mut runtime = Runtime::new();
        assert!(matches!(runtime.open_session(), Err(KartlabError::NotInitialized)));

        runtime.init(graphics()).unwrap();
        let (_, guard) = runtime.open_session().unwrap();
        assert!(runtime.is_running());
        assert!(matches!(runtime.open_session(), Err(KartlabError::SessionAlreadyActive)));
        assert!(matches!(runtime.clean(), Err(KartlabError::SessionActive)));

        drop(guard);
        assert!(!runtime.is_running());
        runtime.clean().unwrap();
    }

    #[test]
    fn test_bad_graphics_leaves_runtime_uninitialized() {
        let mut runtime = Runtime::new();
        let err = runtime.init(GraphicsConfig::ld().with_resolution(0, 0)).unwrap_err();
        assert!(matches!(err, KartlabError::Render(_)));
        assert!(!runtime.is_initialized());
    }

    #[test]
    fn test_runtime_config_from_toml() {
        let dir = std::env::temp_dir().join(format!("kartlab-runtime-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("runtime.toml");
        std::fs::write(
            &path,
            "[graphics]\nscreen_width = 32\nscreen_height = 24\n\n[engine]\nphysics_fps = 60\n",
        )
        .unwrap();

        let config = RuntimeConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.graphics.screen_width, 32);
        assert_eq!(config.engine.physics_fps, 60);
        assert_eq!(config.engine.default_kart, "tux");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
