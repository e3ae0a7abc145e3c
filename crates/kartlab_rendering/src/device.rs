//! # Render Device
//!
//! Headless stand-in for a window: knows the screen size, pumps events once
//! per frame and carries the close signal.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use kartlab_shared::GraphicsConfig;
use tracing::{debug, info};

use crate::error::RenderResult;
use crate::renderer::Shading;
use crate::target::RenderTarget;

/// Cloneable handle that asks a [`RenderDevice`] to close.
#[derive(Clone, Debug)]
pub struct CloseHandle {
    flag: Arc<AtomicBool>,
}

impl CloseHandle {
    /// Requests the device to close. Sticky until the device is dropped.
    pub fn request_close(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// Headless render device.
#[derive(Debug)]
pub struct RenderDevice {
    config: GraphicsConfig,
    close_requested: Arc<AtomicBool>,
    frames: AtomicU64,
}

impl RenderDevice {
    /// Creates a device for a validated graphics config.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::Config`] if the config is invalid.
    pub fn new(config: &GraphicsConfig) -> RenderResult<Self> {
        config.validate()?;
        info!(
            width = config.screen_width,
            height = config.screen_height,
            "Render device created"
        );
        Ok(Self {
            config: config.clone(),
            close_requested: Arc::new(AtomicBool::new(false)),
            frames: AtomicU64::new(0),
        })
    }

    /// Applied graphics config.
    #[must_use]
    pub const fn config(&self) -> &GraphicsConfig {
        &self.config
    }

    /// Screen size.
    #[must_use]
    pub const fn screen_size(&self) -> (u32, u32) {
        (self.config.screen_width, self.config.screen_height)
    }

    /// Pumps events for one frame. Returns `false` once a close was requested.
    pub fn run(&self) -> bool {
        let frame = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        let open = !self.close_requested.load(Ordering::Acquire);
        if !open {
            debug!(frame, "Render device closing");
        }
        open
    }

    /// Requests the device to close.
    pub fn request_close(&self) {
        self.close_requested.store(true, Ordering::Release);
    }

    /// Handle that can close the device from elsewhere.
    #[must_use]
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            flag: Arc::clone(&self.close_requested),
        }
    }

    /// Frames pumped so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Allocates a render target at screen size.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::ZeroSizedTarget`] for a zero screen size.
    pub fn create_render_target(&self, name: impl Into<String>) -> RenderResult<RenderTarget> {
        let (width, height) = self.screen_size();
        RenderTarget::new(name, width, height, Shading::from_config(&self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;

    #[test]
    fn test_invalid_config_rejected() {
        let config = GraphicsConfig::ld().with_resolution(0, 0);
        assert!(matches!(RenderDevice::new(&config), Err(RenderError::Config(_))));
    }

    #[test]
    fn test_run_until_close() {
        let device = RenderDevice::new(&GraphicsConfig::ld().with_resolution(8, 6)).unwrap();
        assert!(device.run());
        assert!(device.run());
        device.close_handle().request_close();
        assert!(!device.run());
        assert!(!device.run());
        assert_eq!(device.frame_count(), 4);
    }

    #[test]
    fn test_targets_use_screen_size() {
        let device = RenderDevice::new(&GraphicsConfig::ld().with_resolution(8, 6)).unwrap();
        let target = device.create_render_target("player0").unwrap();
        assert_eq!(target.size(), (8, 6));
        assert_eq!(target.name(), "player0");
    }
}
