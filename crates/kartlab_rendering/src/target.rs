//! # Render Targets
//!
//! Off-screen surfaces with a double-buffered readback ring.
//!
//! ## Architecture
//!
//! ```text
//!   render()                 fetch()
//!  ┌────────┐   copy    ┌───────────────────────────┐
//!  │  RTT   │ ────────▶ │ ring[next]  (write lock)  │──▶ RenderData
//!  │ planes │           ├───────────────────────────┤
//!  └────────┘           │ ring[next ^ 1]            │    (Arc alias)
//!                       └───────────────────────────┘
//!                       next = (next + 1) % RENDER_BUFFER_COUNT
//! ```
//!
//! Every plane is allocated in [`RenderTarget::new`]. `render` and `fetch`
//! only overwrite, except when a caller still holds a read guard on the slot
//! `fetch` is about to reuse: that slot is left to the reader and a new one
//! takes its place in the ring.

use std::sync::Arc;

use kartlab_engine::World;
use kartlab_shared::RENDER_BUFFER_COUNT;
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::debug;

use crate::camera::Camera;
use crate::error::{RenderError, RenderResult};
use crate::renderer::{self, Shading};

// ============================================================================
// FRAME PLANES
// ============================================================================

/// Color, depth and instance planes of one frame. Row-major, row 0 on top.
#[derive(Clone, Debug, PartialEq)]
pub struct FramePlanes {
    width: u32,
    height: u32,
    /// RGB8, three bytes per pixel.
    pub color: Vec<u8>,
    /// Hit distance over the camera far plane; `1.0` where nothing was hit.
    pub depth: Vec<f32>,
    /// `(category << 24) | body id`; `0` where nothing was hit.
    pub instance: Vec<u32>,
}

impl FramePlanes {
    /// Allocates zeroed planes.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![0; pixels * 3],
            depth: vec![1.0; pixels],
            instance: vec![0; pixels],
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Pixels per plane.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.depth.len()
    }

    /// Overwrites every plane with `other`'s. Both must share a size.
    pub fn copy_from(&mut self, other: &Self) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        self.color.copy_from_slice(&other.color);
        self.depth.copy_from_slice(&other.depth);
        self.instance.copy_from_slice(&other.instance);
    }

    /// Depth plane as raw native-endian bytes.
    #[must_use]
    pub fn depth_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.depth)
    }

    /// Instance plane as raw native-endian bytes.
    #[must_use]
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instance)
    }

    /// RGB of pixel `(x, y)`.
    #[must_use]
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.index(x, y) * 3;
        [self.color[i], self.color[i + 1], self.color[i + 2]]
    }

    #[inline]
    pub(crate) fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// One ring slot, shared between the pool and any [`RenderData`] aliasing it.
pub type SharedFrame = Arc<RwLock<FramePlanes>>;

// ============================================================================
// RENDER DATA
// ============================================================================

/// A player's view of the most recently fetched frame.
///
/// Aliases a ring slot: its content stays valid until a later fetch lands in
/// the same slot. A slot read-locked at that point is kept as is.
#[derive(Clone, Debug, Default)]
pub struct RenderData {
    frame: Option<SharedFrame>,
}

impl RenderData {
    /// Empty render data.
    #[must_use]
    pub const fn new() -> Self {
        Self { frame: None }
    }

    /// Whether no frame has been fetched yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
    }

    /// Read access to the planes, if any.
    #[must_use]
    pub fn read(&self) -> Option<RwLockReadGuard<'_, FramePlanes>> {
        self.frame.as_ref().map(|frame| frame.read())
    }

    /// Copies the planes out of the ring.
    #[must_use]
    pub fn snapshot(&self) -> Option<FramePlanes> {
        self.read().map(|planes| planes.clone())
    }

    /// Whether both alias the same ring slot.
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        match (&self.frame, &other.frame) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Drops the slot alias.
    pub fn clear(&mut self) {
        self.frame = None;
    }
}

// ============================================================================
// RENDER TARGET
// ============================================================================

/// Off-screen surface of one player plus its readback ring.
#[derive(Debug)]
pub struct RenderTarget {
    name: String,
    shading: Shading,
    rtt: FramePlanes,
    ring: [SharedFrame; RENDER_BUFFER_COUNT],
    next: usize,
}

impl RenderTarget {
    /// Allocates the surface and every ring slot.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ZeroSizedTarget`] if either dimension is zero.
    pub fn new(name: impl Into<String>, width: u32, height: u32, shading: Shading) -> RenderResult<Self> {
        let name = name.into();
        if width == 0 || height == 0 {
            return Err(RenderError::ZeroSizedTarget { name, width, height });
        }
        Ok(Self {
            name,
            shading,
            rtt: FramePlanes::new(width, height),
            ring: std::array::from_fn(|_| Arc::new(RwLock::new(FramePlanes::new(width, height)))),
            next: 0,
        })
    }

    /// Target name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Surface size.
    #[must_use]
    pub const fn size(&self) -> (u32, u32) {
        (self.rtt.width, self.rtt.height)
    }

    /// Ring slot the next fetch writes to.
    #[must_use]
    pub const fn slot_index(&self) -> usize {
        self.next
    }

    /// The surface as last rendered.
    #[must_use]
    pub const fn surface(&self) -> &FramePlanes {
        &self.rtt
    }

    /// Draws `camera`'s view of `world` into the surface.
    pub fn render(&mut self, camera: &Camera, world: &World) {
        renderer::rasterize(&mut self.rtt, camera, world.physics(), self.shading);
    }

    /// Copies the surface into the current ring slot, points `data` at it and
    /// advances to the next slot.
    ///
    /// A slot still read-locked by a caller is detached from the ring and
    /// replaced by a fresh one, so the reader keeps its old frame and `fetch`
    /// never blocks.
    pub fn fetch(&mut self, data: &mut RenderData) {
        let copied = match self.ring[self.next].try_write() {
            Some(mut planes) => {
                planes.copy_from(&self.rtt);
                true
            }
            None => false,
        };
        if !copied {
            debug!(target = %self.name, slot = self.next, "ring slot still read, detaching it");
            self.ring[self.next] = Arc::new(RwLock::new(self.rtt.clone()));
        }
        data.frame = Some(Arc::clone(&self.ring[self.next]));
        self.next = (self.next + 1) % RENDER_BUFFER_COUNT;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> RenderTarget {
        RenderTarget::new("test", 4, 3, Shading::default()).unwrap()
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = RenderTarget::new("bad", 0, 3, Shading::default()).unwrap_err();
        assert!(matches!(err, RenderError::ZeroSizedTarget { width: 0, .. }));
    }

    #[test]
    fn test_fetch_alternates_two_slots() {
        let mut target = target();
        let mut first = RenderData::new();
        let mut second = RenderData::new();
        let mut third = RenderData::new();
        assert!(first.is_empty());

        target.fetch(&mut first);
        assert_eq!(target.slot_index(), 1);
        target.fetch(&mut second);
        assert_eq!(target.slot_index(), 0);
        target.fetch(&mut third);

        assert!(!first.same_slot(&second));
        assert!(first.same_slot(&third));
    }

    #[test]
    fn test_fetch_copies_surface() {
        let mut target = target();
        target.rtt.instance[5] = 0x0200_0007;
        target.rtt.color[0] = 200;

        let mut data = RenderData::new();
        target.fetch(&mut data);
        let planes = data.read().unwrap();
        assert_eq!(planes.instance[5], 0x0200_0007);
        assert_eq!(planes.rgb(0, 0)[0], 200);
        assert_eq!(planes.instance_bytes().len(), 12 * 4);
        assert_eq!(planes.depth_bytes().len(), 12 * 4);
    }

    #[test]
    fn test_older_frame_survives_one_fetch() {
        let mut target = target();
        let mut old = RenderData::new();
        target.rtt.depth[0] = 0.25;
        target.fetch(&mut old);

        let mut new = RenderData::new();
        target.rtt.depth[0] = 0.75;
        target.fetch(&mut new);

        assert_eq!(old.read().unwrap().depth[0], 0.25);
        assert_eq!(new.read().unwrap().depth[0], 0.75);

        // The third fetch lands in the first slot again.
        target.rtt.depth[0] = 0.5;
        target.fetch(&mut new);
        assert_eq!(old.read().unwrap().depth[0], 0.5);
    }

    #[test]
    fn test_held_frame_does_not_block_fetch() {
        let mut target = target();
        let mut kept = RenderData::new();
        target.rtt.depth[0] = 0.25;
        target.fetch(&mut kept);

        let guard = kept.read().unwrap();
        let mut data = RenderData::new();
        target.rtt.depth[0] = 0.5;
        target.fetch(&mut data);
        // Lands in the slot `kept` holds.
        target.rtt.depth[0] = 0.75;
        target.fetch(&mut data);

        assert_eq!(guard.depth[0], 0.25);
        assert_eq!(data.read().unwrap().depth[0], 0.75);
        assert!(!kept.same_slot(&data));
        drop(guard);

        // The replacement slot is reused from now on.
        let mut later = RenderData::new();
        target.fetch(&mut later);
        target.fetch(&mut later);
        assert!(later.same_slot(&data));
    }

    #[test]
    fn test_clear_drops_alias() {
        let mut target = target();
        let mut data = RenderData::new();
        target.fetch(&mut data);
        let snapshot = data.snapshot().unwrap();
        assert_eq!(snapshot.pixel_count(), 12);
        data.clear();
        assert!(data.read().is_none());
    }
}
