//! # Tracks
//!
//! A track is a closed centerline on the ground plane plus a road width.
//! Everything that moves along it (karts, the AI, lap counting) works on
//! "distance along the centerline", so the track's main job is converting
//! between world positions and that distance.
//!
//! Tracks come from the built-in catalogue or from `*.toml` descriptors in
//! addon directories:
//!
//! ```toml
//! ident = "ring"
//! name = "Ring Road"
//! width = 10.0
//! centerline = [[0.0, 0.0], [40.0, 0.0], [40.0, 40.0], [0.0, 40.0]]
//!
//! [[objects]]
//! position = [20.0, 1.0, -12.0]
//! half_extents = [2.0, 1.0, 2.0]
//!
//! [[item_boxes]]
//! fraction = 0.5
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use kartlab_shared::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assets::load_dir;
use crate::error::{EngineError, EngineResult};
use crate::physics::Aabb;

/// Spacing between grid rows, in world units.
const GRID_ROW_SPACING: f32 = 4.0;

/// Height of the ground slab below `y = 0`.
const GROUND_DEPTH: f32 = 1.0;

/// Extra ground around the centerline's bounding box.
const GROUND_MARGIN: f32 = 30.0;

// ============================================================================
// DESCRIPTORS
// ============================================================================

/// Oscillating motion of an animated object.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationDef {
    /// Peak offset from the rest position.
    pub amplitude: [f32; 3],
    /// Seconds per full oscillation.
    pub period: f32,
}

/// A box standing on or near the track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackObjectDef {
    /// Rest position of the box center.
    pub position: [f32; 3],
    /// Half size along each axis.
    pub half_extents: [f32; 3],
    /// Present for moving objects.
    #[serde(default)]
    pub animation: Option<AnimationDef>,
}

/// An item box location.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemBoxDef {
    /// Position along the lap in `[0, 1)`.
    pub fraction: f32,
    /// Sideways offset from the centerline.
    #[serde(default)]
    pub offset: f32,
}

/// On-disk track descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackDef {
    /// Identifier used in race configs.
    pub ident: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Road width.
    pub width: f32,
    /// Closed loop of `[x, z]` points; the first point is the start line.
    pub centerline: Vec<[f32; 2]>,
    /// Static and animated boxes.
    #[serde(default)]
    pub objects: Vec<TrackObjectDef>,
    /// Item box locations.
    #[serde(default)]
    pub item_boxes: Vec<ItemBoxDef>,
}

impl TrackDef {
    /// Checks that the descriptor describes a drivable loop.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidAsset`] describing the first problem.
    pub fn validate(&self) -> EngineResult<()> {
        let fail = |reason: &str| -> EngineResult<()> {
            Err(EngineError::InvalidAsset(format!("track '{}': {reason}", self.ident)))
        };

        if self.ident.is_empty() {
            return fail("empty identifier");
        }
        if !self.width.is_finite() || self.width <= 0.0 {
            return fail("width must be positive");
        }
        if self.centerline.len() < 3 {
            return fail("centerline needs at least 3 points");
        }
        if self.centerline.iter().flatten().any(|v| !v.is_finite()) {
            return fail("centerline has non-finite points");
        }
        for object in &self.objects {
            if object.half_extents.iter().any(|h| !h.is_finite() || *h <= 0.0) {
                return fail("object half extents must be positive");
            }
            if let Some(animation) = object.animation {
                if !animation.period.is_finite() || animation.period <= 0.0 {
                    return fail("animation period must be positive");
                }
            }
        }
        if self.item_boxes.iter().any(|b| !(0.0..1.0).contains(&b.fraction)) {
            return fail("item box fraction must be in [0, 1)");
        }
        Ok(())
    }
}

// ============================================================================
// TRACK
// ============================================================================

/// Where a point lies relative to the centerline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackProjection {
    /// Distance along the centerline from the start line, in `[0, length)`.
    pub distance: f32,
    /// Signed sideways offset; positive is to the right of driving direction.
    pub lateral: f32,
}

/// A loaded, drivable track.
#[derive(Clone, Debug)]
pub struct Track {
    def: TrackDef,
    points: Vec<Vec3>,
    /// `cumulative[i]` = centerline distance at `points[i]`.
    cumulative: Vec<f32>,
    length: f32,
    reverse: bool,
}

/// Unit vector to the right of a ground-plane direction.
#[inline]
#[must_use]
pub fn right_of(dir: Vec3) -> Vec3 {
    Vec3::new(dir.z, 0.0, -dir.x)
}

impl Track {
    /// Builds a track from a validated descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidAsset`] if the descriptor is unusable.
    pub fn from_def(def: TrackDef) -> EngineResult<Self> {
        def.validate()?;
        let points: Vec<Vec3> = def
            .centerline
            .iter()
            .map(|[x, z]| Vec3::new(*x, 0.0, *z))
            .collect();
        Self::with_points(def, points, false)
    }

    fn with_points(def: TrackDef, points: Vec<Vec3>, reverse: bool) -> EngineResult<Self> {
        let n = points.len();
        let mut cumulative = Vec::with_capacity(n);
        let mut length = 0.0;
        for i in 0..n {
            cumulative.push(length);
            length += points[i].distance_xz(points[(i + 1) % n]);
        }
        if length <= f32::EPSILON {
            return Err(EngineError::InvalidAsset(format!(
                "track '{}': centerline has zero length",
                def.ident
            )));
        }
        Ok(Self {
            def,
            points,
            cumulative,
            length,
            reverse,
        })
    }

    /// The same track driven the other way. The start line stays in place.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut points = Vec::with_capacity(self.points.len());
        points.push(self.points[0]);
        points.extend(self.points[1..].iter().rev().copied());
        // Lengths of a closed loop do not change when reversed.
        match Self::with_points(self.def.clone(), points, !self.reverse) {
            Ok(track) => track,
            Err(_) => self.clone(),
        }
    }

    /// Identifier.
    #[must_use]
    pub fn ident(&self) -> &str {
        &self.def.ident
    }

    /// Display name, falling back to the identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        if self.def.name.is_empty() {
            &self.def.ident
        } else {
            &self.def.name
        }
    }

    /// Road width.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.def.width
    }

    /// Lap length.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Whether this is the reversed variant.
    #[must_use]
    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Track objects.
    #[must_use]
    pub fn objects(&self) -> &[TrackObjectDef] {
        &self.def.objects
    }

    /// Item box locations.
    #[must_use]
    pub fn item_boxes(&self) -> &[ItemBoxDef] {
        &self.def.item_boxes
    }

    /// Centerline points in driving order.
    #[must_use]
    pub fn centerline(&self) -> &[Vec3] {
        &self.points
    }

    fn segment(&self, i: usize) -> (Vec3, Vec3) {
        (self.points[i], self.points[(i + 1) % self.points.len()])
    }

    /// Wraps any distance into `[0, length)`.
    #[must_use]
    pub fn wrap_distance(&self, distance: f32) -> f32 {
        let d = distance.rem_euclid(self.length);
        // rem_euclid can return `length` itself for tiny negative inputs.
        if d >= self.length {
            0.0
        } else {
            d
        }
    }

    fn segment_at(&self, distance: f32) -> usize {
        let d = self.wrap_distance(distance);
        self.cumulative.partition_point(|c| *c <= d).saturating_sub(1)
    }

    /// Centerline point at `distance` (wrapped).
    #[must_use]
    pub fn point_at(&self, distance: f32) -> Vec3 {
        let d = self.wrap_distance(distance);
        let i = self.segment_at(d);
        let (a, b) = self.segment(i);
        let seg_len = a.distance_xz(b);
        if seg_len <= f32::EPSILON {
            return a;
        }
        a.lerp(b, (d - self.cumulative[i]) / seg_len)
    }

    /// Driving direction at `distance` (wrapped).
    #[must_use]
    pub fn direction_at(&self, distance: f32) -> Vec3 {
        let (a, b) = self.segment(self.segment_at(distance));
        (b - a).normalize_or_zero()
    }

    /// Projects a position onto the centerline.
    #[must_use]
    pub fn project(&self, position: Vec3) -> TrackProjection {
        let p = Vec3::new(position.x, 0.0, position.z);
        let mut best = TrackProjection {
            distance: 0.0,
            lateral: 0.0,
        };
        let mut best_dist = f32::INFINITY;

        for i in 0..self.points.len() {
            let (a, b) = self.segment(i);
            let ab = b - a;
            let len_sq = ab.length_squared();
            let t = if len_sq <= f32::EPSILON {
                0.0
            } else {
                ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
            };
            let closest = a + ab * t;
            let dist = p.distance_xz(closest);
            if dist < best_dist {
                best_dist = dist;
                let dir = ab.normalize_or_zero();
                best = TrackProjection {
                    distance: self.wrap_distance(self.cumulative[i] + len_sq.sqrt() * t),
                    lateral: (p - closest).dot(right_of(dir)),
                };
            }
        }
        best
    }

    /// Whether a position is on the road surface.
    #[must_use]
    pub fn is_on_road(&self, position: Vec3) -> bool {
        self.project(position).lateral.abs() <= self.def.width * 0.5
    }

    /// Grid slot `index`: position and heading. Slots form two columns
    /// behind the start line.
    #[must_use]
    pub fn start_position(&self, index: usize) -> (Vec3, f32) {
        let row = (index / 2) as f32;
        let distance = -(row + 1.0) * GRID_ROW_SPACING;
        let dir = self.direction_at(distance);
        let side = if index % 2 == 0 { -1.0 } else { 1.0 };
        let offset = side * (self.def.width * 0.25).min(2.0);
        let position = self.point_at(distance) + right_of(dir) * offset;
        (position, dir.heading())
    }

    /// World position of an item box.
    #[must_use]
    pub fn item_box_position(&self, item_box: &ItemBoxDef) -> Vec3 {
        let mut fraction = item_box.fraction;
        if self.reverse {
            fraction = 1.0 - fraction;
        }
        let distance = fraction * self.length;
        self.point_at(distance) + right_of(self.direction_at(distance)) * item_box.offset
    }

    /// Ground slab under the whole track. Its top face is `y = 0`.
    #[must_use]
    pub fn ground_aabb(&self) -> Aabb {
        let mut min = self.points[0];
        let mut max = self.points[0];
        for p in &self.points {
            min = min.min(*p);
            max = max.max(*p);
        }
        let margin = self.def.width + GROUND_MARGIN;
        Aabb::new(
            Vec3::new(min.x - margin, -GROUND_DEPTH, min.z - margin),
            Vec3::new(max.x + margin, 0.0, max.z + margin),
        )
    }
}

// ============================================================================
// BUILT-IN CATALOGUE
// ============================================================================

/// Samples an ellipse as a closed centerline, counter-clockwise from `+x`.
fn oval(rx: f32, rz: f32, samples: usize) -> Vec<[f32; 2]> {
    (0..samples)
        .map(|i| {
            let a = i as f32 / samples as f32 * std::f32::consts::TAU;
            [rx * a.cos(), rz * a.sin()]
        })
        .collect()
}

/// Static boxes placed just outside the road.
fn roadside(rx: f32, rz: f32, width: f32, angles: &[f32]) -> Vec<TrackObjectDef> {
    let out = width * 0.5 + 4.0;
    angles
        .iter()
        .map(|a| TrackObjectDef {
            position: [(rx + out) * a.cos(), 1.0, (rz + out) * a.sin()],
            half_extents: [1.5, 1.0, 1.5],
            animation: None,
        })
        .collect()
}

fn builtin(ident: &str, name: &str, rx: f32, rz: f32, width: f32) -> TrackDef {
    let mut objects = roadside(rx, rz, width, &[0.8, 2.4, 4.0, 5.5]);
    // One animated object inside the loop, well away from the road.
    objects.push(TrackObjectDef {
        position: [0.0, 2.0, 0.0],
        half_extents: [1.0, 2.0, 1.0],
        animation: Some(AnimationDef {
            amplitude: [0.0, 1.5, 0.0],
            period: 4.0,
        }),
    });
    TrackDef {
        ident: ident.to_string(),
        name: name.to_string(),
        width,
        centerline: oval(rx, rz, 48),
        objects,
        item_boxes: vec![
            ItemBoxDef { fraction: 0.25, offset: -2.0 },
            ItemBoxDef { fraction: 0.25, offset: 2.0 },
            ItemBoxDef { fraction: 0.6, offset: 0.0 },
        ],
    }
}

/// The tracks that ship with the engine.
#[must_use]
pub fn builtin_tracks() -> Vec<TrackDef> {
    vec![
        builtin("lighthouse", "Around the Lighthouse", 60.0, 35.0, 12.0),
        builtin("stadium", "Stadium", 45.0, 25.0, 14.0),
        builtin("battleisland", "Battle Island", 28.0, 28.0, 24.0),
        builtin("zengarden", "Zen Garden", 22.0, 16.0, 10.0),
        builtin("hacienda", "Hacienda", 80.0, 45.0, 12.0),
    ]
}

// ============================================================================
// TRACK MANAGER
// ============================================================================

/// Installed tracks, keyed by identifier.
#[derive(Clone, Debug, Default)]
pub struct TrackManager {
    tracks: BTreeMap<String, Arc<Track>>,
}

impl TrackManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager holding the built-in catalogue.
    ///
    /// # Errors
    ///
    /// Only fails if a built-in descriptor is broken.
    pub fn with_builtins() -> EngineResult<Self> {
        let mut manager = Self::new();
        for def in builtin_tracks() {
            manager.insert(Track::from_def(def)?);
        }
        Ok(manager)
    }

    /// Installs a track, replacing one with the same identifier.
    pub fn insert(&mut self, track: Track) {
        if let Some(old) = self.tracks.insert(track.ident().to_string(), Arc::new(track)) {
            debug!(track = old.ident(), "Track replaced by addon");
        }
    }

    /// Loads every `*.toml` descriptor in `dir`. Broken files are skipped.
    ///
    /// Returns the number of tracks installed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AssetLoad`] if the directory cannot be read.
    pub fn add_search_dir(&mut self, dir: &Path) -> EngineResult<usize> {
        let mut count = 0;
        for (path, def) in load_dir::<TrackDef>(dir)? {
            match Track::from_def(def) {
                Ok(track) => {
                    self.insert(track);
                    count += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping track"),
            }
        }
        Ok(count)
    }

    /// Looks up a track.
    #[must_use]
    pub fn get(&self, ident: &str) -> Option<Arc<Track>> {
        self.tracks.get(ident).cloned()
    }

    /// Whether a track is installed.
    #[must_use]
    pub fn contains(&self, ident: &str) -> bool {
        self.tracks.contains_key(ident)
    }

    /// Sorted identifiers of all installed tracks.
    #[must_use]
    pub fn identifiers(&self) -> Vec<String> {
        self.tracks.keys().cloned().collect()
    }

    /// Number of installed tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether no tracks are installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Track {
        Track::from_def(TrackDef {
            ident: "square".into(),
            name: String::new(),
            width: 8.0,
            centerline: vec![[0.0, 0.0], [0.0, 40.0], [40.0, 40.0], [40.0, 0.0]],
            objects: Vec::new(),
            item_boxes: Vec::new(),
        })
        .unwrap()
    }

    #[test]
    fn test_length_and_points() {
        let track = square();
        assert_eq!(track.length(), 160.0);
        assert_eq!(track.name(), "square");
        assert_eq!(track.point_at(20.0), Vec3::new(0.0, 0.0, 20.0));
        assert_eq!(track.point_at(60.0), Vec3::new(20.0, 0.0, 40.0));
        // Wraps past the end and before the start.
        assert_eq!(track.point_at(180.0), Vec3::new(0.0, 0.0, 20.0));
        assert_eq!(track.point_at(-20.0), Vec3::new(20.0, 0.0, 0.0));
    }

    #[test]
    fn test_projection() {
        let track = square();
        let projection = track.project(Vec3::new(1.0, 3.0, 10.0));
        assert!((projection.distance - 10.0).abs() < 1e-4);
        // First segment drives along +z; +x is on the right.
        assert!((projection.lateral - 1.0).abs() < 1e-4);
        assert!(track.is_on_road(Vec3::new(3.9, 0.0, 10.0)));
        assert!(!track.is_on_road(Vec3::new(6.0, 0.0, 10.0)));
    }

    #[test]
    fn test_reverse_keeps_start_and_length() {
        let track = square();
        let reversed = track.reversed();
        assert!(reversed.is_reverse());
        assert_eq!(reversed.length(), track.length());
        assert_eq!(reversed.point_at(0.0), track.point_at(0.0));
        // Reversed first segment drives along +x.
        assert_eq!(reversed.direction_at(1.0), Vec3::X);
    }

    #[test]
    fn test_grid_is_behind_start_line() {
        let track = square();
        let (first, heading) = track.start_position(0);
        let (second, _) = track.start_position(1);
        let (third, _) = track.start_position(2);
        // Last segment drives from (40, 0) back to the origin along -x.
        assert!((heading - Vec3::new(-1.0, 0.0, 0.0).heading()).abs() < 1e-4);
        assert!(first.x > 0.0 && first.x < 40.0);
        assert!((first.x - second.x).abs() < 1e-4);
        assert!(first.z != second.z);
        assert!(third.x > first.x);
    }

    #[test]
    fn test_validation_rejects_bad_defs() {
        let mut def = builtin_tracks().remove(0);
        def.centerline.truncate(2);
        assert!(matches!(Track::from_def(def), Err(EngineError::InvalidAsset(_))));

        let mut def = builtin_tracks().remove(0);
        def.width = 0.0;
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_builtins_sorted() {
        let manager = TrackManager::with_builtins().unwrap();
        assert_eq!(
            manager.identifiers(),
            vec!["battleisland", "hacienda", "lighthouse", "stadium", "zengarden"]
        );
        assert!(manager.get("lighthouse").is_some());
        assert!(manager.get("atlantis").is_none());
    }

    #[test]
    fn test_builtin_objects_are_off_road() {
        let manager = TrackManager::with_builtins().unwrap();
        for ident in manager.identifiers() {
            let track = manager.get(&ident).unwrap();
            for object in track.objects() {
                let [x, y, z] = object.position;
                assert!(!track.is_on_road(Vec3::new(x, y, z)), "{ident}");
            }
        }
    }
}
