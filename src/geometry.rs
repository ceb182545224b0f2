//! Rotation-aware bounding-box math shared by the normalizers.
//!
//! DESIGN
//! ======
//! Pure functions, no state. Rotation is always about the rect center, and
//! the renderer reports post-rotation axis-aligned boxes, so the two jobs
//! here are: predict the rotated box for an unrotated one, and invert that
//! prediction when a normalizer wants the rotated box to land somewhere
//! specific. Offsets come in two coordinate systems, center-relative for
//! text/qr/barcode absolute items and draw-space top-left for shapes, and
//! the conversions between them live here as well.

use serde::{Deserialize, Serialize};

// =============================================================================
// TYPES
// =============================================================================

/// Axis-aligned rectangle in draw space. Matches the bounds map entries
/// reported by the render collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Preview canvas extent in draw-space units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True when the two rects share any area. Touching edges do not count.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }

    /// Width of the horizontal overlap between the two rects, 0 when disjoint.
    #[must_use]
    pub fn horizontal_overlap(&self, other: &Rect) -> f64 {
        (self.right().min(other.right()) - self.x.max(other.x)).max(0.0)
    }

    /// Height of the vertical overlap between the two rects, 0 when disjoint.
    #[must_use]
    pub fn vertical_overlap(&self, other: &Rect) -> f64 {
        (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0)
    }

    /// True when `other` lies entirely inside `self` (edges may touch).
    #[must_use]
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x && other.y >= self.y && other.right() <= self.right() && other.bottom() <= self.bottom()
    }
}

// =============================================================================
// ROTATION
// =============================================================================

/// Normalize a rotation in degrees into `[0, 360)`.
#[must_use]
pub fn normalize_rotation(deg: f64) -> f64 {
    let r = deg % 360.0;
    if r < 0.0 { r + 360.0 } else { r }
}

/// Axis-aligned bounding box of `rect` rotated `deg` degrees about its center.
#[must_use]
pub fn rotated_rect(rect: &Rect, deg: f64) -> Rect {
    let rad = normalize_rotation(deg).to_radians();
    let (sin, cos) = (rad.sin().abs(), rad.cos().abs());
    let rw = rect.width * cos + rect.height * sin;
    let rh = rect.width * sin + rect.height * cos;
    let (cx, cy) = rect.center();
    Rect::new(cx - rw / 2.0, cy - rh / 2.0, rw, rh)
}

/// Unrotated top-left that makes the rotated bounding box of a
/// `width` x `height` rect land with its top-left at (`target_x`, `target_y`).
///
/// Inverse of positioning via [`rotated_rect`]: rotation preserves the
/// center, so the unrotated rect shares its center with the target box.
#[must_use]
pub fn offset_for_rotated_target(width: f64, height: f64, deg: f64, target_x: f64, target_y: f64) -> (f64, f64) {
    let rotated = rotated_rect(&Rect::new(0.0, 0.0, width, height), deg);
    let cx = target_x + rotated.width / 2.0;
    let cy = target_y + rotated.height / 2.0;
    (cx - width / 2.0, cy - height / 2.0)
}

// =============================================================================
// OFFSET CONVERSIONS
// =============================================================================

/// Center-relative offset of a draw-space rect: displacement of the rect
/// center from the preview center.
#[must_use]
pub fn draw_to_center_offset(rect: &Rect, extent: &Extent) -> (f64, f64) {
    let (cx, cy) = rect.center();
    (cx - extent.width / 2.0, cy - extent.height / 2.0)
}

/// Draw-space top-left of a `width` x `height` rect whose center sits at the
/// given center-relative offset.
#[must_use]
pub fn center_offset_to_draw(dx: f64, dy: f64, width: f64, height: f64, extent: &Extent) -> (f64, f64) {
    (extent.width / 2.0 + dx - width / 2.0, extent.height / 2.0 + dy - height / 2.0)
}

// =============================================================================
// TESTS
// =============================================================================
