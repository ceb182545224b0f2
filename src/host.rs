//! Collaborator surfaces — the renderer, the editor selection, and the
//! active print medium, seen through narrow traits.
//!
//! DESIGN
//! ======
//! The core never renders, never owns selection UI, and never talks to a
//! printer. What it needs from those collaborators is small: a bounds map
//! for the current items, the preview extent, selection reads/writes, an
//! alignment primitive, and the media sizing basis for prominence floors.
//! Each is a trait so tests can script them (see `test_helpers`).

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::geometry::{Extent, Rect};
use crate::item::{Item, ItemId};

// =============================================================================
// RENDER SURFACE
// =============================================================================

/// Rendered (rotation-applied) footprints keyed by item id, in draw space.
pub type BoundsMap = HashMap<ItemId, Rect>;

/// The external renderer. Asynchronous; one call is one full render pass
/// measuring the given items. Request coalescing is handled by the core's
/// [`crate::render::RenderScheduler`], not by implementors.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Render the items and report their draw-space bounds. A renderer that
    /// has not caught up with a mutation may return an incomplete map; the
    /// scheduler retries with fresh requests.
    async fn render(&self, items: &[Item]) -> BoundsMap;

    /// Current preview canvas extent.
    fn preview_extent(&self) -> Extent;
}

// =============================================================================
// SELECTION SURFACE
// =============================================================================

/// Alignment mode for `align_selected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignMode {
    Left,
    Right,
    Top,
    Bottom,
    CenterHorizontal,
    CenterVertical,
}

/// Reference frame an alignment is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignReference {
    Canvas,
    Selection,
}

/// Outcome reported by the editor's alignment operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignOutcome {
    pub changed: bool,
    pub reason: Option<String>,
    pub count: usize,
}

/// The editor's selection state. Reads may lag the item list by one render
/// cycle; the target resolver compensates with a batch-local snapshot.
pub trait SelectionSurface: Send + Sync {
    fn set_selected(&self, ids: &[ItemId]);
    fn selected(&self) -> Vec<ItemId>;
    fn align_selected(&self, mode: AlignMode, reference: AlignReference) -> AlignOutcome;
}

// =============================================================================
// MEDIA PROFILE
// =============================================================================

/// Sizing facts about the active print medium. The max QR size doubles as
/// the usable-print-width basis for prominence floors, so the same logical
/// template scales across narrow and wide tape.
pub trait MediaProfile: Send + Sync {
    /// Largest QR edge that fits the medium, in device units.
    fn max_qr_size(&self) -> f64;

    /// Fixed label length override, if the medium is pre-cut.
    fn fixed_length(&self) -> Option<f64>;

    /// Ask the collaborator to switch to a named medium. Collaborators that
    /// cannot switch ignore the request.
    fn request_media(&self, _name: &str) {}
}

// =============================================================================
// TEST HELPERS
// =============================================================================
