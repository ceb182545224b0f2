//! Pattern detectors and normalizers — structural repair of a mutated
//! item set.
//!
//! DESIGN
//! ======
//! After a batch mutates the item list, the bridge runs this chain against
//! the items plus fresh rendered geometry. Each detector is a predicate
//! over `(items, bounds)` plus an `apply` that rewrites the matched
//! structure into a canonical, collision-free layout. The chain is an
//! ordered list behind one trait; the first match wins and exactly one
//! normalizer runs. The generic fallback matches anything and only
//! dedups/clamps, flagging low confidence.
//!
//! An `apply` may run its own render→measure→adjust cycles through the
//! scheduler (font downscale until content fits, QR shrink until free of
//! overlap); those loops are bounded and degrade to warnings, never errors.

pub mod barcode_form;
pub mod fallback;
pub mod inventory;
pub mod qr_form;

use async_trait::async_trait;
use tracing::info;

use crate::geometry::Extent;
use crate::host::{BoundsMap, MediaProfile};
use crate::item::{Item, Session};
use crate::render::RenderScheduler;

/// Warning key emitted when no structural intent was recognized.
pub const LOW_CONFIDENCE_WARNING: &str = "assistant.warningNormalizationLowConfidence";

// Prominence floors and fit tuning. Ratios scale against the media's max
// QR size so narrow and wide tape produce proportionally similar layouts.
// Tuned defaults, not protocol contracts.
pub(crate) const QR_FLOOR_RATIO: f64 = 0.25;
pub(crate) const FONT_FLOOR: f64 = 10.0;
pub(crate) const ROW_GAP_MIN: f64 = 3.0;
pub(crate) const GAP_FONT_RATIO: f64 = 0.25;
pub(crate) const DOWNSCALE_STEP: f64 = 0.9;
pub(crate) const CHAR_PROMINENCE_RATIO: f64 = 0.4;
pub(crate) const BARCODE_MIN_WIDTH_RATIO: f64 = 0.9;
pub(crate) const BARCODE_MIN_HEIGHT_RATIO: f64 = 0.22;

/// Minimum QR edge for the active media.
#[must_use]
pub(crate) fn qr_floor(media: &dyn MediaProfile) -> f64 {
    media.max_qr_size() * QR_FLOOR_RATIO
}

// =============================================================================
// DETECTOR INTERFACE
// =============================================================================

/// Everything an `apply` needs: the item list, the render scheduler for
/// measure cycles, the media sizing basis, and the warning sink.
pub struct NormalizeCtx<'a> {
    pub session: &'a mut Session,
    pub scheduler: &'a RenderScheduler,
    pub media: &'a dyn MediaProfile,
    pub extent: Extent,
    pub warnings: &'a mut Vec<String>,
}

/// What an `apply` did.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOutcome {
    pub did_mutate: bool,
    /// True when the final geometry checks held (row order, gaps,
    /// containment). False means a best-effort layout plus a warning.
    pub placement_resolved: bool,
}

/// One `(predicate, normalizer)` pair of the chain.
#[async_trait]
pub trait LayoutDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap structural predicate. Must not mutate.
    fn matches(&self, items: &[Item], bounds: &BoundsMap) -> bool;

    /// Rewrite the matched structure. Runs only when `matches` held.
    async fn apply(&self, ctx: &mut NormalizeCtx<'_>, bounds: &BoundsMap) -> NormalizeOutcome;
}

// =============================================================================
// CHAIN
// =============================================================================

/// Detector priority order. The fallback matches unconditionally, so the
/// chain always applies exactly one normalizer.
#[must_use]
pub fn detector_chain() -> Vec<Box<dyn LayoutDetector>> {
    vec![
        Box::new(inventory::InventoryCard),
        Box::new(qr_form::QrForm),
        Box::new(barcode_form::BoxedBarcodeForm),
        Box::new(fallback::GenericFallback),
    ]
}

/// Run the chain: first matching detector applies. Returns the name of the
/// detector that ran.
pub async fn run_chain(ctx: &mut NormalizeCtx<'_>, bounds: &BoundsMap) -> &'static str {
    for detector in detector_chain() {
        if detector.matches(ctx.session.items(), bounds) {
            info!(detector = detector.name(), items = ctx.session.len(), "normalize: pattern matched");
            let outcome = detector.apply(ctx, bounds).await;
            info!(
                detector = detector.name(),
                did_mutate = outcome.did_mutate,
                placement_resolved = outcome.placement_resolved,
                "normalize: pass complete"
            );
            return detector.name();
        }
    }
    // Unreachable while the fallback matches unconditionally.
    "none"
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
