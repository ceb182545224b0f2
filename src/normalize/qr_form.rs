//! QR-form normalizer — heading/value text rows beside a single qr code.
//!
//! The shape this pass repairs: a handful of absolutely positioned text
//! rows (labels with trailing colons and their values) and one qr code to
//! their right. Rows are restacked top-to-bottom with fontsize-scaled gaps;
//! when the stack overflows the preview the gaps compress first and then
//! every font downscales proportionally to a floor. Horizontal conflicts
//! resolve by shifting the qr right, then shrinking it to a media-scaled
//! floor, then downscaling text once more.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::geometry::{Rect, draw_to_center_offset};
use crate::host::BoundsMap;
use crate::item::{Item, ItemId, ItemKind, PositionMode};

use super::{DOWNSCALE_STEP, FONT_FLOOR, GAP_FONT_RATIO, LayoutDetector, NormalizeCtx, NormalizeOutcome, ROW_GAP_MIN, qr_floor};

const MIN_ROWS: usize = 4;
const MAX_ROWS: usize = 8;
const MIN_HEADING_ROWS: usize = 2;

/// Preview margins as fractions of the relevant extent.
const TOP_MARGIN_RATIO: f64 = 0.05;
const BOTTOM_MARGIN_RATIO: f64 = 0.05;
const SIDE_MARGIN_RATIO: f64 = 0.03;

/// Gap between the text column and the qr, in gap units of the largest row
/// font.
const COLUMN_GAP_RATIO: f64 = 0.5;

/// Bounded render→measure→adjust iterations for the fit loop.
const FIT_ATTEMPTS: u32 = 6;

pub struct QrForm;

fn heading_like(text: &str) -> bool {
    text.trim_end().ends_with(':')
}

#[async_trait]
impl LayoutDetector for QrForm {
    fn name(&self) -> &'static str {
        "qr_form"
    }

    fn matches(&self, items: &[Item], bounds: &BoundsMap) -> bool {
        let qr_count = items.iter().filter(|i| matches!(i.kind, ItemKind::Qr(_))).count();
        let barcode_count = items.iter().filter(|i| matches!(i.kind, ItemKind::Barcode(_))).count();
        if qr_count != 1 || barcode_count != 0 {
            return false;
        }

        let texts: Vec<&Item> = items.iter().filter(|i| matches!(i.kind, ItemKind::Text(_))).collect();
        if texts.len() < MIN_ROWS || texts.len() > MAX_ROWS {
            return false;
        }
        if !texts.iter().all(|t| t.position_mode == PositionMode::Absolute) {
            return false;
        }

        let headings = texts
            .iter()
            .filter(|t| t.as_text().is_some_and(|x| heading_like(&x.text)))
            .count();
        if headings < MIN_HEADING_ROWS {
            return false;
        }

        // At least half the rows must sit left of the qr's horizontal center.
        let qr = items.iter().find(|i| matches!(i.kind, ItemKind::Qr(_)));
        let Some(qr_rect) = qr.and_then(|q| bounds.get(&q.id)) else {
            return false;
        };
        let (qr_cx, _) = qr_rect.center();
        let left_of_qr = texts
            .iter()
            .filter(|t| bounds.get(&t.id).is_some_and(|r| r.center().0 < qr_cx))
            .count();
        left_of_qr * 2 >= texts.len()
    }

    #[allow(clippy::too_many_lines)]
    async fn apply(&self, ctx: &mut NormalizeCtx<'_>, bounds: &BoundsMap) -> NormalizeOutcome {
        let extent = ctx.extent;
        let top_margin = extent.height * TOP_MARGIN_RATIO;
        let bottom_margin = extent.height * BOTTOM_MARGIN_RATIO;
        let side_margin = extent.width * SIDE_MARGIN_RATIO;
        let usable_height = extent.height - top_margin - bottom_margin;

        // Row order is the current visual order, top to bottom.
        let mut row_ids: Vec<ItemId> = ctx
            .session
            .items()
            .iter()
            .filter(|i| matches!(i.kind, ItemKind::Text(_)))
            .map(|i| i.id.clone())
            .collect();
        row_ids.sort_by(|a, b| {
            let ya = bounds.get(a).map_or(f64::MAX, |r| r.y);
            let yb = bounds.get(b).map_or(f64::MAX, |r| r.y);
            ya.total_cmp(&yb)
        });
        let qr_id = ctx
            .session
            .items()
            .iter()
            .find(|i| matches!(i.kind, ItemKind::Qr(_)))
            .map(|i| i.id.clone())
            .unwrap_or_default();
        let original_fonts: Vec<f64> = row_ids
            .iter()
            .filter_map(|id| ctx.session.get(id).and_then(Item::as_text).map(|t| t.font_size))
            .collect();

        let mut needed: Vec<ItemId> = row_ids.clone();
        needed.push(qr_id.clone());

        let mut did_mutate = false;
        let mut gaps_compressed = false;
        let mut current = bounds.clone();

        // Fit loop: compress gaps, then downscale fonts until rows fit.
        for attempt in 0..FIT_ATTEMPTS {
            let heights: Vec<f64> = row_ids.iter().map(|id| current.get(id).map_or(0.0, |r| r.height)).collect();
            let gaps: f64 = row_ids
                .iter()
                .take(row_ids.len().saturating_sub(1))
                .map(|id| self::row_gap(ctx, id, gaps_compressed))
                .sum();
            let required = heights.iter().sum::<f64>() + gaps;
            if required <= usable_height {
                break;
            }
            if !gaps_compressed {
                gaps_compressed = true;
                debug!(attempt, required, usable_height, "normalize: qr form compressing row gaps");
                continue;
            }

            // Proportional downscale, floored.
            let mut any_scaled = false;
            for id in &row_ids {
                if let Some(t) = ctx.session.get_mut(id).and_then(Item::as_text_mut) {
                    let next = (t.font_size * DOWNSCALE_STEP).max(FONT_FLOOR);
                    if next < t.font_size {
                        t.font_size = next;
                        any_scaled = true;
                    }
                }
            }
            if !any_scaled {
                warn!("normalize: qr form out of downscale headroom");
                break;
            }
            did_mutate = true;
            let snapshot: Vec<Item> = ctx.session.items().to_vec();
            current = ctx.scheduler.fresh_bounds(&snapshot, &needed).await;
        }

        // Stack rows top to bottom, keeping each row's left edge.
        let mut y = top_margin;
        for id in &row_ids {
            let Some(measured) = current.get(id) else { continue };
            let left = measured.x.max(side_margin);
            let target = Rect::new(left, y, measured.width, measured.height);
            let (dx, dy) = draw_to_center_offset(&target, &extent);
            if let Some(row) = ctx.session.get_mut(id) {
                if (row.x_offset - dx).abs() > f64::EPSILON || (row.y_offset - dy).abs() > f64::EPSILON {
                    row.x_offset = dx;
                    row.y_offset = dy;
                    did_mutate = true;
                }
            }
            y += measured.height + self::row_gap(ctx, id, gaps_compressed);
        }

        let snapshot: Vec<Item> = ctx.session.items().to_vec();
        current = ctx.scheduler.fresh_bounds(&snapshot, &needed).await;

        // Horizontal resolution: qr right of the column, shrunk to the
        // media floor if the preview is too narrow, then one more text
        // downscale round as the last resort.
        let floor = qr_floor(ctx.media);
        for _ in 0..2 {
            let column_right = row_ids
                .iter()
                .filter_map(|id| current.get(id))
                .map(Rect::right)
                .fold(side_margin, f64::max);
            let largest_font = row_ids
                .iter()
                .filter_map(|id| ctx.session.get(id).and_then(Item::as_text).map(|t| t.font_size))
                .fold(FONT_FLOOR, f64::max);
            let column_gap = largest_font * COLUMN_GAP_RATIO;

            let qr_size = ctx.session.get(&qr_id).and_then(Item::as_qr).map_or(0.0, |q| q.size);
            let available = extent.width - side_margin - (column_right + column_gap);
            let new_size = if qr_size <= available { qr_size } else { available.max(floor) };
            let qr_x = column_right + column_gap;
            let qr_target = Rect::new(qr_x, (extent.height - new_size) / 2.0, new_size, new_size);
            let (qdx, qdy) = draw_to_center_offset(&qr_target, &extent);
            if let Some(item) = ctx.session.get_mut(&qr_id) {
                item.x_offset = qdx;
                item.y_offset = qdy;
                if let Some(q) = item.as_qr_mut() {
                    if (q.size - new_size).abs() > f64::EPSILON {
                        q.size = new_size;
                    }
                }
                did_mutate = true;
            }

            let snapshot: Vec<Item> = ctx.session.items().to_vec();
            current = ctx.scheduler.fresh_bounds(&snapshot, &needed).await;
            if new_size + column_right + column_gap + side_margin <= extent.width {
                break;
            }

            // Floored qr still does not fit: downscale text one more round.
            debug!("normalize: qr form floored qr still overflows, downscaling text");
            for id in &row_ids {
                if let Some(t) = ctx.session.get_mut(id).and_then(Item::as_text_mut) {
                    t.font_size = (t.font_size * DOWNSCALE_STEP).max(FONT_FLOOR);
                }
            }
            let snapshot: Vec<Item> = ctx.session.items().to_vec();
            current = ctx.scheduler.fresh_bounds(&snapshot, &needed).await;
        }

        // Declare resolution only when order, gaps, and containment hold.
        let placement_resolved = self::verify(&row_ids, &qr_id, &current, &extent);
        if !placement_resolved {
            warn!("normalize: qr form placement unresolved");
            ctx.warnings.push("qr form: row or qr placement could not be fully resolved".into());
        }

        let shrunk = row_ids
            .iter()
            .filter_map(|id| ctx.session.get(id).and_then(Item::as_text).map(|t| t.font_size))
            .zip(&original_fonts)
            .any(|(now, was)| now < *was);
        if shrunk {
            debug!("normalize: qr form downscaled fonts to fit");
        }

        NormalizeOutcome { did_mutate, placement_resolved }
    }
}

fn row_gap(ctx: &NormalizeCtx<'_>, id: &ItemId, compressed: bool) -> f64 {
    if compressed {
        return ROW_GAP_MIN;
    }
    let font = ctx.session.get(id).and_then(Item::as_text).map_or(FONT_FLOOR, |t| t.font_size);
    (font * GAP_FONT_RATIO).max(ROW_GAP_MIN)
}

/// Row order, minimum gaps, and full qr containment.
fn verify(row_ids: &[ItemId], qr_id: &ItemId, bounds: &BoundsMap, extent: &crate::geometry::Extent) -> bool {
    let preview = Rect::new(0.0, 0.0, extent.width, extent.height);
    let Some(qr_rect) = bounds.get(qr_id) else {
        return false;
    };
    if !preview.contains(qr_rect) {
        return false;
    }
    let mut last_bottom = f64::MIN;
    for id in row_ids {
        let Some(rect) = bounds.get(id) else {
            return false;
        };
        if last_bottom > f64::MIN && rect.y - last_bottom < ROW_GAP_MIN - 1e-9 {
            return false;
        }
        if rect.intersects(qr_rect) {
            return false;
        }
        last_bottom = rect.bottom();
    }
    true
}

#[cfg(test)]
#[path = "qr_form_test.rs"]
mod tests;
