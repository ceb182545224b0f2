//! Inventory-card normalizer — the labeled three-field German stock card.
//!
//! Matches any item set that carries a qr item plus text mentioning the
//! three inventory field labels, in any arrangement, and rewrites it into
//! the canonical card: three underlined heading rows with their value rows
//! beneath, and the qr code to the right of the text column. Placement is
//! resolved against freshly rendered bounds and the qr shrinks until it no
//! longer collides with the text column.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::geometry::{Rect, draw_to_center_offset};
use crate::host::BoundsMap;
use crate::item::{Item, ItemId, ItemKind, PositionMode};

use super::{LayoutDetector, NormalizeCtx, NormalizeOutcome, qr_floor};

/// Field labels, lowercase, colon included. Matching is case-insensitive.
const FIELD_LABELS: [&str; 3] = ["artikelname:", "artikelnummer:", "lagerplatz:"];

/// Canonical heading casing for the rewritten card.
const HEADINGS: [&str; 3] = ["Artikelname:", "Artikelnummer:", "Lagerplatz:"];

/// Vertical row positions as fractions of preview height: heading rows and
/// the value rows beneath them.
const HEADING_ROW_FRACTIONS: [f64; 3] = [0.06, 0.38, 0.70];
const VALUE_ROW_FRACTIONS: [f64; 3] = [0.21, 0.53, 0.85];

/// Font size as a fraction of the media's max QR edge.
const FONT_RATIO: f64 = 0.16;

/// Left margin and text/qr gap as fractions of preview width.
const LEFT_MARGIN_RATIO: f64 = 0.04;
const COLUMN_GAP_RATIO: f64 = 0.03;

/// QR shrink factor per collision-resolution attempt.
const QR_SHRINK_STEP: f64 = 0.85;

const PLACEMENT_ATTEMPTS: u32 = 3;

pub struct InventoryCard;

// =============================================================================
// DETECTION
// =============================================================================

fn concatenated_text(items: &[Item]) -> String {
    let mut out = String::new();
    for item in items {
        if let ItemKind::Text(t) = &item.kind {
            out.push_str(&t.text);
            out.push('\n');
        }
    }
    out
}

/// Extract the value for one labeled field. The value may follow the label
/// on the same line or sit on the next non-empty line.
fn extract_value(text_lower: &str, original: &str, label: &str) -> String {
    let Some(pos) = text_lower.find(label) else {
        return String::new();
    };
    // Lowercasing can shift byte offsets for some characters; fall back to
    // the lowercased text if the index no longer hits a boundary.
    let after = original.get(pos + label.len()..).unwrap_or_else(|| {
        text_lower.get(pos + label.len()..).unwrap_or("")
    });
    let mut lines = after.lines();
    if let Some(same_line) = lines.next() {
        let same = same_line.trim();
        if !same.is_empty() {
            return same.to_string();
        }
    }
    for line in lines {
        let candidate = line.trim();
        if candidate.is_empty() {
            continue;
        }
        let lower = candidate.to_lowercase();
        if FIELD_LABELS.iter().any(|l| lower.starts_with(l) || lower.contains(l)) {
            // Ran into the next label before any value.
            return String::new();
        }
        return candidate.to_string();
    }
    String::new()
}

#[async_trait]
impl LayoutDetector for InventoryCard {
    fn name(&self) -> &'static str {
        "inventory_card"
    }

    fn matches(&self, items: &[Item], _bounds: &BoundsMap) -> bool {
        let has_text = items.iter().any(|i| matches!(i.kind, ItemKind::Text(_)));
        let has_qr = items.iter().any(|i| matches!(i.kind, ItemKind::Qr(_)));
        if !has_text || !has_qr {
            return false;
        }
        let text = concatenated_text(items).to_lowercase();
        FIELD_LABELS.iter().all(|label| text.contains(label))
    }

    async fn apply(&self, ctx: &mut NormalizeCtx<'_>, _bounds: &BoundsMap) -> NormalizeOutcome {
        let original = concatenated_text(ctx.session.items());
        let lower = original.to_lowercase();
        let values: Vec<String> = FIELD_LABELS
            .iter()
            .map(|label| extract_value(&lower, &original, label))
            .collect();

        // Carry qr payload fields over from the first qr item.
        let (qr_data, qr_ec) = ctx
            .session
            .items()
            .iter()
            .find_map(Item::as_qr)
            .map_or_else(|| (String::new(), "M".to_string()), |q| (q.data.clone(), q.qr_error_correction_level.clone()));

        let font_size = ctx.media.max_qr_size() * FONT_RATIO;
        let mut qr_size = ctx.media.max_qr_size();

        // Canonical template: three heading rows, three value rows, one qr.
        let mut replacement = Vec::with_capacity(7);
        let mut text_ids: Vec<ItemId> = Vec::with_capacity(6);
        for heading in HEADINGS {
            let item = card_text(heading, font_size, true);
            text_ids.push(item.id.clone());
            replacement.push(item);
        }
        for value in &values {
            let item = card_text(value, font_size, false);
            text_ids.push(item.id.clone());
            replacement.push(item);
        }
        let mut qr = Item::with_defaults("qr").expect("qr is a known type");
        qr.position_mode = PositionMode::Absolute;
        if let Some(q) = qr.as_qr_mut() {
            q.data = qr_data;
            q.qr_error_correction_level = qr_ec;
            q.size = qr_size;
        }
        let qr_id = qr.id.clone();
        replacement.push(qr);
        ctx.session.replace_all(replacement);
        debug!(values = ?values, "normalize: inventory card rewritten to canonical template");

        // Placement loop: measure, pin rows to their fractions, put the qr
        // right of the column, shrink on collision, re-measure.
        let extent = ctx.extent;
        let left_margin = extent.width * LEFT_MARGIN_RATIO;
        let column_gap = extent.width * COLUMN_GAP_RATIO;
        let floor = qr_floor(ctx.media);
        let mut placement_resolved = false;

        let mut needed: Vec<ItemId> = text_ids.clone();
        needed.push(qr_id.clone());

        for attempt in 0..PLACEMENT_ATTEMPTS {
            let items_snapshot: Vec<Item> = ctx.session.items().to_vec();
            let bounds = ctx.scheduler.fresh_bounds(&items_snapshot, &needed).await;

            // Pin text rows: left-aligned column at fixed vertical fractions.
            let fractions = HEADING_ROW_FRACTIONS.iter().chain(VALUE_ROW_FRACTIONS.iter());
            let mut column_right = left_margin;
            for (id, fraction) in text_ids.iter().zip(fractions) {
                let Some(measured) = bounds.get(id) else { continue };
                let target = Rect::new(left_margin, extent.height * fraction, measured.width, measured.height);
                let (dx, dy) = draw_to_center_offset(&target, &extent);
                if let Some(row) = ctx.session.get_mut(id) {
                    row.x_offset = dx;
                    row.y_offset = dy;
                }
                column_right = column_right.max(target.right());
            }

            // QR right of the column, vertically centered, shrunk to fit.
            let qr_x = column_right + column_gap;
            let available = (extent.width - column_gap - qr_x).max(0.0);
            if qr_size > available {
                qr_size = available.max(floor);
            }
            let qr_target = Rect::new(qr_x, (extent.height - qr_size) / 2.0, qr_size, qr_size);
            let (qdx, qdy) = draw_to_center_offset(&qr_target, &extent);
            if let Some(item) = ctx.session.get_mut(&qr_id) {
                item.x_offset = qdx;
                item.y_offset = qdy;
                if let Some(q) = item.as_qr_mut() {
                    q.size = qr_size;
                }
            }

            // Verify against fresh geometry: qr fully on the preview and
            // clear of every text row.
            let items_snapshot: Vec<Item> = ctx.session.items().to_vec();
            let bounds = ctx.scheduler.fresh_bounds(&items_snapshot, &needed).await;
            let preview = Rect::new(0.0, 0.0, extent.width, extent.height);
            let resolved = bounds.get(&qr_id).is_some_and(|qr_rect| {
                preview.contains(qr_rect)
                    && !text_ids
                        .iter()
                        .filter_map(|id| bounds.get(id))
                        .any(|row| row.intersects(qr_rect))
            });
            if resolved {
                placement_resolved = true;
                break;
            }
            if qr_size <= floor {
                break;
            }
            qr_size = (qr_size * QR_SHRINK_STEP).max(floor);
            debug!(attempt, qr_size, "normalize: inventory qr collides, shrinking");
        }

        if !placement_resolved {
            warn!("normalize: inventory card qr placement unresolved at floor size");
            ctx.warnings
                .push("inventory card: qr placement could not be fully resolved".into());
        }

        NormalizeOutcome { did_mutate: true, placement_resolved }
    }
}

fn card_text(text: &str, font_size: f64, heading: bool) -> Item {
    let mut item = Item::with_defaults("text").expect("text is a known type");
    item.position_mode = PositionMode::Absolute;
    if let Some(t) = item.as_text_mut() {
        t.text = text.to_string();
        t.font_size = font_size;
        t.text_bold = true;
        t.text_underline = heading;
    }
    item
}

#[cfg(test)]
#[path = "inventory_test.rs"]
mod tests;
