//! Boxed-barcode-form normalizer — code tables framed by rule lines.
//!
//! The target structure is a framed form: repeated code-like text rows, one
//! barcode, and rule lines separating header, body, and columns. Structure
//! is expressed by dividers, not by underlined text, so underline styling
//! is stripped from code rows. Divider and frame positions are computed as
//! deterministic fractions of the frame in center-relative coordinates and
//! converted into the shapes' own top-left offset system, so the same form
//! lands identically on any preview size. Geometrically equivalent shapes
//! that already exist are snapped into place, never duplicated.
//!
//! The rotated side-text + single-big-letter composition is a different
//! template entirely and is left untouched.

use async_trait::async_trait;
use tracing::debug;

use crate::geometry::{Rect, center_offset_to_draw, draw_to_center_offset};
use crate::host::BoundsMap;
use crate::item::{Item, ItemKind, PositionMode, ShapeType};

use super::{BARCODE_MIN_HEIGHT_RATIO, BARCODE_MIN_WIDTH_RATIO, CHAR_PROMINENCE_RATIO, LayoutDetector, NormalizeCtx, NormalizeOutcome};

/// Frame inset from the preview edges, as a fraction of each extent.
const FRAME_MARGIN_RATIO: f64 = 0.03;

/// Divider positions as fractions of the frame extent.
const HEADER_FRACTION: f64 = 0.28;
const MID_FRACTION: f64 = 0.64;
const VERTICAL_FRACTION: f64 = 0.55;

/// Position tolerance for recognizing an existing divider/frame as
/// geometrically equivalent, as a fraction of the frame extent.
const EQUIVALENCE_TOLERANCE_RATIO: f64 = 0.04;

const DIVIDER_STROKE: f64 = 1.0;

pub struct BoxedBarcodeForm;

// =============================================================================
// DETECTION
// =============================================================================

/// Code-like: at least four characters, at least one digit, and nothing but
/// uppercase letters, digits, and common code separators.
fn code_like(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.len() < 4 || !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    trimmed
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.' | '/' | ' '))
}

fn side_rotated(item: &Item) -> bool {
    (item.rotation - 90.0).abs() < 1.0 || (item.rotation - 270.0).abs() < 1.0
}

fn single_letter(item: &Item) -> bool {
    item.as_text().is_some_and(|t| t.text.trim().chars().count() == 1)
}

#[async_trait]
impl LayoutDetector for BoxedBarcodeForm {
    fn name(&self) -> &'static str {
        "boxed_barcode_form"
    }

    fn matches(&self, items: &[Item], _bounds: &BoundsMap) -> bool {
        let barcode_count = items.iter().filter(|i| matches!(i.kind, ItemKind::Barcode(_))).count();
        if barcode_count != 1 {
            return false;
        }
        // Only text, barcode, and divider/frame shapes belong to this form.
        if !items
            .iter()
            .all(|i| matches!(i.kind, ItemKind::Text(_) | ItemKind::Barcode(_) | ItemKind::Shape(_)))
        {
            return false;
        }

        let code_rows = items
            .iter()
            .filter(|i| i.as_text().is_some_and(|t| code_like(&t.text)))
            .count();
        if code_rows < 2 {
            return false;
        }

        // The rotated side-text + single-big-letter "photo" composition is a
        // different template; leave it alone.
        let has_side_text = items.iter().any(|i| matches!(i.kind, ItemKind::Text(_)) && side_rotated(i));
        let has_big_letter = items.iter().any(single_letter);
        !(has_side_text && has_big_letter)
    }

    async fn apply(&self, ctx: &mut NormalizeCtx<'_>, _bounds: &BoundsMap) -> NormalizeOutcome {
        let extent = ctx.extent;
        let margin_x = extent.width * FRAME_MARGIN_RATIO;
        let margin_y = extent.height * FRAME_MARGIN_RATIO;
        let frame = Rect::new(margin_x, margin_y, extent.width - 2.0 * margin_x, extent.height - 2.0 * margin_y);
        let tol_x = frame.width * EQUIVALENCE_TOLERANCE_RATIO;
        let tol_y = frame.height * EQUIVALENCE_TOLERANCE_RATIO;

        let mut did_mutate = false;

        // Frame rectangle first, then the three dividers.
        did_mutate |= ensure_shape(ctx, &frame, ShapeTarget::Frame, tol_x, tol_y);

        let header = Rect::new(frame.x, frame.y + frame.height * HEADER_FRACTION, frame.width, DIVIDER_STROKE);
        did_mutate |= ensure_shape(ctx, &header, ShapeTarget::HorizontalDivider, tol_x, tol_y);

        let mid = Rect::new(frame.x, frame.y + frame.height * MID_FRACTION, frame.width, DIVIDER_STROKE);
        did_mutate |= ensure_shape(ctx, &mid, ShapeTarget::HorizontalDivider, tol_x, tol_y);

        let vertical_top = header.bottom();
        let vertical = Rect::new(
            frame.x + frame.width * VERTICAL_FRACTION,
            vertical_top,
            DIVIDER_STROKE,
            frame.bottom() - vertical_top,
        );
        did_mutate |= ensure_shape(ctx, &vertical, ShapeTarget::VerticalDivider, tol_x, tol_y);

        // Dividers, not underlines, carry the structure.
        for item in ctx.session.items().to_vec() {
            let is_code_row = item.as_text().is_some_and(|t| code_like(&t.text) && t.text_underline);
            if is_code_row {
                if let Some(t) = ctx.session.get_mut(&item.id).and_then(Item::as_text_mut) {
                    t.text_underline = false;
                    did_mutate = true;
                }
            }
        }

        // Prominence floors, scaled to the media.
        let max_qr = ctx.media.max_qr_size();
        let min_barcode_w = max_qr * BARCODE_MIN_WIDTH_RATIO;
        let min_barcode_h = max_qr * BARCODE_MIN_HEIGHT_RATIO;
        let min_char_font = max_qr * CHAR_PROMINENCE_RATIO;
        for item in ctx.session.items().to_vec() {
            match &item.kind {
                ItemKind::Barcode(b) if b.width < min_barcode_w || b.height < min_barcode_h => {
                    if let Some(live) = ctx.session.get_mut(&item.id) {
                        if let ItemKind::Barcode(b) = &mut live.kind {
                            b.width = b.width.max(min_barcode_w);
                            b.height = b.height.max(min_barcode_h);
                            did_mutate = true;
                        }
                    }
                }
                ItemKind::Text(t) if t.text.trim().chars().count() == 1 && t.font_size < min_char_font => {
                    if let Some(live) = ctx.session.get_mut(&item.id).and_then(Item::as_text_mut) {
                        live.font_size = min_char_font;
                        did_mutate = true;
                    }
                }
                _ => {}
            }
        }

        if did_mutate {
            debug!("normalize: boxed barcode form structure ensured");
        }
        NormalizeOutcome { did_mutate, placement_resolved: true }
    }
}

// =============================================================================
// SHAPE ENSURE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeTarget {
    Frame,
    HorizontalDivider,
    VerticalDivider,
}

fn is_candidate(item: &Item, target: ShapeTarget) -> bool {
    let Some(shape) = item.as_shape() else {
        return false;
    };
    match target {
        ShapeTarget::Frame => matches!(shape.shape_type, ShapeType::Rect | ShapeType::RoundRect),
        ShapeTarget::HorizontalDivider => shape.shape_type == ShapeType::Line && shape.width >= shape.height,
        ShapeTarget::VerticalDivider => shape.shape_type == ShapeType::Line && shape.height > shape.width,
    }
}

/// True when an existing candidate shape sits within tolerance of the
/// target, compared in center-relative coordinates.
fn equivalent(item: &Item, target_rect: &Rect, target: ShapeTarget, extent: &crate::geometry::Extent, tol_x: f64, tol_y: f64) -> bool {
    let Some(shape) = item.as_shape() else {
        return false;
    };
    // Shapes position by draw-space top-left; compare center offsets.
    let current = Rect::new(item.x_offset, item.y_offset, shape.width, shape.height);
    let (cdx, cdy) = draw_to_center_offset(&current, extent);
    let (tdx, tdy) = draw_to_center_offset(target_rect, extent);
    match target {
        // A frame is equivalent when both center and size roughly agree.
        ShapeTarget::Frame => {
            (cdx - tdx).abs() <= tol_x
                && (cdy - tdy).abs() <= tol_y
                && (shape.width - target_rect.width).abs() <= 2.0 * tol_x
                && (shape.height - target_rect.height).abs() <= 2.0 * tol_y
        }
        // A divider is equivalent when it sits on the same rule line.
        ShapeTarget::HorizontalDivider => (cdy - tdy).abs() <= tol_y,
        ShapeTarget::VerticalDivider => (cdx - tdx).abs() <= tol_x,
    }
}

/// Snap an existing equivalent shape onto the target, or add the missing
/// one. Returns whether the session changed.
fn ensure_shape(ctx: &mut NormalizeCtx<'_>, target_rect: &Rect, target: ShapeTarget, tol_x: f64, tol_y: f64) -> bool {
    let extent = ctx.extent;
    let existing = ctx
        .session
        .items()
        .iter()
        .find(|i| is_candidate(i, target) && equivalent(i, target_rect, target, &extent, tol_x, tol_y))
        .map(|i| i.id.clone());

    // The target's own offset system is draw-space top-left; the fraction
    // math above was center-relative, so convert at write time.
    let (tdx, tdy) = draw_to_center_offset(target_rect, &extent);
    let (write_x, write_y) = center_offset_to_draw(tdx, tdy, target_rect.width, target_rect.height, &extent);

    if let Some(id) = existing {
        let Some(item) = ctx.session.get_mut(&id) else {
            return false;
        };
        let moved = (item.x_offset - write_x).abs() > 1e-9 || (item.y_offset - write_y).abs() > 1e-9;
        item.position_mode = PositionMode::Absolute;
        item.x_offset = write_x;
        item.y_offset = write_y;
        let mut resized = false;
        if let Some(shape) = item.as_shape_mut() {
            resized = (shape.width - target_rect.width).abs() > 1e-9 || (shape.height - target_rect.height).abs() > 1e-9;
            shape.width = target_rect.width;
            shape.height = target_rect.height;
        }
        moved || resized
    } else {
        let mut item = Item::with_defaults("shape").expect("shape is a known type");
        item.position_mode = PositionMode::Absolute;
        item.x_offset = write_x;
        item.y_offset = write_y;
        if let Some(shape) = item.as_shape_mut() {
            shape.shape_type = if target == ShapeTarget::Frame { ShapeType::Rect } else { ShapeType::Line };
            shape.width = target_rect.width;
            shape.height = target_rect.height;
            shape.stroke_width = DIVIDER_STROKE;
        }
        debug!(?target, "normalize: adding missing form shape");
        ctx.session.push(item);
        true
    }
}

#[cfg(test)]
#[path = "barcode_form_test.rs"]
mod tests;
