//! Item model: label elements and the in-memory session that owns them.
//!
//! DESIGN
//! ======
//! An `Item` is one element of a label layout. Common placement fields live
//! on the struct; the per-type payload is a typed tagged union (`ItemKind`)
//! rather than an open props bag, so unknown fields are rejected at the
//! aliasing layer instead of silently accumulating. Serialization uses the
//! proposer-facing camelCase vocabulary.
//!
//! The `Session` is the single owner of the ordered item list. Items are
//! created by `add_item`, mutated by `update_item` and the normalizers, and
//! removed by `clear_items` or pattern-driven dedup. Ids are UUID strings,
//! unique within a session.

use std::fmt::Write;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::normalize_rotation;

// =============================================================================
// ITEM
// =============================================================================

/// Unique identifier for an item within a session.
pub type ItemId = String;

/// How an item is placed: sequential flow along the feed axis plus an
/// offset, or purely by explicit offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionMode {
    Flow,
    Absolute,
}

/// One label element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub position_mode: PositionMode,
    pub x_offset: f64,
    pub y_offset: f64,
    /// Degrees, kept normalized into `[0, 360)` by every write path.
    pub rotation: f64,
    #[serde(flatten)]
    pub kind: ItemKind,
}

/// Per-type payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemKind {
    Text(TextItem),
    Qr(QrItem),
    Barcode(BarcodeItem),
    Shape(ShapeItem),
    Image(ImageItem),
    Icon(IconItem),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextItem {
    pub text: String,
    pub font_family: String,
    pub font_size: f64,
    pub text_bold: bool,
    pub text_italic: bool,
    pub text_underline: bool,
    pub text_strikethrough: bool,
}

/// QR payload. `size` is the single source of truth for both extents;
/// width/height are mirrored views and never stored independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrItem {
    pub data: String,
    pub size: f64,
    pub qr_error_correction_level: String,
    pub qr_version: Option<u8>,
    pub qr_encoding_mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeItem {
    pub data: String,
    pub width: f64,
    pub height: f64,
    pub barcode_format: String,
    pub barcode_show_text: bool,
    pub barcode_module_width: f64,
    pub barcode_margin: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeType {
    Rect,
    RoundRect,
    Oval,
    Polygon,
    Line,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeItem {
    pub shape_type: ShapeType,
    pub width: f64,
    pub height: f64,
    pub stroke_width: f64,
    pub corner_radius: f64,
    pub sides: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageItem {
    pub source: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconItem {
    pub icon: String,
    pub size: f64,
}

// =============================================================================
// DEFAULTS
// =============================================================================

impl Item {
    /// Create an item of the named type with type defaults. Returns `None`
    /// for an unknown type name.
    #[must_use]
    pub fn with_defaults(item_type: &str) -> Option<Self> {
        let kind = match item_type {
            "text" => ItemKind::Text(TextItem {
                text: String::new(),
                font_family: "default".into(),
                font_size: 12.0,
                text_bold: false,
                text_italic: false,
                text_underline: false,
                text_strikethrough: false,
            }),
            "qr" => ItemKind::Qr(QrItem {
                data: String::new(),
                size: 64.0,
                qr_error_correction_level: "M".into(),
                qr_version: None,
                qr_encoding_mode: "auto".into(),
            }),
            "barcode" => ItemKind::Barcode(BarcodeItem {
                data: String::new(),
                width: 120.0,
                height: 40.0,
                barcode_format: "code128".into(),
                barcode_show_text: true,
                barcode_module_width: 2.0,
                barcode_margin: 4.0,
            }),
            "shape" => ItemKind::Shape(ShapeItem {
                shape_type: ShapeType::Rect,
                width: 60.0,
                height: 40.0,
                stroke_width: 1.0,
                corner_radius: 0.0,
                sides: 5,
            }),
            "image" => ItemKind::Image(ImageItem { source: String::new(), width: 64.0, height: 64.0 }),
            "icon" => ItemKind::Icon(IconItem { icon: String::new(), size: 24.0 }),
            _ => return None,
        };
        Some(Self {
            id: Uuid::new_v4().to_string(),
            position_mode: PositionMode::Flow,
            x_offset: 0.0,
            y_offset: 0.0,
            rotation: 0.0,
            kind,
        })
    }

    /// Type name as used by the action vocabulary.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ItemKind::Text(_) => "text",
            ItemKind::Qr(_) => "qr",
            ItemKind::Barcode(_) => "barcode",
            ItemKind::Shape(_) => "shape",
            ItemKind::Image(_) => "image",
            ItemKind::Icon(_) => "icon",
        }
    }

    /// Set rotation, normalizing into `[0, 360)`.
    pub fn set_rotation(&mut self, deg: f64) {
        self.rotation = normalize_rotation(deg);
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&TextItem> {
        match &self.kind {
            ItemKind::Text(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text_mut(&mut self) -> Option<&mut TextItem> {
        match &mut self.kind {
            ItemKind::Text(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_qr(&self) -> Option<&QrItem> {
        match &self.kind {
            ItemKind::Qr(q) => Some(q),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_qr_mut(&mut self) -> Option<&mut QrItem> {
        match &mut self.kind {
            ItemKind::Qr(q) => Some(q),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_barcode(&self) -> Option<&BarcodeItem> {
        match &self.kind {
            ItemKind::Barcode(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_shape(&self) -> Option<&ShapeItem> {
        match &self.kind {
            ItemKind::Shape(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_shape_mut(&mut self) -> Option<&mut ShapeItem> {
        match &mut self.kind {
            ItemKind::Shape(s) => Some(s),
            _ => None,
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// The single in-memory item list for one editing session.
#[derive(Debug, Default)]
pub struct Session {
    items: Vec<Item>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append an item, normalizing its rotation. Returns the item id.
    pub fn push(&mut self, mut item: Item) -> ItemId {
        item.rotation = normalize_rotation(item.rotation);
        let id = item.id.clone();
        self.items.push(item);
        id
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    #[must_use]
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    #[must_use]
    pub fn first_id(&self) -> Option<ItemId> {
        self.items.first().map(|i| i.id.clone())
    }

    /// Remove every item whose id is in `ids`. Order of survivors is kept.
    pub fn remove_ids(&mut self, ids: &[ItemId]) {
        self.items.retain(|i| !ids.contains(&i.id));
    }

    /// Replace the whole item list. Used by normalizers that rewrite a
    /// recognized pattern into its canonical form.
    pub fn replace_all(&mut self, items: Vec<Item>) {
        self.items = items;
        for item in &mut self.items {
            item.rotation = normalize_rotation(item.rotation);
        }
    }

    /// Compact per-item summary, one line per item, for proposer context.
    #[must_use]
    pub fn snapshot_summary(&self) -> String {
        let mut out = String::new();
        if self.items.is_empty() {
            out.push_str("(empty label — no items yet)\n");
            return out;
        }
        for item in &self.items {
            let label = match &item.kind {
                ItemKind::Text(t) => t.text.clone(),
                ItemKind::Qr(q) => q.data.clone(),
                ItemKind::Barcode(b) => b.data.clone(),
                ItemKind::Shape(s) => format!("{:?}", s.shape_type),
                ItemKind::Image(i) => i.source.clone(),
                ItemKind::Icon(i) => i.icon.clone(),
            };
            let _ = writeln!(
                out,
                "- id={} type={} mode={:?} x={:.0} y={:.0} rot={:.0} label={label:?}",
                item.id,
                item.kind_name(),
                item.position_mode,
                item.x_offset,
                item.y_offset,
                item.rotation,
            );
        }
        out
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "item_test.rs"]
mod tests;
