//! Payload field aliasing and typed application of change maps.
//!
//! DESIGN
//! ======
//! Proposers are sloppy about field names: `content` for `text`,
//! `font_size` for `fontSize`, bare `italic` for `textItalic`. A static
//! alias table resolves every accepted spelling to one canonical camelCase
//! key; anything that resolves to no known field of the target item type is
//! rejected with an explicit warning naming the key, never silently
//! dropped. The one semantic alias is qr width/height: a qr is always
//! square, so either extent drives `size` (the smaller wins when both
//! appear) unless an explicit `size` is present.

use tracing::debug;

use crate::bridge::Data;
use crate::item::{Item, ItemKind, PositionMode, ShapeType};

// =============================================================================
// ALIAS TABLE
// =============================================================================

/// Accepted alias → canonical field name. Canonical names are the item
/// wire-form camelCase keys and resolve to themselves implicitly.
static FIELD_ALIASES: &[(&str, &str)] = &[
    ("content", "text"),
    ("value", "data"),
    ("font_family", "fontFamily"),
    ("font_size", "fontSize"),
    ("fontsize", "fontSize"),
    ("bold", "textBold"),
    ("italic", "textItalic"),
    ("underline", "textUnderline"),
    ("strikethrough", "textStrikethrough"),
    ("text_bold", "textBold"),
    ("text_italic", "textItalic"),
    ("text_underline", "textUnderline"),
    ("text_strikethrough", "textStrikethrough"),
    ("x", "xOffset"),
    ("y", "yOffset"),
    ("x_offset", "xOffset"),
    ("y_offset", "yOffset"),
    ("position_mode", "positionMode"),
    ("angle", "rotation"),
    ("shape_type", "shapeType"),
    ("stroke_width", "strokeWidth"),
    ("corner_radius", "cornerRadius"),
    ("format", "barcodeFormat"),
    ("barcode_format", "barcodeFormat"),
    ("show_text", "barcodeShowText"),
    ("barcode_show_text", "barcodeShowText"),
    ("module_width", "barcodeModuleWidth"),
    ("barcode_module_width", "barcodeModuleWidth"),
    ("margin", "barcodeMargin"),
    ("barcode_margin", "barcodeMargin"),
    ("error_correction", "qrErrorCorrectionLevel"),
    ("errorCorrectionLevel", "qrErrorCorrectionLevel"),
    ("qr_error_correction_level", "qrErrorCorrectionLevel"),
    ("qr_version", "qrVersion"),
    ("version", "qrVersion"),
    ("encoding_mode", "qrEncodingMode"),
    ("qr_encoding_mode", "qrEncodingMode"),
    ("src", "source"),
    ("image", "source"),
];

/// Resolve a payload key to its canonical field name.
#[must_use]
pub fn canonical_key(key: &str) -> &str {
    FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or(key, |(_, canonical)| *canonical)
}

/// Canonical field names accepted per item type, for capability reporting.
#[must_use]
pub fn field_catalog(item_type: &str) -> &'static [&'static str] {
    match item_type {
        "text" => &[
            "text",
            "fontFamily",
            "fontSize",
            "textBold",
            "textItalic",
            "textUnderline",
            "textStrikethrough",
            "positionMode",
            "xOffset",
            "yOffset",
            "rotation",
        ],
        "qr" => &[
            "data",
            "size",
            "qrErrorCorrectionLevel",
            "qrVersion",
            "qrEncodingMode",
            "positionMode",
            "xOffset",
            "yOffset",
            "rotation",
        ],
        "barcode" => &[
            "data",
            "width",
            "height",
            "barcodeFormat",
            "barcodeShowText",
            "barcodeModuleWidth",
            "barcodeMargin",
            "positionMode",
            "xOffset",
            "yOffset",
            "rotation",
        ],
        "shape" => &[
            "shapeType",
            "width",
            "height",
            "strokeWidth",
            "cornerRadius",
            "sides",
            "positionMode",
            "xOffset",
            "yOffset",
            "rotation",
        ],
        "image" => &["source", "width", "height", "positionMode", "xOffset", "yOffset", "rotation"],
        "icon" => &["icon", "size", "positionMode", "xOffset", "yOffset", "rotation"],
        _ => &[],
    }
}

/// Infer an item type from a change map, for rebuild-mode auto-creation of
/// missing targets. Text unless the fields say otherwise.
#[must_use]
pub fn infer_item_type(changes: &Data) -> &'static str {
    let has = |field: &str| changes.keys().any(|k| canonical_key(k) == field);
    if has("shapeType") {
        return "shape";
    }
    if has("barcodeFormat") || has("barcodeModuleWidth") || has("barcodeShowText") {
        return "barcode";
    }
    if has("data") && (has("size") || has("qrErrorCorrectionLevel") || has("qrVersion") || has("qrEncodingMode")) {
        return "qr";
    }
    "text"
}

// =============================================================================
// VALUE COERCION
// =============================================================================

fn value_f64(v: &serde_json::Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn value_bool(v: &serde_json::Value) -> Option<bool> {
    v.as_bool().or_else(|| {
        v.as_str().and_then(|s| match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        })
    })
}

fn value_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// =============================================================================
// CHANGE APPLICATION
// =============================================================================

/// Merge an aliased change map onto an item. Unknown or ill-typed fields
/// produce warnings and are skipped; everything else applies in place.
pub fn apply_changes(item: &mut Item, changes: &Data, warnings: &mut Vec<String>) {
    let kind_name = item.kind_name();
    let explicit_size = item.as_qr().is_some() && changes.keys().any(|k| canonical_key(k) == "size");
    // Smaller of width/height drives qr size when both appear in one map.
    let mut qr_size_candidate: Option<f64> = None;

    for (key, value) in changes {
        let canonical = canonical_key(key);
        match apply_one(item, canonical, value, &mut qr_size_candidate, explicit_size) {
            Applied::Ok => {}
            Applied::BadValue => warnings.push(format!("invalid value for `{key}` on {kind_name} item")),
            Applied::UnknownField => warnings.push(format!("unknown field `{key}` for {kind_name} item")),
        }
    }

    if let Some(size) = qr_size_candidate {
        if let Some(qr) = item.as_qr_mut() {
            qr.size = size;
            debug!(size, "bridge: qr width/height aliased to size");
        }
    }
}

enum Applied {
    Ok,
    BadValue,
    UnknownField,
}

fn apply_one(
    item: &mut Item,
    canonical: &str,
    value: &serde_json::Value,
    qr_size_candidate: &mut Option<f64>,
    explicit_size: bool,
) -> Applied {
    // Common placement fields first.
    match canonical {
        "positionMode" => {
            return match value.as_str() {
                Some("flow") => {
                    item.position_mode = PositionMode::Flow;
                    Applied::Ok
                }
                Some("absolute") => {
                    item.position_mode = PositionMode::Absolute;
                    Applied::Ok
                }
                _ => Applied::BadValue,
            };
        }
        "xOffset" => {
            return value_f64(value).map_or(Applied::BadValue, |v| {
                item.x_offset = v;
                Applied::Ok
            });
        }
        "yOffset" => {
            return value_f64(value).map_or(Applied::BadValue, |v| {
                item.y_offset = v;
                Applied::Ok
            });
        }
        "rotation" => {
            return value_f64(value).map_or(Applied::BadValue, |v| {
                item.set_rotation(v);
                Applied::Ok
            });
        }
        _ => {}
    }

    match &mut item.kind {
        ItemKind::Text(t) => match canonical {
            "text" => value_string(value).map_or(Applied::BadValue, |v| {
                t.text = v;
                Applied::Ok
            }),
            "fontFamily" => value_string(value).map_or(Applied::BadValue, |v| {
                t.font_family = v;
                Applied::Ok
            }),
            "fontSize" => value_f64(value).map_or(Applied::BadValue, |v| {
                t.font_size = v;
                Applied::Ok
            }),
            "textBold" => value_bool(value).map_or(Applied::BadValue, |v| {
                t.text_bold = v;
                Applied::Ok
            }),
            "textItalic" => value_bool(value).map_or(Applied::BadValue, |v| {
                t.text_italic = v;
                Applied::Ok
            }),
            "textUnderline" => value_bool(value).map_or(Applied::BadValue, |v| {
                t.text_underline = v;
                Applied::Ok
            }),
            "textStrikethrough" => value_bool(value).map_or(Applied::BadValue, |v| {
                t.text_strikethrough = v;
                Applied::Ok
            }),
            _ => Applied::UnknownField,
        },
        ItemKind::Qr(q) => match canonical {
            "data" => value_string(value).map_or(Applied::BadValue, |v| {
                q.data = v;
                Applied::Ok
            }),
            "size" => value_f64(value).map_or(Applied::BadValue, |v| {
                q.size = v;
                Applied::Ok
            }),
            // A qr is always square: either extent drives size unless an
            // explicit size accompanies it.
            "width" | "height" => value_f64(value).map_or(Applied::BadValue, |v| {
                if !explicit_size {
                    *qr_size_candidate = Some(qr_size_candidate.map_or(v, |c| c.min(v)));
                }
                Applied::Ok
            }),
            "qrErrorCorrectionLevel" => value_string(value).map_or(Applied::BadValue, |v| {
                q.qr_error_correction_level = v;
                Applied::Ok
            }),
            "qrVersion" => match value {
                serde_json::Value::Null => {
                    q.qr_version = None;
                    Applied::Ok
                }
                _ => value_f64(value).map_or(Applied::BadValue, |v| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    {
                        q.qr_version = Some(v as u8);
                    }
                    Applied::Ok
                }),
            },
            "qrEncodingMode" => value_string(value).map_or(Applied::BadValue, |v| {
                q.qr_encoding_mode = v;
                Applied::Ok
            }),
            _ => Applied::UnknownField,
        },
        ItemKind::Barcode(b) => match canonical {
            "data" => value_string(value).map_or(Applied::BadValue, |v| {
                b.data = v;
                Applied::Ok
            }),
            "width" => value_f64(value).map_or(Applied::BadValue, |v| {
                b.width = v;
                Applied::Ok
            }),
            "height" => value_f64(value).map_or(Applied::BadValue, |v| {
                b.height = v;
                Applied::Ok
            }),
            "barcodeFormat" => value_string(value).map_or(Applied::BadValue, |v| {
                b.barcode_format = v;
                Applied::Ok
            }),
            "barcodeShowText" => value_bool(value).map_or(Applied::BadValue, |v| {
                b.barcode_show_text = v;
                Applied::Ok
            }),
            "barcodeModuleWidth" => value_f64(value).map_or(Applied::BadValue, |v| {
                b.barcode_module_width = v;
                Applied::Ok
            }),
            "barcodeMargin" => value_f64(value).map_or(Applied::BadValue, |v| {
                b.barcode_margin = v;
                Applied::Ok
            }),
            _ => Applied::UnknownField,
        },
        ItemKind::Shape(s) => match canonical {
            "shapeType" => serde_json::from_value::<ShapeType>(value.clone()).map_or(Applied::BadValue, |v| {
                s.shape_type = v;
                Applied::Ok
            }),
            "width" => value_f64(value).map_or(Applied::BadValue, |v| {
                s.width = v;
                Applied::Ok
            }),
            "height" => value_f64(value).map_or(Applied::BadValue, |v| {
                s.height = v;
                Applied::Ok
            }),
            "strokeWidth" => value_f64(value).map_or(Applied::BadValue, |v| {
                s.stroke_width = v;
                Applied::Ok
            }),
            "cornerRadius" => value_f64(value).map_or(Applied::BadValue, |v| {
                s.corner_radius = v;
                Applied::Ok
            }),
            "sides" => value_f64(value).map_or(Applied::BadValue, |v| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    s.sides = (v.max(3.0)) as u32;
                }
                Applied::Ok
            }),
            _ => Applied::UnknownField,
        },
        ItemKind::Image(i) => match canonical {
            "source" => value_string(value).map_or(Applied::BadValue, |v| {
                i.source = v;
                Applied::Ok
            }),
            "width" => value_f64(value).map_or(Applied::BadValue, |v| {
                i.width = v;
                Applied::Ok
            }),
            "height" => value_f64(value).map_or(Applied::BadValue, |v| {
                i.height = v;
                Applied::Ok
            }),
            _ => Applied::UnknownField,
        },
        ItemKind::Icon(i) => match canonical {
            "icon" => value_string(value).map_or(Applied::BadValue, |v| {
                i.icon = v;
                Applied::Ok
            }),
            "size" => value_f64(value).map_or(Applied::BadValue, |v| {
                i.size = v;
                Applied::Ok
            }),
            _ => Applied::UnknownField,
        },
    }
}

#[cfg(test)]
#[path = "alias_test.rs"]
mod tests;
