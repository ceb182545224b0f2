use super::*;
use crate::item::test_helpers::*;
use crate::item::Item;
use serde_json::json;

fn data(pairs: &[(&str, serde_json::Value)]) -> Data {
    pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
}

// =============================================================================
// canonical_key
// =============================================================================

#[test]
fn canonical_key_resolves_aliases() {
    assert_eq!(canonical_key("content"), "text");
    assert_eq!(canonical_key("font_size"), "fontSize");
    assert_eq!(canonical_key("x_offset"), "xOffset");
    assert_eq!(canonical_key("italic"), "textItalic");
    assert_eq!(canonical_key("format"), "barcodeFormat");
}

#[test]
fn canonical_key_passes_canonical_through() {
    assert_eq!(canonical_key("fontSize"), "fontSize");
    assert_eq!(canonical_key("text"), "text");
    assert_eq!(canonical_key("nonsense"), "nonsense");
}

// =============================================================================
// apply_changes — text
// =============================================================================

#[test]
fn text_changes_via_aliases() {
    let mut item = text_item("old");
    let mut warnings = Vec::new();
    let changes = data(&[
        ("content", json!("new text")),
        ("font_size", json!(18)),
        ("bold", json!(true)),
        ("underline", json!("true")),
    ]);
    apply_changes(&mut item, &changes, &mut warnings);
    let t = item.as_text().unwrap();
    assert_eq!(t.text, "new text");
    assert!((t.font_size - 18.0).abs() < f64::EPSILON);
    assert!(t.text_bold);
    assert!(t.text_underline);
    assert!(warnings.is_empty());
}

#[test]
fn unknown_field_is_rejected_with_warning() {
    let mut item = text_item("x");
    let mut warnings = Vec::new();
    apply_changes(&mut item, &data(&[("glitter", json!(true))]), &mut warnings);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("glitter"));
    assert!(warnings[0].contains("text"));
}

#[test]
fn ill_typed_value_is_rejected_with_warning() {
    let mut item = text_item("x");
    let mut warnings = Vec::new();
    apply_changes(&mut item, &data(&[("fontSize", json!({"nested": true}))]), &mut warnings);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("fontSize"));
    // original value untouched
    assert!((item.as_text().unwrap().font_size - 12.0).abs() < f64::EPSILON);
}

#[test]
fn numeric_strings_coerce() {
    let mut item = text_item("x");
    let mut warnings = Vec::new();
    apply_changes(&mut item, &data(&[("fontSize", json!("14.5")), ("xOffset", json!("3"))]), &mut warnings);
    assert!(warnings.is_empty());
    assert!((item.as_text().unwrap().font_size - 14.5).abs() < f64::EPSILON);
    assert!((item.x_offset - 3.0).abs() < f64::EPSILON);
}

// =============================================================================
// apply_changes — common fields
// =============================================================================

#[test]
fn position_mode_and_rotation() {
    let mut item = text_item("x");
    let mut warnings = Vec::new();
    let changes = data(&[("position_mode", json!("absolute")), ("rotation", json!(-90))]);
    apply_changes(&mut item, &changes, &mut warnings);
    assert_eq!(item.position_mode, crate::item::PositionMode::Absolute);
    assert!((item.rotation - 270.0).abs() < f64::EPSILON);
    assert!(warnings.is_empty());
}

// =============================================================================
// apply_changes — qr size invariant
// =============================================================================

#[test]
fn qr_width_drives_size() {
    let mut item = qr_item("d");
    let mut warnings = Vec::new();
    apply_changes(&mut item, &data(&[("width", json!(80.0))]), &mut warnings);
    assert!((item.as_qr().unwrap().size - 80.0).abs() < f64::EPSILON);
    assert!(warnings.is_empty());
}

#[test]
fn qr_width_and_height_smaller_wins() {
    let mut item = qr_item("d");
    let mut warnings = Vec::new();
    apply_changes(&mut item, &data(&[("width", json!(80.0)), ("height", json!(60.0))]), &mut warnings);
    assert!((item.as_qr().unwrap().size - 60.0).abs() < f64::EPSILON);
}

#[test]
fn qr_explicit_size_beats_width_height() {
    let mut item = qr_item("d");
    let mut warnings = Vec::new();
    apply_changes(&mut item, &data(&[("size", json!(50.0)), ("width", json!(80.0))]), &mut warnings);
    assert!((item.as_qr().unwrap().size - 50.0).abs() < f64::EPSILON);
}

#[test]
fn qr_serializes_without_independent_width_after_update() {
    let mut item = qr_item("d");
    let mut warnings = Vec::new();
    apply_changes(&mut item, &data(&[("width", json!(80.0)), ("height", json!(80.0))]), &mut warnings);
    let json = serde_json::to_value(&item).unwrap();
    assert!(json.get("width").is_none());
    assert!(json.get("height").is_none());
    assert!((json.get("size").unwrap().as_f64().unwrap() - 80.0).abs() < f64::EPSILON);
}

// =============================================================================
// apply_changes — barcode / shape
// =============================================================================

#[test]
fn barcode_width_height_apply_directly() {
    let mut item = barcode_item("123");
    let mut warnings = Vec::new();
    apply_changes(&mut item, &data(&[("width", json!(200.0)), ("height", json!(50.0))]), &mut warnings);
    let b = item.as_barcode().unwrap();
    assert!((b.width - 200.0).abs() < f64::EPSILON);
    assert!((b.height - 50.0).abs() < f64::EPSILON);
}

#[test]
fn shape_type_parses_wire_names() {
    let mut item = shape_item(crate::item::ShapeType::Rect);
    let mut warnings = Vec::new();
    apply_changes(&mut item, &data(&[("shape_type", json!("roundRect")), ("corner_radius", json!(4))]), &mut warnings);
    let s = item.as_shape().unwrap();
    assert_eq!(s.shape_type, crate::item::ShapeType::RoundRect);
    assert!((s.corner_radius - 4.0).abs() < f64::EPSILON);
}

// =============================================================================
// infer_item_type
// =============================================================================

#[test]
fn infer_defaults_to_text() {
    assert_eq!(infer_item_type(&data(&[("content", json!("hi"))])), "text");
    assert_eq!(infer_item_type(&Data::new()), "text");
}

#[test]
fn infer_qr_from_data_plus_size() {
    assert_eq!(infer_item_type(&data(&[("data", json!("x")), ("size", json!(40))])), "qr");
}

#[test]
fn infer_barcode_and_shape() {
    assert_eq!(infer_item_type(&data(&[("barcodeFormat", json!("ean13"))])), "barcode");
    assert_eq!(infer_item_type(&data(&[("shape_type", json!("line"))])), "shape");
}

// =============================================================================
// field_catalog
// =============================================================================

#[test]
fn field_catalog_covers_all_types() {
    for ty in ["text", "qr", "barcode", "shape", "image", "icon"] {
        let fields = field_catalog(ty);
        assert!(!fields.is_empty(), "no catalog for {ty}");
        assert!(fields.contains(&"rotation"));
    }
    assert!(field_catalog("qr").contains(&"size"));
    assert!(!field_catalog("qr").contains(&"width"));
    assert!(field_catalog("unknown").is_empty());
}

// =============================================================================
// defaults interplay
// =============================================================================

#[test]
fn apply_changes_on_fresh_default_item() {
    let mut item = Item::with_defaults("qr").unwrap();
    let mut warnings = Vec::new();
    apply_changes(&mut item, &data(&[("data", json!("INV-42")), ("error_correction", json!("H"))]), &mut warnings);
    let q = item.as_qr().unwrap();
    assert_eq!(q.data, "INV-42");
    assert_eq!(q.qr_error_correction_level, "H");
    assert!(warnings.is_empty());
}
