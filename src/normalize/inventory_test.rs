use std::sync::Arc;

use super::*;
use crate::geometry::Extent;
use crate::host::test_helpers::{FakeMedia, FakeRenderer};
use crate::item::test_helpers::*;
use crate::item::Session;
use crate::normalize::{NormalizeCtx, NormalizeOutcome};
use crate::render::RenderScheduler;

const EXTENT: Extent = Extent { width: 400.0, height: 160.0 };

async fn apply_to(items: Vec<crate::item::Item>, media: &FakeMedia) -> (Session, Vec<String>, NormalizeOutcome) {
    let mut session = seeded_session(items);
    let renderer = Arc::new(FakeRenderer::new(EXTENT));
    let scheduler = RenderScheduler::new(renderer);
    let mut warnings = Vec::new();
    let outcome = {
        let mut ctx = NormalizeCtx {
            session: &mut session,
            scheduler: &scheduler,
            media,
            extent: EXTENT,
            warnings: &mut warnings,
        };
        InventoryCard.apply(&mut ctx, &crate::host::BoundsMap::new()).await
    };
    (session, warnings, outcome)
}

// =============================================================================
// matches
// =============================================================================

#[test]
fn matches_needs_all_three_labels_and_a_qr() {
    let full = vec![
        text_item("Artikelname:\nSchraube\nArtikelnummer:\nA-100\nLagerplatz:\nR3"),
        qr_item("A-100"),
    ];
    assert!(InventoryCard.matches(&full, &crate::host::BoundsMap::new()));

    let missing_label = vec![text_item("Artikelname:\nSchraube"), qr_item("A-100")];
    assert!(!InventoryCard.matches(&missing_label, &crate::host::BoundsMap::new()));

    let no_qr = vec![text_item("Artikelname:\nX\nArtikelnummer:\nY\nLagerplatz:\nZ")];
    assert!(!InventoryCard.matches(&no_qr, &crate::host::BoundsMap::new()));
}

#[test]
fn matches_is_case_insensitive_and_spans_items() {
    let items = vec![
        text_item("ARTIKELNAME: Schraube"),
        text_item("artikelnummer: A-100"),
        text_item("Lagerplatz: R3-07"),
        qr_item("A-100"),
    ];
    assert!(InventoryCard.matches(&items, &crate::host::BoundsMap::new()));
}

// =============================================================================
// extract_value
// =============================================================================

#[test]
fn extract_value_same_line_and_next_line() {
    let original = "Artikelname: Schraube M4\nArtikelnummer:\nA-100\nLagerplatz:\nR3-07";
    let lower = original.to_lowercase();
    assert_eq!(extract_value(&lower, original, "artikelname:"), "Schraube M4");
    assert_eq!(extract_value(&lower, original, "artikelnummer:"), "A-100");
    assert_eq!(extract_value(&lower, original, "lagerplatz:"), "R3-07");
}

#[test]
fn extract_value_missing_stays_empty() {
    let original = "Artikelname:\nArtikelnummer: A-100\nLagerplatz: R1";
    let lower = original.to_lowercase();
    // Next non-empty line is another label, so the value is empty.
    assert_eq!(extract_value(&lower, original, "artikelname:"), "");
}

// =============================================================================
// apply — canonical template
// =============================================================================

#[tokio::test]
async fn apply_yields_six_text_and_one_qr() {
    let media = FakeMedia::new(96.0);
    let items = vec![
        text_item("Artikelname:\nSchraube M4\nArtikelnummer:\nA-100\nLagerplatz:\nR3-07"),
        qr_item("A-100"),
    ];
    let (session, _, outcome) = apply_to(items, &media).await;

    let texts: Vec<_> = session.items().iter().filter(|i| i.kind_name() == "text").collect();
    let qrs: Vec<_> = session.items().iter().filter(|i| i.kind_name() == "qr").collect();
    assert_eq!(texts.len(), 6);
    assert_eq!(qrs.len(), 1);
    assert!(outcome.did_mutate);

    // Headings first, underlined; every row bold.
    assert!(texts[0].as_text().unwrap().text_underline);
    assert!(texts[1].as_text().unwrap().text_underline);
    assert!(texts.iter().all(|t| t.as_text().unwrap().text_bold));

    // Values carried into the value rows.
    let contents: Vec<_> = texts.iter().map(|t| t.as_text().unwrap().text.clone()).collect();
    assert!(contents.contains(&"Schraube M4".to_string()));
    assert!(contents.contains(&"A-100".to_string()));
    assert!(contents.contains(&"R3-07".to_string()));
}

#[tokio::test]
async fn apply_replaces_redundant_fragments_too() {
    let media = FakeMedia::new(96.0);
    // A proposer that emitted a monolithic block plus fragments.
    let items = vec![
        text_item("Artikelname: Schraube\nArtikelnummer: A-100\nLagerplatz: R3"),
        text_item("Schraube"),
        text_item("A-100"),
        qr_item("A-100"),
        qr_item("A-100"),
    ];
    let (session, _, _) = apply_to(items, &media).await;
    assert_eq!(session.len(), 7);
    assert_eq!(session.items().iter().filter(|i| i.kind_name() == "qr").count(), 1);
}

#[tokio::test]
async fn apply_preserves_qr_payload() {
    let media = FakeMedia::new(96.0);
    let mut qr = qr_item("INV-0042");
    qr.as_qr_mut().unwrap().qr_error_correction_level = "H".into();
    let items = vec![
        text_item("Artikelname: X\nArtikelnummer: Y\nLagerplatz: Z"),
        qr,
    ];
    let (session, _, _) = apply_to(items, &media).await;
    let q = session.items().iter().find_map(crate::item::Item::as_qr).unwrap();
    assert_eq!(q.data, "INV-0042");
    assert_eq!(q.qr_error_correction_level, "H");
}

// =============================================================================
// apply — placement
// =============================================================================

#[tokio::test]
async fn apply_places_qr_clear_of_text_column() {
    let media = FakeMedia::new(96.0);
    let items = vec![
        text_item("Artikelname: Schraube\nArtikelnummer: A-100\nLagerplatz: R3"),
        qr_item("A-100"),
    ];
    let (session, warnings, outcome) = apply_to(items, &media).await;
    assert!(outcome.placement_resolved, "warnings: {warnings:?}");

    // Re-measure the final layout and assert no text/qr collision.
    let renderer = FakeRenderer::new(EXTENT);
    let bounds = renderer.measure(session.items());
    let qr_id = session.items().iter().find(|i| i.kind_name() == "qr").unwrap().id.clone();
    let qr_rect = bounds[&qr_id];
    for item in session.items().iter().filter(|i| i.kind_name() == "text") {
        assert!(!bounds[&item.id].intersects(&qr_rect), "text row collides with qr");
    }
}

#[tokio::test]
async fn apply_shrinks_qr_when_column_is_wide() {
    let media = FakeMedia::new(120.0);
    let items = vec![
        text_item("Artikelname: Sechskantschraube DIN 933\nArtikelnummer: A-100-X99\nLagerplatz: R3"),
        qr_item("A-100"),
    ];
    let (session, _, _) = apply_to(items, &media).await;
    let q = session.items().iter().find_map(crate::item::Item::as_qr).unwrap();
    assert!(q.size < 120.0, "qr should shrink below the media max, got {}", q.size);
    assert!(q.size >= 120.0 * crate::normalize::QR_FLOOR_RATIO - 1e-9);
}

#[tokio::test]
async fn apply_warns_when_floor_still_collides() {
    // Tiny preview: even the floored qr cannot clear the text column.
    let media = FakeMedia::new(200.0);
    let mut session = seeded_session(vec![
        text_item("Artikelname: Sechskantschraube verzinkt DIN 933 M4x40\nArtikelnummer: Y\nLagerplatz: Z"),
        qr_item("d"),
    ]);
    let renderer = Arc::new(FakeRenderer::new(Extent { width: 120.0, height: 60.0 }));
    let scheduler = RenderScheduler::new(renderer);
    let mut warnings = Vec::new();
    let outcome = {
        let mut ctx = NormalizeCtx {
            session: &mut session,
            scheduler: &scheduler,
            media: &media,
            extent: Extent { width: 120.0, height: 60.0 },
            warnings: &mut warnings,
        };
        InventoryCard.apply(&mut ctx, &crate::host::BoundsMap::new()).await
    };
    assert!(!outcome.placement_resolved);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("qr placement"));
}
