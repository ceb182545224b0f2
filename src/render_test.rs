use std::sync::Arc;

use super::*;
use crate::geometry::Extent;
use crate::host::test_helpers::FakeRenderer;
use crate::item::test_helpers::*;

fn scheduler_with_renderer() -> (RenderScheduler, Arc<FakeRenderer>) {
    let renderer = Arc::new(FakeRenderer::new(Extent { width: 320.0, height: 120.0 }));
    (RenderScheduler::new(renderer.clone()), renderer)
}

// =============================================================================
// refresh
// =============================================================================

#[tokio::test]
async fn refresh_returns_bounds_for_all_items() {
    let (sched, _) = scheduler_with_renderer();
    let items = vec![text_item("hello"), qr_item("data")];
    let bounds = sched.refresh(&items).await;
    assert_eq!(bounds.len(), 2);
    for item in &items {
        assert!(bounds.contains_key(&item.id));
    }
}

#[tokio::test]
async fn refresh_publishes_last_bounds() {
    let (sched, _) = scheduler_with_renderer();
    let items = vec![text_item("hello")];
    let bounds = sched.refresh(&items).await;
    assert_eq!(sched.last_bounds().len(), bounds.len());
}

#[tokio::test]
async fn concurrent_refreshes_coalesce_into_queued_rerun() {
    let (sched, renderer) = scheduler_with_renderer();
    let items_a = vec![text_item("a")];
    let items_b = vec![text_item("b")];

    let (bounds_a, bounds_b) = tokio::join!(sched.refresh(&items_a), sched.refresh(&items_b));

    // Two requests, one in-flight pass plus one rerun, never three passes.
    assert_eq!(renderer.pass_count(), 2);
    assert!(!bounds_a.is_empty());
    assert!(!bounds_b.is_empty());
    // The queued caller sees the rerun, which measured its own items.
    assert!(bounds_b.contains_key(&items_b[0].id));
}

#[tokio::test]
async fn sequential_refreshes_run_one_pass_each() {
    let (sched, renderer) = scheduler_with_renderer();
    let items = vec![text_item("a")];
    sched.refresh(&items).await;
    sched.refresh(&items).await;
    assert_eq!(renderer.pass_count(), 2);
}

// =============================================================================
// fresh_bounds
// =============================================================================

#[tokio::test]
async fn fresh_bounds_complete_on_first_pass() {
    let (sched, renderer) = scheduler_with_renderer();
    let items = vec![text_item("a"), qr_item("q")];
    let needed: Vec<_> = items.iter().map(|i| i.id.clone()).collect();
    let bounds = sched.fresh_bounds(&items, &needed).await;
    assert_eq!(bounds.len(), 2);
    assert_eq!(renderer.pass_count(), 1);
}

#[tokio::test]
async fn fresh_bounds_retries_past_lagging_renderer() {
    let (sched, renderer) = scheduler_with_renderer();
    renderer.lag_for(2);
    let items = vec![text_item("a")];
    let needed = vec![items[0].id.clone()];
    let bounds = sched.fresh_bounds(&items, &needed).await;
    // Two stale passes, then the third catches up.
    assert_eq!(renderer.pass_count(), 3);
    assert!(bounds.contains_key(&items[0].id));
}

#[tokio::test]
async fn fresh_bounds_ceiling_is_soft() {
    let (sched, renderer) = scheduler_with_renderer();
    renderer.lag_for(10);
    let items = vec![text_item("a")];
    let needed = vec![items[0].id.clone()];
    let bounds = sched.fresh_bounds(&items, &needed).await;
    // Ceiling reached: proceeds with the incomplete map instead of erroring.
    assert_eq!(renderer.pass_count(), RENDER_RETRY_LIMIT);
    assert!(bounds.is_empty());
}

#[tokio::test]
async fn fresh_bounds_no_needed_ids_single_pass() {
    let (sched, renderer) = scheduler_with_renderer();
    let items = vec![text_item("a")];
    let _ = sched.fresh_bounds(&items, &[]).await;
    assert_eq!(renderer.pass_count(), 1);
}
