//! Render reconciliation — fresh geometry before any normalization step.
//!
//! DESIGN
//! ======
//! The renderer is asynchronous and must never run two passes in parallel.
//! `RenderScheduler` is an explicit two-state coalescer: a refresh arriving
//! while a pass is in flight sets a single queued flag and is satisfied by
//! one rerun after the in-flight pass completes. Completions publish a
//! monotonic generation on a watch channel; queued callers wait for the
//! generation of the rerun that saw their items.
//!
//! `fresh_bounds` layers the stale-geometry defense on top: after a
//! mutation, request passes until every id a normalization step needs is
//! present in the map, bounded by a small retry ceiling. The ceiling is
//! soft: running out does not error, the caller proceeds with whatever
//! geometry is available and detector fit checks surface any fallout.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::geometry::Extent;
use crate::host::{BoundsMap, RenderSurface};
use crate::item::{Item, ItemId};

/// Render passes attempted per `fresh_bounds` call before proceeding with
/// an incomplete map.
pub const RENDER_RETRY_LIMIT: u32 = 3;

// =============================================================================
// SCHEDULER
// =============================================================================

#[derive(Default)]
struct SchedulerState {
    busy: bool,
    queued: bool,
    /// Items snapshot for the queued rerun. Last writer wins.
    pending_items: Option<Vec<Item>>,
    generation: u64,
    bounds: BoundsMap,
}

/// Coalescing front-end for a [`RenderSurface`].
pub struct RenderScheduler {
    surface: Arc<dyn RenderSurface>,
    state: Mutex<SchedulerState>,
    done: watch::Sender<u64>,
}

impl RenderScheduler {
    #[must_use]
    pub fn new(surface: Arc<dyn RenderSurface>) -> Self {
        let (done, _) = watch::channel(0);
        Self { surface, state: Mutex::new(SchedulerState::default()), done }
    }

    #[must_use]
    pub fn preview_extent(&self) -> Extent {
        self.surface.preview_extent()
    }

    /// Bounds map from the most recent completed pass.
    #[must_use]
    pub fn last_bounds(&self) -> BoundsMap {
        self.state.lock().unwrap().bounds.clone()
    }

    /// Request a render of `items` and return the bounds of a pass that
    /// started no earlier than this request.
    pub async fn refresh(&self, items: &[Item]) -> BoundsMap {
        let queued_until = {
            let mut st = self.state.lock().unwrap();
            if st.busy {
                st.queued = true;
                st.pending_items = Some(items.to_vec());
                // The in-flight pass completes as generation + 1; the rerun
                // carrying our items completes as generation + 2.
                Some(st.generation + 2)
            } else {
                st.busy = true;
                None
            }
        };

        let Some(target) = queued_until else {
            return self.drive(items.to_vec()).await;
        };
        debug!(target_generation = target, "render: request coalesced into queued rerun");
        let mut rx = self.done.subscribe();
        while *rx.borrow_and_update() < target {
            if rx.changed().await.is_err() {
                break;
            }
        }
        self.last_bounds()
    }

    /// Run passes until the queued flag stays clear. Only one task is ever
    /// inside this loop; the busy flag guards entry.
    async fn drive(&self, mut items: Vec<Item>) -> BoundsMap {
        loop {
            let bounds = self.surface.render(&items).await;
            let rerun = {
                let mut st = self.state.lock().unwrap();
                st.generation += 1;
                st.bounds = bounds.clone();
                let _ = self.done.send(st.generation);
                if st.queued {
                    st.queued = false;
                    if let Some(next) = st.pending_items.take() {
                        items = next;
                    }
                    true
                } else {
                    st.busy = false;
                    false
                }
            };
            if !rerun {
                return bounds;
            }
            debug!("render: rerunning for queued request");
        }
    }

    /// Refresh until every id in `needed` appears in the bounds map, up to
    /// [`RENDER_RETRY_LIMIT`] passes. Always returns a map; an incomplete
    /// one after the ceiling is the caller's problem to flag.
    pub async fn fresh_bounds(&self, items: &[Item], needed: &[ItemId]) -> BoundsMap {
        let mut bounds = BoundsMap::new();
        for attempt in 0..RENDER_RETRY_LIMIT {
            bounds = self.refresh(items).await;
            let missing = needed.iter().filter(|id| !bounds.contains_key(*id)).count();
            if missing == 0 {
                return bounds;
            }
            warn!(attempt, missing, "render: bounds incomplete, requesting fresh pass");
        }
        warn!(needed = needed.len(), "render: retry ceiling reached, proceeding with available geometry");
        bounds
    }
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
