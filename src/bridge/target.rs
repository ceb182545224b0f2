//! Target resolution — symbolic, virtual, and literal item references.
//!
//! DESIGN
//! ======
//! A batch refers to items three ways: symbolic names (`last`, `first`,
//! `selected`), virtual ids minted while the batch runs (`item-<n>`,
//! sequential, independent of persisted ids), and literal ids from the live
//! list. The `BatchArena` is a scoped symbol table for the first two. It
//! lives exactly as long as one batch and is discarded (or reset by
//! `clear_items`) without ever touching the persistent id namespace.
//!
//! `selected` reads the external selection surface, which may lag the item
//! list by a render cycle. When the surface reports empty but this batch's
//! own `select_items` recorded a non-empty list, the batch snapshot wins;
//! a transient empty read must not look like "nothing selected".

use std::collections::HashMap;

use tracing::debug;

use crate::host::SelectionSurface;
use crate::item::{ItemId, Session};

// =============================================================================
// BATCH ARENA
// =============================================================================

/// Per-batch bookkeeping, discarded at batch end.
#[derive(Debug, Default)]
pub struct BatchArena {
    counter: usize,
    virtual_ids: HashMap<String, ItemId>,
    last_added: Option<ItemId>,
    selection_snapshot: Option<Vec<ItemId>>,
}

impl BatchArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next virtual id (`item-1`, `item-2`, …) for a freshly added
    /// item and remember it as `last`.
    pub fn mint(&mut self, real_id: ItemId) -> String {
        self.counter += 1;
        let virtual_id = format!("item-{}", self.counter);
        self.virtual_ids.insert(virtual_id.clone(), real_id.clone());
        self.last_added = Some(real_id);
        virtual_id
    }

    #[must_use]
    pub fn last_added(&self) -> Option<&ItemId> {
        self.last_added.as_ref()
    }

    /// Record the id list pushed by this batch's `select_items`.
    pub fn note_selection(&mut self, ids: Vec<ItemId>) {
        self.selection_snapshot = Some(ids);
    }

    #[must_use]
    pub fn selection_snapshot(&self) -> Option<&[ItemId]> {
        self.selection_snapshot.as_deref()
    }

    /// Reset all batch-local bookkeeping. Used by `clear_items`.
    pub fn reset(&mut self) {
        self.counter = 0;
        self.virtual_ids.clear();
        self.last_added = None;
        self.selection_snapshot = None;
    }

    #[must_use]
    fn lookup_virtual(&self, reference: &str) -> Option<&ItemId> {
        self.virtual_ids.get(reference)
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Resolve a reference string to concrete item ids. Empty result means the
/// target could not be resolved; how that is handled depends on the batch
/// mode (rebuild auto-creates, normal mode reports an error).
#[must_use]
pub fn resolve_target(
    reference: &str,
    session: &Session,
    selection: &dyn SelectionSurface,
    arena: &BatchArena,
) -> Vec<ItemId> {
    match reference {
        "last" => arena.last_added().cloned().into_iter().collect(),
        "first" => session.first_id().into_iter().collect(),
        "selected" => {
            let surface_ids: Vec<ItemId> = selection
                .selected()
                .into_iter()
                .filter(|id| session.get(id).is_some())
                .collect();
            if surface_ids.is_empty() {
                if let Some(snapshot) = arena.selection_snapshot() {
                    if !snapshot.is_empty() {
                        debug!("target: selection surface read empty, using batch snapshot");
                        return snapshot.to_vec();
                    }
                }
            }
            surface_ids
        }
        _ => {
            if let Some(real) = arena.lookup_virtual(reference) {
                if session.get(real).is_some() {
                    return vec![real.clone()];
                }
            }
            session.get(reference).map(|i| i.id.clone()).into_iter().collect()
        }
    }
}

#[cfg(test)]
#[path = "target_test.rs"]
mod tests;
