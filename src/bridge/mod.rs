//! Action bridge — sequential interpreter for proposer action batches.
//!
//! DESIGN
//! ======
//! A batch is an ordered list of `{action: verb, ...payload}` maps. The
//! bridge resolves targets, merges aliased payloads onto the item list,
//! and reports structural problems as `E_*`-coded error strings without
//! aborting the rest of the batch. After the last action it reconciles
//! rendered geometry and hands the mutated item set to the normalization
//! chain.
//!
//! Two modes: normal editing reports unresolved targets as errors; rebuild
//! mode (explicit, or inferred from a clear-then-build batch shape)
//! favors self-correction: missing targets are auto-created and broad
//! alignment is suppressed when every selected item already carries
//! explicit offsets. Nothing in here panics or throws; every run returns
//! `{errors, warnings}`.

pub mod alias;
pub mod target;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::host::{AlignMode, AlignReference, MediaProfile, RenderSurface, SelectionSurface};
use crate::item::{Item, ItemId, Session};
use crate::normalize::{NormalizeCtx, run_chain};
use crate::render::RenderScheduler;

use target::BatchArena;

/// Flat key-value action payload.
pub type Data = HashMap<String, serde_json::Value>;

/// Offsets smaller than this count as "default placement" for rebuild-mode
/// align suppression.
const OFFSET_EPSILON: f64 = 1e-6;

// =============================================================================
// ERRORS
// =============================================================================

/// Grepable error code for structured error reporting.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("unknown action verb: {0}")]
    UnknownAction(String),
    #[error("unresolvable target: {0}")]
    UnknownTarget(String),
    #[error("invalid item type: {0}")]
    InvalidItemType(String),
    #[error("malformed action payload: {0}")]
    MalformedAction(String),
}

impl ErrorCode for BridgeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownAction(_) => "E_UNKNOWN_ACTION",
            Self::UnknownTarget(_) => "E_UNKNOWN_TARGET",
            Self::InvalidItemType(_) => "E_INVALID_ITEM_TYPE",
            Self::MalformedAction(_) => "E_MALFORMED_ACTION",
        }
    }
}

fn error_string(err: &BridgeError) -> String {
    format!("{}: {err}", err.error_code())
}

// =============================================================================
// RUN TYPES
// =============================================================================

/// Options for one batch run.
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    /// Explicit rebuild-mode flag. Inferred from the batch shape when absent.
    pub force_rebuild: Option<bool>,
    /// Medium to request from the media collaborator before running.
    pub preferred_media: Option<String>,
}

/// Result of one batch run. Errors are structural and coded; warnings are
/// recoverable ambiguity. An error never aborts the remaining actions.
#[derive(Debug, Default, Serialize)]
pub struct RunResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Accepted verbs and fields, for proposer prompt construction.
#[derive(Debug, Serialize)]
pub struct Capabilities {
    pub item_properties: HashMap<String, Vec<String>>,
    pub notes: Vec<String>,
}

// =============================================================================
// BRIDGE
// =============================================================================

pub struct ActionBridge {
    session: Session,
    scheduler: RenderScheduler,
    selection: Arc<dyn SelectionSurface>,
    media: Arc<dyn MediaProfile>,
}

impl ActionBridge {
    #[must_use]
    pub fn new(
        renderer: Arc<dyn RenderSurface>,
        selection: Arc<dyn SelectionSurface>,
        media: Arc<dyn MediaProfile>,
    ) -> Self {
        Self { session: Session::new(), scheduler: RenderScheduler::new(renderer), selection, media }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Accepted verbs and per-type fields for an upstream proposer.
    #[must_use]
    pub fn capabilities() -> Capabilities {
        let mut item_properties = HashMap::new();
        for ty in ["text", "qr", "barcode", "shape", "image", "icon"] {
            item_properties.insert(ty.to_string(), alias::field_catalog(ty).iter().map(ToString::to_string).collect());
        }
        Capabilities {
            item_properties,
            notes: vec![
                "verbs: add_item, update_item, clear_items, select_items, align_selected".into(),
                "targets: explicit ids, batch-virtual ids (item-1, item-2, ...), last, first, selected".into(),
                "qr items are square: size is authoritative, width/height are treated as size".into(),
                "a batch starting with clear_items followed by add/update runs in rebuild mode".into(),
            ],
        }
    }

    /// Execute an ordered action batch, then reconcile rendered geometry
    /// and normalize the result.
    pub async fn run_actions(&mut self, actions: &[serde_json::Value], options: RunOptions) -> RunResult {
        let force_rebuild = options.force_rebuild.unwrap_or_else(|| infer_rebuild(actions));
        info!(
            actions = actions.len(),
            force_rebuild,
            preferred_media = options.preferred_media.as_deref().unwrap_or("-"),
            "bridge: batch start"
        );
        if let Some(media) = &options.preferred_media {
            self.media.request_media(media);
        }

        let mut result = RunResult::default();
        let mut arena = BatchArena::new();

        for action in actions {
            let Some(verb) = action.get("action").and_then(|v| v.as_str()) else {
                result
                    .errors
                    .push(error_string(&BridgeError::MalformedAction("missing `action` field".into())));
                continue;
            };
            match verb {
                "add_item" => self.add_item(action, &mut arena, &mut result),
                "update_item" => self.update_item(action, &mut arena, &mut result, force_rebuild),
                "clear_items" => {
                    self.session.clear();
                    arena.reset();
                    debug!("bridge: items cleared");
                }
                "select_items" => self.select_items(action, &mut arena, &mut result, force_rebuild),
                "align_selected" => self.align_selected(action, &arena, &mut result, force_rebuild),
                other => {
                    warn!(verb = other, "bridge: unknown action verb");
                    result
                        .errors
                        .push(error_string(&BridgeError::UnknownAction(other.into())));
                }
            }
        }

        self.normalize(&mut result).await;

        info!(
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            items = self.session.len(),
            "bridge: batch complete"
        );
        result
    }

    // =========================================================================
    // VERBS
    // =========================================================================

    fn add_item(&mut self, action: &serde_json::Value, arena: &mut BatchArena, result: &mut RunResult) {
        let item_type = pick_str(action, &["itemType", "item_type", "type"]).unwrap_or("text");
        let Some(mut item) = Item::with_defaults(item_type) else {
            result
                .errors
                .push(error_string(&BridgeError::InvalidItemType(item_type.into())));
            return;
        };
        if let Some(payload) = pick_object(action, &["item", "fields", "properties"]) {
            alias::apply_changes(&mut item, &payload, &mut result.warnings);
        }
        let id = self.session.push(item);
        let virtual_id = arena.mint(id.clone());
        debug!(%id, %virtual_id, item_type, "bridge: item added");
    }

    fn update_item(
        &mut self,
        action: &serde_json::Value,
        arena: &mut BatchArena,
        result: &mut RunResult,
        force_rebuild: bool,
    ) {
        let Some(reference) = pick_str(action, &["itemId", "item_id", "target", "id"]) else {
            result
                .errors
                .push(error_string(&BridgeError::MalformedAction("update_item without target".into())));
            return;
        };
        let changes = pick_object(action, &["changes", "values", "item"]).unwrap_or_default();

        let targets = target::resolve_target(reference, &self.session, self.selection.as_ref(), arena);
        if targets.is_empty() {
            if force_rebuild {
                // A from-scratch proposer may not track ids precisely:
                // create what it meant to edit instead of failing.
                let inferred = alias::infer_item_type(&changes);
                let Some(mut item) = Item::with_defaults(inferred) else {
                    return;
                };
                alias::apply_changes(&mut item, &changes, &mut result.warnings);
                let id = self.session.push(item);
                arena.mint(id.clone());
                debug!(%id, reference, inferred, "bridge: rebuild auto-created missing target");
            } else {
                result
                    .errors
                    .push(error_string(&BridgeError::UnknownTarget(reference.into())));
            }
            return;
        }
        for id in targets {
            if let Some(item) = self.session.get_mut(&id) {
                alias::apply_changes(item, &changes, &mut result.warnings);
            }
        }
    }

    fn select_items(
        &mut self,
        action: &serde_json::Value,
        arena: &mut BatchArena,
        result: &mut RunResult,
        force_rebuild: bool,
    ) {
        let refs = pick_str_array(action, &["itemIds", "item_ids", "ids"]);
        let mut resolved: Vec<ItemId> = Vec::new();
        for reference in &refs {
            let ids = target::resolve_target(reference, &self.session, self.selection.as_ref(), arena);
            if ids.is_empty() {
                if force_rebuild {
                    debug!(%reference, "bridge: dropping unresolvable selection reference");
                } else {
                    result
                        .errors
                        .push(error_string(&BridgeError::UnknownTarget(reference.clone())));
                }
                continue;
            }
            for id in ids {
                if !resolved.contains(&id) {
                    resolved.push(id);
                }
            }
        }
        self.selection.set_selected(&resolved);
        arena.note_selection(resolved);
    }

    fn align_selected(
        &self,
        action: &serde_json::Value,
        arena: &BatchArena,
        result: &mut RunResult,
        force_rebuild: bool,
    ) {
        let mode = pick_str(action, &["mode"])
            .and_then(|m| serde_json::from_value::<AlignMode>(serde_json::Value::String(m.into())).ok());
        let Some(mode) = mode else {
            result
                .errors
                .push(error_string(&BridgeError::MalformedAction("align_selected without valid mode".into())));
            return;
        };
        let reference = pick_str(action, &["reference", "referenceFrame", "reference_frame"])
            .and_then(|r| serde_json::from_value::<AlignReference>(serde_json::Value::String(r.into())).ok())
            .unwrap_or(AlignReference::Canvas);

        if force_rebuild {
            // A rebuild's own normalization owns placement; a blind align
            // would wreck explicit repositioning done this batch.
            let selected = target::resolve_target("selected", &self.session, self.selection.as_ref(), arena);
            let all_explicit = !selected.is_empty()
                && selected.iter().all(|id| {
                    self.session
                        .get(id)
                        .is_some_and(|i| i.x_offset.abs() > OFFSET_EPSILON || i.y_offset.abs() > OFFSET_EPSILON)
                });
            if all_explicit {
                info!(?mode, "bridge: align suppressed in rebuild mode, offsets are explicit");
                return;
            }
        }

        let outcome = self.selection.align_selected(mode, reference);
        info!(?mode, ?reference, changed = outcome.changed, count = outcome.count, "bridge: align delegated");
        if !outcome.changed {
            if let Some(reason) = outcome.reason {
                result.warnings.push(format!("align_selected: {reason}"));
            }
        }
    }

    // =========================================================================
    // NORMALIZATION
    // =========================================================================

    async fn normalize(&mut self, result: &mut RunResult) {
        if self.session.is_empty() {
            debug!("bridge: empty item list, skipping normalization");
            return;
        }
        let items: Vec<Item> = self.session.items().to_vec();
        let needed: Vec<ItemId> = items.iter().map(|i| i.id.clone()).collect();
        let bounds = self.scheduler.fresh_bounds(&items, &needed).await;
        let extent = self.scheduler.preview_extent();
        let mut ctx = NormalizeCtx {
            session: &mut self.session,
            scheduler: &self.scheduler,
            media: self.media.as_ref(),
            extent,
            warnings: &mut result.warnings,
        };
        run_chain(&mut ctx, &bounds).await;
    }
}

// =============================================================================
// BATCH SHAPE
// =============================================================================

/// A batch that wipes the list and then only builds is a from-scratch
/// rebuild, even without the explicit flag.
fn infer_rebuild(actions: &[serde_json::Value]) -> bool {
    let mut verbs = actions.iter().map(|a| a.get("action").and_then(|v| v.as_str()).unwrap_or(""));
    let Some(first) = verbs.next() else {
        return false;
    };
    first == "clear_items" && verbs.all(|v| matches!(v, "add_item" | "update_item"))
}

// =============================================================================
// PAYLOAD HELPERS
// =============================================================================

fn pick_str<'a>(action: &'a serde_json::Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| action.get(k).and_then(|v| v.as_str()))
}

fn pick_object(action: &serde_json::Value, keys: &[&str]) -> Option<Data> {
    keys.iter().find_map(|k| {
        action
            .get(k)
            .and_then(|v| v.as_object())
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    })
}

fn pick_str_array(action: &serde_json::Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|k| action.get(k).and_then(|v| v.as_array()))
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "bridge_test.rs"]
mod tests;
