//! Generic fallback — applied when no structural intent was recognized.
//!
//! Does only the safe repairs: drops text fragments that literally repeat
//! part of a longer aggregate text item (a proposer that emitted one
//! monolithic block plus its pieces), clamps qr codes up to the media
//! prominence floor, and flags low confidence so the caller knows the
//! layout was left essentially as proposed.

use async_trait::async_trait;
use tracing::debug;

use crate::host::BoundsMap;
use crate::item::{Item, ItemId, ItemKind};

use super::{LOW_CONFIDENCE_WARNING, LayoutDetector, NormalizeCtx, NormalizeOutcome, qr_floor};

pub struct GenericFallback;

#[async_trait]
impl LayoutDetector for GenericFallback {
    fn name(&self) -> &'static str {
        "generic_fallback"
    }

    fn matches(&self, _items: &[Item], _bounds: &BoundsMap) -> bool {
        true
    }

    async fn apply(&self, ctx: &mut NormalizeCtx<'_>, _bounds: &BoundsMap) -> NormalizeOutcome {
        let mut did_mutate = false;

        // Duplicate-fragment dedup.
        let doomed = duplicate_fragment_ids(ctx.session.items());
        if !doomed.is_empty() {
            debug!(removed = doomed.len(), "normalize: dropping duplicate text fragments");
            ctx.session.remove_ids(&doomed);
            did_mutate = true;
        }

        // QR prominence floor.
        let floor = qr_floor(ctx.media);
        for item in ctx.session.items().to_vec() {
            if item.as_qr().is_some_and(|q| q.size < floor) {
                if let Some(q) = ctx.session.get_mut(&item.id).and_then(Item::as_qr_mut) {
                    debug!(id = %item.id, floor, "normalize: raising qr to prominence floor");
                    q.size = floor;
                    did_mutate = true;
                }
            }
        }

        ctx.warnings.push(LOW_CONFIDENCE_WARNING.into());
        NormalizeOutcome { did_mutate, placement_resolved: false }
    }
}

/// Ids of text items whose content is contained in a longer text item, or
/// which repeat an earlier identical one.
fn duplicate_fragment_ids(items: &[Item]) -> Vec<ItemId> {
    let texts: Vec<(&ItemId, &str)> = items
        .iter()
        .filter_map(|i| match &i.kind {
            ItemKind::Text(t) => Some((&i.id, t.text.as_str())),
            _ => None,
        })
        .collect();

    let mut doomed = Vec::new();
    for (index, (id, text)) in texts.iter().enumerate() {
        let fragment = text.trim();
        if fragment.len() < 2 {
            continue;
        }
        let redundant = texts.iter().enumerate().any(|(other_index, (_, other))| {
            if other_index == index {
                return false;
            }
            let other_trimmed = other.trim();
            if other_trimmed.len() > fragment.len() {
                other_trimmed.contains(fragment)
            } else {
                // Exact duplicate: the earlier occurrence survives.
                other_trimmed == fragment && other_index < index
            }
        });
        if redundant {
            doomed.push((*id).clone());
        }
    }
    doomed
}

#[cfg(test)]
#[path = "fallback_test.rs"]
mod tests;
