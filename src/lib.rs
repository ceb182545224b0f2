//! Action-driven label layout engine.
//!
//! An external proposer (a human, or an automated assistant working from a
//! description) edits a label through a small vocabulary of discrete
//! actions. This crate interprets those batches against an in-memory item
//! list, reconciles the result with asynchronously rendered geometry, and
//! deterministically repairs recognized structural patterns (inventory
//! cards, heading/value QR forms, boxed barcode forms) into clean,
//! collision-free layouts even when the proposed actions were imprecise,
//! redundant, or geometrically inconsistent.
//!
//! Rendering, printing, selection UI, and media handling live in host
//! collaborators behind the traits in [`host`].
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`bridge`] | Action batch interpreter, target resolution, capabilities |
//! | [`normalize`] | Pattern detectors and canonical-layout normalizers |
//! | [`render`] | Render request coalescing and fresh-bounds reconciliation |
//! | [`item`] | Item model and the session-owned item list |
//! | [`geometry`] | Rotation-aware bounding-box math and offset conversions |
//! | [`host`] | Collaborator surfaces: renderer, selection, media |

pub mod bridge;
pub mod geometry;
pub mod host;
pub mod item;
pub mod normalize;
pub mod render;

pub use bridge::{ActionBridge, Capabilities, RunOptions, RunResult};
pub use geometry::{Extent, Rect};
pub use host::{AlignMode, AlignOutcome, AlignReference, BoundsMap, MediaProfile, RenderSurface, SelectionSurface};
pub use item::{Item, ItemId, ItemKind, PositionMode, Session, ShapeType};
pub use normalize::LOW_CONFIDENCE_WARNING;
