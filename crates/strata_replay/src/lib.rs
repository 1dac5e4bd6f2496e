//! STRATA Replay and Diff
//!
//! Deterministic reconstruction of entity snapshots by folding the
//! changelog in canonical order, and derivation of new changelog drafts
//! from the difference between an authoritative definition and its last
//! materialized snapshot.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;
pub mod engine;
pub mod snapshot;

pub use diff::{DiffEngine, EntityDiff, FieldsChange, RelationshipsChange};
pub use engine::{ReplayEngine, ReplayState};
pub use snapshot::EntitySnapshot;
