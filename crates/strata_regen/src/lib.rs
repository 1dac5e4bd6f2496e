//! STRATA Regeneration
//!
//! The command layer on top of the changelog store: translates
//! authoring commands into changelog records, decides which
//! materialization artifacts each record needs, and escalates to full
//! regeneration after external imports.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod dispatch;
pub mod policy;

pub use coordinator::{RegenOutcome, RegenerationCoordinator};
pub use dispatch::{ArtifactKind, MaterializeTask, dispatch};
pub use policy::{
    definition_needs_constraints, field_needs_constraints, record_requires_constraints,
    relationship_needs_constraints,
};
