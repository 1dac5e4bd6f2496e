//! STRATA Core Types
//!
//! This crate contains pure types and logic with no I/O.
//! All types serialize to the flat JSON layout used by the persisted
//! changelog store and the entity authoring tool.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod date;
pub mod entity;
pub mod error;
pub mod project;

// Re-exports
pub use date::ChangelogDate;
pub use entity::{EntityDefinition, FieldDescriptor, RelationshipDescriptor, RelationshipType};
pub use error::{CoreError, CoreResult};
pub use project::ProjectState;
