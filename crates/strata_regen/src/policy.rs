//! Constraint policy.
//!
//! Constraints (unique indexes, non-null checks, foreign keys, join
//! tables) are rendered in a separate artifact so the schema change and
//! its constraints can be applied as distinct migration steps. The
//! predicates here decide when that companion artifact is needed.

use strata_core::{EntityDefinition, FieldDescriptor, RelationshipDescriptor};
use strata_log::{ChangelogPayload, ChangelogRecord};

/// Whether an added field needs a companion constraints artifact.
#[must_use]
pub fn field_needs_constraints(field: &FieldDescriptor) -> bool {
    field.unique || field.nullable
}

/// Whether an added relationship needs a companion constraints
/// artifact: it materializes either a constraint column on the owning
/// table or a join table.
#[must_use]
pub fn relationship_needs_constraints(relationship: &RelationshipDescriptor) -> bool {
    relationship.requires_constraint_column() || relationship.requires_join_table()
}

/// Whether a full definition carries any relationship that needs
/// constraints when first materialized.
#[must_use]
pub fn definition_needs_constraints(definition: &EntityDefinition) -> bool {
    definition
        .relationships
        .iter()
        .any(relationship_needs_constraints)
}

/// Whether materializing this record requires a companion constraints
/// artifact. Removals never do; only what the record adds counts.
#[must_use]
pub fn record_requires_constraints(record: &ChangelogRecord) -> bool {
    match &record.payload {
        ChangelogPayload::EntityNew { definition, .. }
        | ChangelogPayload::EntitySnapshot { definition, .. } => {
            definition_needs_constraints(definition)
        }
        ChangelogPayload::EntityFields { added_fields, .. } => {
            added_fields.iter().any(field_needs_constraints)
        }
        ChangelogPayload::EntityRelationships {
            added_relationships,
            ..
        } => added_relationships.iter().any(relationship_needs_constraints),
        ChangelogPayload::Custom { .. } | ChangelogPayload::Tag { .. } => false,
    }
}
