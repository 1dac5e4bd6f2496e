//! Diff engine deriving changelog drafts from definition deltas.

use crate::snapshot::EntitySnapshot;
use serde::{Deserialize, Serialize};
use strata_core::{EntityDefinition, FieldDescriptor, RelationshipDescriptor};

/// A drafted field-level delta, not yet dated or persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsChange {
    /// Entity the delta applies to
    pub entity_name: String,
    /// Fields present in the authoritative definition but not the snapshot
    pub added_fields: Vec<FieldDescriptor>,
    /// Names of fields present in the snapshot but not the definition
    pub removed_fields: Vec<String>,
}

/// A drafted relationship-level delta, not yet dated or persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipsChange {
    /// Entity the delta applies to
    pub entity_name: String,
    /// Relationships present in the definition but not the snapshot
    pub added_relationships: Vec<RelationshipDescriptor>,
    /// Composite removal keys of relationships no longer present
    pub removed_relationships: Vec<String>,
}

/// The outcome of diffing one entity.
///
/// The two drafts are independent; both may be produced from one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityDiff {
    /// Field-level draft, present iff either field set is non-empty
    pub fields_change: Option<FieldsChange>,
    /// Relationship-level draft, present iff either set is non-empty
    pub relationships_change: Option<RelationshipsChange>,
}

impl EntityDiff {
    /// Whether the definition and snapshot already agree
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields_change.is_none() && self.relationships_change.is_none()
    }
}

/// Engine comparing authoritative definitions against replayed snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffEngine;

impl DiffEngine {
    /// Create a new diff engine (unit struct)
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compute the drafts needed to reconcile `snapshot` with `current`.
    ///
    /// Field membership compares `fieldName`; relationship membership
    /// compares the identity key (`relationshipName` falling back to
    /// `otherEntityName`). Removed relationships are returned as
    /// composite `relationshipName:relationshipType` keys.
    #[must_use]
    pub fn diff(&self, current: &EntityDefinition, snapshot: &EntitySnapshot) -> EntityDiff {
        let entity_name = if current.name.is_empty() {
            snapshot.name.clone()
        } else {
            current.name.clone()
        };

        let added_fields: Vec<FieldDescriptor> = current
            .fields
            .iter()
            .filter(|field| !snapshot.has_field(&field.field_name))
            .cloned()
            .collect();

        let removed_fields: Vec<String> = snapshot
            .fields
            .iter()
            .filter(|field| {
                !current
                    .fields
                    .iter()
                    .any(|f| f.field_name == field.field_name)
            })
            .map(|field| field.field_name.clone())
            .collect();

        let fields_change = (!added_fields.is_empty() || !removed_fields.is_empty()).then(|| {
            FieldsChange {
                entity_name: entity_name.clone(),
                added_fields,
                removed_fields,
            }
        });

        let added_relationships: Vec<RelationshipDescriptor> = current
            .relationships
            .iter()
            .filter(|rel| !snapshot.has_relationship(rel.identity()))
            .cloned()
            .collect();

        let removed_relationships: Vec<String> = snapshot
            .relationships
            .iter()
            .filter(|rel| {
                !current
                    .relationships
                    .iter()
                    .any(|r| r.identity() == rel.identity())
            })
            .map(RelationshipDescriptor::removal_key)
            .collect();

        let relationships_change = (!added_relationships.is_empty()
            || !removed_relationships.is_empty())
        .then(|| RelationshipsChange {
            entity_name,
            added_relationships,
            removed_relationships,
        });

        EntityDiff {
            fields_change,
            relationships_change,
        }
    }
}
