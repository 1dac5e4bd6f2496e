//! Materialized entity snapshots.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strata_core::{ChangelogDate, EntityDefinition, FieldDescriptor, RelationshipDescriptor};

/// The materialized view of an entity at a point in the changelog.
///
/// `removed_fields`/`removed_relationships` carry the removals of the
/// last replayed record only, never a cumulative union; callers needing
/// full removal history must inspect the records directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySnapshot {
    /// Entity name
    pub name: String,
    /// Net fields, append order preserved from the record stream
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Net relationships, append order preserved
    #[serde(default)]
    pub relationships: Vec<RelationshipDescriptor>,
    /// Creation date carried over from the last full definition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog_date: Option<ChangelogDate>,
    /// Authoring-tool attributes carried over from the last full definition
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
    /// Fields removed by the last replayed record
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_fields: Vec<FieldDescriptor>,
    /// Relationships removed by the last replayed record
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_relationships: Vec<RelationshipDescriptor>,
}

impl EntitySnapshot {
    /// An empty snapshot for an entity with no replayed records
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether the snapshot contains a field with the given name
    #[must_use]
    pub fn has_field(&self, field_name: &str) -> bool {
        self.fields.iter().any(|field| field.field_name == field_name)
    }

    /// Whether the snapshot contains a relationship with the given identity
    #[must_use]
    pub fn has_relationship(&self, identity: &str) -> bool {
        self.relationships.iter().any(|rel| rel.identity() == identity)
    }

    /// Convert back into an authoritative definition, dropping the
    /// removed sets. Used when rewriting entity files after an import.
    #[must_use]
    pub fn definition(&self) -> EntityDefinition {
        EntityDefinition {
            name: self.name.clone(),
            fields: self.fields.clone(),
            relationships: self.relationships.clone(),
            changelog_date: self.changelog_date.clone(),
            options: self.options.clone(),
        }
    }
}

impl From<EntityDefinition> for EntitySnapshot {
    fn from(definition: EntityDefinition) -> Self {
        Self {
            name: definition.name,
            fields: definition.fields,
            relationships: definition.relationships,
            changelog_date: definition.changelog_date,
            options: definition.options,
            removed_fields: Vec::new(),
            removed_relationships: Vec::new(),
        }
    }
}
