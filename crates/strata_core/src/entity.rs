//! Entity structure descriptors.
//!
//! These mirror the authoring tool's entity definition files: a named
//! entity with an ordered list of fields and relationships. Attributes
//! this core does not interpret round-trip through the flattened
//! `options` map untouched.

use crate::date::ChangelogDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single entity field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Field name, unique within an entity's current fields
    pub field_name: String,
    /// Field type, opaque to this core
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    /// Whether the field carries a uniqueness constraint
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
    /// Whether the field is nullable
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    /// Authoring-tool attributes preserved verbatim
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl FieldDescriptor {
    /// Create a plain field with no constraints
    #[must_use]
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            field_type: None,
            unique: false,
            nullable: false,
            options: Map::new(),
        }
    }

    /// Set the field type
    #[must_use]
    pub fn with_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    /// Mark the field unique
    #[must_use]
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Mark the field nullable
    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Relationship cardinality between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipType {
    /// One to one
    OneToOne,
    /// One to many
    OneToMany,
    /// Many to one
    ManyToOne,
    /// Many to many
    ManyToMany,
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToOne => "many-to-one",
            Self::ManyToMany => "many-to-many",
        };
        write!(f, "{}", s)
    }
}

/// A relationship from one entity to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDescriptor {
    /// Relationship name; identity falls back to the other entity's name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_name: Option<String>,
    /// Name of the entity on the other side
    pub other_entity_name: String,
    /// Relationship cardinality
    pub relationship_type: RelationshipType,
    /// Whether this entity owns the relationship (bidirectional types)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub owner_side: bool,
    /// Authoring-tool attributes preserved verbatim
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl RelationshipDescriptor {
    /// Create a relationship to another entity
    #[must_use]
    pub fn new(other_entity_name: impl Into<String>, relationship_type: RelationshipType) -> Self {
        Self {
            relationship_name: None,
            other_entity_name: other_entity_name.into(),
            relationship_type,
            owner_side: false,
            options: Map::new(),
        }
    }

    /// Set the relationship name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.relationship_name = Some(name.into());
        self
    }

    /// Set the owner side flag
    #[must_use]
    pub fn with_owner_side(mut self, owner_side: bool) -> Self {
        self.owner_side = owner_side;
        self
    }

    /// Identity within an entity: the relationship name if present,
    /// the other entity's name otherwise.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.relationship_name
            .as_deref()
            .unwrap_or(&self.other_entity_name)
    }

    /// Composite key used by removal lists:
    /// `relationshipName:relationshipType`. An absent name renders as
    /// the literal `undefined` so keys stay stable with existing
    /// persisted stores.
    #[must_use]
    pub fn removal_key(&self) -> String {
        format!(
            "{}:{}",
            self.relationship_name.as_deref().unwrap_or("undefined"),
            self.relationship_type
        )
    }

    /// Whether a foreign key column for this relationship lives on the
    /// declaring entity.
    #[must_use]
    pub fn requires_constraint_column(&self) -> bool {
        matches!(self.relationship_type, RelationshipType::ManyToOne)
            || (matches!(self.relationship_type, RelationshipType::OneToOne) && self.owner_side)
    }

    /// Whether this relationship is materialized through a join table.
    #[must_use]
    pub fn requires_join_table(&self) -> bool {
        matches!(self.relationship_type, RelationshipType::ManyToMany) && self.owner_side
    }
}

/// The authoritative structure of an entity, as supplied by the entity
/// authoring tool or reconstructed by replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDefinition {
    /// Entity name
    pub name: String,
    /// Ordered fields
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Ordered relationships
    #[serde(default)]
    pub relationships: Vec<RelationshipDescriptor>,
    /// Creation date stamped by the authoring tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog_date: Option<ChangelogDate>,
    /// Authoring-tool attributes preserved verbatim
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl EntityDefinition {
    /// Create an empty definition
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            relationships: Vec::new(),
            changelog_date: None,
            options: Map::new(),
        }
    }

    /// Add a field
    #[must_use]
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a relationship
    #[must_use]
    pub fn with_relationship(mut self, relationship: RelationshipDescriptor) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Set the creation date
    #[must_use]
    pub fn with_changelog_date(mut self, date: ChangelogDate) -> Self {
        self.changelog_date = Some(date);
        self
    }
}
