//! Changelog record types.
//!
//! A record is one immutable event in the project's schema timeline.
//! The payload is a sum type tagged by `type`; flattened into the
//! envelope it serializes to the flat JSON object shape of the
//! persisted store.

use serde::{Deserialize, Serialize};
use strata_core::{ChangelogDate, EntityDefinition, FieldDescriptor, RelationshipDescriptor};

/// The closed set of changelog record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangelogKind {
    /// A brand-new entity with its full definition
    EntityNew,
    /// A full-definition breaking point for an existing entity
    EntitySnapshot,
    /// Fields added to or removed from an entity
    EntityFields,
    /// Relationships added to or removed from an entity
    EntityRelationships,
    /// A free-form custom milestone
    Custom,
    /// A named tag milestone
    Tag,
}

impl ChangelogKind {
    /// Every kind, in declaration order
    pub const ALL: [Self; 6] = [
        Self::EntityNew,
        Self::EntitySnapshot,
        Self::EntityFields,
        Self::EntityRelationships,
        Self::Custom,
        Self::Tag,
    ];

    /// The wire tag of this kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EntityNew => "entity-new",
            Self::EntitySnapshot => "entity-snapshot",
            Self::EntityFields => "entity-fields",
            Self::EntityRelationships => "entity-relationships",
            Self::Custom => "custom",
            Self::Tag => "tag",
        }
    }

    /// Parse a wire tag
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Whether records of this kind are scoped to one entity
    #[must_use]
    pub const fn is_entity_scoped(self) -> bool {
        matches!(
            self,
            Self::EntityNew | Self::EntitySnapshot | Self::EntityFields | Self::EntityRelationships
        )
    }

    /// Whether replaying this kind (re)initializes the entity state
    #[must_use]
    pub const fn initializes_entity(self) -> bool {
        matches!(self, Self::EntityNew | Self::EntitySnapshot)
    }
}

impl std::fmt::Display for ChangelogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-kind payload of a changelog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChangelogPayload {
    /// A brand-new entity
    #[serde(rename_all = "camelCase")]
    EntityNew {
        /// Entity name
        entity_name: String,
        /// Full definition at creation
        definition: EntityDefinition,
    },
    /// A full-definition breaking point
    #[serde(rename_all = "camelCase")]
    EntitySnapshot {
        /// Entity name
        entity_name: String,
        /// Full definition at the snapshot
        definition: EntityDefinition,
    },
    /// Field-level delta
    #[serde(rename_all = "camelCase")]
    EntityFields {
        /// Entity name
        entity_name: String,
        /// Field descriptors appended by this record
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        added_fields: Vec<FieldDescriptor>,
        /// Names of fields removed by this record
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        removed_fields: Vec<String>,
    },
    /// Relationship-level delta
    #[serde(rename_all = "camelCase")]
    EntityRelationships {
        /// Entity name
        entity_name: String,
        /// Relationship descriptors appended by this record
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        added_relationships: Vec<RelationshipDescriptor>,
        /// Composite `relationshipName:relationshipType` keys removed
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        removed_relationships: Vec<String>,
    },
    /// A free-form custom milestone
    Custom {
        /// Label of the milestone
        name: String,
    },
    /// A named tag milestone
    Tag {
        /// Tag name
        name: String,
    },
}

/// One immutable event in the schema timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogRecord {
    /// Primary key within the store; sortable timestamp
    pub changelog_date: ChangelogDate,
    /// Marks records minted by the one-time versioning bootstrap
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub migration: bool,
    /// Kind-specific payload
    #[serde(flatten)]
    pub payload: ChangelogPayload,
}

impl ChangelogRecord {
    /// An `entity-new` record
    #[must_use]
    pub fn entity_new(
        changelog_date: ChangelogDate,
        entity_name: impl Into<String>,
        definition: EntityDefinition,
    ) -> Self {
        Self {
            changelog_date,
            migration: false,
            payload: ChangelogPayload::EntityNew {
                entity_name: entity_name.into(),
                definition,
            },
        }
    }

    /// An `entity-snapshot` record
    #[must_use]
    pub fn entity_snapshot(
        changelog_date: ChangelogDate,
        entity_name: impl Into<String>,
        definition: EntityDefinition,
    ) -> Self {
        Self {
            changelog_date,
            migration: false,
            payload: ChangelogPayload::EntitySnapshot {
                entity_name: entity_name.into(),
                definition,
            },
        }
    }

    /// An `entity-fields` record
    #[must_use]
    pub fn entity_fields(
        changelog_date: ChangelogDate,
        entity_name: impl Into<String>,
        added_fields: Vec<FieldDescriptor>,
        removed_fields: Vec<String>,
    ) -> Self {
        Self {
            changelog_date,
            migration: false,
            payload: ChangelogPayload::EntityFields {
                entity_name: entity_name.into(),
                added_fields,
                removed_fields,
            },
        }
    }

    /// An `entity-relationships` record
    #[must_use]
    pub fn entity_relationships(
        changelog_date: ChangelogDate,
        entity_name: impl Into<String>,
        added_relationships: Vec<RelationshipDescriptor>,
        removed_relationships: Vec<String>,
    ) -> Self {
        Self {
            changelog_date,
            migration: false,
            payload: ChangelogPayload::EntityRelationships {
                entity_name: entity_name.into(),
                added_relationships,
                removed_relationships,
            },
        }
    }

    /// A `custom` record
    #[must_use]
    pub fn custom(changelog_date: ChangelogDate, name: impl Into<String>) -> Self {
        Self {
            changelog_date,
            migration: false,
            payload: ChangelogPayload::Custom { name: name.into() },
        }
    }

    /// A `tag` record
    #[must_use]
    pub fn tag(changelog_date: ChangelogDate, name: impl Into<String>) -> Self {
        Self {
            changelog_date,
            migration: false,
            payload: ChangelogPayload::Tag { name: name.into() },
        }
    }

    /// Set the bootstrap migration flag
    #[must_use]
    pub fn with_migration(mut self, migration: bool) -> Self {
        self.migration = migration;
        self
    }

    /// The kind tag of this record
    #[must_use]
    pub const fn kind(&self) -> ChangelogKind {
        match &self.payload {
            ChangelogPayload::EntityNew { .. } => ChangelogKind::EntityNew,
            ChangelogPayload::EntitySnapshot { .. } => ChangelogKind::EntitySnapshot,
            ChangelogPayload::EntityFields { .. } => ChangelogKind::EntityFields,
            ChangelogPayload::EntityRelationships { .. } => ChangelogKind::EntityRelationships,
            ChangelogPayload::Custom { .. } => ChangelogKind::Custom,
            ChangelogPayload::Tag { .. } => ChangelogKind::Tag,
        }
    }

    /// The entity this record is scoped to, if any
    #[must_use]
    pub fn entity_name(&self) -> Option<&str> {
        match &self.payload {
            ChangelogPayload::EntityNew { entity_name, .. }
            | ChangelogPayload::EntitySnapshot { entity_name, .. }
            | ChangelogPayload::EntityFields { entity_name, .. }
            | ChangelogPayload::EntityRelationships { entity_name, .. } => Some(entity_name),
            ChangelogPayload::Custom { .. } | ChangelogPayload::Tag { .. } => None,
        }
    }

    /// The free-form label of a `custom`/`tag` record, if any
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.payload {
            ChangelogPayload::Custom { name } | ChangelogPayload::Tag { name } => Some(name),
            _ => None,
        }
    }

    /// The full definition carried by `entity-new`/`entity-snapshot`
    #[must_use]
    pub fn definition(&self) -> Option<&EntityDefinition> {
        match &self.payload {
            ChangelogPayload::EntityNew { definition, .. }
            | ChangelogPayload::EntitySnapshot { definition, .. } => Some(definition),
            _ => None,
        }
    }
}
