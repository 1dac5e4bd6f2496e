//! Materialization dispatch.
//!
//! Maps each changelog record to the set of artifacts a renderer must
//! produce for it, and to the deterministic file stems those artifacts
//! are written under. The dispatch itself performs no IO.

use crate::policy::record_requires_constraints;
use serde::{Deserialize, Serialize};
use strata_log::{ChangelogKind, ChangelogRecord};

/// The artifact kinds a single record can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Table creation for a brand-new entity
    AddedEntity,
    /// Constraints companion to [`ArtifactKind::AddedEntity`]
    AddedEntityConstraints,
    /// Incremental column/relationship changes to an existing entity
    UpdatedEntity,
    /// Data migration companion emitted alongside new constraints
    UpdatedEntityMigrate,
    /// Constraints companion to [`ArtifactKind::UpdatedEntity`]
    UpdatedEntityConstraints,
    /// Free-form changeset stub for a custom milestone
    Custom,
    /// Full-definition breaking point for an entity
    Snapshot,
    /// Named tag changeset
    Tag,
}

impl ArtifactKind {
    /// The stem infix of this artifact kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddedEntity => "added_entity",
            Self::AddedEntityConstraints => "added_entity_constraints",
            Self::UpdatedEntity => "updated_entity",
            Self::UpdatedEntityMigrate => "updated_entity_migrate",
            Self::UpdatedEntityConstraints => "updated_entity_constraints",
            Self::Custom => "custom",
            Self::Snapshot => "snapshot",
            Self::Tag => "tag",
        }
    }

    /// The file stem (no extension) for this artifact of a record:
    /// `{changelogDate}_{kind}_{label}` where the label is the record's
    /// entity name, or its free-form name for `custom`/`tag` records.
    #[must_use]
    pub fn file_stem(self, record: &ChangelogRecord) -> String {
        let label = record
            .entity_name()
            .or_else(|| record.name())
            .unwrap_or_default();
        format!("{}_{}_{}", record.changelog_date, self.as_str(), label)
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of materialization work: a record and the artifacts it
/// requires, in render order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterializeTask {
    /// The record being materialized
    pub record: ChangelogRecord,
    /// Artifacts to render, in order
    pub artifacts: Vec<ArtifactKind>,
}

impl MaterializeTask {
    /// File stems of every artifact, in render order
    #[must_use]
    pub fn file_stems(&self) -> Vec<String> {
        self.artifacts
            .iter()
            .map(|kind| kind.file_stem(&self.record))
            .collect()
    }
}

/// Decide the artifacts a record requires.
///
/// Update records that add constrained fields or relationships get the
/// migrate and constraints companions after the main artifact, so the
/// three apply in that order.
#[must_use]
pub fn dispatch(record: &ChangelogRecord) -> MaterializeTask {
    let artifacts = match record.kind() {
        ChangelogKind::EntityNew => {
            let mut artifacts = vec![ArtifactKind::AddedEntity];
            if record_requires_constraints(record) {
                artifacts.push(ArtifactKind::AddedEntityConstraints);
            }
            artifacts
        }
        ChangelogKind::EntityFields | ChangelogKind::EntityRelationships => {
            let mut artifacts = vec![ArtifactKind::UpdatedEntity];
            if record_requires_constraints(record) {
                artifacts.push(ArtifactKind::UpdatedEntityMigrate);
                artifacts.push(ArtifactKind::UpdatedEntityConstraints);
            }
            artifacts
        }
        ChangelogKind::EntitySnapshot => vec![ArtifactKind::Snapshot],
        ChangelogKind::Custom => vec![ArtifactKind::Custom],
        ChangelogKind::Tag => vec![ArtifactKind::Tag],
    };

    MaterializeTask {
        record: record.clone(),
        artifacts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{
        ChangelogDate, EntityDefinition, FieldDescriptor, RelationshipDescriptor, RelationshipType,
    };

    fn date(value: &str) -> ChangelogDate {
        ChangelogDate::parse(value).unwrap()
    }

    #[test]
    fn test_added_entity_stem() {
        let record = ChangelogRecord::entity_new(
            date("20150805124838"),
            "BankAccount",
            EntityDefinition::new("BankAccount"),
        );
        let task = dispatch(&record);
        assert_eq!(task.artifacts, vec![ArtifactKind::AddedEntity]);
        assert_eq!(
            task.file_stems(),
            vec!["20150805124838_added_entity_BankAccount"]
        );
    }

    #[test]
    fn test_added_entity_with_relationship_gets_constraints() {
        let definition = EntityDefinition::new("BankAccount").with_relationship(
            RelationshipDescriptor::new("user", RelationshipType::ManyToOne),
        );
        let record =
            ChangelogRecord::entity_new(date("20150805124838"), "BankAccount", definition);
        let task = dispatch(&record);
        assert_eq!(
            task.artifacts,
            vec![
                ArtifactKind::AddedEntity,
                ArtifactKind::AddedEntityConstraints
            ]
        );
        assert_eq!(
            task.file_stems()[1],
            "20150805124838_added_entity_constraints_BankAccount"
        );
    }

    #[test]
    fn test_plain_field_update_has_no_companions() {
        let record = ChangelogRecord::entity_fields(
            date("20200302000000"),
            "BankAccount",
            vec![FieldDescriptor::new("iban")],
            vec![],
        );
        let task = dispatch(&record);
        assert_eq!(task.artifacts, vec![ArtifactKind::UpdatedEntity]);
        assert_eq!(
            task.file_stems(),
            vec!["20200302000000_updated_entity_BankAccount"]
        );
    }

    #[test]
    fn test_constrained_update_renders_migrate_then_constraints() {
        let record = ChangelogRecord::entity_fields(
            date("20200302000000"),
            "BankAccount",
            vec![FieldDescriptor::new("iban").with_unique(true)],
            vec![],
        );
        let task = dispatch(&record);
        assert_eq!(
            task.file_stems(),
            vec![
                "20200302000000_updated_entity_BankAccount",
                "20200302000000_updated_entity_migrate_BankAccount",
                "20200302000000_updated_entity_constraints_BankAccount",
            ]
        );
    }

    #[test]
    fn test_custom_tag_and_snapshot_stems() {
        let custom = dispatch(&ChangelogRecord::custom(date("20200302000001"), "loadData"));
        assert_eq!(custom.file_stems(), vec!["20200302000001_custom_loadData"]);

        let tag = dispatch(&ChangelogRecord::tag(date("20200302000002"), "v1.0.0"));
        assert_eq!(tag.file_stems(), vec!["20200302000002_tag_v1.0.0"]);

        let snapshot = dispatch(&ChangelogRecord::entity_snapshot(
            date("20200302000003"),
            "BankAccount",
            EntityDefinition::new("BankAccount"),
        ));
        assert_eq!(
            snapshot.file_stems(),
            vec!["20200302000003_snapshot_BankAccount"]
        );
    }
}
