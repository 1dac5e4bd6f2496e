//! Replay engine for deterministic entity reconstruction.
//!
//! Replay is a strict left fold over records sorted in canonical order.
//! Within one entity's subsequence, later records strictly dominate
//! earlier ones for anything they add or remove.

use crate::snapshot::EntitySnapshot;
use strata_core::{ChangelogDate, CoreError, CoreResult};
use strata_log::{ChangelogPayload, ChangelogRecord};

/// Running fold state: the accumulating snapshot plus whether a full
/// definition has been seen yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayState {
    /// The accumulating snapshot
    pub snapshot: EntitySnapshot,
    /// Set once an `entity-new`/`entity-snapshot` record is folded in
    pub initialized: bool,
}

impl ReplayState {
    /// Initial state for an entity
    #[must_use]
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            snapshot: EntitySnapshot::empty(entity_name),
            initialized: false,
        }
    }
}

/// Engine reconstructing entity snapshots from the changelog.
///
/// Pure and deterministic: the same record sequence and cutoff always
/// yields the same snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayEngine;

impl ReplayEngine {
    /// Create a new replay engine (unit struct)
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Fold an ordered record sequence into the entity's snapshot.
    ///
    /// Records not scoped to `entity_name` are skipped, as are records
    /// dated after `until` when a cutoff is given. When
    /// `include_removed` is set, the snapshot carries the removed sets
    /// of the last replayed record only.
    ///
    /// # Errors
    ///
    /// Returns `UninitializedEntity` if a mutating record for the
    /// entity precedes its first full definition.
    pub fn replay(
        &self,
        records: &[ChangelogRecord],
        entity_name: &str,
        until: Option<&ChangelogDate>,
        include_removed: bool,
    ) -> CoreResult<EntitySnapshot> {
        let mut state = ReplayState::new(entity_name);

        for record in records {
            if record.entity_name() != Some(entity_name) {
                continue;
            }
            if let Some(cutoff) = until {
                if record.changelog_date > *cutoff {
                    continue;
                }
            }
            state = Self::apply(state, record, include_removed)?;
        }

        if state.snapshot.name.is_empty() {
            state.snapshot.name = entity_name.to_string();
        }
        Ok(state.snapshot)
    }

    /// Apply one record to the fold state.
    ///
    /// # Errors
    ///
    /// Returns `UninitializedEntity` if the record mutates an entity
    /// that has no full definition yet.
    pub fn apply(
        mut state: ReplayState,
        record: &ChangelogRecord,
        include_removed: bool,
    ) -> CoreResult<ReplayState> {
        if record.kind().initializes_entity() {
            if let Some(definition) = record.definition() {
                let previous_name = state.snapshot.name.clone();
                state.snapshot = EntitySnapshot::from(definition.clone());
                if state.snapshot.name.is_empty() {
                    state.snapshot.name = previous_name;
                }
            }
            state.initialized = true;
            if include_removed {
                state.snapshot.removed_fields = Vec::new();
                state.snapshot.removed_relationships = Vec::new();
            }
            return Ok(state);
        }

        if !state.initialized {
            return Err(CoreError::UninitializedEntity {
                entity: record.entity_name().unwrap_or_default().to_string(),
                changelog_date: record.changelog_date.to_string(),
            });
        }

        let mut removed_fields = Vec::new();
        let mut removed_relationships = Vec::new();

        match &record.payload {
            ChangelogPayload::EntityFields {
                added_fields,
                removed_fields: removed_names,
                ..
            } => {
                state.snapshot.fields.retain(|field| {
                    let is_removed = removed_names.contains(&field.field_name);
                    if is_removed {
                        removed_fields.push(field.clone());
                    }
                    !is_removed
                });
                state.snapshot.fields.extend(added_fields.iter().cloned());
            }
            ChangelogPayload::EntityRelationships {
                added_relationships,
                removed_relationships: removed_keys,
                ..
            } => {
                state.snapshot.relationships.retain(|rel| {
                    let is_removed = removed_keys.contains(&rel.removal_key());
                    if is_removed {
                        removed_relationships.push(rel.clone());
                    }
                    !is_removed
                });
                state
                    .snapshot
                    .relationships
                    .extend(added_relationships.iter().cloned());
            }
            _ => {}
        }

        if include_removed {
            // Only the last record's removals are retained, not a union.
            state.snapshot.removed_fields = removed_fields;
            state.snapshot.removed_relationships = removed_relationships;
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{EntityDefinition, FieldDescriptor, RelationshipDescriptor, RelationshipType};

    fn date(value: &str) -> ChangelogDate {
        ChangelogDate::parse(value).unwrap()
    }

    fn bank_account_created() -> ChangelogRecord {
        ChangelogRecord::entity_new(
            date("20150805124838"),
            "BankAccount",
            EntityDefinition::new("BankAccount").with_field(FieldDescriptor::new("balance")),
        )
    }

    #[test]
    fn test_replay_single_entity_new() {
        let records = vec![bank_account_created()];
        let snapshot = ReplayEngine::new()
            .replay(&records, "BankAccount", None, false)
            .unwrap();

        assert_eq!(snapshot.name, "BankAccount");
        assert_eq!(snapshot.fields.len(), 1);
        assert_eq!(snapshot.fields[0].field_name, "balance");
        assert!(snapshot.relationships.is_empty());
    }

    #[test]
    fn test_replay_is_deterministic() {
        let records = vec![
            bank_account_created(),
            ChangelogRecord::entity_fields(
                date("20200302000000"),
                "BankAccount",
                vec![FieldDescriptor::new("iban")],
                vec![],
            ),
        ];
        let engine = ReplayEngine::new();
        let first = engine.replay(&records, "BankAccount", None, false).unwrap();
        let second = engine.replay(&records, "BankAccount", None, false).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_replay_fails_before_initialization() {
        let records = vec![ChangelogRecord::entity_fields(
            date("20200302000000"),
            "BankAccount",
            vec![FieldDescriptor::new("iban")],
            vec![],
        )];
        let err = ReplayEngine::new()
            .replay(&records, "BankAccount", None, false)
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::UninitializedEntity {
                entity: "BankAccount".to_string(),
                changelog_date: "20200302000000".to_string(),
            }
        );
    }

    #[test]
    fn test_replay_no_matching_records_is_empty_snapshot() {
        let records = vec![bank_account_created()];
        let snapshot = ReplayEngine::new()
            .replay(&records, "Operation", None, false)
            .unwrap();
        assert_eq!(snapshot.name, "Operation");
        assert!(snapshot.fields.is_empty());
    }

    #[test]
    fn test_replay_respects_cutoff() {
        let records = vec![
            bank_account_created(),
            ChangelogRecord::entity_fields(
                date("20200302000000"),
                "BankAccount",
                vec![FieldDescriptor::new("iban")],
                vec![],
            ),
        ];
        let snapshot = ReplayEngine::new()
            .replay(&records, "BankAccount", Some(&date("20150805124838")), false)
            .unwrap();
        assert_eq!(snapshot.fields.len(), 1);

        // Cutoff is inclusive
        let snapshot = ReplayEngine::new()
            .replay(&records, "BankAccount", Some(&date("20200302000000")), false)
            .unwrap();
        assert_eq!(snapshot.fields.len(), 2);
    }

    #[test]
    fn test_replay_removes_then_appends() {
        let records = vec![
            bank_account_created(),
            ChangelogRecord::entity_fields(
                date("20200302000000"),
                "BankAccount",
                vec![FieldDescriptor::new("iban")],
                vec!["balance".to_string()],
            ),
        ];
        let snapshot = ReplayEngine::new()
            .replay(&records, "BankAccount", None, false)
            .unwrap();
        assert_eq!(snapshot.fields.len(), 1);
        assert_eq!(snapshot.fields[0].field_name, "iban");
    }

    #[test]
    fn test_removed_field_may_reappear() {
        let records = vec![
            bank_account_created(),
            ChangelogRecord::entity_fields(
                date("20200302000000"),
                "BankAccount",
                vec![],
                vec!["balance".to_string()],
            ),
            ChangelogRecord::entity_fields(
                date("20200302000001"),
                "BankAccount",
                vec![FieldDescriptor::new("balance").with_type("BigDecimal")],
                vec![],
            ),
        ];
        let snapshot = ReplayEngine::new()
            .replay(&records, "BankAccount", None, false)
            .unwrap();
        assert_eq!(snapshot.fields.len(), 1);
        assert_eq!(snapshot.fields[0].field_type.as_deref(), Some("BigDecimal"));
    }

    #[test]
    fn test_relationship_removal_uses_composite_key() {
        let operations =
            RelationshipDescriptor::new("operation", RelationshipType::OneToMany)
                .with_name("operations");
        let records = vec![
            ChangelogRecord::entity_new(
                date("20150805124838"),
                "BankAccount",
                EntityDefinition::new("BankAccount").with_relationship(operations.clone()),
            ),
            // Wrong type in the key: no removal happens
            ChangelogRecord::entity_relationships(
                date("20200302000000"),
                "BankAccount",
                vec![],
                vec!["operations:many-to-many".to_string()],
            ),
            ChangelogRecord::entity_relationships(
                date("20200302000001"),
                "BankAccount",
                vec![],
                vec!["operations:one-to-many".to_string()],
            ),
        ];
        let engine = ReplayEngine::new();

        let partial = engine
            .replay(&records[..2], "BankAccount", None, false)
            .unwrap();
        assert_eq!(partial.relationships.len(), 1);

        let full = engine.replay(&records, "BankAccount", None, false).unwrap();
        assert!(full.relationships.is_empty());
    }

    #[test]
    fn test_replay_removed_sets_not_cumulative() {
        let records = vec![
            ChangelogRecord::entity_new(
                date("20150805124838"),
                "BankAccount",
                EntityDefinition::new("BankAccount")
                    .with_field(FieldDescriptor::new("balance"))
                    .with_field(FieldDescriptor::new("iban")),
            ),
            ChangelogRecord::entity_fields(
                date("20200302000000"),
                "BankAccount",
                vec![],
                vec!["balance".to_string()],
            ),
            ChangelogRecord::entity_fields(
                date("20200302000001"),
                "BankAccount",
                vec![],
                vec!["iban".to_string()],
            ),
        ];
        let snapshot = ReplayEngine::new()
            .replay(&records, "BankAccount", None, true)
            .unwrap();

        // Only the last record's removals survive
        assert_eq!(snapshot.removed_fields.len(), 1);
        assert_eq!(snapshot.removed_fields[0].field_name, "iban");
    }

    #[test]
    fn test_removed_sets_empty_without_include_removed() {
        let records = vec![
            bank_account_created(),
            ChangelogRecord::entity_fields(
                date("20200302000000"),
                "BankAccount",
                vec![],
                vec!["balance".to_string()],
            ),
        ];
        let snapshot = ReplayEngine::new()
            .replay(&records, "BankAccount", None, false)
            .unwrap();
        assert!(snapshot.removed_fields.is_empty());
    }

    #[test]
    fn test_entity_snapshot_record_resets_state() {
        let records = vec![
            bank_account_created(),
            ChangelogRecord::entity_fields(
                date("20200302000000"),
                "BankAccount",
                vec![FieldDescriptor::new("iban")],
                vec![],
            ),
            ChangelogRecord::entity_snapshot(
                date("20200302000001"),
                "BankAccount",
                EntityDefinition::new("BankAccount").with_field(FieldDescriptor::new("balance")),
            ),
        ];
        let snapshot = ReplayEngine::new()
            .replay(&records, "BankAccount", None, false)
            .unwrap();
        assert_eq!(snapshot.fields.len(), 1);
        assert_eq!(snapshot.fields[0].field_name, "balance");
    }

    #[test]
    fn test_apply_transition_in_isolation() {
        let state = ReplayState::new("BankAccount");
        let state = ReplayEngine::apply(state, &bank_account_created(), false).unwrap();
        assert!(state.initialized);
        assert_eq!(state.snapshot.fields.len(), 1);

        let record = ChangelogRecord::entity_fields(
            date("20200302000000"),
            "BankAccount",
            vec![FieldDescriptor::new("iban")],
            vec![],
        );
        let state = ReplayEngine::apply(state, &record, false).unwrap();
        assert_eq!(state.snapshot.fields.len(), 2);
    }
}
