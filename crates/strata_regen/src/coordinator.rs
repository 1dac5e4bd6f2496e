//! Regeneration coordinator.
//!
//! The command layer over the store, replay, and diff engines. Each
//! authoring command mints the records it implies, persists them, and
//! returns the materialization work as data; rendering and file IO
//! belong to the surrounding tool.

use crate::dispatch::{MaterializeTask, dispatch};
use std::collections::BTreeMap;
use strata_core::{ChangelogDate, CoreError, CoreResult, EntityDefinition, ProjectState};
use strata_log::{ChangelogRecord, ChangelogStore};
use strata_replay::{DiffEngine, ReplayEngine};

/// The net effect of one coordinator command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegenOutcome {
    /// Materialization work for records minted by the command, in the
    /// order the artifacts must apply
    pub tasks: Vec<MaterializeTask>,
    /// Definitions whose files must be rewritten after an import
    pub rewritten_entities: Vec<EntityDefinition>,
    /// When set, incremental tasks are void and every artifact must be
    /// regenerated from the store
    pub full_regeneration: bool,
}

impl RegenOutcome {
    /// Whether the command changed nothing
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.tasks.is_empty() && self.rewritten_entities.is_empty() && !self.full_regeneration
    }
}

/// Coordinator translating authoring commands into changelog records
/// and materialization tasks.
///
/// Borrows the store and the project state for the duration of one
/// command batch; the caller flushes the store afterwards.
#[derive(Debug)]
pub struct RegenerationCoordinator<'a> {
    store: &'a mut ChangelogStore,
    state: &'a mut ProjectState,
    replay: ReplayEngine,
    diff: DiffEngine,
}

impl<'a> RegenerationCoordinator<'a> {
    /// Create a coordinator over a loaded store and project state,
    /// seeding the store counter from the project configuration.
    pub fn new(store: &'a mut ChangelogStore, state: &'a mut ProjectState) -> Self {
        if let Some(millis) = state.last_timestamp {
            store.seed_timestamp(millis);
        }
        Self {
            store,
            state,
            replay: ReplayEngine::new(),
            diff: DiffEngine::new(),
        }
    }

    /// Record a brand-new entity at the definition's own creation
    /// date, minting a fresh date only when the definition carries
    /// none. Skipped entirely while the project has not enabled
    /// versioning.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateDate` if the definition's date is already
    /// taken, and `InvalidDate` if date allocation fails.
    pub fn create_entity(&mut self, definition: &EntityDefinition) -> CoreResult<RegenOutcome> {
        if !self.state.versioned_database {
            tracing::debug!(entity = %definition.name, "Versioning disabled, skipping changelog");
            return Ok(RegenOutcome::default());
        }

        let mut definition = definition.clone();
        let date = match definition.changelog_date.clone() {
            Some(date) => date,
            None => self.store.allocate_date(None)?,
        };
        definition.changelog_date = Some(date.clone());

        let record = ChangelogRecord::entity_new(date.clone(), definition.name.clone(), definition);
        self.store.insert_new(record.clone())?;
        self.store.observe(&date);
        self.sync_state();

        tracing::debug!(
            changelog_date = %record.changelog_date,
            entity = record.entity_name().unwrap_or_default(),
            "Recorded new entity"
        );
        Ok(RegenOutcome {
            tasks: vec![dispatch(&record)],
            ..RegenOutcome::default()
        })
    }

    /// Reconcile a batch of authoritative definitions against their
    /// replayed snapshots.
    ///
    /// All field-level records are minted and dated before any
    /// relationship-level record, so a relationship artifact never
    /// applies before the column it references exists, regardless of
    /// entity order within the batch. Untracked entities get an
    /// `entity-new` record instead of a diff.
    ///
    /// # Errors
    ///
    /// Returns `UninitializedEntity` if an entity's records start with
    /// a delta, and `InvalidDate` if date allocation fails.
    pub fn update_entities(
        &mut self,
        definitions: &[EntityDefinition],
    ) -> CoreResult<RegenOutcome> {
        if !self.state.versioned_database {
            tracing::debug!("Versioning disabled, skipping changelog");
            return Ok(RegenOutcome::default());
        }

        let records = self.store.list_all();
        let mut minted: Vec<ChangelogRecord> = Vec::new();
        let mut pending_relationships = Vec::new();

        for definition in definitions {
            let tracked = records
                .iter()
                .any(|record| record.entity_name() == Some(definition.name.as_str()));
            if !tracked {
                let mut definition = definition.clone();
                let date = self.store.allocate_date(definition.changelog_date.as_ref())?;
                definition.changelog_date = Some(date.clone());
                let record =
                    ChangelogRecord::entity_new(date, definition.name.clone(), definition);
                self.store.insert_new(record.clone())?;
                minted.push(record);
                continue;
            }

            let snapshot = self.replay.replay(&records, &definition.name, None, false)?;
            let diff = self.diff.diff(definition, &snapshot);

            if let Some(change) = diff.fields_change {
                let date = self.store.allocate_date(None)?;
                let record = ChangelogRecord::entity_fields(
                    date,
                    change.entity_name,
                    change.added_fields,
                    change.removed_fields,
                );
                self.store.save(record.clone());
                minted.push(record);
            }
            if let Some(change) = diff.relationships_change {
                pending_relationships.push(change);
            }
        }

        for change in pending_relationships {
            let date = self.store.allocate_date(None)?;
            let record = ChangelogRecord::entity_relationships(
                date,
                change.entity_name,
                change.added_relationships,
                change.removed_relationships,
            );
            self.store.save(record.clone());
            minted.push(record);
        }

        self.sync_state();
        tracing::debug!(records = minted.len(), "Reconciled entity batch");
        Ok(RegenOutcome {
            tasks: minted.iter().map(dispatch).collect(),
            ..RegenOutcome::default()
        })
    }

    /// One-time conversion of an unversioned project: record every
    /// existing entity at its own creation date, flagged as migration
    /// records, and enable versioning.
    ///
    /// A no-op when there are no entities or the store already has
    /// records. No artifacts are produced here; the conversion is
    /// followed by a full regeneration.
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` if an entity has no creation
    /// date, and `DuplicateDate` if two entities share one. Nothing is
    /// flushed when the conversion aborts.
    pub fn bootstrap(&mut self, definitions: &[EntityDefinition]) -> CoreResult<RegenOutcome> {
        if definitions.is_empty() || !self.store.is_empty() {
            tracing::debug!("Nothing to bootstrap");
            return Ok(RegenOutcome::default());
        }

        for definition in definitions {
            let Some(date) = definition.changelog_date.clone() else {
                return Err(CoreError::MissingRequiredField {
                    field: "changelogDate".to_string(),
                    changelog_date: None,
                });
            };
            let record = ChangelogRecord::entity_new(
                date.clone(),
                definition.name.clone(),
                definition.clone(),
            )
            .with_migration(true);
            self.store.insert_new(record)?;
            self.store.observe(&date);
        }

        self.state.versioned_database = true;
        self.sync_state();
        tracing::debug!(entities = definitions.len(), "Bootstrapped versioned database");
        Ok(RegenOutcome::default())
    }

    /// Mint a free-form custom milestone at a fresh date.
    ///
    /// Explicit commands always persist, independent of the versioning
    /// flag and even when no entity changed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDate` if date allocation fails.
    pub fn custom(&mut self, name: &str) -> CoreResult<RegenOutcome> {
        self.milestone(|date| ChangelogRecord::custom(date, name))
    }

    /// Mint a named tag milestone at a fresh date.
    ///
    /// Explicit commands always persist, independent of the versioning
    /// flag and even when no entity changed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDate` if date allocation fails.
    pub fn tag(&mut self, name: &str) -> CoreResult<RegenOutcome> {
        self.milestone(|date| ChangelogRecord::tag(date, name))
    }

    fn milestone(
        &mut self,
        build: impl FnOnce(ChangelogDate) -> ChangelogRecord,
    ) -> CoreResult<RegenOutcome> {
        let date = self.store.allocate_date(None)?;
        let record = build(date);
        self.store.save(record.clone());
        self.sync_state();
        Ok(RegenOutcome {
            tasks: vec![dispatch(&record)],
            ..RegenOutcome::default()
        })
    }

    /// Record a full-definition breaking point for an entity at its
    /// current replayed state. Later replays restart from it.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity has no records at all.
    pub fn snapshot_entity(&mut self, entity_name: &str) -> CoreResult<RegenOutcome> {
        let records = self.store.list_all();
        if !records
            .iter()
            .any(|record| record.entity_name() == Some(entity_name))
        {
            return Err(CoreError::EntityNotFound {
                entity: entity_name.to_string(),
            });
        }

        let snapshot = self.replay.replay(&records, entity_name, None, false)?;
        let date = self.store.allocate_date(None)?;
        let record = ChangelogRecord::entity_snapshot(date, entity_name, snapshot.definition());
        self.store.save(record.clone());
        self.sync_state();

        tracing::debug!(entity = entity_name, "Recorded entity snapshot");
        Ok(RegenOutcome {
            tasks: vec![dispatch(&record)],
            ..RegenOutcome::default()
        })
    }

    /// Merge an externally supplied record set and rewrite the touched
    /// entities from their replayed state.
    ///
    /// Imported records may land anywhere in the timeline, so the
    /// incremental path is unsound afterwards: the outcome carries no
    /// tasks and demands full regeneration instead.
    ///
    /// # Errors
    ///
    /// Returns `UninitializedEntity` if a touched entity's merged
    /// records start with a delta.
    pub fn apply_external(
        &mut self,
        incoming: BTreeMap<ChangelogDate, ChangelogRecord>,
    ) -> CoreResult<RegenOutcome> {
        let touched = self.store.import(incoming);
        if touched.is_empty() {
            return Ok(RegenOutcome::default());
        }

        let records = self.store.list_all();
        let mut rewritten = Vec::new();
        for entity in &touched {
            let snapshot = self.replay.replay(&records, entity, None, false)?;
            rewritten.push(snapshot.definition());
        }

        self.sync_state();
        tracing::debug!(
            entities = touched.len(),
            "Imported external changelogs, escalating to full regeneration"
        );
        Ok(RegenOutcome {
            tasks: Vec::new(),
            rewritten_entities: rewritten,
            full_regeneration: true,
        })
    }

    /// Materialization work for every stored record, in canonical
    /// order. Read-only; used for full regeneration.
    #[must_use]
    pub fn regenerate(&self) -> RegenOutcome {
        RegenOutcome {
            tasks: self.store.list_all().iter().map(dispatch).collect(),
            ..RegenOutcome::default()
        }
    }

    /// Sync the counter from the newest stored record, in both
    /// directions between the store and the project state.
    pub fn load_last_changelog_date(&mut self) {
        if let Some(record) = self.store.last_record() {
            let millis = record.changelog_date.timestamp_millis();
            self.store.seed_timestamp(millis);
            self.state.observe_timestamp(millis);
        }
        if let Some(millis) = self.state.last_timestamp {
            self.store.seed_timestamp(millis);
        }
    }

    fn sync_state(&mut self) {
        let millis = self.store.last_timestamp();
        if millis > 0 {
            self.state.observe_timestamp(millis);
        }
    }
}
