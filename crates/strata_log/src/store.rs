//! Durable keyed changelog store.
//!
//! One JSON document per project holds the record mapping and the
//! `lastLiquibaseTimestamp` counter. The store is loaded once per run,
//! owned exclusively in memory, and flushed at the end; the surrounding
//! tool serializes runs against the same project.

use crate::order::canonical_cmp;
use crate::record::{ChangelogKind, ChangelogRecord};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use strata_core::{ChangelogDate, CoreError, CoreResult};

const MILLIS_PER_SECOND: i64 = 1_000;

/// Errors raised by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing file exists but cannot be read or written
    #[error("IO error: {reason}")]
    Io {
        /// Underlying cause
        reason: String,
    },

    /// The backing document is not valid JSON
    #[error("Malformed store document: {reason}")]
    Malformed {
        /// Underlying cause
        reason: String,
    },
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        CoreError::StoreUnavailable {
            reason: err.to_string(),
        }
    }
}

/// Persisted document layout, shared with the external import format.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database_changelogs: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_liquibase_timestamp: Option<i64>,
}

/// Keyed collection of changelog records plus the store-wide timestamp
/// counter. Records are never mutated after a successful save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangelogStore {
    records: BTreeMap<ChangelogDate, ChangelogRecord>,
    last_timestamp: i64,
}

impl ChangelogStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store from its backing document.
    ///
    /// A missing file or an absent record mapping is an empty store, not
    /// an error; a warning advisory is logged instead.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the document exists but cannot be
    /// read or is not valid JSON, `MissingRequiredField` if a record
    /// lacks `changelogDate` or `type`, `UnknownChangelogType` if a
    /// record's type is outside the closed set, and `ParseError` for an
    /// otherwise malformed record.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Cannot find any changelog");
                return Ok(Self::new());
            }
            Err(err) => {
                return Err(StoreError::Io {
                    reason: err.to_string(),
                }
                .into());
            }
        };

        let document: StoreDocument =
            serde_json::from_str(&content).map_err(|err| StoreError::Malformed {
                reason: err.to_string(),
            })?;

        let mut store = Self {
            records: BTreeMap::new(),
            last_timestamp: document.last_liquibase_timestamp.unwrap_or_default(),
        };

        let Some(changelogs) = document.database_changelogs else {
            tracing::warn!(path = %path.display(), "Cannot find any changelog");
            return Ok(store);
        };

        for value in changelogs.into_values() {
            let record = decode_record(value)?;
            store.records.insert(record.changelog_date.clone(), record);
        }

        Ok(store)
    }

    /// Parse an externally supplied import file: a bare mapping of
    /// `changelogDate` to record, validated like the persisted store.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`ChangelogStore::load`].
    pub fn load_external(path: &Path) -> CoreResult<BTreeMap<ChangelogDate, ChangelogRecord>> {
        let content = std::fs::read_to_string(path).map_err(|err| StoreError::Io {
            reason: err.to_string(),
        })?;
        Self::parse_external(&content)
    }

    /// Parse external import content already read into memory.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`ChangelogStore::load`].
    pub fn parse_external(content: &str) -> CoreResult<BTreeMap<ChangelogDate, ChangelogRecord>> {
        let values: BTreeMap<String, Value> =
            serde_json::from_str(content).map_err(|err| StoreError::Malformed {
                reason: err.to_string(),
            })?;

        let mut records = BTreeMap::new();
        for value in values.into_values() {
            let record = decode_record(value)?;
            records.insert(record.changelog_date.clone(), record);
        }
        Ok(records)
    }

    /// Flush the store back to its backing document.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the document cannot be written.
    pub fn flush(&self, path: &Path) -> CoreResult<()> {
        let mut changelogs = BTreeMap::new();
        for (date, record) in &self.records {
            changelogs.insert(date.to_string(), serde_json::to_value(record)?);
        }

        let document = StoreDocument {
            database_changelogs: Some(changelogs),
            last_liquibase_timestamp: (self.last_timestamp > 0).then_some(self.last_timestamp),
        };

        let content = serde_json::to_string_pretty(&document)?;
        std::fs::write(path, content).map_err(|err| StoreError::Io {
            reason: err.to_string(),
        })?;
        Ok(())
    }

    /// Insert or overwrite the entry at the record's date.
    ///
    /// A collision does not reject the write: the store-wide counter
    /// advances by one logical tick so a subsequently minted date will
    /// not collide, and the entry is overwritten at its original key.
    /// Returns whether the slot was previously occupied.
    pub fn save(&mut self, record: ChangelogRecord) -> bool {
        let occupied = self.records.contains_key(&record.changelog_date);
        if occupied {
            self.last_timestamp += 1;
            tracing::debug!(
                changelog_date = %record.changelog_date,
                "Date collision on save, advancing timestamp counter"
            );
        }
        self.records.insert(record.changelog_date.clone(), record);
        occupied
    }

    /// Insert a record whose date must not already be taken.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateDate` if an entry already exists at the
    /// record's date; nothing is written in that case.
    pub fn insert_new(&mut self, record: ChangelogRecord) -> CoreResult<()> {
        if self.records.contains_key(&record.changelog_date) {
            return Err(CoreError::DuplicateDate {
                changelog_date: record.changelog_date.to_string(),
            });
        }
        self.records.insert(record.changelog_date.clone(), record);
        Ok(())
    }

    /// All records in canonical order, optionally predicate-filtered.
    #[must_use]
    pub fn list<F>(&self, filter: Option<F>) -> Vec<ChangelogRecord>
    where
        F: Fn(&ChangelogRecord) -> bool,
    {
        let mut records: Vec<ChangelogRecord> = match filter {
            Some(predicate) => self
                .records
                .values()
                .filter(|record| predicate(record))
                .cloned()
                .collect(),
            None => self.records.values().cloned().collect(),
        };
        records.sort_by(canonical_cmp);
        records
    }

    /// All records in canonical order.
    #[must_use]
    pub fn list_all(&self) -> Vec<ChangelogRecord> {
        self.list(None::<fn(&ChangelogRecord) -> bool>)
    }

    /// Produce a new unique date.
    ///
    /// Reuses `existing` when provided and not already taken; otherwise
    /// mints the next free second at or after `max(now, counter + 1s)`.
    /// The counter advances to the allocated instant.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDate` if the counter has drifted outside the
    /// representable date range.
    pub fn allocate_date(&mut self, existing: Option<&ChangelogDate>) -> CoreResult<ChangelogDate> {
        if let Some(date) = existing {
            if !self.records.contains_key(date) {
                self.observe(date);
                return Ok(date.clone());
            }
        }

        let now = Utc::now().timestamp_millis();
        let mut millis = now - now.rem_euclid(MILLIS_PER_SECOND);
        if millis <= self.last_timestamp {
            millis = (self.last_timestamp / MILLIS_PER_SECOND + 1) * MILLIS_PER_SECOND;
        }

        let mut date = ChangelogDate::from_timestamp_millis(millis)?;
        while self.records.contains_key(&date) {
            millis += MILLIS_PER_SECOND;
            date = ChangelogDate::from_timestamp_millis(millis)?;
        }

        self.last_timestamp = millis;
        Ok(date)
    }

    /// Advance the counter monotonically to at least the given date.
    pub fn observe(&mut self, date: &ChangelogDate) {
        let millis = date.timestamp_millis();
        if millis > self.last_timestamp {
            self.last_timestamp = millis;
        }
    }

    /// Merge an external record set wholesale, last-write-wins per date.
    ///
    /// Returns the deduplicated names of entities touched by the
    /// imported records, in import order.
    pub fn import(&mut self, records: BTreeMap<ChangelogDate, ChangelogRecord>) -> Vec<String> {
        let mut touched: Vec<String> = Vec::new();
        for record in records.into_values() {
            if let Some(entity_name) = record.entity_name() {
                if !touched.iter().any(|name| name == entity_name) {
                    touched.push(entity_name.to_string());
                }
            }
            self.save(record);
        }
        touched
    }

    /// The record at a given date, if any
    #[must_use]
    pub fn get(&self, date: &ChangelogDate) -> Option<&ChangelogRecord> {
        self.records.get(date)
    }

    /// The chronologically newest record, if any
    #[must_use]
    pub fn last_record(&self) -> Option<&ChangelogRecord> {
        self.records.values().next_back()
    }

    /// The store-wide timestamp counter, epoch milliseconds
    #[must_use]
    pub fn last_timestamp(&self) -> i64 {
        self.last_timestamp
    }

    /// Seed the counter from project configuration; later values win
    pub fn seed_timestamp(&mut self, millis: i64) {
        if millis > self.last_timestamp {
            self.last_timestamp = millis;
        }
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in date order
    pub fn records(&self) -> impl Iterator<Item = &ChangelogRecord> {
        self.records.values()
    }
}

/// Validate and decode one persisted record object.
fn decode_record(value: Value) -> CoreResult<ChangelogRecord> {
    let object = value.as_object().ok_or_else(|| CoreError::ParseError {
        message: "changelog record must be an object".to_string(),
    })?;

    let date = object.get("changelogDate").and_then(Value::as_str);
    if date.is_none() {
        return Err(CoreError::MissingRequiredField {
            field: "changelogDate".to_string(),
            changelog_date: None,
        });
    }

    let Some(kind) = object.get("type").and_then(Value::as_str) else {
        return Err(CoreError::MissingRequiredField {
            field: "type".to_string(),
            changelog_date: date.map(String::from),
        });
    };

    if ChangelogKind::parse(kind).is_none() {
        return Err(CoreError::UnknownChangelogType {
            kind: kind.to_string(),
        });
    }

    Ok(serde_json::from_value(value)?)
}
