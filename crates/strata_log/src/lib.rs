//! STRATA Changelog Log
//!
//! Append-only, date-ordered schema changelog records and the keyed
//! store that persists them. Records are immutable once saved; the
//! store is keyed by the changelog date.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod order;
pub mod record;
pub mod store;

pub use order::canonical_cmp;
pub use record::{ChangelogKind, ChangelogPayload, ChangelogRecord};
pub use store::{ChangelogStore, StoreError};
