//! Canonical record ordering.
//!
//! Primary key is the changelog date, ascending. Two records minted at
//! the same instant for different entities tie-break lexicographically
//! on entity name, so replay order never depends on load order.

use crate::record::ChangelogRecord;
use std::cmp::Ordering;

/// Total order over changelog records: `(changelogDate, entityName)`
/// ascending. Records without an entity name compare equal on ties.
#[must_use]
pub fn canonical_cmp(a: &ChangelogRecord, b: &ChangelogRecord) -> Ordering {
    match a.changelog_date.cmp(&b.changelog_date) {
        Ordering::Equal => match (a.entity_name(), b.entity_name()) {
            (Some(left), Some(right)) => left.cmp(right),
            _ => Ordering::Equal,
        },
        ordering => ordering,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{ChangelogDate, EntityDefinition};

    fn date(value: &str) -> ChangelogDate {
        ChangelogDate::parse(value).unwrap()
    }

    fn entity_new(date_value: &str, name: &str) -> ChangelogRecord {
        ChangelogRecord::entity_new(date(date_value), name, EntityDefinition::new(name))
    }

    #[test]
    fn test_orders_by_date_first() {
        let earlier = entity_new("20200101000000", "Zebra");
        let later = entity_new("20200102000000", "Aardvark");
        assert_eq!(canonical_cmp(&earlier, &later), Ordering::Less);
        assert_eq!(canonical_cmp(&later, &earlier), Ordering::Greater);
    }

    #[test]
    fn test_equal_dates_tie_break_on_entity_name() {
        let a = entity_new("20200101000000", "Alpha");
        let b = entity_new("20200101000000", "Beta");
        assert_eq!(canonical_cmp(&a, &b), Ordering::Less);
        assert_eq!(canonical_cmp(&b, &a), Ordering::Greater);
    }

    #[test]
    fn test_equal_dates_without_entity_names_compare_equal() {
        let a = ChangelogRecord::tag(date("20200101000000"), "v1");
        let b = ChangelogRecord::custom(date("20200101000000"), "note");
        assert_eq!(canonical_cmp(&a, &b), Ordering::Equal);

        let c = entity_new("20200101000000", "Alpha");
        assert_eq!(canonical_cmp(&a, &c), Ordering::Equal);
    }

    #[test]
    fn test_sort_is_deterministic() {
        let mut records = vec![
            entity_new("20200102000000", "Beta"),
            entity_new("20200101000000", "Beta"),
            entity_new("20200101000000", "Alpha"),
        ];
        records.sort_by(canonical_cmp);
        let names: Vec<_> = records.iter().filter_map(|r| r.entity_name()).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Beta"]);
        assert_eq!(records[2].changelog_date.as_str(), "20200102000000");
    }
}
