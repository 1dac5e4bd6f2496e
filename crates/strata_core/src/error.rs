//! Core error types for STRATA.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The persisted store exists but cannot be read
    StoreUnavailable {
        /// Why the store could not be read
        reason: String,
    },

    /// A mutating record was replayed before the entity was initialized
    UninitializedEntity {
        /// Entity being replayed
        entity: String,
        /// Date of the offending record
        changelog_date: String,
    },

    /// Two records would collide on their primary key
    DuplicateDate {
        /// The already-occupied date
        changelog_date: String,
    },

    /// A persisted record carries a type outside the closed set
    UnknownChangelogType {
        /// The unrecognized type tag
        kind: String,
    },

    /// A persisted record is missing a required field
    MissingRequiredField {
        /// Name of the missing field
        field: String,
        /// Date of the offending record, when known
        changelog_date: Option<String>,
    },

    /// A changelog date is not a valid yyyyMMddHHmmss value
    InvalidDate {
        /// The rejected value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// A named entity has no records in the log
    EntityNotFound {
        /// The entity that was looked up
        entity: String,
    },

    /// Malformed persisted content
    ParseError {
        /// Error message
        message: String,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreUnavailable { reason } => {
                write!(f, "Changelog store unavailable: {}", reason)
            }
            Self::UninitializedEntity { entity, changelog_date } => {
                write!(
                    f,
                    "Entity {} was not initialized at changelog {}",
                    entity, changelog_date
                )
            }
            Self::DuplicateDate { changelog_date } => {
                write!(f, "Duplicate changelogDate {}", changelog_date)
            }
            Self::UnknownChangelogType { kind } => {
                write!(f, "Changelog of type {} not implemented", kind)
            }
            Self::MissingRequiredField { field, changelog_date } => match changelog_date {
                Some(date) => write!(f, "Changelog {} must have a {}", date, field),
                None => write!(f, "Changelog must have a {}", field),
            },
            Self::InvalidDate { value, reason } => {
                write!(f, "Invalid changelog date {}: {}", value, reason)
            }
            Self::EntityNotFound { entity } => {
                write!(f, "Entity {} was not found", entity)
            }
            Self::ParseError { message } => write!(f, "Parse error: {}", message),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::DuplicateDate {
            changelog_date: "20150805124838".to_string(),
        };
        assert_eq!(format!("{}", err), "Duplicate changelogDate 20150805124838");

        let err = CoreError::MissingRequiredField {
            field: "changelogDate".to_string(),
            changelog_date: None,
        };
        assert_eq!(format!("{}", err), "Changelog must have a changelogDate");

        let err = CoreError::MissingRequiredField {
            field: "type".to_string(),
            changelog_date: Some("20200101000000".to_string()),
        };
        assert_eq!(
            format!("{}", err),
            "Changelog 20200101000000 must have a type"
        );
    }

    #[test]
    fn test_uninitialized_entity_display() {
        let err = CoreError::UninitializedEntity {
            entity: "BankAccount".to_string(),
            changelog_date: "20200302000000".to_string(),
        };
        let s = format!("{}", err);
        assert!(s.contains("BankAccount"));
        assert!(s.contains("20200302000000"));
    }

    #[test]
    fn test_error_equality() {
        let err1 = CoreError::EntityNotFound {
            entity: "Operation".to_string(),
        };
        let err2 = CoreError::EntityNotFound {
            entity: "Operation".to_string(),
        };
        assert_eq!(err1, err2);
    }

    #[test]
    fn test_from_serde_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let core: CoreError = err.into();
        assert!(matches!(core, CoreError::ParseError { .. }));
    }
}
