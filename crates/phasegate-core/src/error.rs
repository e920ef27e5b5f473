//! Error types for phasegate.
//!
//! A closed gate is never an error. Only configuration that cannot be
//! interpreted ends up here, and it always aborts the whole evaluation.

use thiserror::Error;

/// Top-level result type for phasegate operations.
pub type Result<T> = std::result::Result<T, GateError>;

/// Top-level error type for phasegate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("malformed timestamp for {field}: '{value}' is not an RFC3339 UTC instant")]
    MalformedTimestamp { field: String, value: String },

    #[error("malformed time of day for {field}: '{value}' is not HH:MM:SS")]
    MalformedTimeOfDay { field: String, value: String },

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Structurally valid but semantically invalid gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{field} must be a non-negative number of hours, got {value}")]
    NegativeHours { field: &'static str, value: i64 },

    #[error(
        "time_of_day_start ({start}) is after time_of_day_end ({end}); overnight windows are not supported, split them into two windows"
    )]
    InvertedTimeOfDay { start: String, end: String },

    #[error("scope_id and scope_ids are mutually exclusive; set only one")]
    ConflictingScopes,

    #[error("one of scope_id or scope_ids must be set")]
    MissingScope,

    #[error("scope_id must not be empty")]
    EmptyScopeId,

    #[error("scope_ids must contain at least one identifier")]
    EmptyScopeIds,
}

impl GateError {
    pub(crate) fn timestamp(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::MalformedTimestamp {
            field: field.into(),
            value: value.into(),
        }
    }

    pub(crate) fn time_of_day(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::MalformedTimeOfDay {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Qualify the offending field name with its location in the gate
    /// configuration, e.g. `inclusion_windows[2].date_start`.
    #[must_use]
    pub fn within(self, location: &str) -> Self {
        match self {
            Self::MalformedTimestamp { field, value } => Self::MalformedTimestamp {
                field: format!("{location}.{field}"),
                value,
            },
            Self::MalformedTimeOfDay { field, value } => Self::MalformedTimeOfDay {
                field: format!("{location}.{field}"),
                value,
            },
            other => other,
        }
    }

    /// Whether this error is a semantic configuration problem rather than a
    /// format problem in a single field.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
