//! Error types for the scheduling core.
//!
//! Validation and range errors are raised before any collaborator call and
//! leave local state untouched. Persistence errors are retryable by the
//! caller; nothing in the core retries on its own.

use chrono::NaiveDate;

use crate::models::activity::ActivityId;
use crate::models::trip::ExtendDirection;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error(
        "Cannot remove {removed} day(s) {direction}: the trip would end on {new_end} before it starts on {new_start}"
    )]
    InvalidRange {
        direction: ExtendDirection,
        removed: i64,
        new_start: NaiveDate,
        new_end: NaiveDate,
    },

    #[error("Activity {0} not found")]
    NotFound(ActivityId),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Trip range changed but {failed} of {total} activity updates failed; refresh required")]
    Reconciliation { failed: usize, total: usize },
}

impl ScheduleError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Wrap a collaborator failure, keeping the full context chain.
    pub fn persistence(err: anyhow::Error) -> Self {
        Self::Persistence(format!("{err:#}"))
    }

    /// Whether the caller may retry the same operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Reconciliation { .. })
    }

    /// Whether local state should be reloaded before continuing.
    pub fn requires_refresh(&self) -> bool {
        matches!(self, Self::Reconciliation { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_validation_message_names_field() {
        let err = ScheduleError::validation("title", "cannot be empty");
        assert_eq!(err.to_string(), "Invalid title: cannot be empty");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_persistence_keeps_context_chain() {
        let source: anyhow::Result<()> = Err(anyhow::anyhow!("disk full"));
        let err = ScheduleError::persistence(source.context("Failed to update activity").unwrap_err());
        assert_eq!(
            err.to_string(),
            "Persistence failed: Failed to update activity: disk full"
        );
        assert!(err.is_retryable());
        assert!(!err.requires_refresh());
    }

    #[test]
    fn test_reconciliation_requires_refresh() {
        let err = ScheduleError::Reconciliation { failed: 1, total: 3 };
        assert!(err.requires_refresh());
        assert!(err.to_string().contains("1 of 3"));
    }
}
