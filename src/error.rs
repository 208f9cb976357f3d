//! Error types for board loading
//!
//! Errors are classified by what the user sees:
//! - NotFound: reference data (year, month) is missing, a configuration problem
//! - NoData: the period exists but nothing was recorded for it
//! - Backend: a query in a required step failed
//! - Configuration: no usable backend (missing credentials, bad snapshot)
//!
//! Partial failures (recency filter, team and employee resolution) never
//! become a `BoardError`; those steps log and degrade instead.

use thiserror::Error;

use crate::backend::BackendError;
use crate::types::Period;

/// Which reference entity could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingEntity {
    Year(i32),
    Period(Period),
}

impl std::fmt::Display for MissingEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingEntity::Year(year) => write!(f, "year {}", year),
            MissingEntity::Period(period) => write!(f, "period {}", period),
        }
    }
}

/// Error types for board loading
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Not found: {0}")]
    NotFound(MissingEntity),

    #[error("No data recorded for {0}")]
    NoData(Period),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Coarse error class, serialized into the board result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    NotFound,
    NoData,
    Backend,
    Configuration,
}

impl BoardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BoardError::NotFound(_) => ErrorKind::NotFound,
            BoardError::NoData(_) => ErrorKind::NoData,
            BoardError::Backend(_) => ErrorKind::Backend,
            BoardError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Returns true if a later attempt could succeed without changes to the
    /// backend data or the configuration.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BoardError::Backend(e) if e.is_retryable())
    }

    /// Message for the single user-facing error state.
    pub fn user_message(&self) -> String {
        match self {
            BoardError::NotFound(MissingEntity::Year(year)) => {
                format!("Data unavailable: year {} is not configured.", year)
            }
            BoardError::NotFound(MissingEntity::Period(period)) => format!(
                "Data unavailable: neither {} nor the month before it is configured.",
                period
            ),
            BoardError::NoData(period) => format!("No data recorded for {} yet.", period),
            BoardError::Backend(e) if e.is_retryable() => {
                "The metrics service is unreachable. Try again later.".to_string()
            }
            BoardError::Backend(_) => "Failed to load metrics.".to_string(),
            BoardError::Configuration(msg) => format!(
                "Metrics backend unavailable: {}. Check ~/.kpiboard/config.json",
                msg
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct_for_not_found_and_no_data() {
        let not_found = BoardError::NotFound(MissingEntity::Year(2025));
        let no_data = BoardError::NoData(Period::new(2025, 10));
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(no_data.kind(), ErrorKind::NoData);
        assert_ne!(not_found.user_message(), no_data.user_message());
    }

    #[test]
    fn test_backend_timeout_is_retryable() {
        let err = BoardError::from(BackendError::Timeout);
        assert!(err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::Backend);

        let err = BoardError::from(BackendError::Decode("bad json".into()));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_messages_name_the_missing_entity() {
        let err = BoardError::NotFound(MissingEntity::Period(Period::new(2025, 2)));
        assert!(err.to_string().contains("2025-02"));
        assert!(err.user_message().contains("2025-02"));
    }
}
