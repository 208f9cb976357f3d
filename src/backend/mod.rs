//! Read access to the hosted metrics backend.
//!
//! Every read the board pipeline needs goes through [`Backend`]. Single-row
//! reads answer with a [`Lookup`], which keeps "no such row" apart from
//! "the query failed" without looking at backend error codes. List reads
//! answer with a plain `Result`: an empty list is a valid answer.

pub mod client;
pub mod memory;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    Employee, Membership, MetricObservation, MetricTeamLink, MonthRow, PeriodRow, Team, YearRow,
};

pub use client::RestBackend;
pub use memory::MemoryBackend;

/// Backend connection settings stored in ~/.kpiboard/config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

/// How the `months` table names its months.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MonthNaming {
    /// `month` holds the month number ("10").
    Number,
    /// `month` holds the lowercase long Russian name ("октябрь").
    #[default]
    RuLong,
}

impl MonthNaming {
    /// The `month` column value for a month number, `None` outside 1-12.
    pub fn key(self, month: u32) -> Option<String> {
        match self {
            MonthNaming::Number => (1..=12).contains(&month).then(|| month.to_string()),
            MonthNaming::RuLong => crate::util::ru_month_name(month).map(str::to_string),
        }
    }
}

/// Errors from backend reads.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend request failed: {0}")]
    Network(String),

    #[error("Backend request timed out")]
    Timeout,

    #[error("Backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    #[error("Query failed: {0}")]
    Query(String),
}

impl BackendError {
    /// Transient failures: network trouble, timeouts, rate limits, 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Network(_) | BackendError::Timeout => true,
            BackendError::Http { status, .. } => *status == 429 || *status >= 500,
            BackendError::Decode(_) | BackendError::Query(_) => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

/// Outcome of a single-row read.
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    QueryError(BackendError),
}

impl<T> Lookup<T> {
    /// Build a lookup from the rows of a query that should match at most one row.
    pub fn from_rows(mut rows: Vec<T>, what: &str) -> Self {
        match rows.len() {
            0 => Lookup::NotFound,
            1 => Lookup::Found(rows.remove(0)),
            n => Lookup::QueryError(BackendError::Query(format!(
                "expected at most one {} row, got {}",
                what, n
            ))),
        }
    }

    pub fn from_result(result: Result<Vec<T>, BackendError>, what: &str) -> Self {
        match result {
            Ok(rows) => Self::from_rows(rows, what),
            Err(e) => Lookup::QueryError(e),
        }
    }

    /// `Ok(Some)` when found, `Ok(None)` when absent, `Err` when the query failed.
    pub fn into_result(self) -> Result<Option<T>, BackendError> {
        match self {
            Lookup::Found(v) => Ok(Some(v)),
            Lookup::NotFound => Ok(None),
            Lookup::QueryError(e) => Err(e),
        }
    }
}

/// Read operations over the backend's tables. All access is by equality or
/// membership filters plus result-count limits.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn find_year(&self, year: i32) -> Lookup<YearRow>;

    /// Look up a month by its number (1-12).
    async fn find_month(&self, month: u32) -> Lookup<MonthRow>;

    async fn find_period(&self, year_id: i64, month_id: i64) -> Lookup<PeriodRow>;

    /// Observations for one period joined with their metric definitions,
    /// in backend order, at most `limit` of them.
    async fn observations(
        &self,
        period_id: i64,
        limit: usize,
    ) -> Result<Vec<MetricObservation>, BackendError>;

    /// Distinct metric ids observed in any of the given periods.
    async fn observed_metric_ids(&self, period_ids: &[i64]) -> Result<Vec<i64>, BackendError>;

    async fn team_links(&self, metric_ids: &[i64]) -> Result<Vec<MetricTeamLink>, BackendError>;

    async fn teams(&self, team_ids: &[i64]) -> Result<Vec<Team>, BackendError>;

    async fn memberships(&self, team_ids: &[i64]) -> Result<Vec<Membership>, BackendError>;

    async fn employees(&self, employee_ids: &[i64]) -> Result<Vec<Employee>, BackendError>;
}
