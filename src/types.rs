//! Shared type definitions for the board pipeline.
//!
//! Backend rows are kept separate from the payload types handed to the
//! presentation layer: rows mirror the backend tables, payload types are
//! camelCase and carry only what a card needs.

use serde::{Deserialize, Serialize};

use crate::backend::{BackendConfig, MonthNaming};

/// Display name used when an observation's metric definition is missing.
pub const UNKNOWN_METRIC_NAME: &str = "Unknown metric";

// =============================================================================
// Reference data
// =============================================================================

/// A `years` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRow {
    pub year_id: i64,
    pub year: i32,
}

/// A `months` row. `month` holds whatever naming the backend uses
/// (a number or a long month name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthRow {
    pub month_id: i64,
    #[serde(deserialize_with = "string_or_number")]
    pub month: String,
    #[serde(default)]
    pub quarter: Option<i32>,
}

/// Month columns hold either text or an integer depending on the schema.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected month name or number, got {}",
            other
        ))),
    }
}

/// A `month_in_year` row: the composite key of a (year, month) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRow {
    pub monthyear_id: i64,
    pub year_id: i64,
    pub month_id: i64,
}

/// A metric definition (KPI type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub measurement: Option<String>,
}

/// A team.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: i64,
    pub name: String,
}

/// An employee.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub full_name: String,
}

/// Declares that a team is responsible for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricTeamLink {
    pub metric_id: i64,
    pub team_id: i64,
}

/// An employee's membership in a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub employee_id: i64,
    pub team_id: i64,
}

// =============================================================================
// Periods
// =============================================================================

/// A (year, month) reporting window. Months are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// The immediately preceding period. January steps back into December
    /// of the previous year.
    pub fn previous(self) -> Self {
        if self.month <= 1 {
            Self::new(self.year - 1, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Month number preceding `month`, wrapping January back to December.
pub fn previous_month(month: u32) -> u32 {
    if month <= 1 {
        12
    } else {
        month - 1
    }
}

/// A period whose year, month and composite rows all exist in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPeriod {
    pub period: Period,
    pub year_id: i64,
    pub month_id: i64,
    pub period_id: i64,
}

// =============================================================================
// Observations and board payload
// =============================================================================

/// One recorded value of a metric for a period, joined with its definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricObservation {
    pub observation_id: i64,
    pub metric_id: i64,
    pub period_id: i64,
    /// Null in the backend stays `None`.
    pub value: Option<f64>,
    /// Joined definition; `None` when the metric row is missing.
    pub metric: Option<Metric>,
}

impl MetricObservation {
    /// Name shown on the card.
    pub fn display_name(&self) -> &str {
        self.metric
            .as_ref()
            .map(|m| m.name.as_str())
            .unwrap_or(UNKNOWN_METRIC_NAME)
    }
}

/// One card of the selected metric set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedMetric {
    pub observation: MetricObservation,
    pub display_name: String,
}

impl From<MetricObservation> for SelectedMetric {
    fn from(observation: MetricObservation) -> Self {
        let display_name = observation.display_name().to_string();
        Self {
            observation,
            display_name,
        }
    }
}

impl SelectedMetric {
    pub fn metric_id(&self) -> i64 {
        self.observation.metric_id
    }
}

/// Employees (and their teams) linked to one selected metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricEmployees {
    pub metric_id: i64,
    pub metric_name: String,
    pub teams: Vec<Team>,
    pub employees: Vec<Employee>,
}

/// Data handed to the presentation layer for one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub period: ResolvedPeriod,
    pub metrics: Vec<SelectedMetric>,
    /// One entry per selected metric, in the same order.
    pub employees_by_metric: Vec<MetricEmployees>,
}

// =============================================================================
// Configuration
// =============================================================================

/// Contents of ~/.kpiboard/config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    /// Reporting year the board shows; the month comes from the clock.
    #[serde(default = "default_target_year")]
    pub target_year: i32,
    #[serde(default = "default_display_cap")]
    pub display_cap: usize,
    #[serde(default = "default_per_team_cap")]
    pub per_team_cap: usize,
    /// How many observations to fetch for the period before sampling.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    #[serde(default)]
    pub month_naming: MonthNaming,
    /// Fixed sampling seed. Unset means a fresh seed per run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_target_year() -> i32 {
    2025
}

fn default_display_cap() -> usize {
    4
}

fn default_per_team_cap() -> usize {
    2
}

fn default_fetch_limit() -> usize {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            target_year: default_target_year(),
            display_cap: default_display_cap(),
            per_team_cap: default_per_team_cap(),
            fetch_limit: default_fetch_limit(),
            month_naming: MonthNaming::default(),
            seed: None,
        }
    }
}
