//! In-memory backend over a snapshot of the metrics tables.
//!
//! Used for offline runs (`kpiboard --snapshot board.json`) and as the fixture
//! store in tests. Rows keep their snapshot order, which stands in for the
//! hosted backend's natural order.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Backend, BackendError, Lookup, MonthNaming};
use crate::types::{
    Employee, Membership, Metric, MetricObservation, MetricTeamLink, MonthRow, PeriodRow, Team,
    YearRow,
};

// Snapshot files use camelCase keys throughout. Reference-data records are
// converted to the backend row types on lookup.

/// A `years` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub year_id: i64,
    pub year: i32,
}

/// A `months` row; `month` is a number or a long month name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthRecord {
    pub month_id: i64,
    #[serde(deserialize_with = "crate::types::string_or_number")]
    pub month: String,
    #[serde(default)]
    pub quarter: Option<i32>,
}

/// A `month_in_year` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodRecord {
    pub period_id: i64,
    pub year_id: i64,
    pub month_id: i64,
}

impl From<&YearRecord> for YearRow {
    fn from(r: &YearRecord) -> Self {
        YearRow {
            year_id: r.year_id,
            year: r.year,
        }
    }
}

impl From<&MonthRecord> for MonthRow {
    fn from(r: &MonthRecord) -> Self {
        MonthRow {
            month_id: r.month_id,
            month: r.month.clone(),
            quarter: r.quarter,
        }
    }
}

impl From<&PeriodRecord> for PeriodRow {
    fn from(r: &PeriodRecord) -> Self {
        PeriodRow {
            monthyear_id: r.period_id,
            year_id: r.year_id,
            month_id: r.month_id,
        }
    }
}

/// One `monthly_metrics` row before the metric definition is joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRecord {
    pub observation_id: i64,
    pub metric_id: i64,
    pub period_id: i64,
    #[serde(default)]
    pub value: Option<f64>,
}

/// A full copy of the tables the board reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub years: Vec<YearRecord>,
    #[serde(default)]
    pub months: Vec<MonthRecord>,
    #[serde(default)]
    pub periods: Vec<PeriodRecord>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub observations: Vec<ObservationRecord>,
    #[serde(default)]
    pub team_links: Vec<MetricTeamLink>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub memberships: Vec<Membership>,
    #[serde(default)]
    pub employees: Vec<Employee>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    snapshot: Snapshot,
}

impl MemoryBackend {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read snapshot {}: {}", path.display(), e))?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse snapshot {}: {}", path.display(), e))?;
        Ok(Self::new(snapshot))
    }

    // -------------------------------------------------------------------------
    // Fixture builders
    // -------------------------------------------------------------------------

    pub fn with_year(mut self, year_id: i64, year: i32) -> Self {
        self.snapshot.years.push(YearRecord { year_id, year });
        self
    }

    /// Add a month keyed by its number.
    pub fn with_month(mut self, month_id: i64, month: u32) -> Self {
        self.snapshot.months.push(MonthRecord {
            month_id,
            month: month.to_string(),
            quarter: Some(((month.max(1) - 1) / 3 + 1) as i32),
        });
        self
    }

    pub fn with_period(mut self, period_id: i64, year_id: i64, month_id: i64) -> Self {
        self.snapshot.periods.push(PeriodRecord {
            period_id,
            year_id,
            month_id,
        });
        self
    }

    pub fn with_metric(mut self, id: i64, name: &str) -> Self {
        self.snapshot.metrics.push(Metric {
            id,
            name: name.to_string(),
            measurement: None,
        });
        self
    }

    pub fn with_observation(
        mut self,
        observation_id: i64,
        metric_id: i64,
        period_id: i64,
        value: f64,
    ) -> Self {
        self.snapshot.observations.push(ObservationRecord {
            observation_id,
            metric_id,
            period_id,
            value: Some(value),
        });
        self
    }

    pub fn with_team(mut self, id: i64, name: &str) -> Self {
        self.snapshot.teams.push(Team {
            id,
            name: name.to_string(),
        });
        self
    }

    pub fn with_link(mut self, metric_id: i64, team_id: i64) -> Self {
        self.snapshot.team_links.push(MetricTeamLink { metric_id, team_id });
        self
    }

    pub fn with_employee(mut self, id: i64, full_name: &str) -> Self {
        self.snapshot.employees.push(Employee {
            id,
            full_name: full_name.to_string(),
        });
        self
    }

    pub fn with_membership(mut self, employee_id: i64, team_id: i64) -> Self {
        self.snapshot.memberships.push(Membership {
            employee_id,
            team_id,
        });
        self
    }

    fn metric(&self, id: i64) -> Option<Metric> {
        self.snapshot.metrics.iter().find(|m| m.id == id).cloned()
    }
}

/// Months in a snapshot may be named either way; accept both.
fn month_matches(row: &MonthRecord, month: u32) -> bool {
    let name = row.month.trim();
    [MonthNaming::Number, MonthNaming::RuLong]
        .iter()
        .filter_map(|naming| naming.key(month))
        .any(|key| key.eq_ignore_ascii_case(name) || key == name.to_lowercase())
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn find_year(&self, year: i32) -> Lookup<YearRow> {
        Lookup::from_rows(
            self.snapshot
                .years
                .iter()
                .filter(|y| y.year == year)
                .map(YearRow::from)
                .collect(),
            "years",
        )
    }

    async fn find_month(&self, month: u32) -> Lookup<MonthRow> {
        Lookup::from_rows(
            self.snapshot
                .months
                .iter()
                .filter(|m| month_matches(m, month))
                .map(MonthRow::from)
                .collect(),
            "months",
        )
    }

    async fn find_period(&self, year_id: i64, month_id: i64) -> Lookup<PeriodRow> {
        Lookup::from_rows(
            self.snapshot
                .periods
                .iter()
                .filter(|p| p.year_id == year_id && p.month_id == month_id)
                .map(PeriodRow::from)
                .collect(),
            "month_in_year",
        )
    }

    async fn observations(
        &self,
        period_id: i64,
        limit: usize,
    ) -> Result<Vec<MetricObservation>, BackendError> {
        Ok(self
            .snapshot
            .observations
            .iter()
            .filter(|o| o.period_id == period_id)
            .take(limit)
            .map(|o| MetricObservation {
                observation_id: o.observation_id,
                metric_id: o.metric_id,
                period_id: o.period_id,
                value: o.value,
                metric: self.metric(o.metric_id),
            })
            .collect())
    }

    async fn observed_metric_ids(&self, period_ids: &[i64]) -> Result<Vec<i64>, BackendError> {
        let wanted: HashSet<i64> = period_ids.iter().copied().collect();
        let mut ids: Vec<i64> = self
            .snapshot
            .observations
            .iter()
            .filter(|o| wanted.contains(&o.period_id))
            .map(|o| o.metric_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn team_links(&self, metric_ids: &[i64]) -> Result<Vec<MetricTeamLink>, BackendError> {
        Ok(self
            .snapshot
            .team_links
            .iter()
            .filter(|l| metric_ids.contains(&l.metric_id))
            .copied()
            .collect())
    }

    async fn teams(&self, team_ids: &[i64]) -> Result<Vec<Team>, BackendError> {
        Ok(self
            .snapshot
            .teams
            .iter()
            .filter(|t| team_ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn memberships(&self, team_ids: &[i64]) -> Result<Vec<Membership>, BackendError> {
        Ok(self
            .snapshot
            .memberships
            .iter()
            .filter(|m| team_ids.contains(&m.team_id))
            .copied()
            .collect())
    }

    async fn employees(&self, employee_ids: &[i64]) -> Result<Vec<Employee>, BackendError> {
        Ok(self
            .snapshot
            .employees
            .iter()
            .filter(|e| employee_ids.contains(&e.id))
            .cloned()
            .collect())
    }
}
