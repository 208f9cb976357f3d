//! HTTP client for the hosted metrics database.
//!
//! Talks PostgREST: every read is a `GET {url}/rest/v1/{table}` with a
//! `select` list, `col=eq.v` / `col=in.(a,b)` filters and an optional
//! `limit`. Auth is the project API key, sent both as `apikey` and as a
//! bearer token.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{Backend, BackendConfig, BackendError, Lookup, MonthNaming};
use crate::types::{
    Employee, Membership, Metric, MetricObservation, MetricTeamLink, MonthRow, PeriodRow, Team,
    YearRow,
};

const REST_PATH: &str = "rest/v1";

const YEARS: &str = "years";
const MONTHS: &str = "months";
const MONTH_IN_YEAR: &str = "month_in_year";
const MONTHLY_METRICS: &str = "monthly_metrics";
const METRIC_TEAMS: &str = "metric_teams";
const TEAMS: &str = "teams";
const EMPLOYEE_TEAMS: &str = "employee_teams";
const EMPLOYEES: &str = "employees";

/// Single-row reads fetch one extra row so duplicates are detected.
const SINGLE_ROW_PROBE: usize = 2;

/// Rows per request for unbounded list reads; stays under common
/// PostgREST `max-rows` settings.
const PAGE_SIZE: usize = 1000;

pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    month_naming: MonthNaming,
    page_size: usize,
}

impl RestBackend {
    pub fn new(config: &BackendConfig, month_naming: MonthNaming) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BackendError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            month_naming,
            page_size: PAGE_SIZE,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, REST_PATH, table)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: &[(&str, String)],
        limit: Option<usize>,
    ) -> Result<Vec<T>, BackendError> {
        let mut query: Vec<(&str, String)> = Vec::with_capacity(filters.len() + 2);
        query.push(("select", columns.to_string()));
        query.extend(filters.iter().cloned());
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        log::debug!("GET {} {:?}", table, query);

        let resp = self
            .client
            .get(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .query(&query)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Http { status, body });
        }

        resp.json::<Vec<T>>()
            .await
            .map_err(|e| BackendError::Decode(format!("{}: {}", table, e)))
    }
}

/// `col=eq.value`
fn eq_filter(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

/// `col=not.is.null`
fn not_null_filter() -> String {
    "not.is.null".to_string()
}

/// Observations of one period that can be shown: rows without a metric are
/// excluded by the backend so they never take up a `limit` slot.
fn observation_filters(period_id: i64) -> Vec<(&'static str, String)> {
    vec![
        ("monthyear_id", eq_filter(period_id)),
        ("metric_id", not_null_filter()),
    ]
}

/// Metric ids of the given periods, one page of them.
fn observed_page_filters(period_ids: &[i64], offset: usize) -> Vec<(&'static str, String)> {
    vec![
        ("monthyear_id", in_filter(period_ids)),
        ("metric_id", not_null_filter()),
        ("order", "monthmetric_id.asc".to_string()),
        ("offset", offset.to_string()),
    ]
}

/// `col=in.(a,b,c)`
fn in_filter(ids: &[i64]) -> String {
    let joined = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({})", joined)
}

#[derive(Deserialize)]
struct MetricRow {
    metric_id: i64,
    metric: String,
    #[serde(default)]
    measurement: Option<String>,
}

#[derive(Deserialize)]
struct ObservationRow {
    monthmetric_id: i64,
    metric_id: Option<i64>,
    monthyear_id: Option<i64>,
    value: Option<f64>,
    #[serde(default)]
    metrics: Option<MetricRow>,
}

#[derive(Deserialize)]
struct MetricIdRow {
    metric_id: Option<i64>,
}

#[derive(Deserialize)]
struct TeamRow {
    team_id: i64,
    team: String,
}

#[derive(Deserialize)]
struct EmployeeRow {
    employee_id: i64,
    full_name: String,
}

#[async_trait]
impl Backend for RestBackend {
    async fn find_year(&self, year: i32) -> Lookup<YearRow> {
        let result = self
            .select(YEARS, "year_id,year", &[("year", eq_filter(year))], Some(SINGLE_ROW_PROBE))
            .await;
        Lookup::from_result(result, YEARS)
    }

    async fn find_month(&self, month: u32) -> Lookup<MonthRow> {
        let Some(key) = self.month_naming.key(month) else {
            return Lookup::NotFound;
        };
        let result = self
            .select::<MonthRow>(
                MONTHS,
                "month_id,month,quarter",
                &[("month", eq_filter(key))],
                Some(SINGLE_ROW_PROBE),
            )
            .await;
        Lookup::from_result(result, MONTHS)
    }

    async fn find_period(&self, year_id: i64, month_id: i64) -> Lookup<PeriodRow> {
        let result = self
            .select(
                MONTH_IN_YEAR,
                "monthyear_id,year_id,month_id",
                &[("year_id", eq_filter(year_id)), ("month_id", eq_filter(month_id))],
                Some(SINGLE_ROW_PROBE),
            )
            .await;
        Lookup::from_result(result, MONTH_IN_YEAR)
    }

    async fn observations(
        &self,
        period_id: i64,
        limit: usize,
    ) -> Result<Vec<MetricObservation>, BackendError> {
        let rows: Vec<ObservationRow> = self
            .select(
                MONTHLY_METRICS,
                "monthmetric_id,metric_id,monthyear_id,value,metrics(metric_id,metric,measurement)",
                &observation_filters(period_id),
                Some(limit),
            )
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                // Rows without a metric cannot be rendered or linked to teams.
                let metric_id = row.metric_id?;
                Some(MetricObservation {
                    observation_id: row.monthmetric_id,
                    metric_id,
                    period_id: row.monthyear_id.unwrap_or(period_id),
                    value: row.value,
                    metric: row.metrics.map(|m| Metric {
                        id: m.metric_id,
                        name: m.metric,
                        measurement: m.measurement,
                    }),
                })
            })
            .collect())
    }

    async fn observed_metric_ids(&self, period_ids: &[i64]) -> Result<Vec<i64>, BackendError> {
        if period_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut ids: Vec<i64> = Vec::new();
        let mut offset = 0;
        loop {
            let rows: Vec<MetricIdRow> = self
                .select(
                    MONTHLY_METRICS,
                    "metric_id",
                    &observed_page_filters(period_ids, offset),
                    Some(self.page_size),
                )
                .await?;
            let fetched = rows.len();
            ids.extend(rows.into_iter().filter_map(|r| r.metric_id));
            if fetched < self.page_size {
                break;
            }
            offset += fetched;
        }

        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn team_links(&self, metric_ids: &[i64]) -> Result<Vec<MetricTeamLink>, BackendError> {
        if metric_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(
            METRIC_TEAMS,
            "metric_id,team_id",
            &[("metric_id", in_filter(metric_ids))],
            None,
        )
        .await
        .map(|links: Vec<LinkRow>| links.into_iter().map(Into::into).collect())
    }

    async fn teams(&self, team_ids: &[i64]) -> Result<Vec<Team>, BackendError> {
        if team_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<TeamRow> = self
            .select(TEAMS, "team_id,team", &[("team_id", in_filter(team_ids))], None)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| Team {
                id: r.team_id,
                name: r.team,
            })
            .collect())
    }

    async fn memberships(&self, team_ids: &[i64]) -> Result<Vec<Membership>, BackendError> {
        if team_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(
            EMPLOYEE_TEAMS,
            "employee_id,team_id",
            &[("team_id", in_filter(team_ids))],
            None,
        )
        .await
        .map(|rows: Vec<MembershipRow>| rows.into_iter().map(Into::into).collect())
    }

    async fn employees(&self, employee_ids: &[i64]) -> Result<Vec<Employee>, BackendError> {
        if employee_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<EmployeeRow> = self
            .select(
                EMPLOYEES,
                "employee_id,full_name",
                &[("employee_id", in_filter(employee_ids))],
                None,
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| Employee {
                id: r.employee_id,
                full_name: r.full_name,
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct LinkRow {
    metric_id: i64,
    team_id: i64,
}

impl From<LinkRow> for MetricTeamLink {
    fn from(row: LinkRow) -> Self {
        MetricTeamLink {
            metric_id: row.metric_id,
            team_id: row.team_id,
        }
    }
}

#[derive(Deserialize)]
struct MembershipRow {
    employee_id: i64,
    team_id: i64,
}

impl From<MembershipRow> for Membership {
    fn from(row: MembershipRow) -> Self {
        Membership {
            employee_id: row.employee_id,
            team_id: row.team_id,
        }
    }
}
