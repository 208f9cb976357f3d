//! Test helpers: a backend wrapper that fails chosen reads, and the shared
//! October 2025 fixture.

use async_trait::async_trait;

use super::{Backend, BackendError, Lookup, MemoryBackend};
use crate::types::{
    Employee, Membership, MetricObservation, MetricTeamLink, MonthRow, PeriodRow, Team, YearRow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    FindYear,
    FindMonth,
    FindPeriod,
    Observations,
    ObservedMetricIds,
    TeamLinks,
    Teams,
    Memberships,
    Employees,
}

/// Delegates to a [`MemoryBackend`] except for the listed reads, which fail
/// with a query error.
pub struct FailingBackend {
    pub inner: MemoryBackend,
    pub failing: Vec<Op>,
}

impl FailingBackend {
    pub fn new(inner: MemoryBackend, failing: &[Op]) -> Self {
        Self {
            inner,
            failing: failing.to_vec(),
        }
    }

    fn fails(&self, op: Op) -> Option<BackendError> {
        self.failing
            .contains(&op)
            .then(|| BackendError::Query(format!("injected failure in {:?}", op)))
    }
}

#[async_trait]
impl Backend for FailingBackend {
    async fn find_year(&self, year: i32) -> Lookup<YearRow> {
        match self.fails(Op::FindYear) {
            Some(e) => Lookup::QueryError(e),
            None => self.inner.find_year(year).await,
        }
    }

    async fn find_month(&self, month: u32) -> Lookup<MonthRow> {
        match self.fails(Op::FindMonth) {
            Some(e) => Lookup::QueryError(e),
            None => self.inner.find_month(month).await,
        }
    }

    async fn find_period(&self, year_id: i64, month_id: i64) -> Lookup<PeriodRow> {
        match self.fails(Op::FindPeriod) {
            Some(e) => Lookup::QueryError(e),
            None => self.inner.find_period(year_id, month_id).await,
        }
    }

    async fn observations(
        &self,
        period_id: i64,
        limit: usize,
    ) -> Result<Vec<MetricObservation>, BackendError> {
        match self.fails(Op::Observations) {
            Some(e) => Err(e),
            None => self.inner.observations(period_id, limit).await,
        }
    }

    async fn observed_metric_ids(&self, period_ids: &[i64]) -> Result<Vec<i64>, BackendError> {
        match self.fails(Op::ObservedMetricIds) {
            Some(e) => Err(e),
            None => self.inner.observed_metric_ids(period_ids).await,
        }
    }

    async fn team_links(&self, metric_ids: &[i64]) -> Result<Vec<MetricTeamLink>, BackendError> {
        match self.fails(Op::TeamLinks) {
            Some(e) => Err(e),
            None => self.inner.team_links(metric_ids).await,
        }
    }

    async fn teams(&self, team_ids: &[i64]) -> Result<Vec<Team>, BackendError> {
        match self.fails(Op::Teams) {
            Some(e) => Err(e),
            None => self.inner.teams(team_ids).await,
        }
    }

    async fn memberships(&self, team_ids: &[i64]) -> Result<Vec<Membership>, BackendError> {
        match self.fails(Op::Memberships) {
            Some(e) => Err(e),
            None => self.inner.memberships(team_ids).await,
        }
    }

    async fn employees(&self, employee_ids: &[i64]) -> Result<Vec<Employee>, BackendError> {
        match self.fails(Op::Employees) {
            Some(e) => Err(e),
            None => self.inner.employees(employee_ids).await,
        }
    }
}

/// Period id of October 2025 in [`october_2025`].
pub const OCTOBER: i64 = 310;
/// Period id of September 2025 in [`october_2025`].
pub const SEPTEMBER: i64 = 309;
/// Period id of August 2025 in [`october_2025`].
pub const AUGUST: i64 = 308;

/// Year 2025 with August, September and October periods.
///
/// October has 6 observations across 3 teams:
/// team A (1) owns metrics 1, 2, 3; team B (2) owns 4, 5; team C (3) owns 6.
/// Employees: Anna and Boris in A, Boris and Vera in B, Gleb in C.
pub fn october_2025() -> MemoryBackend {
    MemoryBackend::default()
        .with_year(1, 2025)
        .with_month(8, 8)
        .with_month(9, 9)
        .with_month(10, 10)
        .with_period(AUGUST, 1, 8)
        .with_period(SEPTEMBER, 1, 9)
        .with_period(OCTOBER, 1, 10)
        .with_metric(1, "Requests processed")
        .with_metric(2, "Projects completed")
        .with_metric(3, "Hours logged")
        .with_metric(4, "Active members")
        .with_metric(5, "Deploys")
        .with_metric(6, "Incidents closed")
        .with_observation(101, 1, OCTOBER, 7145.0)
        .with_observation(102, 2, OCTOBER, 127.0)
        .with_observation(103, 3, OCTOBER, 18543.0)
        .with_observation(104, 4, OCTOBER, 42.0)
        .with_observation(105, 5, OCTOBER, 310.0)
        .with_observation(106, 6, OCTOBER, 18.0)
        .with_team(1, "Backend")
        .with_team(2, "Frontend")
        .with_team(3, "Support")
        .with_link(1, 1)
        .with_link(2, 1)
        .with_link(3, 1)
        .with_link(4, 2)
        .with_link(5, 2)
        .with_link(6, 3)
        .with_employee(1, "Anna Ivanova")
        .with_employee(2, "Boris Petrov")
        .with_employee(3, "Vera Smirnova")
        .with_employee(4, "Gleb Kozlov")
        .with_membership(1, 1)
        .with_membership(2, 1)
        .with_membership(2, 2)
        .with_membership(3, 2)
        .with_membership(4, 3)
}
