// Employee resolver: who is behind each selected metric.
//
// metric -> teams (metric_teams) -> employees (employee_teams -> employees).
// Metrics are resolved concurrently; one failing metric never blocks the others.

use std::collections::HashSet;

use futures::future::join_all;

use crate::backend::{Backend, BackendError};
use crate::types::{Employee, MetricEmployees, SelectedMetric, Team};

/// Resolve teams and employees for every selected metric.
///
/// Returns exactly one entry per metric, in the same order. A metric whose
/// lookup fails gets an empty entry and a warning.
pub async fn resolve_employees(
    backend: &dyn Backend,
    metrics: &[SelectedMetric],
) -> Vec<MetricEmployees> {
    let lookups = metrics.iter().map(|m| resolve_one(backend, m));
    join_all(lookups).await
}

async fn resolve_one(backend: &dyn Backend, metric: &SelectedMetric) -> MetricEmployees {
    let metric_id = metric.metric_id();
    let (teams, employees) = match lookup(backend, metric_id).await {
        Ok(found) => found,
        Err(e) => {
            log::warn!(
                "Employee resolver: lookup failed for metric {} ({}): {}",
                metric_id,
                metric.display_name,
                e
            );
            (Vec::new(), Vec::new())
        }
    };

    MetricEmployees {
        metric_id,
        metric_name: metric.display_name.clone(),
        teams,
        employees,
    }
}

async fn lookup(
    backend: &dyn Backend,
    metric_id: i64,
) -> Result<(Vec<Team>, Vec<Employee>), BackendError> {
    let links = backend.team_links(&[metric_id]).await?;
    let team_ids = dedup_in_order(links.iter().map(|l| l.team_id));
    if team_ids.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let teams = order_by_ids(backend.teams(&team_ids).await?, &team_ids, |t| t.id);

    let memberships = backend.memberships(&team_ids).await?;
    let employee_ids = dedup_in_order(memberships.iter().map(|m| m.employee_id));
    if employee_ids.is_empty() {
        return Ok((teams, Vec::new()));
    }

    let employees = order_by_ids(backend.employees(&employee_ids).await?, &employee_ids, |e| e.id);
    Ok((teams, employees))
}

/// Keep the first occurrence of each id.
fn dedup_in_order(ids: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

/// Reorder `rows` to follow `ids`, dropping duplicates and rows not asked for.
fn order_by_ids<T>(rows: Vec<T>, ids: &[i64], id_of: impl Fn(&T) -> i64) -> Vec<T> {
    let mut slots: Vec<Option<T>> = ids.iter().map(|_| None).collect();
    for row in rows {
        let id = id_of(&row);
        if let Some(pos) = ids.iter().position(|i| *i == id) {
            if slots[pos].is_none() {
                slots[pos] = Some(row);
            }
        }
    }
    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{october_2025, FailingBackend, Op, OCTOBER};
    use crate::types::{Metric, MetricObservation};

    fn selected(metric_id: i64, name: &str) -> SelectedMetric {
        MetricObservation {
            observation_id: 100 + metric_id,
            metric_id,
            period_id: OCTOBER,
            value: Some(1.0),
            metric: Some(Metric {
                id: metric_id,
                name: name.to_string(),
                measurement: None,
            }),
        }
        .into()
    }

    fn names(entry: &MetricEmployees) -> Vec<&str> {
        entry.employees.iter().map(|e| e.full_name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_one_entry_per_metric_in_order() {
        let backend = october_2025();
        let metrics = vec![
            selected(4, "Active members"),
            selected(5, "Deploys"),
            selected(1, "Requests processed"),
        ];

        let entries = resolve_employees(&backend, &metrics).await;
        assert_eq!(
            entries.iter().map(|e| e.metric_id).collect::<Vec<_>>(),
            vec![4, 5, 1]
        );
        assert_eq!(names(&entries[0]), vec!["Boris Petrov", "Vera Smirnova"]);
        assert_eq!(entries[0].teams[0].name, "Frontend");
        assert_eq!(names(&entries[2]), vec!["Anna Ivanova", "Boris Petrov"]);
        assert_eq!(entries[2].metric_name, "Requests processed");
    }

    #[tokio::test]
    async fn test_employee_in_two_owning_teams_listed_once() {
        // Metric 1 owned by Backend and Frontend; Boris sits in both.
        let backend = october_2025().with_link(1, 2);
        let entries = resolve_employees(&backend, &[selected(1, "Requests processed")]).await;

        assert_eq!(entries[0].teams.len(), 2);
        assert_eq!(
            names(&entries[0]),
            vec!["Anna Ivanova", "Boris Petrov", "Vera Smirnova"]
        );
    }

    #[tokio::test]
    async fn test_unowned_metric_has_empty_entry() {
        let backend = october_2025().with_metric(9, "Orphan");
        let entries = resolve_employees(&backend, &[selected(9, "Orphan")]).await;
        assert_eq!(entries.len(), 1);
        assert!(entries[0].teams.is_empty());
        assert!(entries[0].employees.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_yields_empty_entry() {
        let backend = FailingBackend::new(october_2025(), &[Op::Memberships]);
        let metrics = vec![selected(1, "Requests processed"), selected(6, "Incidents closed")];

        let entries = resolve_employees(&backend, &metrics).await;
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.employees.is_empty() && e.teams.is_empty()));
        assert_eq!(entries[1].metric_id, 6);
    }

    #[test]
    fn test_order_by_ids_follows_requested_order() {
        let rows = vec![(3, "c"), (1, "a"), (2, "b"), (1, "dup")];
        let ordered = order_by_ids(rows, &[1, 2, 3], |r| r.0);
        assert_eq!(ordered, vec![(1, "a"), (2, "b"), (3, "c")]);
    }
}
