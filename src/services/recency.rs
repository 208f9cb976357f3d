// Recency filter: keep the board fresh by hiding metrics shown in the two
// preceding periods. A freshness heuristic only: any failure here fails open.

use std::collections::HashSet;

use crate::backend::{Backend, BackendError, Lookup};
use crate::types::{MetricObservation, Period, ResolvedPeriod};

/// How many preceding periods count as "recently shown".
pub const RECENT_PERIODS: usize = 2;

/// Result of the recency filter.
#[derive(Debug, Clone, Default)]
pub struct RecencyOutcome {
    /// Observations that go on to team grouping.
    pub kept: Vec<MetricObservation>,
    /// Observations removed as recently shown, in fetch order.
    pub excluded: Vec<MetricObservation>,
    /// True when the filter was not applied (lookup failed, or it would have
    /// removed everything).
    pub bypassed: bool,
}

impl RecencyOutcome {
    fn unfiltered(observations: &[MetricObservation]) -> Self {
        Self {
            kept: observations.to_vec(),
            excluded: Vec::new(),
            bypassed: true,
        }
    }
}

/// Period ids of the `count` periods immediately before `period`, newest
/// first. Periods missing from the backend are skipped.
pub async fn preceding_period_ids(
    backend: &dyn Backend,
    period: &ResolvedPeriod,
    count: usize,
) -> Result<Vec<i64>, BackendError> {
    let mut ids = Vec::with_capacity(count);
    let mut cursor: Period = period.period;

    for _ in 0..count {
        cursor = cursor.previous();

        let year_id = if cursor.year == period.period.year {
            period.year_id
        } else {
            match backend.find_year(cursor.year).await.into_result()? {
                Some(row) => row.year_id,
                None => continue,
            }
        };

        let Some(month) = backend.find_month(cursor.month).await.into_result()? else {
            continue;
        };

        match backend.find_period(year_id, month.month_id).await {
            Lookup::Found(row) => ids.push(row.monthyear_id),
            Lookup::NotFound => {}
            Lookup::QueryError(e) => return Err(e),
        }
    }

    Ok(ids)
}

/// Drop observations whose metric appeared in either of the two preceding
/// periods. Never returns an empty `kept` for non-empty input.
pub async fn filter_recent(
    backend: &dyn Backend,
    period: &ResolvedPeriod,
    observations: &[MetricObservation],
) -> RecencyOutcome {
    let recent = match recent_metric_ids(backend, period).await {
        Ok(ids) => ids,
        Err(e) => {
            log::warn!(
                "Recency filter: lookup failed for {}, showing unfiltered metrics: {}",
                period.period,
                e
            );
            return RecencyOutcome::unfiltered(observations);
        }
    };

    let (kept, excluded): (Vec<_>, Vec<_>) = observations
        .iter()
        .cloned()
        .partition(|o| !recent.contains(&o.metric_id));

    if kept.is_empty() {
        log::info!(
            "Recency filter: all {} metrics were shown recently, keeping them",
            observations.len()
        );
        return RecencyOutcome::unfiltered(observations);
    }

    log::debug!(
        "Recency filter: kept {}, excluded {}",
        kept.len(),
        excluded.len()
    );
    RecencyOutcome {
        kept,
        excluded,
        bypassed: false,
    }
}

async fn recent_metric_ids(
    backend: &dyn Backend,
    period: &ResolvedPeriod,
) -> Result<HashSet<i64>, BackendError> {
    let period_ids = preceding_period_ids(backend, period, RECENT_PERIODS).await?;
    if period_ids.is_empty() {
        return Ok(HashSet::new());
    }
    Ok(backend
        .observed_metric_ids(&period_ids)
        .await?
        .into_iter()
        .collect())
}
