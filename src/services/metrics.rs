// Metric fetcher: observations recorded for the resolved period.

use crate::backend::Backend;
use crate::error::BoardError;
use crate::types::{MetricObservation, ResolvedPeriod};

/// Fetch up to `cap` observations for the period, each joined with its
/// metric definition, in backend order.
///
/// An empty result is `NoData`, never an empty list.
pub async fn fetch_observations(
    backend: &dyn Backend,
    period: &ResolvedPeriod,
    cap: usize,
) -> Result<Vec<MetricObservation>, BoardError> {
    let observations = backend.observations(period.period_id, cap).await?;

    if observations.is_empty() {
        return Err(BoardError::NoData(period.period));
    }

    log::debug!(
        "Metric fetcher: {} observations for {}",
        observations.len(),
        period.period
    );
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{october_2025, FailingBackend, Op, OCTOBER};
    use crate::error::ErrorKind;
    use crate::types::Period;

    fn october() -> ResolvedPeriod {
        ResolvedPeriod {
            period: Period::new(2025, 10),
            year_id: 1,
            month_id: 10,
            period_id: OCTOBER,
        }
    }

    #[tokio::test]
    async fn test_fetch_respects_cap() {
        let backend = october_2025();
        let obs = fetch_observations(&backend, &october(), 4).await.unwrap();
        assert_eq!(obs.len(), 4);
        assert_eq!(obs[0].display_name(), "Requests processed");

        let all = fetch_observations(&backend, &october(), 50).await.unwrap();
        assert_eq!(all.len(), 6);
    }

    #[tokio::test]
    async fn test_empty_period_is_no_data() {
        let backend = october_2025();
        let mut period = october();
        period.period_id = 999;
        let err = fetch_observations(&backend, &period, 4).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoData);
    }

    #[tokio::test]
    async fn test_query_failure_is_distinct_from_no_data() {
        let backend = FailingBackend::new(october_2025(), &[Op::Observations]);
        let err = fetch_observations(&backend, &october(), 4).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
    }
}
