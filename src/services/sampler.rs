// Team grouping & sampler: picks the final cards.
//
// Pool building caps every team at `per_team_cap` metrics, the pool is
// shuffled and cut to `display_cap`, short selections are padded from the
// unfiltered fetch, and the result is ordered by display name.

use std::collections::{BTreeMap, HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;

use super::recency::RecencyOutcome;
use crate::backend::Backend;
use crate::types::{MetricObservation, MetricTeamLink, SelectedMetric};
use crate::util::compare_names;

/// Size limits for one board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLimits {
    pub per_team_cap: usize,
    pub display_cap: usize,
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            per_team_cap: 2,
            display_cap: 4,
        }
    }
}

/// One observation per metric, the first in fetch order.
pub fn distinct_by_metric(observations: &[MetricObservation]) -> Vec<MetricObservation> {
    let mut seen: HashSet<i64> = HashSet::new();
    observations
        .iter()
        .filter(|o| seen.insert(o.metric_id))
        .cloned()
        .collect()
}

/// Group observations by owning team and keep at most `per_team_cap` from
/// each, chosen at random.
///
/// Teams are visited in ascending id order so a seeded generator gives a
/// reproducible pool. A metric enters the pool once, even when it is owned
/// by several teams or observed more than once. Metrics no team owns are not
/// subject to the cap and follow the team buckets in fetch order.
pub fn build_team_pool<R: Rng + ?Sized>(
    observations: &[MetricObservation],
    links: &[MetricTeamLink],
    per_team_cap: usize,
    rng: &mut R,
) -> Vec<MetricObservation> {
    let observations = distinct_by_metric(observations);

    let mut teams_by_metric: HashMap<i64, Vec<i64>> = HashMap::new();
    for link in links {
        let teams = teams_by_metric.entry(link.metric_id).or_default();
        if !teams.contains(&link.team_id) {
            teams.push(link.team_id);
        }
    }

    let mut buckets: BTreeMap<i64, Vec<&MetricObservation>> = BTreeMap::new();
    let mut unowned: Vec<&MetricObservation> = Vec::new();
    for obs in &observations {
        match teams_by_metric.get(&obs.metric_id) {
            Some(teams) if !teams.is_empty() => {
                for team_id in teams {
                    buckets.entry(*team_id).or_default().push(obs);
                }
            }
            _ => unowned.push(obs),
        }
    }

    let mut seen: HashSet<i64> = HashSet::new();
    let mut pool = Vec::new();
    for (team_id, mut bucket) in buckets {
        bucket.shuffle(rng);
        let before = pool.len();
        for obs in bucket.into_iter().take(per_team_cap) {
            if seen.insert(obs.metric_id) {
                pool.push(obs.clone());
            }
        }
        log::debug!("Sampler: team {} contributes {}", team_id, pool.len() - before);
    }
    for obs in unowned {
        if seen.insert(obs.metric_id) {
            pool.push(obs.clone());
        }
    }

    pool
}

/// Append candidates whose metric is not yet selected, in the order given,
/// until `display_cap` is reached.
pub fn pad_selection<'a>(
    selected: &mut Vec<MetricObservation>,
    display_cap: usize,
    candidates: impl IntoIterator<Item = &'a MetricObservation>,
) {
    let mut taken: HashSet<i64> = selected.iter().map(|o| o.metric_id).collect();
    for obs in candidates {
        if selected.len() >= display_cap {
            break;
        }
        if taken.insert(obs.metric_id) {
            selected.push(obs.clone());
        }
    }
}

/// Order cards by display name (locale-aware), then by metric id.
pub fn sort_for_display(metrics: &mut [SelectedMetric]) {
    metrics.sort_by(|a, b| {
        compare_names(&a.display_name, &b.display_name)
            .then_with(|| a.metric_id().cmp(&b.metric_id()))
    });
}

/// Choose the board's metrics from the recency-filtered set.
///
/// Padding draws first on what the recency filter excluded, then on the
/// rest of the unfiltered fetch, both in fetch order. If team links cannot
/// be loaded the sampling step is skipped: the first `display_cap` filtered
/// observations are taken as they come, then padded the same way.
pub async fn select_metrics<R: Rng + ?Sized>(
    backend: &dyn Backend,
    recency: &RecencyOutcome,
    unfiltered: &[MetricObservation],
    limits: SelectionLimits,
    rng: &mut R,
) -> Vec<SelectedMetric> {
    let mut metric_ids: Vec<i64> = recency.kept.iter().map(|o| o.metric_id).collect();
    metric_ids.sort_unstable();
    metric_ids.dedup();

    let mut selected = match backend.team_links(&metric_ids).await {
        Ok(links) => {
            let mut pool = build_team_pool(&recency.kept, &links, limits.per_team_cap, rng);
            pool.shuffle(rng);
            pool.truncate(limits.display_cap);
            pool
        }
        Err(e) => {
            log::warn!("Sampler: team links unavailable, skipping sampling: {}", e);
            let mut first = distinct_by_metric(&recency.kept);
            first.truncate(limits.display_cap);
            first
        }
    };

    if selected.len() < limits.display_cap {
        let before = selected.len();
        pad_selection(
            &mut selected,
            limits.display_cap,
            recency.excluded.iter().chain(unfiltered.iter()),
        );
        log::debug!("Sampler: padded {} -> {}", before, selected.len());
    }

    let mut metrics: Vec<SelectedMetric> = selected.into_iter().map(SelectedMetric::from).collect();
    sort_for_display(&mut metrics);
    metrics
}
