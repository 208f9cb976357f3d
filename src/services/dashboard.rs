// Board service: runs the selection pipeline for one render.
// period -> observations -> recency filter -> team sampling -> employees.

use chrono::NaiveDate;
use rand::Rng;

use super::employees::resolve_employees;
use super::metrics::fetch_observations;
use super::period::resolve_period;
use super::recency::filter_recent;
use super::sampler::{select_metrics, SelectionLimits};
use crate::backend::Backend;
use crate::error::{BoardError, ErrorKind};
use crate::types::{Board, Config, Period};

/// Soft latency budget for one board load.
const BOARD_LATENCY_BUDGET_MS: u128 = 2_000;

/// Result type for board loading
#[derive(Debug, serde::Serialize)]
#[allow(clippy::large_enum_variant)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BoardResult {
    Success {
        data: Board,
    },
    NoData {
        message: String,
        period: Period,
    },
    NotFound {
        message: String,
    },
    Error {
        message: String,
        kind: ErrorKind,
        #[serde(rename = "canRetry")]
        can_retry: bool,
    },
}

impl BoardResult {
    pub fn is_success(&self) -> bool {
        matches!(self, BoardResult::Success { .. })
    }
}

impl From<BoardError> for BoardResult {
    fn from(err: BoardError) -> Self {
        let message = err.user_message();
        match err {
            BoardError::NoData(period) => BoardResult::NoData { message, period },
            BoardError::NotFound(_) => BoardResult::NotFound { message },
            other => BoardResult::Error {
                message,
                kind: other.kind(),
                can_retry: other.is_retryable(),
            },
        }
    }
}

/// Load one board.
///
/// Period resolution and the metric fetch are required; their failures
/// abort the load. The recency filter, team sampling and employee
/// resolution degrade instead of failing.
pub async fn load_board<R: Rng + ?Sized>(
    backend: &dyn Backend,
    config: &Config,
    today: NaiveDate,
    rng: &mut R,
) -> Result<Board, BoardError> {
    let started = std::time::Instant::now();

    let period = resolve_period(backend, config.target_year, today).await?;
    let fetched = fetch_observations(backend, &period, config.fetch_limit).await?;
    let recency = filter_recent(backend, &period, &fetched).await;

    let limits = SelectionLimits {
        per_team_cap: config.per_team_cap,
        display_cap: config.display_cap,
    };
    let metrics = select_metrics(backend, &recency, &fetched, limits, rng).await;
    let employees_by_metric = resolve_employees(backend, &metrics).await;

    let elapsed_ms = started.elapsed().as_millis();
    log::info!(
        "Board loaded for {}: {} fetched, {} after recency{}, {} shown ({}ms)",
        period.period,
        fetched.len(),
        recency.kept.len(),
        if recency.bypassed { " (bypassed)" } else { "" },
        metrics.len(),
        elapsed_ms
    );
    if elapsed_ms > BOARD_LATENCY_BUDGET_MS {
        log::warn!(
            "load_board exceeded latency budget: {}ms > {}ms",
            elapsed_ms,
            BOARD_LATENCY_BUDGET_MS
        );
    }

    Ok(Board {
        period,
        metrics,
        employees_by_metric,
    })
}

/// Load one board and fold any failure into the single error state the
/// presentation layer renders.
pub async fn load_board_result<R: Rng + ?Sized>(
    backend: &dyn Backend,
    config: &Config,
    today: NaiveDate,
    rng: &mut R,
) -> BoardResult {
    match load_board(backend, config, today, rng).await {
        Ok(data) => BoardResult::Success { data },
        Err(e) => {
            log::warn!("Board load failed: {}", e);
            e.into()
        }
    }
}
