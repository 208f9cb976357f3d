// Period resolution: which (year, month) the board shows.
// The month comes from the caller's clock, the year from configuration.

use chrono::{Datelike, NaiveDate};

use crate::backend::{Backend, Lookup};
use crate::error::{BoardError, MissingEntity};
use crate::types::{previous_month, Period, ResolvedPeriod};

/// Resolve the reporting period for `today` within `target_year`.
///
/// Tries the current month, then once the month before it (January falls
/// back to December of the same target year). The fallback is taken when the
/// month row is missing or the period has no observations recorded.
///
/// Errors:
/// - `NotFound(Year)` when the target year is missing
/// - `NotFound(Period)` when neither month row exists
/// - `NoData(period)` when a month exists but has no (year, month) row, or
///   when no candidate month has observations
pub async fn resolve_period(
    backend: &dyn Backend,
    target_year: i32,
    today: NaiveDate,
) -> Result<ResolvedPeriod, BoardError> {
    let year = match backend.find_year(target_year).await {
        Lookup::Found(row) => row,
        Lookup::NotFound => return Err(BoardError::NotFound(MissingEntity::Year(target_year))),
        Lookup::QueryError(e) => return Err(e.into()),
    };

    let current = today.month();
    let mut first_without_data: Option<Period> = None;

    for month in [current, previous_month(current)] {
        let period = Period::new(target_year, month);

        let month_row = match backend.find_month(month).await {
            Lookup::Found(row) => row,
            Lookup::NotFound => {
                log::debug!("Period resolver: month {} not configured", month);
                continue;
            }
            Lookup::QueryError(e) => return Err(e.into()),
        };

        let composite = match backend.find_period(year.year_id, month_row.month_id).await {
            Lookup::Found(row) => row,
            Lookup::NotFound => {
                log::debug!("Period resolver: {} has no period row", period);
                return Err(BoardError::NoData(*first_without_data.get_or_insert(period)));
            }
            Lookup::QueryError(e) => return Err(e.into()),
        };

        let probe = backend.observations(composite.monthyear_id, 1).await?;
        if probe.is_empty() {
            log::debug!("Period resolver: {} has no observations", period);
            first_without_data.get_or_insert(period);
            continue;
        }

        if month != current {
            log::info!(
                "Period resolver: no data for {}, falling back to {}",
                Period::new(target_year, current),
                period
            );
        }

        return Ok(ResolvedPeriod {
            period,
            year_id: year.year_id,
            month_id: month_row.month_id,
            period_id: composite.monthyear_id,
        });
    }

    match first_without_data {
        Some(period) => Err(BoardError::NoData(period)),
        None => Err(BoardError::NotFound(MissingEntity::Period(Period::new(
            target_year,
            current,
        )))),
    }
}
