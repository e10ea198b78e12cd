//! Parametric confidence cone.
//!
//! The cone is fitted on the daily returns before the fit-end date and laid
//! over the whole return history plus a forward projection of weekdays:
//! `line(k) = (1 + mu)^k`, band `line(k) * (1 +/- n * sigma * sqrt(k))`.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::domain::error::TearsheetError;
use crate::domain::regime::{ConeBand, ConePoint};
use crate::domain::series::ReturnSeries;

pub fn cone_rolling(
    returns: &ReturnSeries,
    num_std: f64,
    fit_end: NaiveDate,
    horizon: usize,
) -> Result<ConeBand, TearsheetError> {
    if !(num_std.is_finite() && num_std > 0.0) {
        return Err(TearsheetError::invalid_input(format!(
            "cone width {num_std} must be positive"
        )));
    }
    let fit = returns.before(fit_end);
    if fit.len() < 2 {
        return Err(TearsheetError::missing_data(format!(
            "cone needs at least 2 returns before {fit_end}, found {}",
            fit.len()
        )));
    }
    let (mu, sigma) = match (fit.mean(), fit.std_dev()) {
        (Some(m), Some(s)) => (m, s),
        _ => return Err(TearsheetError::missing_data("cone fit window is empty")),
    };
    if mu <= -1.0 {
        return Err(TearsheetError::invalid_input(format!(
            "mean daily return {mu} cannot be compounded"
        )));
    }

    let mut axis = returns.dates();
    if let Some(last) = returns.last_date() {
        axis.extend(next_weekdays(last, horizon));
    }

    let points = axis
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            let k = (i + 1) as f64;
            let line = (1.0 + mu).powf(k);
            let spread = num_std * sigma * k.sqrt();
            ConePoint {
                date,
                line,
                sd_up: line * (1.0 + spread),
                sd_down: line * (1.0 - spread),
            }
        })
        .collect();
    ConeBand::new(points)
}

/// The `count` weekdays following `after`.
pub fn next_weekdays(after: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut current = after;
    while dates.len() < count {
        let Some(next) = current.succ_opt() else {
            break;
        };
        current = next;
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(current);
        }
    }
    dates
}
