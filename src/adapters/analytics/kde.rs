//! Gaussian kernel density estimates and the backtest/live divergence.

use crate::domain::error::TearsheetError;
use crate::domain::series::{sample_std, CumulativeReturnSeries};

const GRID_POINTS: usize = 512;
const MIN_DISPERSION: f64 = 1e-12;

/// Scott's rule: `sigma * n^(-1/5)`.
fn scott_bandwidth(samples: &[f64]) -> Result<f64, TearsheetError> {
    let std = sample_std(samples).ok_or_else(|| {
        TearsheetError::missing_data(format!(
            "density estimate needs at least 2 samples, found {}",
            samples.len()
        ))
    })?;
    if std < MIN_DISPERSION {
        return Err(TearsheetError::invalid_input("samples have no dispersion"));
    }
    Ok(std * (samples.len() as f64).powf(-0.2))
}

pub fn kde_density(samples: &[f64], grid: &[f64]) -> Result<Vec<f64>, TearsheetError> {
    let h = scott_bandwidth(samples)?;
    Ok(density_with_bandwidth(samples, h, grid))
}

fn density_with_bandwidth(samples: &[f64], h: f64, grid: &[f64]) -> Vec<f64> {
    let norm = 1.0 / (samples.len() as f64 * h * (2.0 * std::f64::consts::PI).sqrt());
    grid.iter()
        .map(|&x| {
            samples
                .iter()
                .map(|&s| (-0.5 * ((x - s) / h).powi(2)).exp())
                .sum::<f64>()
                * norm
        })
        .collect()
}

/// Simple returns between consecutive points of a cumulative series.
fn daily_from_cum(cum: &CumulativeReturnSeries) -> Result<Vec<f64>, TearsheetError> {
    let first = cum
        .points()
        .first()
        .map(|p| p.value)
        .ok_or_else(|| TearsheetError::missing_data("empty cumulative series"))?;
    Ok(cum.pct_change(first)?.values().into_iter().skip(1).collect())
}

/// Evenly spaced grid spanning every sample plus `pad` on each side.
pub fn shared_grid(a: &[f64], b: &[f64], pad: f64) -> Vec<f64> {
    let (lo, hi) = a
        .iter()
        .chain(b)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let (lo, hi) = (lo - pad, hi + pad);
    let step = (hi - lo) / (GRID_POINTS - 1) as f64;
    (0..GRID_POINTS).map(|i| lo + step * i as f64).collect()
}

/// Total-variation distance `0.5 * integral |f - g|` between the daily
/// return densities of the two periods, clamped to `[0, 1]`.
pub fn out_of_sample_vs_in_sample_returns_kde(
    backtest_cum: &CumulativeReturnSeries,
    live_cum: &CumulativeReturnSeries,
) -> Result<f64, TearsheetError> {
    let backtest = daily_from_cum(backtest_cum)?;
    let live = daily_from_cum(live_cum)?;
    let (hb, hl) = (scott_bandwidth(&backtest)?, scott_bandwidth(&live)?);

    let grid = shared_grid(&backtest, &live, 3.0 * hb.max(hl));
    let step = grid[1] - grid[0];
    let f = density_with_bandwidth(&backtest, hb, &grid);
    let g = density_with_bandwidth(&live, hl, &grid);

    let distance = 0.5 * f.iter().zip(&g).map(|(a, b)| (a - b).abs()).sum::<f64>() * step;
    Ok(distance.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::TimeSeries;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn cum_from_returns(returns: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let pairs: Vec<_> = returns
            .iter()
            .enumerate()
            .map(|(i, &v)| (start + chrono::Duration::days(i as i64), v))
            .collect();
        TimeSeries::from_pairs(&pairs).unwrap().cum_returns(1.0)
    }

    fn wave(n: usize, scale: f64, shift: f64) -> Vec<f64> {
        (0..n)
            .map(|i| shift + scale * ((i as f64) * 0.7).sin())
            .collect()
    }

    #[test]
    fn density_integrates_to_one() {
        let samples = wave(200, 0.01, 0.0);
        let grid = shared_grid(&samples, &[], 0.1);
        let density = kde_density(&samples, &grid).unwrap();
        let step = grid[1] - grid[0];
        assert_abs_diff_eq!(density.iter().sum::<f64>() * step, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn identical_periods_have_no_divergence() {
        let cum = cum_from_returns(&wave(100, 0.01, 0.0));
        let d = out_of_sample_vs_in_sample_returns_kde(&cum, &cum).unwrap();
        assert_abs_diff_eq!(d, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn shifted_periods_diverge() {
        let backtest = cum_from_returns(&wave(100, 0.005, 0.0));
        let live = cum_from_returns(&wave(100, 0.005, 0.05));
        let d = out_of_sample_vs_in_sample_returns_kde(&backtest, &live).unwrap();
        assert!(d > 0.9 && d <= 1.0);
    }

    #[test]
    fn flat_returns_are_rejected() {
        let cum = cum_from_returns(&[0.01; 10]);
        assert!(out_of_sample_vs_in_sample_returns_kde(&cum, &cum).is_err());
    }
}
