//! Trailing-window regressions and Sharpe ratio.

use crate::domain::error::TearsheetError;
use crate::domain::factors::{FactorBetaTable, FactorSet, INTERCEPT_COLUMN};
use crate::domain::series::{mean, sample_std, DatedValue, ReturnSeries, TimeSeries};

use super::stats::simple_regression;
use super::TRADING_DAYS_PER_YEAR;

fn check_window(len: usize, window: usize) -> Result<(), TearsheetError> {
    if window < 2 {
        return Err(TearsheetError::invalid_input(format!(
            "rolling window must be at least 2, got {window}"
        )));
    }
    if len < window {
        return Err(TearsheetError::missing_data(format!(
            "{len} observations are fewer than the {window}-day window"
        )));
    }
    Ok(())
}

/// Beta of `returns` to `factor` over each trailing window of their shared
/// dates. Windows where the factor has no variance are omitted.
pub fn rolling_beta(
    returns: &ReturnSeries,
    factor: &TimeSeries,
    window: usize,
) -> Result<TimeSeries, TearsheetError> {
    let (r, f) = returns.inner_join(factor)?;
    check_window(r.len(), window)?;
    let (rv, fv, dates) = (r.values(), f.values(), r.dates());

    let points = (window..=rv.len())
        .filter_map(|end| {
            let start = end - window;
            simple_regression(&rv[start..end], &fv[start..end]).map(|(beta, _)| DatedValue {
                date: dates[end - 1],
                value: beta,
            })
        })
        .collect();
    Ok(TimeSeries::new(points)?.with_name(factor.label()))
}

/// Mean over standard deviation, annualised, per trailing window. Windows
/// with zero dispersion are omitted.
pub fn rolling_sharpe(returns: &ReturnSeries, window: usize) -> Result<TimeSeries, TearsheetError> {
    check_window(returns.len(), window)?;
    let (values, dates) = (returns.values(), returns.dates());

    let points = (window..=values.len())
        .filter_map(|end| {
            let slice = &values[end - window..end];
            let (m, s) = (mean(slice)?, sample_std(slice)?);
            (s > 0.0).then(|| DatedValue {
                date: dates[end - 1],
                value: m / s * TRADING_DAYS_PER_YEAR.sqrt(),
            })
        })
        .collect();
    Ok(TimeSeries::new(points)?.with_name("rolling_sharpe"))
}

/// OLS with intercept of `returns` on every factor over each trailing
/// window of the dates all series share. Singular windows are omitted.
pub fn rolling_multifactor_beta(
    returns: &ReturnSeries,
    factors: &FactorSet,
    window: usize,
) -> Result<FactorBetaTable, TearsheetError> {
    if factors.is_empty() {
        return Err(TearsheetError::missing_data("no factors supplied"));
    }
    let mut aligned = returns.clone();
    for f in factors.factors() {
        aligned = aligned.inner_join(f)?.0;
    }
    let dates = aligned.dates();
    check_window(dates.len(), window)?;

    let y = aligned.values();
    let xs: Vec<Vec<f64>> = factors
        .factors()
        .iter()
        .map(|f| f.reindex(&dates).map(|s| s.values()))
        .collect::<Result<_, _>>()?;

    let mut out_dates = Vec::new();
    let mut rows = Vec::new();
    for end in window..=dates.len() {
        let start = end - window;
        let design: Vec<Vec<f64>> = (start..end)
            .map(|i| {
                std::iter::once(1.0)
                    .chain(xs.iter().map(|x| x[i]))
                    .collect()
            })
            .collect();
        if let Some(coef) = least_squares(&design, &y[start..end]) {
            out_dates.push(dates[end - 1]);
            rows.push(coef);
        }
    }

    let mut columns = vec![INTERCEPT_COLUMN.to_string()];
    columns.extend(factors.names().into_iter().map(String::from));
    FactorBetaTable::new(columns, out_dates, rows)
}

/// Solve the normal equations `X'X b = X'y`.
fn least_squares(design: &[Vec<f64>], y: &[f64]) -> Option<Vec<f64>> {
    let k = design.first()?.len();
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, yi) in design.iter().zip(y) {
        for i in 0..k {
            xty[i] += row[i] * yi;
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    solve(xtx, xty)
}

/// Gaussian elimination with partial pivoting. `None` for a singular system.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    const SINGULAR: f64 = 1e-12;
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < SINGULAR {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn series(name: &str, values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let pairs: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (start + chrono::Duration::days(i as i64), v))
            .collect();
        TimeSeries::from_pairs(&pairs).unwrap().with_name(name)
    }

    const BENCH: [f64; 8] = [0.01, -0.02, 0.015, 0.003, -0.007, 0.02, -0.01, 0.004];

    #[test]
    fn rolling_beta_recovers_slope() {
        let bench = series("SPY", &BENCH);
        let strat = bench.map_values(|r| 1.5 * r);
        let beta = rolling_beta(&strat, &bench, 4).unwrap();
        assert_eq!(beta.len(), 5);
        assert_eq!(beta.first_date(), bench.dates().get(3).copied());
        for v in beta.values() {
            assert_abs_diff_eq!(v, 1.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn rolling_beta_skips_flat_windows() {
        let flat = series("F", &[0.01, 0.01, 0.01, 0.02]);
        let strat = series("S", &[0.01, 0.02, 0.03, 0.04]);
        let beta = rolling_beta(&strat, &flat, 3).unwrap();
        assert_eq!(beta.len(), 1);
    }

    #[test]
    fn window_longer_than_series_is_missing_data() {
        let s = series("S", &BENCH);
        assert!(matches!(
            rolling_sharpe(&s, 20),
            Err(TearsheetError::MissingData { .. })
        ));
        assert!(matches!(
            rolling_sharpe(&s, 1),
            Err(TearsheetError::InvalidInput { .. })
        ));
    }

    #[test]
    fn rolling_sharpe_matches_direct_computation() {
        let s = series("S", &BENCH);
        let sharpe = rolling_sharpe(&s, 8).unwrap();
        let expected = mean(&BENCH).unwrap() / sample_std(&BENCH).unwrap() * 252f64.sqrt();
        assert_eq!(sharpe.len(), 1);
        assert_abs_diff_eq!(sharpe.values()[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn multifactor_recovers_coefficients() {
        let smb = series("SMB", &BENCH);
        let hml = series("HML", &[0.002, 0.01, -0.004, 0.007, 0.0, -0.012, 0.006, 0.001]);
        let strat_values: Vec<f64> = BENCH
            .iter()
            .zip(hml.values())
            .map(|(a, b)| 0.0005 + 0.8 * a - 0.3 * b)
            .collect();
        let strat = series("S", &strat_values);
        let factors = FactorSet::new(vec![smb, hml]).unwrap();
        let table = rolling_multifactor_beta(&strat, &factors, 6).unwrap();
        assert_eq!(table.columns(), ["const", "SMB", "HML"]);
        assert_eq!(table.dates().len(), 3);
        for v in table.intercept().unwrap().values() {
            assert_abs_diff_eq!(v, 0.0005, epsilon = 1e-9);
        }
        for v in table.column("HML").unwrap().values() {
            assert_abs_diff_eq!(v, -0.3, epsilon = 1e-9);
        }
    }

    #[test]
    fn singular_system_has_no_solution() {
        assert!(solve(vec![vec![1.0, 2.0], vec![2.0, 4.0]], vec![1.0, 2.0]).is_none());
        let x = solve(vec![vec![2.0, 1.0], vec![1.0, 3.0]], vec![3.0, 5.0]).unwrap();
        assert_abs_diff_eq!(x[0], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 1.4, epsilon = 1e-12);
    }
}
