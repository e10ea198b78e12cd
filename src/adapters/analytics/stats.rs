//! Summary performance statistics, alpha/beta and parametric VaR.

use crate::domain::error::TearsheetError;
use crate::domain::perf::PerfStats;
use crate::domain::series::{mean, sample_std, ReturnSeries};

use super::TRADING_DAYS_PER_YEAR;

pub fn perf_stats(
    returns: &ReturnSeries,
    benchmark: Option<&ReturnSeries>,
) -> Result<PerfStats, TearsheetError> {
    if returns.is_empty() {
        return Err(TearsheetError::missing_data(format!(
            "{} has no returns",
            returns.label()
        )));
    }
    let values = returns.values();

    let cumulative_return = values.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
    let years = values.len() as f64 / TRADING_DAYS_PER_YEAR;
    let annual_return = if cumulative_return > -1.0 {
        (1.0 + cumulative_return).powf(1.0 / years) - 1.0
    } else {
        -1.0
    };

    let annual_volatility = sample_std(&values)
        .map(|s| s * TRADING_DAYS_PER_YEAR.sqrt())
        .unwrap_or(0.0);
    let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&values);
    let max_drawdown = max_drawdown(&values);
    let calmar_ratio = if max_drawdown < 0.0 {
        annual_return / max_drawdown.abs()
    } else {
        0.0
    };

    let (alpha, beta) = match benchmark {
        Some(b) => {
            let (alpha, beta) = calc_alpha_beta(returns, b)?;
            (Some(alpha), Some(beta))
        }
        None => (None, None),
    };

    Ok(PerfStats {
        annual_return,
        cumulative_return,
        annual_volatility,
        sharpe_ratio,
        sortino_ratio,
        calmar_ratio,
        max_drawdown,
        alpha,
        beta,
    })
}

/// Largest peak-to-trough loss of the compounded curve, as a negative
/// fraction.
fn max_drawdown(returns: &[f64]) -> f64 {
    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut max_dd = 0.0_f64;
    for r in returns {
        equity *= 1.0 + r;
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            max_dd = max_dd.min(equity / peak - 1.0);
        }
    }
    max_dd
}

fn compute_risk_adjusted(returns: &[f64]) -> (f64, f64) {
    let (Some(mean), Some(stddev)) = (mean(returns), sample_std(returns)) else {
        return (0.0, 0.0);
    };

    let sharpe = if stddev > 0.0 {
        mean / stddev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside_sq: f64 = returns
        .iter()
        .filter(|&&r| r < 0.0)
        .map(|r| r.powi(2))
        .sum();
    let downside_stddev = (downside_sq / returns.len() as f64).sqrt();

    let sortino = if downside_stddev > 0.0 {
        mean / downside_stddev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}

/// Ordinary least squares of `returns` on `benchmark` over their shared
/// dates. Alpha is annualised.
pub fn calc_alpha_beta(
    returns: &ReturnSeries,
    benchmark: &ReturnSeries,
) -> Result<(f64, f64), TearsheetError> {
    let (r, b) = returns.inner_join(benchmark)?;
    if r.len() < 2 {
        return Err(TearsheetError::missing_data(format!(
            "alpha/beta needs at least 2 shared dates, found {}",
            r.len()
        )));
    }
    let (rv, bv) = (r.values(), b.values());
    let (beta, intercept) = simple_regression(&rv, &bv).ok_or_else(|| {
        TearsheetError::division_by_zero(format!("{} has zero variance", benchmark.label()))
    })?;
    Ok((intercept * TRADING_DAYS_PER_YEAR, beta))
}

/// Slope and intercept of `y` on `x`, `None` when `x` has no variance.
pub(super) fn simple_regression(y: &[f64], x: &[f64]) -> Option<(f64, f64)> {
    let (my, mx) = (mean(y)?, mean(x)?);
    let mut cov = 0.0;
    let mut var = 0.0;
    for (yi, xi) in y.iter().zip(x) {
        cov += (yi - my) * (xi - mx);
        var += (xi - mx).powi(2);
    }
    if var == 0.0 {
        return None;
    }
    let slope = cov / var;
    Some((slope, my - slope * mx))
}

/// `P - P * (1 + z(c) * sigma + mu)` where `z` is the standard normal
/// quantile.
pub fn var_cov_var_normal(
    portfolio_value: f64,
    confidence: f64,
    mean: f64,
    std_dev: f64,
) -> Result<f64, TearsheetError> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(TearsheetError::invalid_input(format!(
            "confidence {confidence} is outside (0, 1)"
        )));
    }
    if !(std_dev >= 0.0 && std_dev.is_finite()) {
        return Err(TearsheetError::invalid_input(format!(
            "standard deviation {std_dev} must be finite and non-negative"
        )));
    }
    let z = inverse_normal_cdf(confidence);
    Ok(portfolio_value - portfolio_value * (1.0 + z * std_dev + mean))
}

/// Acklam's rational approximation of the standard normal quantile,
/// relative error below 1.2e-9.
pub fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e1,
        2.209460984245205e2,
        -2.759285104469687e2,
        1.383577518672690e2,
        -3.066479806614716e1,
        2.506628277459239,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e1,
        1.615858368580409e2,
        -1.556989798598866e2,
        6.680131188771972e1,
        -1.328068155288572e1,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-3,
        -3.223964580411365e-1,
        -2.400758277161838,
        -2.549732539343734,
        4.374664141464968,
        2.938163982698783,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-3,
        3.224671290700398e-1,
        2.445134137142996,
        3.754408661907416,
    ];
    const P_LOW: f64 = 0.02425;

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}
