//! Backtest / out-of-sample / all-history performance table.

/// Trading days per month used for the month counts in the table header.
pub const TRADING_DAYS_PER_MONTH: usize = 21;

/// Summary statistics for one return series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfStats {
    pub annual_return: f64,
    pub cumulative_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    /// Fractional, reported as a negative number.
    pub max_drawdown: f64,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
}

impl PerfStats {
    pub const LABELS: [&'static str; 9] = [
        "annual_return",
        "cumulative_returns",
        "annual_volatility",
        "sharpe_ratio",
        "sortino_ratio",
        "calmar_ratio",
        "max_drawdown",
        "alpha",
        "beta",
    ];

    /// Values in the order of [`PerfStats::LABELS`].
    pub fn values(&self) -> [Option<f64>; 9] {
        [
            Some(self.annual_return),
            Some(self.cumulative_return),
            Some(self.annual_volatility),
            Some(self.sharpe_ratio),
            Some(self.sortino_ratio),
            Some(self.calmar_ratio),
            Some(self.max_drawdown),
            self.alpha,
            self.beta,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerfTableRow {
    pub label: &'static str,
    pub backtest: Option<f64>,
    pub out_of_sample: Option<f64>,
    pub all_history: Option<f64>,
}

/// Statistics for the backtest period (absent when live trading starts on
/// the first return date), the live period (absent for a pure backtest) and
/// the whole history.
#[derive(Debug, Clone, PartialEq)]
pub struct PerfTable {
    pub backtest: Option<PerfStats>,
    pub out_of_sample: Option<PerfStats>,
    pub all_history: PerfStats,
    pub backtest_days: usize,
    pub out_of_sample_days: usize,
}

impl PerfTable {
    pub fn backtest_months(&self) -> usize {
        months(self.backtest_days)
    }

    pub fn out_of_sample_months(&self) -> usize {
        months(self.out_of_sample_days)
    }

    pub fn rows(&self) -> Vec<PerfTableRow> {
        let backtest = self.backtest.map(|s| s.values());
        let live = self.out_of_sample.map(|s| s.values());
        let all = self.all_history.values();
        PerfStats::LABELS
            .iter()
            .enumerate()
            .map(|(i, &label)| PerfTableRow {
                label,
                backtest: backtest.and_then(|v| v[i]),
                out_of_sample: live.and_then(|v| v[i]),
                all_history: all[i],
            })
            .collect()
    }
}

/// Whole months covered by `trading_days`, rounded down.
pub fn months(trading_days: usize) -> usize {
    trading_days / TRADING_DAYS_PER_MONTH
}
