//! Built-in analytics engine implementing [`AnalyticsPort`].

pub mod cone;
pub mod drawdown_table;
pub mod kde;
pub mod rolling;
pub mod stats;

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::drawdown::DrawdownEpisode;
use crate::domain::error::TearsheetError;
use crate::domain::factors::{FactorBetaTable, FactorSet};
use crate::domain::perf::PerfStats;
use crate::domain::positions::{
    long_short_cash, top_long_short_abs, ExposureDecomposition, PositionTable, TopPositionRanking,
};
use crate::domain::regime::ConeBand;
use crate::domain::series::{CumulativeReturnSeries, ReturnSeries, TimeSeries};
use crate::ports::analytics_port::AnalyticsPort;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinAnalytics;

impl BuiltinAnalytics {
    pub fn new() -> Self {
        Self
    }
}

impl AnalyticsPort for BuiltinAnalytics {
    fn rolling_beta(
        &self,
        returns: &ReturnSeries,
        factor: &TimeSeries,
        window: usize,
    ) -> Result<TimeSeries, TearsheetError> {
        rolling::rolling_beta(returns, factor, window)
    }

    fn rolling_multifactor_beta(
        &self,
        returns: &ReturnSeries,
        factors: &FactorSet,
        window: usize,
    ) -> Result<FactorBetaTable, TearsheetError> {
        rolling::rolling_multifactor_beta(returns, factors, window)
    }

    fn gen_drawdown_table(
        &self,
        returns: &ReturnSeries,
        top: usize,
    ) -> Result<Vec<DrawdownEpisode>, TearsheetError> {
        let table = drawdown_table::gen_drawdown_table(returns, top)?;
        debug!(episodes = table.len(), top, "drawdown table");
        Ok(table)
    }

    fn cone_rolling(
        &self,
        returns: &ReturnSeries,
        num_std: f64,
        fit_end: NaiveDate,
        horizon: usize,
    ) -> Result<ConeBand, TearsheetError> {
        let cone = cone::cone_rolling(returns, num_std, fit_end, horizon)?;
        debug!(points = cone.len(), %fit_end, "cone fitted");
        Ok(cone)
    }

    fn rolling_sharpe(
        &self,
        returns: &ReturnSeries,
        window: usize,
    ) -> Result<TimeSeries, TearsheetError> {
        rolling::rolling_sharpe(returns, window)
    }

    fn perf_stats(
        &self,
        returns: &ReturnSeries,
        benchmark: Option<&ReturnSeries>,
    ) -> Result<PerfStats, TearsheetError> {
        stats::perf_stats(returns, benchmark)
    }

    fn calc_alpha_beta(
        &self,
        returns: &ReturnSeries,
        benchmark: &ReturnSeries,
    ) -> Result<(f64, f64), TearsheetError> {
        stats::calc_alpha_beta(returns, benchmark)
    }

    fn var_cov_var_normal(
        &self,
        portfolio_value: f64,
        confidence: f64,
        mean: f64,
        std_dev: f64,
    ) -> Result<f64, TearsheetError> {
        stats::var_cov_var_normal(portfolio_value, confidence, mean, std_dev)
    }

    fn out_of_sample_vs_in_sample_returns_kde(
        &self,
        backtest_cum: &CumulativeReturnSeries,
        live_cum: &CumulativeReturnSeries,
    ) -> Result<f64, TearsheetError> {
        kde::out_of_sample_vs_in_sample_returns_kde(backtest_cum, live_cum)
    }

    fn kde_density(&self, samples: &[f64], grid: &[f64]) -> Result<Vec<f64>, TearsheetError> {
        kde::kde_density(samples, grid)
    }

    fn get_long_short_pos(
        &self,
        positions: &PositionTable,
    ) -> Result<ExposureDecomposition, TearsheetError> {
        long_short_cash(&positions.to_allocations()?)
    }

    fn get_top_long_short_abs(
        &self,
        positions: &PositionTable,
        top: usize,
    ) -> Result<TopPositionRanking, TearsheetError> {
        Ok(top_long_short_abs(&positions.to_allocations()?, top))
    }
}
