//! Statistical analytics port trait.
//!
//! The renderer consumes these results and never computes regressions,
//! cones or density estimates itself.

use chrono::NaiveDate;

use crate::domain::aggregation::{Period, PeriodReturn};
use crate::domain::drawdown::DrawdownEpisode;
use crate::domain::error::TearsheetError;
use crate::domain::factors::{FactorBetaTable, FactorSet};
use crate::domain::perf::PerfStats;
use crate::domain::positions::{ExposureDecomposition, PositionTable, TopPositionRanking};
use crate::domain::regime::ConeBand;
use crate::domain::series::{CumulativeReturnSeries, ReturnSeries, TimeSeries};

pub trait AnalyticsPort {
    /// Trailing-window beta of `returns` to `factor` on their shared dates.
    fn rolling_beta(
        &self,
        returns: &ReturnSeries,
        factor: &TimeSeries,
        window: usize,
    ) -> Result<TimeSeries, TearsheetError>;

    /// Trailing-window regression on every factor at once, intercept first.
    fn rolling_multifactor_beta(
        &self,
        returns: &ReturnSeries,
        factors: &FactorSet,
        window: usize,
    ) -> Result<FactorBetaTable, TearsheetError>;

    fn cum_returns(&self, returns: &ReturnSeries, starting_value: f64) -> CumulativeReturnSeries {
        returns.cum_returns(starting_value)
    }

    fn aggregate_returns(&self, returns: &ReturnSeries, period: Period) -> Vec<PeriodReturn> {
        crate::domain::aggregation::aggregate_returns(returns, period)
    }

    /// Worst `top` drawdown episodes, most severe first.
    fn gen_drawdown_table(
        &self,
        returns: &ReturnSeries,
        top: usize,
    ) -> Result<Vec<DrawdownEpisode>, TearsheetError>;

    /// Cone fitted on returns before `fit_end`, covering the series' dates
    /// plus `horizon` projected trading days.
    fn cone_rolling(
        &self,
        returns: &ReturnSeries,
        num_std: f64,
        fit_end: NaiveDate,
        horizon: usize,
    ) -> Result<ConeBand, TearsheetError>;

    fn rolling_sharpe(&self, returns: &ReturnSeries, window: usize)
    -> Result<TimeSeries, TearsheetError>;

    fn perf_stats(
        &self,
        returns: &ReturnSeries,
        benchmark: Option<&ReturnSeries>,
    ) -> Result<PerfStats, TearsheetError>;

    /// Annualised alpha and beta against `benchmark`.
    fn calc_alpha_beta(
        &self,
        returns: &ReturnSeries,
        benchmark: &ReturnSeries,
    ) -> Result<(f64, f64), TearsheetError>;

    /// Parametric value at risk of a `portfolio_value` position.
    fn var_cov_var_normal(
        &self,
        portfolio_value: f64,
        confidence: f64,
        mean: f64,
        std_dev: f64,
    ) -> Result<f64, TearsheetError>;

    /// Distribution divergence in `[0, 1]` between the daily returns
    /// recovered from two cumulative series.
    fn out_of_sample_vs_in_sample_returns_kde(
        &self,
        backtest_cum: &CumulativeReturnSeries,
        live_cum: &CumulativeReturnSeries,
    ) -> Result<f64, TearsheetError>;

    /// Density estimate of `samples` evaluated at every point of `grid`.
    fn kde_density(&self, samples: &[f64], grid: &[f64]) -> Result<Vec<f64>, TearsheetError>;

    /// Long/short/cash decomposition of dollar `positions`.
    fn get_long_short_pos(
        &self,
        positions: &PositionTable,
    ) -> Result<ExposureDecomposition, TearsheetError>;

    /// Top-N rankings over the allocation weights of dollar `positions`.
    fn get_top_long_short_abs(
        &self,
        positions: &PositionTable,
        top: usize,
    ) -> Result<TopPositionRanking, TearsheetError>;
}
