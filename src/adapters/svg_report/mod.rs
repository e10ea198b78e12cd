//! Tear sheet renderer.
//!
//! Composes segmentation, drawdown shading, the underwater curve, the
//! consistency score and the position/transaction ratios into a
//! [`TearsheetDocument`]. Every section is built independently: a failing
//! section is recorded as skipped and the rest of the report continues.

pub mod canvas;
pub mod charts;
pub mod tables;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::aggregation::{aggregate_returns, monthly_mean, monthly_return_table, Period};
use crate::domain::config_validation::ReportSettings;
use crate::domain::consistency::{consistency_score, split_returns};
use crate::domain::drawdown::shade_episodes;
use crate::domain::error::TearsheetError;
use crate::domain::perf::PerfTable;
use crate::domain::positions::{
    holdings_count, top_long_short_abs, PositionTable, TopPositionRanking,
};
use crate::domain::regime::{segment_cone, ConeSlices};
use crate::domain::report::{
    Block, Section, SkippedSection, TearsheetDocument, TearsheetInputs,
};
use crate::domain::series::{mean, sample_std, ReturnSeries, TimeSeries};
use crate::domain::turnover::{gross_leverage, turnover, TransactionDay};
use crate::domain::underwater::underwater;
use crate::ports::analytics_port::AnalyticsPort;
use canvas::{FillStyle, Figure};
use charts::{
    ActivityOptions, BarChartOptions, DrawdownPeriodsOptions, ExposureMode, ExposureOptions,
    RollingLineOptions, RollingReturnsOptions, UnderwaterOptions,
};

pub const PERFORMANCE: &str = "Performance statistics";
pub const CONSISTENCY: &str = "Consistency";
pub const CUMULATIVE_RETURNS: &str = "Cumulative returns";
pub const ROLLING_BETA: &str = "Rolling beta";
pub const ROLLING_SHARPE: &str = "Rolling Sharpe ratio";
pub const FACTOR_EXPOSURE: &str = "Rolling factor exposures";
pub const DRAWDOWN_PERIODS: &str = "Top drawdown periods";
pub const UNDERWATER: &str = "Underwater plot";
pub const MONTHLY_HEATMAP: &str = "Monthly returns";
pub const ANNUAL_RETURNS: &str = "Annual returns";
pub const MONTHLY_DISTRIBUTION: &str = "Distribution of monthly returns";
pub const RETURN_QUANTILES: &str = "Return quantiles";
pub const RETURN_RANGE: &str = "Return range";
pub const RETURNS_SIMILARITY: &str = "Daily returns similarity";
pub const POSITIONS: &str = "Positions";
pub const TRANSACTIONS: &str = "Transactions";

/// Portfolio value and confidence of the value-at-risk lines.
const VAR_PORTFOLIO_VALUE: f64 = 1e7;
const VAR_CONFIDENCE: f64 = 0.05;
const SIMILARITY_GRID_POINTS: usize = 200;

pub struct TearsheetRenderer<'a> {
    analytics: &'a dyn AnalyticsPort,
    settings: &'a ReportSettings,
}

impl<'a> TearsheetRenderer<'a> {
    pub fn new(analytics: &'a dyn AnalyticsPort, settings: &'a ReportSettings) -> Self {
        Self {
            analytics,
            settings,
        }
    }

    fn live_start(&self) -> NaiveDate {
        self.settings.live_start_date
    }

    fn document(&self, inputs: &TearsheetInputs) -> TearsheetDocument {
        let subtitle = match (inputs.returns.first_date(), inputs.returns.last_date()) {
            (Some(first), Some(last)) => format!(
                "{first} to {last}, live from {}, benchmark {}",
                self.live_start(),
                self.settings.benchmark_name
            ),
            _ => String::new(),
        };
        TearsheetDocument {
            title: self.settings.title.clone(),
            subtitle,
            ..TearsheetDocument::default()
        }
    }

    /// Full report with every chart and table.
    pub fn render(&self, inputs: &TearsheetInputs) -> TearsheetDocument {
        let mut doc = self.document(inputs);
        info!(title = %doc.title, points = inputs.returns.len(), "rendering tear sheet");

        self.add(&mut doc, PERFORMANCE, |s| self.performance(s, inputs));
        self.add(&mut doc, CONSISTENCY, |s| self.consistency(s, inputs));
        self.add(&mut doc, CUMULATIVE_RETURNS, |s| self.cumulative_returns(s, inputs));
        self.add(&mut doc, ROLLING_BETA, |s| self.rolling_beta(s, inputs));
        self.add(&mut doc, ROLLING_SHARPE, |s| self.rolling_sharpe(s, inputs));
        if let Some(factors) = &inputs.factors {
            self.add(&mut doc, FACTOR_EXPOSURE, |s| {
                self.factor_exposure(s, &inputs.returns, factors)
            });
        }
        self.add(&mut doc, DRAWDOWN_PERIODS, |s| self.drawdown_periods(s, inputs));
        self.add(&mut doc, UNDERWATER, |s| self.underwater(s, inputs));
        self.add(&mut doc, MONTHLY_HEATMAP, |s| self.monthly_heatmap(s, inputs));
        self.add(&mut doc, ANNUAL_RETURNS, |s| self.annual_returns(s, inputs));
        self.add(&mut doc, MONTHLY_DISTRIBUTION, |s| {
            self.monthly_distribution(s, inputs)
        });
        self.add(&mut doc, RETURN_QUANTILES, |s| self.return_quantiles(s, inputs));
        self.add(&mut doc, RETURN_RANGE, |s| self.return_range(s, inputs));
        self.add(&mut doc, RETURNS_SIMILARITY, |s| {
            self.returns_similarity(s, inputs)
        });
        if let Some(positions) = &inputs.positions {
            self.add(&mut doc, POSITIONS, |s| self.positions(s, positions));
            if let Some(transactions) = &inputs.transactions {
                self.add(&mut doc, TRANSACTIONS, |s| {
                    self.transactions(s, transactions, positions)
                });
            }
        } else if inputs.transactions.is_some() {
            doc.skipped.push(SkippedSection {
                title: TRANSACTIONS.to_string(),
                reason: "transactions need a positions file".to_string(),
            });
        }

        info!(
            sections = doc.sections.len(),
            skipped = doc.skipped.len(),
            "tear sheet rendered"
        );
        doc
    }

    /// Text-only summaries: performance table, consistency, return range
    /// and top positions.
    pub fn render_stats(&self, inputs: &TearsheetInputs) -> TearsheetDocument {
        let mut doc = self.document(inputs);
        self.add(&mut doc, PERFORMANCE, |s| self.performance(s, inputs));
        self.add(&mut doc, CONSISTENCY, |s| self.consistency(s, inputs));
        self.add(&mut doc, RETURN_RANGE, |s| self.return_range(s, inputs));
        if let Some(positions) = &inputs.positions {
            self.add(&mut doc, POSITIONS, |s| {
                self.position_tables(s, positions).map(|_| ())
            });
        }
        doc
    }

    fn add(
        &self,
        doc: &mut TearsheetDocument,
        title: &str,
        build: impl FnOnce(&mut Section) -> Result<(), TearsheetError>,
    ) {
        let mut section = Section::new(title);
        match build(&mut section) {
            Ok(()) => {
                debug!(section = title, blocks = section.blocks.len(), "section built");
                doc.sections.push(section);
            }
            Err(e) => {
                warn!(section = title, error = %e, "skipping section");
                doc.skipped.push(SkippedSection {
                    title: title.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    fn figure(
        section: &mut Section,
        title: &str,
        draw: impl FnOnce(&mut canvas::Axes) -> Result<(), TearsheetError>,
    ) -> Result<(), TearsheetError> {
        let mut fig = Figure::new();
        draw(fig.add_axes(title))?;
        section.push(Block::Figure(fig.to_svg()));
        Ok(())
    }

    fn performance(
        &self,
        section: &mut Section,
        inputs: &TearsheetInputs,
    ) -> Result<(), TearsheetError> {
        let backtest = inputs.returns.before(self.live_start());
        let live = inputs.returns.from_date(self.live_start());
        let benchmark = Some(&inputs.benchmark);

        let table = PerfTable {
            backtest: if backtest.is_empty() {
                None
            } else {
                Some(self.analytics.perf_stats(&backtest, benchmark)?)
            },
            out_of_sample: if live.is_empty() {
                None
            } else {
                Some(self.analytics.perf_stats(&live, benchmark)?)
            },
            all_history: self.analytics.perf_stats(&inputs.returns, benchmark)?,
            backtest_days: backtest.len(),
            out_of_sample_days: live.len(),
        };
        section.push(Block::Table(tables::perf_table(&table)));
        Ok(())
    }

    fn consistency(
        &self,
        section: &mut Section,
        inputs: &TearsheetInputs,
    ) -> Result<(), TearsheetError> {
        let split = split_returns(&inputs.returns, self.live_start())?;
        let divergence = self.analytics.out_of_sample_vs_in_sample_returns_kde(
            &self.analytics.cum_returns(&split.backtest, 1.0),
            &self.analytics.cum_returns(&split.live, 1.0),
        )?;
        let score = consistency_score(divergence)?;
        section.push(Block::Text(format!(
            "{}% :Similarity between Backtest vs. Out-of-Sample (daily returns distribution)",
            score.floor()
        )));
        Ok(())
    }

    fn cumulative_returns(
        &self,
        section: &mut Section,
        inputs: &TearsheetInputs,
    ) -> Result<(), TearsheetError> {
        let returns = &inputs.returns;
        let cum = self.analytics.cum_returns(returns, 1.0);

        let mut benchmarks = Vec::new();
        for (name, bench) in std::iter::once((&self.settings.benchmark_name, &inputs.benchmark))
            .chain(inputs.benchmark2.as_ref().map(|b| (&self.settings.benchmark2_name, b)))
        {
            let (aligned, _) = bench.inner_join(returns)?;
            benchmarks.push((name.as_str(), self.analytics.cum_returns(&aligned, 1.0)));
        }

        let mut cone_error = None;
        let cone = match self.settings.cone_std {
            Some(num_std) => match self.cone(returns, num_std) {
                Ok(slices) => Some(slices),
                Err(e) => {
                    warn!(error = %e, "drawing cumulative returns without the cone");
                    cone_error = Some(e);
                    None
                }
            },
            None => None,
        };

        let bench_refs: Vec<(&str, &TimeSeries)> =
            benchmarks.iter().map(|(n, s)| (*n, s)).collect();
        Self::figure(section, CUMULATIVE_RETURNS, |ax| {
            charts::plot_rolling_returns(
                ax,
                &cum,
                &bench_refs,
                self.live_start(),
                cone.as_ref(),
                &RollingReturnsOptions::default(),
            )
        })?;
        if let Some(e) = cone_error {
            section.push(Block::Note(format!("Cone omitted: {e}")));
        }
        Ok(())
    }

    /// Cone fitted on the backtest and sliced around the live start.
    fn cone(&self, returns: &ReturnSeries, num_std: f64) -> Result<ConeSlices, TearsheetError> {
        let band = self.analytics.cone_rolling(
            returns,
            num_std,
            self.live_start(),
            self.settings.cone_horizon,
        )?;
        let (first, last) = match (returns.first_date(), returns.last_date()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(TearsheetError::missing_data("returns are empty")),
        };
        segment_cone(&band, self.live_start(), first, last)
    }

    fn rolling_beta(
        &self,
        section: &mut Section,
        inputs: &TearsheetInputs,
    ) -> Result<(), TearsheetError> {
        let window = self.settings.rolling_beta_window;
        let series = [2 * window, 3 * window]
            .into_iter()
            .map(|w| -> Result<_, TearsheetError> {
                let beta = self.analytics.rolling_beta(&inputs.returns, &inputs.benchmark, w)?;
                Ok((format!("{w}-day"), beta))
            })
            .collect::<Result<Vec<_>, TearsheetError>>()?;
        let title = format!("Rolling beta to {}", self.settings.benchmark_name);
        Self::figure(section, &title, |ax| {
            charts::plot_rolling_lines(ax, &series, &RollingLineOptions::beta())
        })
    }

    fn rolling_sharpe(
        &self,
        section: &mut Section,
        inputs: &TearsheetInputs,
    ) -> Result<(), TearsheetError> {
        let window = self.settings.rolling_sharpe_window;
        let sharpe = self.analytics.rolling_sharpe(&inputs.returns, window)?;
        let title = format!("Rolling Sharpe ratio ({window}-day)");
        Self::figure(section, &title, |ax| {
            charts::plot_rolling_lines(
                ax,
                &[(format!("{window}-day"), sharpe)],
                &RollingLineOptions::sharpe(),
            )
        })
    }

    fn factor_exposure(
        &self,
        section: &mut Section,
        returns: &ReturnSeries,
        factors: &crate::domain::factors::FactorSet,
    ) -> Result<(), TearsheetError> {
        let window = self.settings.rolling_factor_window;
        let betas = factors
            .factors()
            .iter()
            .map(|f| -> Result<_, TearsheetError> {
                let beta = self.analytics.rolling_beta(returns, f, window)?;
                Ok((f.name().unwrap_or("factor").to_string(), beta))
            })
            .collect::<Result<Vec<_>, TearsheetError>>()?;

        let table = self.analytics.rolling_multifactor_beta(returns, factors, window)?;
        let alpha = table
            .intercept()
            .ok_or_else(|| TearsheetError::missing_data("regression has no intercept column"))?
            .map_values(|v| v * 252.0);

        let mut fig = Figure::new();
        charts::plot_rolling_lines(
            fig.add_axes(format!("Rolling factor betas ({window}-day)")),
            &betas,
            &RollingLineOptions::factor_betas(),
        )?;
        charts::plot_rolling_lines(
            fig.add_axes("Multi-factor alpha"),
            &[("Annualised alpha".to_string(), alpha)],
            &RollingLineOptions::multifactor_alpha(),
        )?;
        section.push(Block::Figure(fig.to_svg()));
        Ok(())
    }

    fn drawdown_periods(
        &self,
        section: &mut Section,
        inputs: &TearsheetInputs,
    ) -> Result<(), TearsheetError> {
        let top = self.settings.top_drawdowns;
        let cum = self.analytics.cum_returns(&inputs.returns, 1.0);
        let episodes = self.analytics.gen_drawdown_table(&inputs.returns, top)?;
        let intervals = shade_episodes(&episodes, &cum, top)?;
        let title = format!("Top {top} drawdown periods");
        Self::figure(section, &title, |ax| {
            charts::plot_drawdown_periods(ax, &cum, &intervals, &DrawdownPeriodsOptions::default())
        })?;
        section.push(Block::Table(tables::drawdown_table(&episodes)));
        Ok(())
    }

    fn underwater(
        &self,
        section: &mut Section,
        inputs: &TearsheetInputs,
    ) -> Result<(), TearsheetError> {
        let curve = underwater(&self.analytics.cum_returns(&inputs.returns, 1.0))?;
        Self::figure(section, UNDERWATER, |ax| {
            charts::plot_underwater(ax, &curve, &UnderwaterOptions::default())
        })
    }

    fn monthly_heatmap(
        &self,
        section: &mut Section,
        inputs: &TearsheetInputs,
    ) -> Result<(), TearsheetError> {
        let rows = monthly_return_table(&inputs.returns);
        if rows.is_empty() {
            return Err(TearsheetError::missing_data("no monthly returns"));
        }
        section.push(Block::Table(tables::monthly_heatmap(&rows)));
        Ok(())
    }

    fn annual_returns(
        &self,
        section: &mut Section,
        inputs: &TearsheetInputs,
    ) -> Result<(), TearsheetError> {
        let yearly = self.analytics.aggregate_returns(&inputs.returns, Period::Yearly);
        Self::figure(section, ANNUAL_RETURNS, |ax| {
            charts::plot_annual_returns(ax, &yearly, &BarChartOptions::annual_returns())
        })
    }

    fn monthly_distribution(
        &self,
        section: &mut Section,
        inputs: &TearsheetInputs,
    ) -> Result<(), TearsheetError> {
        let monthly = self.analytics.aggregate_returns(&inputs.returns, Period::Monthly);
        let options = BarChartOptions::monthly_distribution();
        Self::figure(section, MONTHLY_DISTRIBUTION, |ax| {
            charts::plot_monthly_returns_dist(ax, &monthly, &options)
        })
    }

    fn return_quantiles(
        &self,
        section: &mut Section,
        inputs: &TearsheetInputs,
    ) -> Result<(), TearsheetError> {
        Self::figure(section, RETURN_QUANTILES, |ax| {
            charts::plot_return_quantiles(ax, &inputs.returns, &FillStyle::new("steelblue", 0.6))
        })
    }

    fn return_range(
        &self,
        section: &mut Section,
        inputs: &TearsheetInputs,
    ) -> Result<(), TearsheetError> {
        let daily = inputs.returns.values();
        let weekly: Vec<f64> = aggregate_returns(&inputs.returns, Period::Weekly)
            .iter()
            .map(|r| r.value)
            .collect();

        let (daily_mean, daily_std) = mean_and_std(&daily, "daily")?;
        let (weekly_mean, weekly_std) = mean_and_std(&weekly, "weekly")?;
        let var = |m: f64, s: f64| {
            self.analytics
                .var_cov_var_normal(VAR_PORTFOLIO_VALUE, VAR_CONFIDENCE, m, s)
        };
        let rows = [
            ("2-sigma returns daily", format!("{:.3}", daily_mean - 2.0 * daily_std)),
            ("2-sigma returns weekly", format!("{:.3}", weekly_mean - 2.0 * weekly_std)),
            ("95% VaR daily (1e7)", format!("{:.0}", var(daily_mean, daily_std)?)),
            ("95% VaR weekly (1e7)", format!("{:.0}", var(weekly_mean, weekly_std)?)),
        ];
        section.push(Block::Table(tables::key_value_table(RETURN_RANGE, &rows)));
        Ok(())
    }

    fn returns_similarity(
        &self,
        section: &mut Section,
        inputs: &TearsheetInputs,
    ) -> Result<(), TearsheetError> {
        let split = split_returns(&inputs.returns, self.live_start())?;
        let backtest = standardise(&split.backtest.values(), "backtest")?;
        let live = standardise(&split.live.values(), "live")?;
        let grid = evaluation_grid(&backtest, &live);
        let f = self.analytics.kde_density(&backtest, &grid)?;
        let g = self.analytics.kde_density(&live, &grid)?;
        Self::figure(section, RETURNS_SIMILARITY, |ax| {
            charts::plot_returns_similarity(ax, &grid, &f, &g)
        })
    }

    fn position_tables(
        &self,
        section: &mut Section,
        positions: &PositionTable,
    ) -> Result<TopPositionRanking, TearsheetError> {
        let top = self.settings.top_positions;
        let ranking = self.analytics.get_top_long_short_abs(positions, top)?;
        section.push(Block::Table(tables::ranking_table(
            &format!("Top {top} long positions of all time"),
            "max",
            &ranking.top_long,
        )));
        section.push(Block::Table(tables::ranking_table(
            &format!("Top {top} short positions of all time"),
            "min",
            &ranking.top_short,
        )));
        section.push(Block::Table(tables::ranking_table(
            &format!("Top {top} positions of all time"),
            "max",
            &ranking.top_abs,
        )));
        Ok(ranking)
    }

    fn positions(
        &self,
        section: &mut Section,
        positions: &PositionTable,
    ) -> Result<(), TearsheetError> {
        let ranking = self.position_tables(section, positions)?;

        let allocations = positions.to_allocations()?;
        let everything = top_long_short_abs(&allocations, usize::MAX);
        section.push(Block::Table(tables::ranking_table(
            "All positions ever held",
            "max",
            &everything.top_abs,
        )));

        let top_symbols: Vec<String> = ranking.top_abs.iter().map(|p| p.symbol.clone()).collect();
        let top_allocations = allocations.select_columns(&top_symbols)?;
        let exposure = self.analytics.get_long_short_pos(positions)?;
        let leverage = gross_leverage(positions)?;
        let holdings = holdings_count(positions);
        let holdings_points = charts::series_points(&holdings);

        let mut fig = Figure::new();
        charts::plot_activity(
            fig.add_axes("Gross leverage"),
            &charts::ratio_points(&leverage),
            &[],
            &ActivityOptions::gross_leverage(),
        )?;
        let mode = charts::plot_exposures(
            fig.add_axes("Long/short/cash exposure"),
            &exposure,
            &ExposureOptions::default(),
        )?;
        if !top_symbols.is_empty() {
            charts::plot_allocations(
                fig.add_axes("Portfolio allocation over time, top positions"),
                &top_allocations,
            )?;
        }
        charts::plot_activity(
            fig.add_axes("Holdings per day"),
            &holdings_points,
            &monthly_mean(&holdings_points),
            &ActivityOptions::holdings(),
        )?;
        section.push(Block::Figure(fig.to_svg()));

        if let (ExposureMode::Lines, Some(first)) = (mode, exposure.negative_cash_dates.first()) {
            warn!(
                dates = exposure.negative_cash_dates.len(),
                "negative cash weight, exposure drawn as lines"
            );
            section.push(Block::Note(format!(
                "Cash weight is negative on {} date(s), first on {}; exposure is drawn as unstacked lines.",
                exposure.negative_cash_dates.len(),
                first
            )));
        }
        let missing = leverage.missing_dates();
        if !missing.is_empty() {
            section.push(Block::Note(format!(
                "Gross leverage is undefined on {} date(s) with zero net liquidation value.",
                missing.len()
            )));
        }
        Ok(())
    }

    fn transactions(
        &self,
        section: &mut Section,
        transactions: &[TransactionDay],
        positions: &PositionTable,
    ) -> Result<(), TearsheetError> {
        let daily = turnover(transactions, positions)?;
        let monthly = daily.monthly_mean();

        let mut fig = Figure::new();
        charts::plot_activity(
            fig.add_axes("Daily turnover"),
            &charts::ratio_points(&daily),
            &charts::ratio_points(&monthly),
            &ActivityOptions::turnover(),
        )?;
        charts::plot_daily_volume(
            fig.add_axes("Daily volume traded"),
            transactions,
            &ActivityOptions::shares_traded(),
        )?;
        charts::plot_volume_histogram(
            fig.add_axes("Histogram of daily trading volume"),
            transactions,
            &BarChartOptions::volume_histogram(),
        )?;
        section.push(Block::Figure(fig.to_svg()));

        let missing = daily.missing_dates();
        if !missing.is_empty() {
            section.push(Block::Note(format!(
                "Turnover is undefined on {} date(s) where the portfolio holds nothing, cash included.",
                missing.len()
            )));
        }
        Ok(())
    }
}

fn mean_and_std(values: &[f64], label: &str) -> Result<(f64, f64), TearsheetError> {
    match (mean(values), sample_std(values)) {
        (Some(m), Some(s)) => Ok((m, s)),
        _ => Err(TearsheetError::missing_data(format!(
            "need at least 2 {label} returns, found {}",
            values.len()
        ))),
    }
}

/// Scale to zero mean and unit variance.
fn standardise(values: &[f64], label: &str) -> Result<Vec<f64>, TearsheetError> {
    let (m, s) = mean_and_std(values, label)?;
    if s == 0.0 {
        return Err(TearsheetError::division_by_zero(format!(
            "{label} returns have zero variance"
        )));
    }
    Ok(values.iter().map(|v| (v - m) / s).collect())
}

fn evaluation_grid(a: &[f64], b: &[f64]) -> Vec<f64> {
    let (lo, hi) = a
        .iter()
        .chain(b)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let (lo, hi) = (lo - 1.0, hi + 1.0);
    let step = (hi - lo) / (SIMILARITY_GRID_POINTS - 1) as f64;
    (0..SIMILARITY_GRID_POINTS).map(|i| lo + step * i as f64).collect()
}
