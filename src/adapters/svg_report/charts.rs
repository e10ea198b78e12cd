//! Chart routines. Each one draws into the `Axes` it is handed and nothing
//! else; styling comes from its options struct.

use chrono::NaiveDate;

use super::canvas::{Axes, FillStyle, LegendLoc, LineStyle, TickFormat};
use crate::domain::aggregation::{aggregate_returns, box_stats, histogram, Period, PeriodReturn};
use crate::domain::drawdown::ShadedInterval;
use crate::domain::error::TearsheetError;
use crate::domain::positions::{ExposureDecomposition, PositionTable};
use crate::domain::regime::{segment_series, ConeBand, ConeSlices};
use crate::domain::series::{mean, CumulativeReturnSeries, ReturnSeries, TimeSeries};
use crate::domain::turnover::{RatioSeries, TransactionDay};

/// Colour cycle for charts with one line per series.
pub const SERIES_COLORS: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

fn cycle_color(i: usize) -> &'static str {
    SERIES_COLORS[i % SERIES_COLORS.len()]
}

fn require_points(series: &TimeSeries, what: &str) -> Result<(), TearsheetError> {
    if series.is_empty() {
        return Err(TearsheetError::missing_data(format!("{what} has no points")));
    }
    Ok(())
}

fn plot_series(ax: &mut Axes, series: &TimeSeries, style: LineStyle, label: Option<&str>) {
    ax.plot_dates(&series.dates(), series.values(), style, label);
}

#[derive(Debug, Clone)]
pub struct RollingReturnsOptions {
    pub backtest: LineStyle,
    pub live: LineStyle,
    pub benchmark: LineStyle,
    pub cone_line: LineStyle,
    pub live_band: FillStyle,
    pub future_band: FillStyle,
    pub guide: LineStyle,
    pub legend: LegendLoc,
}

impl Default for RollingReturnsOptions {
    fn default() -> Self {
        Self {
            backtest: LineStyle::solid("forestgreen", 2.0).with_alpha(0.7),
            live: LineStyle::solid("red", 2.0).with_alpha(0.7),
            benchmark: LineStyle::solid("grey", 1.5).with_alpha(0.6),
            cone_line: LineStyle::dashed("steelblue", 1.0),
            live_band: FillStyle::new("red", 0.2),
            future_band: FillStyle::new("navy", 0.15),
            guide: LineStyle::dashed("black", 1.0),
            legend: LegendLoc::UpperLeft,
        }
    }
}

/// Cumulative returns split into backtest and live parts, with benchmarks
/// and an optional segmented cone.
pub fn plot_rolling_returns(
    ax: &mut Axes,
    cum_returns: &CumulativeReturnSeries,
    benchmarks: &[(&str, &CumulativeReturnSeries)],
    live_start: NaiveDate,
    cone: Option<&ConeSlices>,
    opts: &RollingReturnsOptions,
) -> Result<(), TearsheetError> {
    let (backtest, live) = segment_series(cum_returns, live_start)?;
    ax.set_ylabel("Cumulative returns");

    for (i, (label, bench)) in benchmarks.iter().enumerate() {
        let style = LineStyle {
            alpha: opts.benchmark.alpha * if i == 0 { 1.0 } else { 0.6 },
            ..opts.benchmark.clone()
        };
        plot_series(ax, bench, style, Some(*label));
    }
    if !backtest.is_empty() {
        plot_series(ax, &backtest, opts.backtest.clone(), Some("Backtest"));
    }
    if !live.is_empty() {
        plot_series(ax, &live, opts.live.clone(), Some("Live"));
    }

    if let Some(cone) = cone {
        let mut label = Some("Cone");
        for (band, fill) in [
            (&cone.fit, None),
            (&cone.live, Some(&opts.live_band)),
            (&cone.future, Some(&opts.future_band)),
        ] {
            if band.is_empty() {
                continue;
            }
            plot_cone_band(ax, band, &opts.cone_line, fill, label.take());
        }
    }

    ax.axhline(1.0, opts.guide.clone(), None);
    ax.set_legend(opts.legend);
    Ok(())
}

fn plot_cone_band(
    ax: &mut Axes,
    band: &ConeBand,
    line: &LineStyle,
    fill: Option<&FillStyle>,
    label: Option<&str>,
) {
    let center = band.line();
    let dates = center.dates();
    if let Some(fill) = fill {
        ax.fill_between_dates(
            &dates,
            band.lower().values(),
            band.upper().values(),
            fill.clone(),
            None,
        );
    }
    ax.plot_dates(
        &dates,
        center.values(),
        line.clone(),
        label,
    );
}

/// Style for the rolling beta, Sharpe and factor charts.
#[derive(Debug, Clone)]
pub struct RollingLineOptions {
    pub lines: Vec<LineStyle>,
    /// Guide at the mean of the first series.
    pub mean: Option<LineStyle>,
    pub zero: LineStyle,
    pub ylim: (f64, f64),
    pub ylabel: String,
    pub legend: LegendLoc,
}

impl RollingLineOptions {
    pub fn beta() -> Self {
        Self {
            lines: vec![
                LineStyle::solid("steelblue", 2.0).with_alpha(0.6),
                LineStyle::solid("grey", 2.0).with_alpha(0.4),
            ],
            mean: Some(LineStyle::dashed("steelblue", 2.0)),
            zero: LineStyle::solid("black", 1.0).with_alpha(0.5),
            ylim: (-2.5, 2.5),
            ylabel: "Beta".to_string(),
            legend: LegendLoc::UpperLeft,
        }
    }

    pub fn sharpe() -> Self {
        Self {
            lines: vec![LineStyle::solid("orangered", 2.0).with_alpha(0.7)],
            mean: Some(LineStyle::dashed("steelblue", 2.0)),
            ylim: (-3.0, 6.0),
            ylabel: "Sharpe ratio".to_string(),
            ..Self::beta()
        }
    }

    pub fn factor_betas() -> Self {
        Self {
            lines: (0..3)
                .map(|i| LineStyle::solid(cycle_color(i), 2.0).with_alpha(0.6))
                .collect(),
            mean: None,
            ylim: (-2.0, 2.0),
            ..Self::beta()
        }
    }

    pub fn multifactor_alpha() -> Self {
        Self {
            lines: vec![LineStyle::solid("forestgreen", 2.0).with_alpha(0.6)],
            mean: Some(LineStyle::dashed("forestgreen", 2.0)),
            ylim: (-0.4, 0.4),
            ylabel: "Alpha".to_string(),
            ..Self::beta()
        }
    }

    fn line(&self, i: usize) -> LineStyle {
        self.lines
            .get(i % self.lines.len().max(1))
            .cloned()
            .unwrap_or_else(|| LineStyle::solid(cycle_color(i), 2.0))
    }
}

/// One line per labelled rolling series, with mean and zero guides and
/// fixed y-limits.
pub fn plot_rolling_lines(
    ax: &mut Axes,
    series: &[(String, TimeSeries)],
    opts: &RollingLineOptions,
) -> Result<(), TearsheetError> {
    let (_, first) = series
        .first()
        .ok_or_else(|| TearsheetError::missing_data("no rolling series to plot"))?;
    require_points(first, "rolling series")?;

    for (i, (label, s)) in series.iter().enumerate() {
        plot_series(ax, s, opts.line(i), Some(label.as_str()));
    }
    if let (Some(style), Some(m)) = (&opts.mean, first.mean()) {
        ax.axhline(m, style.clone(), Some("Mean"));
    }
    ax.axhline(0.0, opts.zero.clone(), None);
    ax.set_ylim(opts.ylim.0, opts.ylim.1);
    ax.set_ylabel(opts.ylabel.clone());
    ax.set_legend(opts.legend);
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DrawdownPeriodsOptions {
    pub line: LineStyle,
    pub shade_alpha: f64,
    pub legend: LegendLoc,
}

impl Default for DrawdownPeriodsOptions {
    fn default() -> Self {
        Self {
            line: LineStyle::solid("#1f77b4", 1.5),
            shade_alpha: 0.4,
            legend: LegendLoc::UpperLeft,
        }
    }
}

/// Cumulative returns with every ranked drawdown interval shaded. The y
/// range is fixed from the line before any shading is added.
pub fn plot_drawdown_periods(
    ax: &mut Axes,
    cum_returns: &CumulativeReturnSeries,
    intervals: &[ShadedInterval],
    opts: &DrawdownPeriodsOptions,
) -> Result<(), TearsheetError> {
    require_points(cum_returns, "cumulative returns")?;
    plot_series(ax, cum_returns, opts.line.clone(), Some("Portfolio"));
    let (lo, hi) = ax.ylim();
    ax.set_ylim(lo, hi);
    for interval in intervals {
        ax.axvspan_dates(
            interval.start,
            interval.end,
            FillStyle::new(&interval.color, opts.shade_alpha),
        );
    }
    ax.set_ylabel("Cumulative returns");
    ax.set_legend(opts.legend);
    Ok(())
}

#[derive(Debug, Clone)]
pub struct UnderwaterOptions {
    pub fill: FillStyle,
}

impl Default for UnderwaterOptions {
    fn default() -> Self {
        Self {
            fill: FillStyle::new("coral", 0.7),
        }
    }
}

/// Area between zero and the underwater curve, in percent.
pub fn plot_underwater(
    ax: &mut Axes,
    underwater: &TimeSeries,
    opts: &UnderwaterOptions,
) -> Result<(), TearsheetError> {
    require_points(underwater, "underwater curve")?;
    let values = underwater.values();
    ax.fill_between_dates(
        &underwater.dates(),
        values.clone(),
        vec![0.0; values.len()],
        opts.fill.clone(),
        None,
    );
    ax.set_y_format(TickFormat::PercentValue);
    ax.set_ylabel("Drawdown");
    ax.set_legend(LegendLoc::Hidden);
    Ok(())
}

/// Bars plus a mean guide, shared by the annual-return and histogram charts.
#[derive(Debug, Clone)]
pub struct BarChartOptions {
    pub fill: FillStyle,
    pub mean: LineStyle,
    pub zero: LineStyle,
    pub bins: usize,
}

impl BarChartOptions {
    pub fn annual_returns() -> Self {
        Self {
            fill: FillStyle::new("steelblue", 0.7),
            mean: LineStyle::dashed("steelblue", 3.0).with_alpha(0.7),
            zero: LineStyle::solid("black", 1.0).with_alpha(0.6),
            bins: 0,
        }
    }

    pub fn monthly_distribution() -> Self {
        Self {
            fill: FillStyle::new("orangered", 0.8),
            mean: LineStyle::dashed("gold", 3.0),
            zero: LineStyle::solid("black", 1.0).with_alpha(0.6),
            bins: 20,
        }
    }

    pub fn volume_histogram() -> Self {
        Self {
            fill: FillStyle::new("steelblue", 0.8),
            mean: LineStyle::dashed("steelblue", 2.0),
            zero: LineStyle::solid("black", 1.0).with_alpha(0.0),
            bins: 50,
        }
    }
}

/// Horizontal bar per year, in percent, with a mean guide.
pub fn plot_annual_returns(
    ax: &mut Axes,
    yearly: &[PeriodReturn],
    opts: &BarChartOptions,
) -> Result<(), TearsheetError> {
    if yearly.is_empty() {
        return Err(TearsheetError::missing_data("no annual returns"));
    }
    let values: Vec<f64> = yearly.iter().map(|p| p.value * 100.0).collect();
    let positions: Vec<f64> = (0..yearly.len()).map(|i| i as f64).collect();
    let categories = yearly
        .iter()
        .zip(&positions)
        .map(|(p, &pos)| (pos, p.period.to_string()))
        .collect();

    ax.barh(positions, values.clone(), 0.8, opts.fill.clone());
    if let Some(m) = mean(&values) {
        ax.axvline(m, opts.mean.clone(), Some("Mean"));
    }
    ax.axvline(0.0, opts.zero.clone(), None);
    ax.set_y_categories(categories);
    ax.set_x_format(TickFormat::PercentValue);
    ax.set_xlabel("Returns");
    ax.set_ylabel("Year");
    Ok(())
}

/// Histogram of `values` with a mean guide.
pub fn plot_distribution(
    ax: &mut Axes,
    values: &[f64],
    opts: &BarChartOptions,
) -> Result<(), TearsheetError> {
    let hist = histogram(values, opts.bins)
        .ok_or_else(|| TearsheetError::missing_data("no finite values to bin"))?;
    let width = hist.edges[1] - hist.edges[0];
    let centres = hist.edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    let counts = hist.counts.iter().map(|&c| c as f64).collect();
    ax.bar(centres, counts, width, opts.fill.clone(), None);
    if let Some(m) = mean(values) {
        ax.axvline(m, opts.mean.clone(), Some("Mean"));
    }
    ax.axvline(0.0, opts.zero.clone(), None);
    Ok(())
}

/// Monthly returns histogram in percent.
pub fn plot_monthly_returns_dist(
    ax: &mut Axes,
    monthly: &[PeriodReturn],
    opts: &BarChartOptions,
) -> Result<(), TearsheetError> {
    let values: Vec<f64> = monthly.iter().map(|p| p.value * 100.0).collect();
    plot_distribution(ax, &values, opts)?;
    ax.set_x_format(TickFormat::PercentValue);
    ax.set_xlabel("Returns");
    ax.set_ylabel("Number of months");
    Ok(())
}

/// Box statistics of daily, weekly and monthly returns, in percent.
pub fn plot_return_quantiles(
    ax: &mut Axes,
    returns: &ReturnSeries,
    fill: &FillStyle,
) -> Result<(), TearsheetError> {
    let daily: Vec<f64> = returns.values().iter().map(|v| v * 100.0).collect();
    let period = |p: Period| -> Vec<f64> {
        aggregate_returns(returns, p)
            .iter()
            .map(|r| r.value * 100.0)
            .collect()
    };
    let groups = [
        ("Daily", daily),
        ("Weekly", period(Period::Weekly)),
        ("Monthly", period(Period::Monthly)),
    ];

    let mut categories = Vec::new();
    for (i, (label, values)) in groups.iter().enumerate() {
        let stats = box_stats(values)
            .ok_or_else(|| TearsheetError::missing_data(format!("no {label} returns")))?;
        ax.boxplot(i as f64, stats, fill.clone());
        categories.push((i as f64, label.to_string()));
    }
    ax.set_x_categories(categories);
    ax.set_y_format(TickFormat::PercentValue);
    ax.set_ylabel("Returns");
    Ok(())
}

/// Density curves of the backtest and live return distributions.
pub fn plot_returns_similarity(
    ax: &mut Axes,
    grid: &[f64],
    backtest: &[f64],
    live: &[f64],
) -> Result<(), TearsheetError> {
    if grid.is_empty() || grid.len() != backtest.len() || grid.len() != live.len() {
        return Err(TearsheetError::invalid_input(
            "density curves must match the evaluation grid",
        ));
    }
    ax.plot(
        grid.to_vec(),
        backtest.to_vec(),
        LineStyle::solid("forestgreen", 2.0),
        Some("Backtest"),
    );
    ax.plot(
        grid.to_vec(),
        live.to_vec(),
        LineStyle::solid("red", 2.0),
        Some("Live"),
    );
    ax.set_xlabel("Standardised daily returns");
    ax.set_ylabel("Density");
    ax.set_legend(LegendLoc::UpperRight);
    Ok(())
}

/// A daily line with its monthly mean and overall mean, used by the
/// turnover, leverage, holdings and volume charts.
#[derive(Debug, Clone)]
pub struct ActivityOptions {
    pub daily: LineStyle,
    pub monthly: LineStyle,
    pub mean: LineStyle,
    pub ylim: Option<(f64, f64)>,
    pub ylabel: String,
    pub legend: LegendLoc,
}

impl ActivityOptions {
    pub fn turnover() -> Self {
        Self {
            daily: LineStyle::solid("steelblue", 1.0).with_alpha(0.7),
            monthly: LineStyle::solid("orangered", 2.0).with_alpha(0.7),
            mean: LineStyle::dashed("steelblue", 3.0).with_alpha(0.7),
            ylim: Some((0.0, 1.0)),
            ylabel: "Turnover".to_string(),
            legend: LegendLoc::UpperLeft,
        }
    }

    pub fn gross_leverage() -> Self {
        Self {
            daily: LineStyle::solid("limegreen", 1.0).with_alpha(0.8),
            ylim: None,
            ylabel: "Gross leverage".to_string(),
            ..Self::turnover()
        }
    }

    pub fn holdings() -> Self {
        Self {
            daily: LineStyle::solid("steelblue", 1.0).with_alpha(0.6),
            monthly: LineStyle::solid("orangered", 2.0).with_alpha(0.5),
            ylim: None,
            ylabel: "Holdings".to_string(),
            ..Self::turnover()
        }
    }

    pub fn shares_traded() -> Self {
        Self {
            ylim: None,
            ylabel: "Shares traded".to_string(),
            ..Self::turnover()
        }
    }
}

fn split_optional(points: &[(NaiveDate, Option<f64>)]) -> (Vec<NaiveDate>, Vec<f64>) {
    points
        .iter()
        .map(|(d, v)| (*d, v.unwrap_or(f64::NAN)))
        .unzip()
}

/// Daily values (missing dates leave gaps), optional monthly means and the
/// overall mean guide.
pub fn plot_activity(
    ax: &mut Axes,
    daily: &[(NaiveDate, Option<f64>)],
    monthly: &[(NaiveDate, Option<f64>)],
    opts: &ActivityOptions,
) -> Result<(), TearsheetError> {
    let present: Vec<f64> = daily.iter().filter_map(|(_, v)| *v).collect();
    let overall = mean(&present)
        .ok_or_else(|| TearsheetError::missing_data(format!("no {} values", opts.ylabel)))?;

    let (dates, values) = split_optional(daily);
    ax.plot_dates(&dates, values, opts.daily.clone(), Some("Daily"));
    if !monthly.is_empty() {
        let (dates, values) = split_optional(monthly);
        ax.plot_dates(&dates, values, opts.monthly.clone(), Some("Monthly mean"));
    }
    ax.axhline(overall, opts.mean.clone(), Some("Overall mean"));
    if let Some((lo, hi)) = opts.ylim {
        ax.set_ylim(lo, hi);
    }
    ax.set_ylabel(opts.ylabel.clone());
    ax.set_legend(opts.legend);
    Ok(())
}

pub fn ratio_points(series: &RatioSeries) -> Vec<(NaiveDate, Option<f64>)> {
    series.points.iter().map(|p| (p.date, p.ratio)).collect()
}

pub fn series_points(series: &TimeSeries) -> Vec<(NaiveDate, Option<f64>)> {
    series.points().iter().map(|p| (p.date, Some(p.value))).collect()
}

/// How the exposure chart was drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureMode {
    Stacked,
    /// Negative cash cannot be stacked; each component is drawn as a line.
    Lines,
}

#[derive(Debug, Clone)]
pub struct ExposureOptions {
    pub long: FillStyle,
    pub short: FillStyle,
    pub cash: FillStyle,
    pub legend: LegendLoc,
}

impl Default for ExposureOptions {
    fn default() -> Self {
        Self {
            long: FillStyle::new("green", 0.5),
            short: FillStyle::new("red", 0.5),
            cash: FillStyle::new("grey", 0.5),
            legend: LegendLoc::UpperLeft,
        }
    }
}

/// Long, short and cash weights over time. Stacked areas unless any cash
/// weight is negative.
pub fn plot_exposures(
    ax: &mut Axes,
    exposure: &ExposureDecomposition,
    opts: &ExposureOptions,
) -> Result<ExposureMode, TearsheetError> {
    if exposure.rows.is_empty() {
        return Err(TearsheetError::missing_data("no exposure rows"));
    }
    let dates: Vec<NaiveDate> = exposure.rows.iter().map(|r| r.date).collect();
    let long: Vec<f64> = exposure.rows.iter().map(|r| r.long).collect();
    let short: Vec<f64> = exposure.rows.iter().map(|r| r.short).collect();
    let cash: Vec<f64> = exposure.rows.iter().map(|r| r.cash).collect();
    let zeros = vec![0.0; dates.len()];

    let mode = if exposure.has_negative_cash() {
        for (values, fill, label) in [
            (long, &opts.long, "Long"),
            (short, &opts.short, "Short"),
            (cash, &opts.cash, "Cash"),
        ] {
            ax.plot_dates(&dates, values, LineStyle::solid(&fill.color, 1.5), Some(label));
        }
        ExposureMode::Lines
    } else {
        let long_plus_cash = long.iter().zip(&cash).map(|(l, c)| l + c).collect();
        ax.fill_between_dates(&dates, zeros.clone(), long.clone(), opts.long.clone(), Some("Long"));
        ax.fill_between_dates(&dates, short, zeros, opts.short.clone(), Some("Short"));
        ax.fill_between_dates(&dates, long, long_plus_cash, opts.cash.clone(), Some("Cash"));
        ExposureMode::Stacked
    };
    ax.set_y_format(TickFormat::Percent);
    ax.set_ylabel("Exposure");
    ax.set_legend(opts.legend);
    Ok(mode)
}

/// One allocation line per column of `allocations`.
pub fn plot_allocations(ax: &mut Axes, allocations: &PositionTable) -> Result<(), TearsheetError> {
    if allocations.is_empty() || allocations.columns().is_empty() {
        return Err(TearsheetError::missing_data("no allocations to plot"));
    }
    for (i, symbol) in allocations.columns().iter().enumerate() {
        let values = allocations.rows().iter().map(|row| row[i]).collect();
        ax.plot_dates(
            allocations.dates(),
            values,
            LineStyle::solid(cycle_color(i), 1.5),
            Some(symbol.as_str()),
        );
    }
    ax.set_y_format(TickFormat::Percent);
    ax.set_ylabel("Exposure by holding");
    ax.set_legend(LegendLoc::UpperLeft);
    Ok(())
}

/// Shares traded per day with the overall mean.
pub fn plot_daily_volume(
    ax: &mut Axes,
    transactions: &[TransactionDay],
    opts: &ActivityOptions,
) -> Result<(), TearsheetError> {
    let daily: Vec<_> = transactions
        .iter()
        .map(|t| (t.date, Some(t.txn_shares)))
        .collect();
    plot_activity(ax, &daily, &[], opts)
}

/// Histogram of daily dollar volume.
pub fn plot_volume_histogram(
    ax: &mut Axes,
    transactions: &[TransactionDay],
    opts: &BarChartOptions,
) -> Result<(), TearsheetError> {
    let volumes: Vec<f64> = transactions.iter().map(|t| t.txn_volume).collect();
    plot_distribution(ax, &volumes, opts)?;
    ax.set_xlabel("Daily volume");
    ax.set_ylabel("Number of days");
    Ok(())
}
