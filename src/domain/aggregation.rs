//! Calendar aggregation: period compounding, month-end resampling,
//! histograms and box statistics.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use crate::domain::series::ReturnSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodKey {
    Week { year: i32, week: u32 },
    Month { year: i32, month: u32 },
    Year(i32),
}

impl PeriodKey {
    fn of(date: NaiveDate, period: Period) -> Self {
        match period {
            Period::Weekly => {
                let iso = date.iso_week();
                PeriodKey::Week {
                    year: iso.year(),
                    week: iso.week(),
                }
            }
            Period::Monthly => PeriodKey::Month {
                year: date.year(),
                month: date.month(),
            },
            Period::Yearly => PeriodKey::Year(date.year()),
        }
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodKey::Week { year, week } => write!(f, "{year}-W{week:02}"),
            PeriodKey::Month { year, month } => write!(f, "{year}-{month:02}"),
            PeriodKey::Year(year) => write!(f, "{year}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodReturn {
    pub period: PeriodKey,
    pub value: f64,
}

/// Compound daily returns within each calendar period.
pub fn aggregate_returns(returns: &ReturnSeries, period: Period) -> Vec<PeriodReturn> {
    let mut grouped: BTreeMap<PeriodKey, f64> = BTreeMap::new();
    for p in returns.points() {
        let growth = grouped.entry(PeriodKey::of(p.date, period)).or_insert(1.0);
        *growth *= 1.0 + p.value;
    }
    grouped
        .into_iter()
        .map(|(period, growth)| PeriodReturn {
            period,
            value: growth - 1.0,
        })
        .collect()
}

pub struct MonthlyReturnRow {
    pub year: i32,
    pub months: [Option<f64>; 12],
}

/// Year x month grid of compounded monthly returns.
pub fn monthly_return_table(returns: &ReturnSeries) -> Vec<MonthlyReturnRow> {
    let monthly = aggregate_returns(returns, Period::Monthly);
    let mut years: BTreeMap<i32, [Option<f64>; 12]> = BTreeMap::new();
    for r in monthly {
        if let PeriodKey::Month { year, month } = r.period {
            years.entry(year).or_insert([None; 12])[(month - 1) as usize] = Some(r.value);
        }
    }
    years
        .into_iter()
        .map(|(year, months)| MonthlyReturnRow { year, months })
        .collect()
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Mean of the present values in each calendar month, labelled by month end.
/// A month without any present value stays missing.
pub fn monthly_mean(points: &[(NaiveDate, Option<f64>)]) -> Vec<(NaiveDate, Option<f64>)> {
    let mut grouped: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for &(date, value) in points {
        let entry = grouped.entry(month_end(date)).or_insert((0.0, 0));
        if let Some(v) = value {
            entry.0 += v;
            entry.1 += 1;
        }
    }
    grouped
        .into_iter()
        .map(|(date, (sum, count))| (date, (count > 0).then(|| sum / count as f64)))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

pub fn histogram(values: &[f64], bins: usize) -> Option<Histogram> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return None;
    }
    let mut min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        min -= 0.5;
        max += 0.5;
    }
    let width = (max - min) / bins as f64;
    let edges = (0..=bins).map(|i| min + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    for v in finite {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Some(Histogram { edges, counts })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    let pos = p.clamp(0.0, 1.0) * (sorted.len() as f64 - 1.0);
    let idx = pos.floor() as usize;
    let frac = pos - idx as f64;
    if idx + 1 >= sorted.len() {
        sorted[sorted.len() - 1]
    } else {
        sorted[idx] + (sorted[idx + 1] - sorted[idx]) * frac
    }
}

pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(BoxStats {
        min: sorted[0],
        q1: percentile(&sorted, 0.25),
        median: percentile(&sorted, 0.5),
        q3: percentile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}
