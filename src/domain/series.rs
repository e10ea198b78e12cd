//! Date-indexed series, geometric compounding and explicit alignment.
//!
//! Every series is ordered by strictly increasing date. Alignment between two
//! series is never implicit: callers pick `inner_join` or `reindex` and get an
//! [`TearsheetError::Alignment`] when the indices cannot be reconciled.

use chrono::NaiveDate;

use crate::domain::error::TearsheetError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    name: Option<String>,
    points: Vec<DatedValue>,
}

/// Daily fractional returns.
pub type ReturnSeries = TimeSeries;

/// Geometrically compounded returns: `start * prod(1 + r)`.
pub type CumulativeReturnSeries = TimeSeries;

impl TimeSeries {
    /// Build a series from ingested points. Dates must be strictly increasing
    /// and every value finite.
    pub fn new(points: Vec<DatedValue>) -> Result<Self, TearsheetError> {
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(TearsheetError::invalid_input(format!(
                    "dates must be strictly increasing: {} follows {}",
                    pair[1].date, pair[0].date
                )));
            }
        }
        if let Some(bad) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(TearsheetError::invalid_input(format!(
                "non-finite value on {}",
                bad.date
            )));
        }
        Ok(Self { name: None, points })
    }

    pub fn from_pairs(pairs: &[(NaiveDate, f64)]) -> Result<Self, TearsheetError> {
        Self::new(
            pairs
                .iter()
                .map(|&(date, value)| DatedValue { date, value })
                .collect(),
        )
    }

    /// Internal constructor for series derived from an already ordered index.
    pub(crate) fn from_ordered(points: Vec<DatedValue>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].date < w[1].date));
        Self { name: None, points }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn points(&self) -> &[DatedValue] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| self.points[idx].value)
    }

    /// Points strictly before `date`.
    pub fn before(&self, date: NaiveDate) -> TimeSeries {
        let end = self.points.partition_point(|p| p.date < date);
        self.derived(self.points[..end].to_vec())
    }

    /// Points on or after `date`.
    pub fn from_date(&self, date: NaiveDate) -> TimeSeries {
        let start = self.points.partition_point(|p| p.date < date);
        self.derived(self.points[start..].to_vec())
    }

    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> TimeSeries {
        self.derived(
            self.points
                .iter()
                .map(|p| DatedValue {
                    date: p.date,
                    value: f(p.value),
                })
                .collect(),
        )
    }

    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        Some(self.points.iter().map(|p| p.value).sum::<f64>() / self.points.len() as f64)
    }

    /// Sample standard deviation (n - 1 denominator).
    pub fn std_dev(&self) -> Option<f64> {
        sample_std(&self.values())
    }

    /// Compound returns from `starting_value`.
    pub fn cum_returns(&self, starting_value: f64) -> CumulativeReturnSeries {
        let mut acc = starting_value;
        let points = self
            .points
            .iter()
            .map(|p| {
                acc *= 1.0 + p.value;
                DatedValue {
                    date: p.date,
                    value: acc,
                }
            })
            .collect();
        self.derived(points)
    }

    /// Recover simple returns from a cumulative series. The first point is
    /// measured against `starting_value`.
    pub fn pct_change(&self, starting_value: f64) -> Result<ReturnSeries, TearsheetError> {
        let mut prev = starting_value;
        let mut points = Vec::with_capacity(self.points.len());
        for p in &self.points {
            if prev == 0.0 {
                return Err(TearsheetError::division_by_zero(format!(
                    "cumulative value is zero before {}",
                    p.date
                )));
            }
            points.push(DatedValue {
                date: p.date,
                value: p.value / prev - 1.0,
            });
            prev = p.value;
        }
        Ok(self.derived(points))
    }

    /// Intersect the two date indices. An empty intersection of two non-empty
    /// series is an alignment failure.
    pub fn inner_join(
        &self,
        other: &TimeSeries,
    ) -> Result<(TimeSeries, TimeSeries), TearsheetError> {
        let mut left = Vec::new();
        let mut right = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.points.len() && j < other.points.len() {
            let (a, b) = (self.points[i], other.points[j]);
            match a.date.cmp(&b.date) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    left.push(a);
                    right.push(b);
                    i += 1;
                    j += 1;
                }
            }
        }
        if left.is_empty() && !self.is_empty() && !other.is_empty() {
            return Err(TearsheetError::alignment(format!(
                "{} and {} share no dates",
                self.label(),
                other.label()
            )));
        }
        Ok((self.derived(left), other.derived(right)))
    }

    /// Select exactly `dates` from this series. Every requested date must be
    /// present.
    pub fn reindex(&self, dates: &[NaiveDate]) -> Result<TimeSeries, TearsheetError> {
        let mut points = Vec::with_capacity(dates.len());
        for &date in dates {
            let value = self.get(date).ok_or_else(|| {
                TearsheetError::alignment(format!("{} has no value on {}", self.label(), date))
            })?;
            points.push(DatedValue { date, value });
        }
        Ok(self.derived(points))
    }

    pub(crate) fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| "series".to_string())
    }

    fn derived(&self, points: Vec<DatedValue>) -> TimeSeries {
        TimeSeries {
            name: self.name.clone(),
            points,
        }
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}
