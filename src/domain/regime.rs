//! Regime segmentation of a date axis and cone-band slicing.
//!
//! A single cutoff date splits the axis into three contiguous, disjoint
//! slices: Fit (before the cutoff), Live (cutoff through the last observed
//! date) and Future (after the last observed date).

use chrono::NaiveDate;

use crate::domain::error::TearsheetError;
use crate::domain::series::{DatedValue, TimeSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regime {
    Fit,
    Live,
    Future,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegimeBoundary {
    pub cutoff: NaiveDate,
    pub last_observed: NaiveDate,
}

impl RegimeBoundary {
    pub fn new(cutoff: NaiveDate, last_observed: NaiveDate) -> Self {
        Self {
            cutoff,
            last_observed,
        }
    }

    pub fn classify(&self, date: NaiveDate) -> Regime {
        if date > self.last_observed {
            Regime::Future
        } else if date < self.cutoff {
            Regime::Fit
        } else {
            Regime::Live
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConePoint {
    pub date: NaiveDate,
    pub line: f64,
    pub sd_up: f64,
    pub sd_down: f64,
}

/// Date-indexed cone band, ordered by date, with `sd_down <= line <= sd_up`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConeBand {
    points: Vec<ConePoint>,
}

impl ConeBand {
    pub fn new(points: Vec<ConePoint>) -> Result<Self, TearsheetError> {
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(TearsheetError::invalid_input(format!(
                    "cone dates must be strictly increasing: {} follows {}",
                    pair[1].date, pair[0].date
                )));
            }
        }
        if let Some(bad) = points
            .iter()
            .find(|p| !(p.sd_down <= p.line && p.line <= p.sd_up))
        {
            return Err(TearsheetError::invalid_input(format!(
                "cone band out of order on {}: sd_down {} line {} sd_up {}",
                bad.date, bad.sd_down, bad.line, bad.sd_up
            )));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[ConePoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn line(&self) -> TimeSeries {
        self.project(|p| p.line)
    }

    pub fn upper(&self) -> TimeSeries {
        self.project(|p| p.sd_up)
    }

    pub fn lower(&self) -> TimeSeries {
        self.project(|p| p.sd_down)
    }

    fn project(&self, f: impl Fn(&ConePoint) -> f64) -> TimeSeries {
        TimeSeries::from_ordered(
            self.points
                .iter()
                .map(|p| DatedValue {
                    date: p.date,
                    value: f(p),
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConeSlices {
    pub fit: ConeBand,
    pub live: ConeBand,
    pub future: ConeBand,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DateSlices {
    pub fit: Vec<NaiveDate>,
    pub live: Vec<NaiveDate>,
    pub future: Vec<NaiveDate>,
}

/// Partition an ordered date axis by regime.
pub fn segment_dates(dates: &[NaiveDate], boundary: RegimeBoundary) -> DateSlices {
    let mut slices = DateSlices::default();
    for &date in dates {
        match boundary.classify(date) {
            Regime::Fit => slices.fit.push(date),
            Regime::Live => slices.live.push(date),
            Regime::Future => slices.future.push(date),
        }
    }
    slices
}

/// Split a series into its Fit and Live parts. A series never has Future
/// points because its last date defines the boundary.
pub fn segment_series(
    series: &TimeSeries,
    cutoff: NaiveDate,
) -> Result<(TimeSeries, TimeSeries), TearsheetError> {
    let last = series
        .last_date()
        .ok_or_else(|| TearsheetError::missing_data("cannot segment an empty series"))?;
    let slices = segment_dates(&series.dates(), RegimeBoundary::new(cutoff, last));
    Ok((series.reindex(&slices.fit)?, series.reindex(&slices.live)?))
}

/// Slice a cone table around `cutoff` and the return series' observed range.
///
/// The cone must cover `[returns_first, returns_last]`; otherwise the chart
/// would silently truncate and the call fails with `MissingData`.
pub fn segment_cone(
    cone: &ConeBand,
    cutoff: NaiveDate,
    returns_first: NaiveDate,
    returns_last: NaiveDate,
) -> Result<ConeSlices, TearsheetError> {
    let (cone_first, cone_last) = match (cone.first_date(), cone.last_date()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(TearsheetError::missing_data("cone table is empty")),
    };
    if cone_first > returns_first || cone_last < returns_last {
        return Err(TearsheetError::missing_data(format!(
            "cone covers {cone_first}..{cone_last} but returns span {returns_first}..{returns_last}"
        )));
    }

    let boundary = RegimeBoundary::new(cutoff, returns_last);
    let mut fit = Vec::new();
    let mut live = Vec::new();
    let mut future = Vec::new();
    for point in cone.points() {
        match boundary.classify(point.date) {
            Regime::Fit => fit.push(*point),
            Regime::Live => live.push(*point),
            Regime::Future => future.push(*point),
        }
    }

    Ok(ConeSlices {
        fit: ConeBand { points: fit },
        live: ConeBand { points: live },
        future: ConeBand { points: future },
    })
}
