//! Position tables: allocation weights, top-N ranking, exposure
//! decomposition and holdings counts.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::domain::error::TearsheetError;
use crate::domain::series::{DatedValue, TimeSeries};

pub const CASH_COLUMN: &str = "cash";
pub const DEFAULT_TOP_POSITIONS: usize = 10;

/// Date x symbol table. Used both for dollar position values and for
/// fractional allocation weights (`PositionAllocationMatrix`).
#[derive(Debug, Clone, PartialEq)]
pub struct PositionTable {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl PositionTable {
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, TearsheetError> {
        if dates.len() != rows.len() {
            return Err(TearsheetError::invalid_input(format!(
                "{} dates but {} rows",
                dates.len(),
                rows.len()
            )));
        }
        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(TearsheetError::invalid_input(format!(
                    "position dates must be strictly increasing: {} follows {}",
                    pair[1], pair[0]
                )));
            }
        }
        for (date, row) in dates.iter().zip(&rows) {
            if row.len() != columns.len() {
                return Err(TearsheetError::invalid_input(format!(
                    "row {} has {} values for {} columns",
                    date,
                    row.len(),
                    columns.len()
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(TearsheetError::invalid_input(format!(
                    "non-finite position value on {date}"
                )));
            }
        }
        Ok(Self {
            dates,
            columns,
            rows,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn cash_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c == CASH_COLUMN)
    }

    /// Symbol columns with their indices, cash excluded.
    pub fn symbols(&self) -> impl Iterator<Item = (usize, &str)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_str() != CASH_COLUMN)
            .map(|(i, c)| (i, c.as_str()))
    }

    pub fn row_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Divide each row by its total (symbols plus cash) to get weights.
    pub fn to_allocations(&self) -> Result<PositionTable, TearsheetError> {
        let mut rows = Vec::with_capacity(self.rows.len());
        for (date, row) in self.dates.iter().zip(&self.rows) {
            let total: f64 = row.iter().sum();
            if total == 0.0 {
                return Err(TearsheetError::division_by_zero(format!(
                    "portfolio value is zero on {date}"
                )));
            }
            rows.push(row.iter().map(|v| v / total).collect());
        }
        Ok(PositionTable {
            dates: self.dates.clone(),
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Keep only `symbols`, in the order given.
    pub fn select_columns(&self, symbols: &[String]) -> Result<PositionTable, TearsheetError> {
        let mut indices = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let idx = self
                .columns
                .iter()
                .position(|c| c == symbol)
                .ok_or_else(|| {
                    TearsheetError::missing_data(format!("no position column {symbol}"))
                })?;
            indices.push(idx);
        }
        Ok(PositionTable {
            dates: self.dates.clone(),
            columns: symbols.to_vec(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i]).collect())
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedPosition {
    pub symbol: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopPositionRanking {
    pub top_long: Vec<RankedPosition>,
    pub top_short: Vec<RankedPosition>,
    pub top_abs: Vec<RankedPosition>,
}

/// Convert a configured count into a ranking size.
pub fn parse_top_n(value: i64) -> Result<usize, TearsheetError> {
    usize::try_from(value)
        .map_err(|_| {
            TearsheetError::invalid_input(format!("top-N must be non-negative, got {value}"))
        })
}

struct SymbolExtremes {
    symbol: String,
    max: f64,
    min: f64,
    max_abs: f64,
}

/// Rank symbols (cash excluded) by their extreme weights over all dates.
pub fn top_long_short_abs(allocations: &PositionTable, top: usize) -> TopPositionRanking {
    let mut extremes: Vec<SymbolExtremes> = allocations
        .symbols()
        .map(|(idx, symbol)| {
            let mut e = SymbolExtremes {
                symbol: symbol.to_string(),
                max: f64::NEG_INFINITY,
                min: f64::INFINITY,
                max_abs: 0.0,
            };
            for row in allocations.rows() {
                let v = row[idx];
                e.max = e.max.max(v);
                e.min = e.min.min(v);
                e.max_abs = e.max_abs.max(v.abs());
            }
            e
        })
        .collect();
    extremes.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    TopPositionRanking {
        top_long: rank_by(&extremes, top, true, |e| (e.max > 0.0).then_some(e.max)),
        top_short: rank_by(&extremes, top, false, |e| (e.min < 0.0).then_some(e.min)),
        top_abs: rank_by(&extremes, top, true, |e| (e.max_abs > 0.0).then_some(e.max_abs)),
    }
}

fn rank_by(
    extremes: &[SymbolExtremes],
    top: usize,
    descending: bool,
    key: impl Fn(&SymbolExtremes) -> Option<f64>,
) -> Vec<RankedPosition> {
    let mut ranked: Vec<RankedPosition> = extremes
        .iter()
        .filter_map(|e| {
            key(e).map(|weight| RankedPosition {
                symbol: e.symbol.clone(),
                weight,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        let ord = a.weight.partial_cmp(&b.weight).unwrap_or(Ordering::Equal);
        let ord = if descending { ord.reverse() } else { ord };
        ord.then_with(|| a.symbol.cmp(&b.symbol))
    });
    ranked.truncate(top);
    ranked
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureRow {
    pub date: NaiveDate,
    pub long: f64,
    pub short: f64,
    pub cash: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExposureDecomposition {
    pub rows: Vec<ExposureRow>,
    /// Dates on which the cash weight is negative. A stacked-area rendering
    /// cannot represent these without transformation.
    pub negative_cash_dates: Vec<NaiveDate>,
}

impl ExposureDecomposition {
    pub fn has_negative_cash(&self) -> bool {
        !self.negative_cash_dates.is_empty()
    }
}

/// Per-date sum of long weights, sum of short weights and the cash weight.
pub fn long_short_cash(
    allocations: &PositionTable,
) -> Result<ExposureDecomposition, TearsheetError> {
    let cash_idx = allocations
        .cash_index()
        .ok_or_else(|| TearsheetError::missing_data("position table has no cash column"))?;

    let mut rows = Vec::with_capacity(allocations.dates().len());
    let mut negative_cash_dates = Vec::new();
    for (&date, row) in allocations.dates().iter().zip(allocations.rows()) {
        let mut long = 0.0;
        let mut short = 0.0;
        for (idx, _) in allocations.symbols() {
            let v = row[idx];
            if v > 0.0 {
                long += v;
            } else {
                short += v;
            }
        }
        let cash = row[cash_idx];
        if cash < 0.0 {
            negative_cash_dates.push(date);
        }
        rows.push(ExposureRow {
            date,
            long,
            short,
            cash,
        });
    }

    Ok(ExposureDecomposition {
        rows,
        negative_cash_dates,
    })
}

/// Number of non-zero, non-cash holdings on each date.
pub fn holdings_count(positions: &PositionTable) -> TimeSeries {
    TimeSeries::from_ordered(
        positions
            .dates()
            .iter()
            .zip(positions.rows())
            .map(|(&date, row)| DatedValue {
                date,
                value: positions.symbols().filter(|(idx, _)| row[*idx] != 0.0).count() as f64,
            })
            .collect(),
    )
    .with_name("holdings")
}
