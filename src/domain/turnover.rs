//! Turnover and gross leverage ratios.
//!
//! Per-date computations fail on a zero denominator. The series builders
//! record such dates as missing instead of substituting a value.

use chrono::NaiveDate;

use crate::domain::aggregation::monthly_mean;
use crate::domain::error::TearsheetError;
use crate::domain::positions::PositionTable;

/// Aggregate trading activity for one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransactionDay {
    pub date: NaiveDate,
    /// Dollar value traded.
    pub txn_volume: f64,
    /// Number of shares traded.
    pub txn_shares: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioPoint {
    pub date: NaiveDate,
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RatioSeries {
    pub points: Vec<RatioPoint>,
}

impl RatioSeries {
    pub fn present(&self) -> Vec<(NaiveDate, f64)> {
        self.points
            .iter()
            .filter_map(|p| p.ratio.map(|r| (p.date, r)))
            .collect()
    }

    pub fn missing_dates(&self) -> Vec<NaiveDate> {
        self.points
            .iter()
            .filter(|p| p.ratio.is_none())
            .map(|p| p.date)
            .collect()
    }

    /// Calendar-month means of the present values.
    pub fn monthly_mean(&self) -> RatioSeries {
        let pairs: Vec<_> = self.points.iter().map(|p| (p.date, p.ratio)).collect();
        RatioSeries {
            points: monthly_mean(&pairs)
                .into_iter()
                .map(|(date, ratio)| RatioPoint { date, ratio })
                .collect(),
        }
    }

    pub fn mean(&self) -> Option<f64> {
        let present = self.present();
        if present.is_empty() {
            return None;
        }
        Some(present.iter().map(|(_, v)| v).sum::<f64>() / present.len() as f64)
    }
}

/// Sum of absolute non-cash position values on row `row`.
fn gross_exposure(positions: &PositionTable, row: usize) -> f64 {
    let values = &positions.rows()[row];
    positions.symbols().map(|(idx, _)| values[idx].abs()).sum()
}

/// Sum of absolute values on row `row` over every column, cash included.
fn total_absolute_value(positions: &PositionTable, row: usize) -> f64 {
    positions.rows()[row].iter().map(|v| v.abs()).sum()
}

/// Turnover for a single day: `volume / sum(|value|)` over every column,
/// cash included.
pub fn turnover_at(
    txn: &TransactionDay,
    positions: &PositionTable,
) -> Result<f64, TearsheetError> {
    let row = positions.row_index(txn.date).ok_or_else(|| {
        TearsheetError::alignment(format!("transaction date {} has no position row", txn.date))
    })?;
    let denominator = total_absolute_value(positions, row);
    if denominator == 0.0 {
        return Err(TearsheetError::division_by_zero(format!(
            "portfolio holds nothing on {}",
            txn.date
        )));
    }
    Ok(txn.txn_volume / denominator)
}

/// Daily turnover over every transaction date. Days where every column,
/// cash included, is zero are missing; a transaction date absent from `positions` is an error.
pub fn turnover(
    transactions: &[TransactionDay],
    positions: &PositionTable,
) -> Result<RatioSeries, TearsheetError> {
    let mut points = Vec::with_capacity(transactions.len());
    for txn in transactions {
        let ratio = match turnover_at(txn, positions) {
            Ok(r) => Some(r),
            Err(TearsheetError::DivisionByZero { .. }) => None,
            Err(e) => return Err(e),
        };
        points.push(RatioPoint {
            date: txn.date,
            ratio,
        });
    }
    Ok(RatioSeries { points })
}

/// Gross leverage for one row: gross exposure over net liquidation value.
pub fn gross_leverage_at(positions: &PositionTable, row: usize) -> Result<f64, TearsheetError> {
    let values = &positions.rows()[row];
    let net_liquidation: f64 = values.iter().sum();
    if net_liquidation == 0.0 {
        return Err(TearsheetError::division_by_zero(format!(
            "net liquidation value is zero on {}",
            positions.dates()[row]
        )));
    }
    Ok(gross_exposure(positions, row) / net_liquidation)
}

pub fn gross_leverage(positions: &PositionTable) -> Result<RatioSeries, TearsheetError> {
    if positions.cash_index().is_none() {
        return Err(TearsheetError::missing_data(
            "gross leverage needs a cash column",
        ));
    }
    let points = positions
        .dates()
        .iter()
        .enumerate()
        .map(|(row, &date)| RatioPoint {
            date,
            ratio: gross_leverage_at(positions, row).ok(),
        })
        .collect();
    Ok(RatioSeries { points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn positions() -> PositionTable {
        PositionTable::new(
            vec![d(2020, 1, 2), d(2020, 1, 3), d(2020, 2, 3), d(2020, 2, 4)],
            vec!["AAPL".into(), "GOOG".into(), "cash".into()],
            vec![
                vec![600.0, -400.0, 800.0],
                vec![0.0, 0.0, 1000.0],
                vec![500.0, 0.0, 500.0],
                vec![0.0, 0.0, 0.0],
            ],
        )
        .unwrap()
    }

    fn txn(date: NaiveDate, volume: f64) -> TransactionDay {
        TransactionDay {
            date,
            txn_volume: volume,
            txn_shares: volume / 10.0,
        }
    }

    #[test]
    fn turnover_divides_by_total_absolute_value_including_cash() {
        let r = turnover_at(&txn(d(2020, 1, 2), 500.0), &positions()).unwrap();
        assert_relative_eq!(r, 500.0 / 1800.0);
    }

    #[test]
    fn cash_only_day_has_turnover() {
        let r = turnover_at(&txn(d(2020, 1, 3), 500.0), &positions()).unwrap();
        assert_relative_eq!(r, 0.5);
    }

    #[test]
    fn empty_portfolio_raises_division_by_zero() {
        let err = turnover_at(&txn(d(2020, 2, 4), 100.0), &positions()).unwrap_err();
        assert!(matches!(err, TearsheetError::DivisionByZero { .. }));
    }

    #[test]
    fn series_marks_zero_denominator_missing() {
        let series = turnover(
            &[txn(d(2020, 1, 3), 500.0), txn(d(2020, 2, 4), 100.0)],
            &positions(),
        )
        .unwrap();
        assert_eq!(series.points[1].ratio, None);
        assert_eq!(series.missing_dates(), vec![d(2020, 2, 4)]);
        assert_relative_eq!(series.mean().unwrap(), 0.5);
    }

    #[test]
    fn unknown_transaction_date_is_alignment_error() {
        let err = turnover(&[txn(d(2020, 1, 4), 1.0)], &positions()).unwrap_err();
        assert!(matches!(err, TearsheetError::Alignment { .. }));
    }

    #[test]
    fn monthly_mean_of_turnover() {
        let series = turnover(
            &[
                txn(d(2020, 1, 2), 500.0),
                txn(d(2020, 1, 3), 100.0),
                txn(d(2020, 2, 3), 250.0),
            ],
            &positions(),
        )
        .unwrap();
        let monthly = series.monthly_mean();
        assert_eq!(monthly.points.len(), 2);
        assert_relative_eq!(monthly.points[0].ratio.unwrap(), (500.0 / 1800.0 + 0.1) / 2.0);
        assert_relative_eq!(monthly.points[1].ratio.unwrap(), 0.25);
    }

    #[test]
    fn gross_leverage_per_row() {
        let lev = gross_leverage(&positions()).unwrap();
        assert_relative_eq!(lev.points[0].ratio.unwrap(), 1.0);
        assert_relative_eq!(lev.points[1].ratio.unwrap(), 0.0);
        assert_relative_eq!(lev.points[2].ratio.unwrap(), 0.5);
        assert_eq!(lev.points[3].ratio, None);
    }

    #[test]
    fn zero_net_liquidation_is_missing() {
        let table = PositionTable::new(
            vec![d(2020, 1, 2)],
            vec!["AAPL".into(), "cash".into()],
            vec![vec![100.0, -100.0]],
        )
        .unwrap();
        assert!(matches!(
            gross_leverage_at(&table, 0),
            Err(TearsheetError::DivisionByZero { .. })
        ));
        assert_eq!(gross_leverage(&table).unwrap().points[0].ratio, None);
    }
}
