//! Underwater (running drawdown) curve.

use crate::domain::error::TearsheetError;
use crate::domain::series::{CumulativeReturnSeries, DatedValue, TimeSeries};

/// Percent below the running maximum at each date, `<= 0`, exactly `0.0`
/// at new highs.
pub fn underwater(cum_returns: &CumulativeReturnSeries) -> Result<TimeSeries, TearsheetError> {
    let mut running_max = f64::NEG_INFINITY;
    let mut points = Vec::with_capacity(cum_returns.len());

    for p in cum_returns.points() {
        running_max = running_max.max(p.value);
        if running_max <= 0.0 {
            return Err(TearsheetError::division_by_zero(format!(
                "running maximum of cumulative returns is {} on {}",
                running_max, p.date
            )));
        }
        let value = if p.value >= running_max {
            0.0
        } else {
            -100.0 * (running_max - p.value) / running_max
        };
        points.push(DatedValue {
            date: p.date,
            value,
        });
    }

    Ok(TimeSeries::from_ordered(points).with_name("underwater"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn cum_series(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let pairs: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (start + chrono::Duration::days(i as i64), v))
            .collect();
        TimeSeries::from_pairs(&pairs).unwrap()
    }

    #[test]
    fn known_curve() {
        let uw = underwater(&cum_series(&[1.0, 1.1, 1.05, 0.95, 1.0, 1.2])).unwrap();
        let expected = [0.0, 0.0, -4.545454, -13.636363, -9.090909, 0.0];
        for (got, want) in uw.values().iter().zip(expected) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-5);
        }
    }

    #[test]
    fn zero_capital_fails() {
        let err = underwater(&cum_series(&[0.0, 0.5])).unwrap_err();
        assert!(matches!(err, TearsheetError::DivisionByZero { .. }));
    }

    #[test]
    fn negative_start_fails() {
        let err = underwater(&cum_series(&[-0.5, -0.2])).unwrap_err();
        assert!(matches!(err, TearsheetError::DivisionByZero { .. }));
    }

    #[test]
    fn empty_series_is_empty_curve() {
        let uw = underwater(&TimeSeries::default()).unwrap();
        assert!(uw.is_empty());
    }

    proptest! {
        #[test]
        fn never_above_zero_and_zero_only_at_highs(
            returns in prop::collection::vec(-0.5f64..0.5, 1..200),
        ) {
            let mut acc = 1.0;
            let values: Vec<f64> = returns.iter().map(|r| { acc *= 1.0 + r; acc }).collect();
            let uw = underwater(&cum_series(&values)).unwrap();

            let mut running_max = f64::NEG_INFINITY;
            for (value, point) in values.iter().zip(uw.values()) {
                running_max = running_max.max(*value);
                prop_assert!(point <= 0.0);
                prop_assert_eq!(point == 0.0, *value == running_max);
            }
        }
    }
}
