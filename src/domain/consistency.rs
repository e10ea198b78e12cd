//! Backtest vs out-of-sample consistency score.

use chrono::NaiveDate;

use crate::domain::error::TearsheetError;
use crate::domain::series::ReturnSeries;

/// Returns split at the live cutoff: backtest is strictly before it, live is
/// on or after it.
#[derive(Debug, Clone)]
pub struct ReturnSplit {
    pub backtest: ReturnSeries,
    pub live: ReturnSeries,
}

pub fn split_returns(
    returns: &ReturnSeries,
    cutoff: NaiveDate,
) -> Result<ReturnSplit, TearsheetError> {
    let backtest = returns.before(cutoff);
    let live = returns.from_date(cutoff);
    if backtest.is_empty() {
        return Err(TearsheetError::missing_data(format!(
            "no backtest returns before {cutoff}"
        )));
    }
    if live.is_empty() {
        return Err(TearsheetError::missing_data(format!(
            "no out-of-sample returns on or after {cutoff}"
        )));
    }
    Ok(ReturnSplit { backtest, live })
}

/// `100 * (1 - divergence)` for a divergence in `[0, 1]`.
pub fn consistency_score(divergence: f64) -> Result<f64, TearsheetError> {
    if !(0.0..=1.0).contains(&divergence) {
        return Err(TearsheetError::invalid_input(format!(
            "divergence {divergence} is outside [0, 1]"
        )));
    }
    Ok(100.0 * (1.0 - divergence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::domain::series::TimeSeries;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn known_values() {
        assert_relative_eq!(consistency_score(0.2).unwrap(), 80.0, epsilon = 1e-12);
        assert_relative_eq!(consistency_score(0.0).unwrap(), 100.0);
        assert_relative_eq!(consistency_score(1.0).unwrap(), 0.0);
    }

    #[test]
    fn out_of_range_is_invalid() {
        for bad in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                consistency_score(bad),
                Err(TearsheetError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn split_puts_cutoff_in_live() {
        let s = TimeSeries::from_pairs(&[
            (d(2020, 1, 1), 0.01),
            (d(2020, 1, 2), 0.02),
            (d(2020, 1, 3), 0.03),
        ])
        .unwrap();
        let split = split_returns(&s, d(2020, 1, 2)).unwrap();
        assert_eq!(split.backtest.len(), 1);
        assert_eq!(split.live.first_date(), Some(d(2020, 1, 2)));
    }

    #[test]
    fn split_without_live_is_missing_data() {
        let s = TimeSeries::from_pairs(&[(d(2020, 1, 1), 0.01)]).unwrap();
        assert!(matches!(
            split_returns(&s, d(2021, 1, 1)),
            Err(TearsheetError::MissingData { .. })
        ));
        assert!(matches!(
            split_returns(&s, d(2019, 1, 1)),
            Err(TearsheetError::MissingData { .. })
        ));
    }

    proptest! {
        #[test]
        fn strictly_decreasing(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let (sa, sb) = (consistency_score(a).unwrap(), consistency_score(b).unwrap());
            prop_assert!((0.0..=100.0).contains(&sa));
            if a < b {
                prop_assert!(sa > sb);
            }
        }
    }
}
