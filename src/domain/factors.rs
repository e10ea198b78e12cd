//! Risk-factor return sets and rolling regression coefficient tables.

use chrono::NaiveDate;

use crate::domain::error::TearsheetError;
use crate::domain::series::TimeSeries;

/// Column name of the regression intercept in a [`FactorBetaTable`].
pub const INTERCEPT_COLUMN: &str = "const";

/// Named factor return series (e.g. SMB, HML, UMD).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FactorSet {
    factors: Vec<TimeSeries>,
}

impl FactorSet {
    /// Every factor must carry a distinct name.
    pub fn new(factors: Vec<TimeSeries>) -> Result<Self, TearsheetError> {
        let mut names = Vec::with_capacity(factors.len());
        for f in &factors {
            let name = f
                .name()
                .ok_or_else(|| TearsheetError::invalid_input("factor series must be named"))?;
            if names.contains(&name) {
                return Err(TearsheetError::invalid_input(format!(
                    "duplicate factor {name}"
                )));
            }
            names.push(name);
        }
        Ok(Self { factors })
    }

    pub fn factors(&self) -> &[TimeSeries] {
        &self.factors
    }

    pub fn names(&self) -> Vec<&str> {
        self.factors.iter().filter_map(|f| f.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&TimeSeries> {
        self.factors.iter().find(|f| f.name() == Some(name))
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// Rolling regression output: one row per window end date, an intercept
/// column followed by one coefficient column per factor.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorBetaTable {
    columns: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

impl FactorBetaTable {
    pub fn new(
        columns: Vec<String>,
        dates: Vec<NaiveDate>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, TearsheetError> {
        if columns.first().map(String::as_str) != Some(INTERCEPT_COLUMN) {
            return Err(TearsheetError::invalid_input(format!(
                "first coefficient column must be {INTERCEPT_COLUMN}"
            )));
        }
        if dates.len() != rows.len() || rows.iter().any(|r| r.len() != columns.len()) {
            return Err(TearsheetError::invalid_input(
                "coefficient table rows do not match its columns",
            ));
        }
        Ok(Self {
            columns,
            dates,
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<TimeSeries> {
        let idx = self.columns.iter().position(|c| c == name)?;
        let pairs: Vec<_> = self
            .dates
            .iter()
            .zip(&self.rows)
            .map(|(&d, row)| (d, row[idx]))
            .collect();
        TimeSeries::from_pairs(&pairs)
            .ok()
            .map(|s| s.with_name(name))
    }

    pub fn intercept(&self) -> Option<TimeSeries> {
        self.column(INTERCEPT_COLUMN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, day).unwrap()
    }

    fn factor(name: &str) -> TimeSeries {
        TimeSeries::from_pairs(&[(d(1), 0.01), (d(2), -0.02)])
            .unwrap()
            .with_name(name)
    }

    #[test]
    fn factor_set_lookup() {
        let set = FactorSet::new(vec![factor("SMB"), factor("HML")]).unwrap();
        assert_eq!(set.names(), vec!["SMB", "HML"]);
        assert!(set.get("HML").is_some());
        assert!(set.get("UMD").is_none());
    }

    #[test]
    fn duplicate_or_unnamed_factor_rejected() {
        assert!(FactorSet::new(vec![factor("SMB"), factor("SMB")]).is_err());
        assert!(FactorSet::new(vec![TimeSeries::default()]).is_err());
    }

    #[test]
    fn beta_table_columns() {
        let table = FactorBetaTable::new(
            vec!["const".into(), "SMB".into()],
            vec![d(1), d(2)],
            vec![vec![0.001, 0.5], vec![0.002, 0.7]],
        )
        .unwrap();
        assert_eq!(table.intercept().unwrap().values(), vec![0.001, 0.002]);
        assert_eq!(table.column("SMB").unwrap().name(), Some("SMB"));
        assert!(table.column("HML").is_none());
    }

    #[test]
    fn beta_table_requires_intercept_first() {
        let err = FactorBetaTable::new(vec!["SMB".into()], vec![], vec![]).unwrap_err();
        assert!(matches!(err, TearsheetError::InvalidInput { .. }));
    }
}
