//! CSV file data adapter.
//!
//! Every file starts with a header row whose first column is an ISO date.
//! Relative paths are resolved against the adapter's base directory.

use crate::domain::error::TearsheetError;
use crate::domain::factors::FactorSet;
use crate::domain::positions::{PositionTable, CASH_COLUMN};
use crate::domain::series::{DatedValue, ReturnSeries, TimeSeries};
use crate::domain::turnover::TransactionDay;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

/// Header and rows of one CSV file, each row tagged with its line number.
struct CsvTable {
    file: String,
    headers: Vec<String>,
    rows: Vec<(u64, NaiveDate, Vec<String>)>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    fn read_table(&self, path: &Path) -> Result<CsvTable, TearsheetError> {
        let path = self.resolve(path);
        let file = path.display().to_string();
        let content = fs::read_to_string(&path).map_err(|e| TearsheetError::DataLoad {
            file: file.clone(),
            reason: e.to_string(),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| load_error(&file, format!("CSV parse error: {e}")))?
            .iter()
            .skip(1)
            .map(String::from)
            .collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| load_error(&file, format!("CSV parse error: {e}")))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let date_str = record
                .get(0)
                .ok_or_else(|| load_error(&file, format!("line {line}: missing date column")))?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                load_error(&file, format!("line {line}: invalid date {date_str:?}: {e}"))
            })?;
            rows.push((line, date, record.iter().skip(1).map(String::from).collect()));
        }
        rows.sort_by_key(|(_, date, _)| *date);

        debug!(file = %file, rows = rows.len(), columns = headers.len(), "loaded csv");
        Ok(CsvTable {
            file,
            headers,
            rows,
        })
    }
}

fn load_error(file: &str, reason: String) -> TearsheetError {
    TearsheetError::DataLoad {
        file: file.to_string(),
        reason,
    }
}

impl CsvTable {
    fn column_index(&self, name: &str) -> Result<usize, TearsheetError> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| load_error(&self.file, format!("missing {name} column")))
    }

    fn number(
        &self,
        line: u64,
        row: &[String],
        idx: usize,
        allow_empty: bool,
    ) -> Result<f64, TearsheetError> {
        match row.get(idx).map(String::as_str) {
            Some("") | None if allow_empty => Ok(0.0),
            Some(cell) => cell.parse::<f64>().map_err(|e| {
                load_error(
                    &self.file,
                    format!("line {line}: invalid {} value {cell:?}: {e}", self.headers[idx]),
                )
            }),
            None => Err(load_error(
                &self.file,
                format!("line {line}: missing {} value", self.headers[idx]),
            )),
        }
    }

    fn series(&self, idx: usize) -> Result<TimeSeries, TearsheetError> {
        let points = self
            .rows
            .iter()
            .map(|(line, date, row)| {
                Ok(DatedValue {
                    date: *date,
                    value: self.number(*line, row, idx, false)?,
                })
            })
            .collect::<Result<Vec<_>, TearsheetError>>()?;
        let series =
            TimeSeries::new(points).map_err(|e| load_error(&self.file, e.to_string()))?;
        Ok(series.with_name(self.headers[idx].clone()))
    }
}

impl DataPort for CsvAdapter {
    fn load_returns(&self, path: &Path) -> Result<ReturnSeries, TearsheetError> {
        let table = self.read_table(path)?;
        if table.headers.is_empty() {
            return Err(load_error(&table.file, "missing return column".into()));
        }
        table.series(0)
    }

    fn load_factors(&self, path: &Path) -> Result<FactorSet, TearsheetError> {
        let table = self.read_table(path)?;
        let factors = (0..table.headers.len())
            .map(|idx| table.series(idx))
            .collect::<Result<Vec<_>, _>>()?;
        FactorSet::new(factors).map_err(|e| load_error(&table.file, e.to_string()))
    }

    fn load_positions(&self, path: &Path) -> Result<PositionTable, TearsheetError> {
        let table = self.read_table(path)?;
        table.column_index(CASH_COLUMN)?;

        let mut dates = Vec::with_capacity(table.rows.len());
        let mut values = Vec::with_capacity(table.rows.len());
        for (line, date, row) in &table.rows {
            dates.push(*date);
            values.push(
                (0..table.headers.len())
                    .map(|idx| table.number(*line, row, idx, true))
                    .collect::<Result<Vec<_>, _>>()?,
            );
        }
        let columns = table
            .headers
            .iter()
            .map(|h| {
                if h.eq_ignore_ascii_case(CASH_COLUMN) {
                    CASH_COLUMN.to_string()
                } else {
                    h.clone()
                }
            })
            .collect();
        PositionTable::new(dates, columns, values)
            .map_err(|e| load_error(&table.file, e.to_string()))
    }

    fn load_transactions(&self, path: &Path) -> Result<Vec<TransactionDay>, TearsheetError> {
        let table = self.read_table(path)?;
        let volume_idx = table.column_index("txn_volume")?;
        let shares_idx = table.column_index("txn_shares")?;

        let mut days: Vec<TransactionDay> = Vec::with_capacity(table.rows.len());
        for (line, date, row) in &table.rows {
            if days.last().is_some_and(|d| d.date == *date) {
                return Err(load_error(
                    &table.file,
                    format!("line {line}: duplicate date {date}"),
                ));
            }
            days.push(TransactionDay {
                date: *date,
                txn_volume: table.number(*line, row, volume_idx, false)?,
                txn_shares: table.number(*line, row, shares_idx, false)?,
            });
        }
        Ok(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        fs::write(
            path.join("strategy.csv"),
            "date,strategy\n2024-01-16,0.02\n2024-01-15,0.01\n2024-01-17,-0.005\n",
        )
        .unwrap();
        fs::write(
            path.join("factors.csv"),
            "date,SMB,HML,UMD\n2024-01-15,0.001,0.002,-0.001\n2024-01-16,0.0,-0.003,0.004\n",
        )
        .unwrap();
        fs::write(
            path.join("positions.csv"),
            "date,AAPL,MSFT,cash\n2024-01-15,1000,,500\n2024-01-16,1200,-300,100\n",
        )
        .unwrap();
        fs::write(
            path.join("transactions.csv"),
            "date,txn_volume,txn_shares\n2024-01-15,1500,30\n2024-01-16,800,12\n",
        )
        .unwrap();

        (dir, path)
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn load_returns_sorts_and_names() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let returns = adapter.load_returns(Path::new("strategy.csv")).unwrap();
        assert_eq!(returns.name(), Some("strategy"));
        assert_eq!(returns.dates(), vec![d(15), d(16), d(17)]);
        assert_eq!(returns.values(), vec![0.01, 0.02, -0.005]);
    }

    #[test]
    fn load_factors_reads_every_column() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let factors = adapter.load_factors(Path::new("factors.csv")).unwrap();
        assert_eq!(factors.names(), vec!["SMB", "HML", "UMD"]);
        assert_eq!(factors.get("HML").unwrap().values(), vec![0.002, -0.003]);
    }

    #[test]
    fn load_positions_treats_empty_cells_as_zero() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let positions = adapter.load_positions(Path::new("positions.csv")).unwrap();
        assert_eq!(positions.columns(), ["AAPL", "MSFT", "cash"]);
        assert_eq!(positions.rows()[0], vec![1000.0, 0.0, 500.0]);
        assert_eq!(positions.cash_index(), Some(2));
    }

    #[test]
    fn load_transactions() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let txns = adapter.load_transactions(Path::new("transactions.csv")).unwrap();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[1].txn_volume, 800.0);
        assert_eq!(txns[1].txn_shares, 12.0);
    }

    #[test]
    fn missing_file_is_data_load_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let err = adapter.load_returns(Path::new("nope.csv")).unwrap_err();
        assert!(matches!(err, TearsheetError::DataLoad { .. }));
    }

    #[test]
    fn malformed_value_names_line() {
        let (_dir, path) = setup_test_data();
        let content = "date,strategy\n2024-01-15,0.01\n2024-01-16,abc\n";
        fs::write(path.join("bad.csv"), content).unwrap();
        let adapter = CsvAdapter::new(path);
        let err = adapter.load_returns(Path::new("bad.csv")).unwrap_err();
        match err {
            TearsheetError::DataLoad { reason, .. } => assert!(reason.contains("line 3")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn duplicate_return_dates_rejected() {
        let (_dir, path) = setup_test_data();
        let content = "date,strategy\n2024-01-15,0.01\n2024-01-15,0.02\n";
        fs::write(path.join("dup.csv"), content).unwrap();
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.load_returns(Path::new("dup.csv")),
            Err(TearsheetError::DataLoad { .. })
        ));
    }

    #[test]
    fn positions_without_cash_rejected() {
        let (_dir, path) = setup_test_data();
        fs::write(path.join("nocash.csv"), "date,AAPL\n2024-01-15,100\n").unwrap();
        let adapter = CsvAdapter::new(path);
        let err = adapter.load_positions(Path::new("nocash.csv")).unwrap_err();
        assert!(err.to_string().contains("cash"));
    }
}
