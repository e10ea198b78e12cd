#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tearsheet::domain::config_validation::ReportSettings;
use tearsheet::domain::error::TearsheetError;
use tearsheet::domain::factors::FactorSet;
use tearsheet::domain::positions::PositionTable;
use tearsheet::domain::report::TearsheetDocument;
use tearsheet::domain::series::{ReturnSeries, TimeSeries};
use tearsheet::domain::turnover::TransactionDay;
use tearsheet::ports::data_port::DataPort;
use tearsheet::ports::report_port::ReportPort;

/// Data port serving in-memory fixtures keyed by file name.
#[derive(Default)]
pub struct MockDataPort {
    pub returns: HashMap<String, ReturnSeries>,
    pub factors: Option<FactorSet>,
    pub positions: Option<PositionTable>,
    pub transactions: Option<Vec<TransactionDay>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_returns(mut self, file: &str, series: ReturnSeries) -> Self {
        self.returns.insert(file.to_string(), series);
        self
    }

    pub fn with_positions(mut self, positions: PositionTable) -> Self {
        self.positions = Some(positions);
        self
    }

    pub fn with_transactions(mut self, transactions: Vec<TransactionDay>) -> Self {
        self.transactions = Some(transactions);
        self
    }

    pub fn with_factors(mut self, factors: FactorSet) -> Self {
        self.factors = Some(factors);
        self
    }

    pub fn with_error(mut self, file: &str, reason: &str) -> Self {
        self.errors.insert(file.to_string(), reason.to_string());
        self
    }

    fn check(&self, path: &Path) -> Result<String, TearsheetError> {
        let file = path.display().to_string();
        match self.errors.get(&file) {
            Some(reason) => Err(TearsheetError::DataLoad {
                file,
                reason: reason.clone(),
            }),
            None => Ok(file),
        }
    }

    fn missing(file: String) -> TearsheetError {
        TearsheetError::DataLoad {
            file,
            reason: "no fixture".to_string(),
        }
    }
}

impl DataPort for MockDataPort {
    fn load_returns(&self, path: &Path) -> Result<ReturnSeries, TearsheetError> {
        let file = self.check(path)?;
        self.returns
            .get(&file)
            .cloned()
            .ok_or_else(|| Self::missing(file))
    }

    fn load_factors(&self, path: &Path) -> Result<FactorSet, TearsheetError> {
        let file = self.check(path)?;
        self.factors.clone().ok_or_else(|| Self::missing(file))
    }

    fn load_positions(&self, path: &Path) -> Result<PositionTable, TearsheetError> {
        let file = self.check(path)?;
        self.positions.clone().ok_or_else(|| Self::missing(file))
    }

    fn load_transactions(&self, path: &Path) -> Result<Vec<TransactionDay>, TearsheetError> {
        let file = self.check(path)?;
        self.transactions.clone().ok_or_else(|| Self::missing(file))
    }
}

/// Report port that keeps the last written document.
#[derive(Default)]
pub struct MockReportPort {
    pub written: RefCell<Option<(TearsheetDocument, PathBuf)>>,
}

impl MockReportPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> TearsheetDocument {
        self.written
            .borrow()
            .as_ref()
            .map(|(doc, _)| doc.clone())
            .expect("no document written")
    }
}

impl ReportPort for MockReportPort {
    fn write(
        &self,
        document: &TearsheetDocument,
        output_path: &Path,
    ) -> Result<(), TearsheetError> {
        *self.written.borrow_mut() = Some((document.clone(), output_path.to_path_buf()));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `n` consecutive weekdays starting at `start`.
pub fn weekdays(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut d = start;
    while dates.len() < n {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(d);
        }
        d += Duration::days(1);
    }
    dates
}

/// Deterministic wavy daily returns with a small drift.
pub fn make_returns(dates: &[NaiveDate], scale: f64, phase: f64) -> ReturnSeries {
    let pairs: Vec<_> = dates
        .iter()
        .enumerate()
        .map(|(i, &d)| (d, 0.0004 + scale * ((i as f64) * 0.83 + phase).sin()))
        .collect();
    TimeSeries::from_pairs(&pairs).unwrap()
}

/// Dollar positions in two symbols plus cash; every fifth day the book
/// borrows cash when `leveraged` is set.
pub fn make_positions(dates: &[NaiveDate], leveraged: bool) -> PositionTable {
    let rows = dates
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let cash = if leveraged && i % 5 == 0 { -200.0 } else { 300.0 };
            vec![1000.0 + 10.0 * i as f64, -250.0, cash]
        })
        .collect();
    PositionTable::new(
        dates.to_vec(),
        vec!["AAPL".into(), "MSFT".into(), "cash".into()],
        rows,
    )
    .unwrap()
}

pub fn make_transactions(dates: &[NaiveDate]) -> Vec<TransactionDay> {
    dates
        .iter()
        .enumerate()
        .map(|(i, &date)| TransactionDay {
            date,
            txn_volume: 100.0 + (i % 7) as f64 * 40.0,
            txn_shares: 10.0 + (i % 3) as f64,
        })
        .collect()
}

pub fn sample_settings(live_start: NaiveDate) -> ReportSettings {
    ReportSettings {
        live_start_date: live_start,
        title: "Momentum Book".to_string(),
        benchmark_name: "SPY".to_string(),
        benchmark2_name: "Bonds".to_string(),
        cone_std: Some(1.5),
        cone_horizon: 21,
        top_positions: 10,
        top_drawdowns: 5,
        rolling_beta_window: 20,
        rolling_sharpe_window: 40,
        rolling_factor_window: 40,
        output: PathBuf::from("tearsheet.html"),
    }
}

/// Write a return CSV with header `date,<name>`.
pub fn write_returns_csv(dir: &Path, file: &str, name: &str, series: &ReturnSeries) {
    let mut content = format!("date,{name}\n");
    for p in series.points() {
        content.push_str(&format!("{},{}\n", p.date, p.value));
    }
    fs::write(dir.join(file), content).unwrap();
}

pub fn write_positions_csv(dir: &Path, file: &str, positions: &PositionTable) {
    let mut content = format!("date,{}\n", positions.columns().join(","));
    for (date, row) in positions.dates().iter().zip(positions.rows()) {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        content.push_str(&format!("{date},{}\n", cells.join(",")));
    }
    fs::write(dir.join(file), content).unwrap();
}

pub fn write_transactions_csv(dir: &Path, file: &str, transactions: &[TransactionDay]) {
    let mut content = String::from("date,txn_volume,txn_shares\n");
    for t in transactions {
        content.push_str(&format!("{},{},{}\n", t.date, t.txn_volume, t.txn_shares));
    }
    fs::write(dir.join(file), content).unwrap();
}
