//! Configuration validation.
//!
//! Validates every `[data]` and `[report]` field before any input file is
//! loaded, and resolves the validated values into [`ReportSettings`].

use std::path::PathBuf;

use crate::domain::error::TearsheetError;
use crate::domain::positions::{parse_top_n, DEFAULT_TOP_POSITIONS};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_TITLE: &str = "Strategy Tear Sheet";
pub const DEFAULT_BENCHMARK_NAME: &str = "Benchmark";
pub const DEFAULT_BENCHMARK2_NAME: &str = "Benchmark 2";
pub const DEFAULT_CONE_HORIZON: usize = 63;
pub const DEFAULT_TOP_DRAWDOWNS: usize = 10;
pub const DEFAULT_ROLLING_BETA_WINDOW: usize = 63;
pub const DEFAULT_ROLLING_SHARPE_WINDOW: usize = 126;
pub const DEFAULT_ROLLING_FACTOR_WINDOW: usize = 126;
pub const DEFAULT_OUTPUT: &str = "tearsheet.html";

/// Input file locations from the `[data]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFiles {
    pub returns: PathBuf,
    pub benchmark: PathBuf,
    pub benchmark2: Option<PathBuf>,
    pub factors: Option<PathBuf>,
    pub positions: Option<PathBuf>,
    pub transactions: Option<PathBuf>,
}

/// Resolved `[report]` settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub live_start_date: NaiveDate,
    pub title: String,
    pub benchmark_name: String,
    pub benchmark2_name: String,
    pub cone_std: Option<f64>,
    pub cone_horizon: usize,
    pub top_positions: usize,
    pub top_drawdowns: usize,
    pub rolling_beta_window: usize,
    pub rolling_sharpe_window: usize,
    pub rolling_factor_window: usize,
    pub output: PathBuf,
}

impl ReportSettings {
    pub fn with_live_start(mut self, date: NaiveDate) -> Self {
        self.live_start_date = date;
        self
    }
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TearsheetError> {
    load_data_files(config)?;
    load_report_settings(config)?;
    Ok(())
}

pub fn load_data_files(config: &dyn ConfigPort) -> Result<DataFiles, TearsheetError> {
    Ok(DataFiles {
        returns: required_path(config, "returns")?,
        benchmark: required_path(config, "benchmark")?,
        benchmark2: optional_path(config, "benchmark2"),
        factors: optional_path(config, "factors"),
        positions: optional_path(config, "positions"),
        transactions: optional_path(config, "transactions"),
    })
}

pub fn load_report_settings(config: &dyn ConfigPort) -> Result<ReportSettings, TearsheetError> {
    let live_start_date = parse_date(config.get_string("report", "live_start_date").as_deref())?;

    let cone_std = optional_number::<f64>(config, "cone_std")?;
    if let Some(std) = cone_std {
        if !(std.is_finite() && std > 0.0) {
            return Err(invalid("cone_std", "cone_std must be positive"));
        }
    }

    Ok(ReportSettings {
        live_start_date,
        title: string_or(config, "title", DEFAULT_TITLE),
        benchmark_name: string_or(config, "benchmark_name", DEFAULT_BENCHMARK_NAME),
        benchmark2_name: string_or(config, "benchmark2_name", DEFAULT_BENCHMARK2_NAME),
        cone_std,
        cone_horizon: count(config, "cone_horizon", DEFAULT_CONE_HORIZON, 0)?,
        top_positions: top_n(config, "top_positions", DEFAULT_TOP_POSITIONS)?,
        top_drawdowns: top_n(config, "top_drawdowns", DEFAULT_TOP_DRAWDOWNS)?,
        rolling_beta_window: count(config, "rolling_beta_window", DEFAULT_ROLLING_BETA_WINDOW, 2)?,
        rolling_sharpe_window: count(
            config,
            "rolling_sharpe_window",
            DEFAULT_ROLLING_SHARPE_WINDOW,
            2,
        )?,
        rolling_factor_window: count(
            config,
            "rolling_factor_window",
            DEFAULT_ROLLING_FACTOR_WINDOW,
            2,
        )?,
        output: PathBuf::from(string_or(config, "output", DEFAULT_OUTPUT)),
    })
}

pub fn parse_live_start(value: &str) -> Result<NaiveDate, TearsheetError> {
    parse_date(Some(value))
}

fn parse_date(value: Option<&str>) -> Result<NaiveDate, TearsheetError> {
    match value.map(str::trim) {
        None | Some("") => Err(TearsheetError::ConfigMissing {
            section: "report".to_string(),
            key: "live_start_date".to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
            invalid(
                "live_start_date",
                "invalid live_start_date format, expected YYYY-MM-DD",
            )
        }),
    }
}

fn required_path(config: &dyn ConfigPort, key: &str) -> Result<PathBuf, TearsheetError> {
    optional_path(config, key).ok_or_else(|| TearsheetError::ConfigMissing {
        section: "data".to_string(),
        key: key.to_string(),
    })
}

fn optional_path(config: &dyn ConfigPort, key: &str) -> Option<PathBuf> {
    config
        .get_string("data", key)
        .filter(|s| !s.trim().is_empty())
        .map(|s| PathBuf::from(s.trim()))
}

fn string_or(config: &dyn ConfigPort, key: &str, default: &str) -> String {
    config
        .get_string("report", key)
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| default.to_string())
}

fn optional_number<T: std::str::FromStr>(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<T>, TearsheetError> {
    match config.get_string("report", key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(key, &format!("{key} must be a number"))),
    }
}

fn count(
    config: &dyn ConfigPort,
    key: &str,
    default: usize,
    minimum: i64,
) -> Result<usize, TearsheetError> {
    let value = optional_number::<i64>(config, key)?.unwrap_or(default as i64);
    if value < minimum {
        return Err(invalid(key, &format!("{key} must be at least {minimum}")));
    }
    Ok(value as usize)
}

fn top_n(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, TearsheetError> {
    let value = optional_number::<i64>(config, key)?.unwrap_or(default as i64);
    let n = parse_top_n(value)?;
    if n == 0 {
        return Err(invalid(key, &format!("{key} must be at least 1")));
    }
    Ok(n)
}

fn invalid(key: &str, reason: &str) -> TearsheetError {
    TearsheetError::ConfigInvalid {
        section: "report".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const MINIMAL: &str = "[data]\nreturns = r.csv\nbenchmark = spy.csv\n\n\
                           [report]\nlive_start_date = 2020-06-01\n";

    #[test]
    fn minimal_config_uses_defaults() {
        let config = make_config(MINIMAL);
        assert!(validate_config(&config).is_ok());
        let settings = load_report_settings(&config).unwrap();
        assert_eq!(
            settings.live_start_date,
            NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()
        );
        assert_eq!(settings.title, DEFAULT_TITLE);
        assert_eq!(settings.cone_std, None);
        assert_eq!(settings.top_positions, 10);
        assert_eq!(settings.rolling_beta_window, 63);
        assert_eq!(settings.output, PathBuf::from("tearsheet.html"));
    }

    #[test]
    fn full_config_is_resolved() {
        let config = make_config(
            r#"
[data]
returns = strategy.csv
benchmark = spy.csv
benchmark2 = bonds.csv
factors = factors.csv
positions = positions.csv
transactions = txns.csv

[report]
live_start_date = 2021-01-04
title = Momentum
benchmark_name = S&P500
cone_std = 1.5
cone_horizon = 21
top_positions = 5
top_drawdowns = 3
rolling_beta_window = 21
rolling_sharpe_window = 42
rolling_factor_window = 63
output = out/report.html
"#,
        );
        let files = load_data_files(&config).unwrap();
        assert_eq!(files.factors, Some(PathBuf::from("factors.csv")));
        assert_eq!(files.transactions, Some(PathBuf::from("txns.csv")));
        let settings = load_report_settings(&config).unwrap();
        assert_eq!(settings.title, "Momentum");
        assert_eq!(settings.benchmark_name, "S&P500");
        assert_eq!(settings.benchmark2_name, DEFAULT_BENCHMARK2_NAME);
        assert_eq!(settings.cone_std, Some(1.5));
        assert_eq!(settings.cone_horizon, 21);
        assert_eq!(settings.top_drawdowns, 3);
        assert_eq!(settings.rolling_factor_window, 63);
    }

    #[test]
    fn missing_returns_fails() {
        let config =
            make_config("[data]\nbenchmark = spy.csv\n[report]\nlive_start_date = 2020-06-01\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, TearsheetError::ConfigMissing { key, .. } if key == "returns"));
    }

    #[test]
    fn missing_benchmark_fails() {
        let config =
            make_config("[data]\nreturns = r.csv\n[report]\nlive_start_date = 2020-06-01\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, TearsheetError::ConfigMissing { key, .. } if key == "benchmark"));
    }

    #[test]
    fn missing_live_start_fails() {
        let config = make_config("[data]\nreturns = r.csv\nbenchmark = spy.csv\n");
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, TearsheetError::ConfigMissing { key, .. } if key == "live_start_date")
        );
    }

    #[test]
    fn invalid_live_start_format_fails() {
        let config = make_config(&MINIMAL.replace("2020-06-01", "2020/06/01"));
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, TearsheetError::ConfigInvalid { key, .. } if key == "live_start_date")
        );
    }

    #[test]
    fn cone_std_must_be_positive() {
        for bad in ["0", "-1.0", "abc"] {
            let config = make_config(&format!("{MINIMAL}cone_std = {bad}\n"));
            let err = validate_config(&config).unwrap_err();
            assert!(matches!(err, TearsheetError::ConfigInvalid { key, .. } if key == "cone_std"));
        }
    }

    #[test]
    fn window_below_two_fails() {
        let config = make_config(&format!("{MINIMAL}rolling_sharpe_window = 1\n"));
        let err = validate_config(&config).unwrap_err();
        match err {
            TearsheetError::ConfigInvalid { key, .. } => assert_eq!(key, "rolling_sharpe_window"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn negative_top_positions_is_invalid_input() {
        let config = make_config(&format!("{MINIMAL}top_positions = -3\n"));
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, TearsheetError::InvalidInput { .. }));
    }

    #[test]
    fn zero_top_drawdowns_fails() {
        let config = make_config(&format!("{MINIMAL}top_drawdowns = 0\n"));
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, TearsheetError::ConfigInvalid { key, .. } if key == "top_drawdowns")
        );
    }

    #[test]
    fn live_start_override() {
        let settings = load_report_settings(&make_config(MINIMAL)).unwrap();
        let date = parse_live_start("2021-03-01").unwrap();
        assert_eq!(settings.with_live_start(date).live_start_date, date);
        assert!(parse_live_start("March").is_err());
    }
}
