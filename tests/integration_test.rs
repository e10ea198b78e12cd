mod common;

use common::*;
use std::path::{Path, PathBuf};
use tearsheet::adapters::svg_report::{
    CONSISTENCY, CUMULATIVE_RETURNS, DRAWDOWN_PERIODS, FACTOR_EXPOSURE, PERFORMANCE, POSITIONS,
    RETURN_RANGE, TRANSACTIONS, UNDERWATER,
};
use tearsheet::cli::run_report_pipeline;
use tearsheet::domain::config_validation::DataFiles;
use tearsheet::domain::error::TearsheetError;
use tearsheet::domain::factors::FactorSet;
use tearsheet::domain::report::{Block, TearsheetDocument};

fn files() -> DataFiles {
    DataFiles {
        returns: PathBuf::from("returns.csv"),
        benchmark: PathBuf::from("spy.csv"),
        benchmark2: None,
        factors: None,
        positions: None,
        transactions: None,
    }
}

fn with_positions(mut files: DataFiles) -> DataFiles {
    files.positions = Some(PathBuf::from("positions.csv"));
    files.transactions = Some(PathBuf::from("transactions.csv"));
    files
}

fn texts(doc: &TearsheetDocument, title: &str) -> Vec<String> {
    doc.section(title)
        .map(|s| {
            s.blocks
                .iter()
                .filter_map(|b| match b {
                    Block::Text(t) | Block::Note(t) => Some(t.clone()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// 300 weekdays from 2020-01-01; live trading starts after 200 of them.
fn base_mock() -> (MockDataPort, Vec<chrono::NaiveDate>) {
    let dates = weekdays(date(2020, 1, 1), 300);
    let mock = MockDataPort::new()
        .with_returns("returns.csv", make_returns(&dates, 0.01, 0.0).with_name("strategy"))
        .with_returns("spy.csv", make_returns(&dates, 0.008, 0.4).with_name("SPY"));
    (mock, dates)
}

mod pipeline {
    use super::*;

    #[test]
    fn renders_every_core_section() {
        let (mock, dates) = base_mock();
        let report = MockReportPort::new();
        let settings = sample_settings(dates[200]);

        let doc = run_report_pipeline(&mock, &report, &files(), &settings, Path::new("out.html"))
            .unwrap();

        for title in [
            PERFORMANCE,
            CONSISTENCY,
            CUMULATIVE_RETURNS,
            DRAWDOWN_PERIODS,
            UNDERWATER,
            RETURN_RANGE,
        ] {
            assert!(doc.section(title).is_some(), "missing section {title}");
        }
        assert!(doc.section(POSITIONS).is_none());
        assert!(doc.section(FACTOR_EXPOSURE).is_none());
        assert_eq!(doc.title, "Momentum Book");

        let written = report.document();
        assert_eq!(written, doc);
        let path = report.written.borrow().as_ref().map(|(_, p)| p.clone());
        assert_eq!(path, Some(PathBuf::from("out.html")));
    }

    #[test]
    fn consistency_line_reports_whole_percent() {
        let (mock, dates) = base_mock();
        let report = MockReportPort::new();
        let doc = run_report_pipeline(
            &mock,
            &report,
            &files(),
            &sample_settings(dates[200]),
            Path::new("out.html"),
        )
        .unwrap();

        let lines = texts(&doc, CONSISTENCY);
        assert_eq!(lines.len(), 1);
        let (score, rest) = lines[0].split_once('%').unwrap();
        let score: f64 = score.parse().unwrap();
        assert!((0.0..=100.0).contains(&score));
        assert_eq!(score.fract(), 0.0);
        assert!(rest.starts_with(" :Similarity between Backtest vs. Out-of-Sample"));
    }

    #[test]
    fn pure_backtest_skips_consistency() {
        let (mock, dates) = base_mock();
        let report = MockReportPort::new();
        let live_start = *dates.last().unwrap() + chrono::Duration::days(30);

        let doc = run_report_pipeline(
            &mock,
            &report,
            &files(),
            &sample_settings(live_start),
            Path::new("out.html"),
        )
        .unwrap();

        assert!(doc.is_skipped(CONSISTENCY));
        let perf = doc.section(PERFORMANCE).unwrap();
        let table = perf.tables().next().unwrap();
        assert!(!table.headers.iter().any(|h| h == "Out_of_Sample"));
    }

    #[test]
    fn all_live_history_keeps_core_sections() {
        let (mock, dates) = base_mock();
        let doc = run_report_pipeline(
            &mock,
            &MockReportPort::new(),
            &files(),
            &sample_settings(dates[0]),
            Path::new("out.html"),
        )
        .unwrap();

        let table = doc.section(PERFORMANCE).unwrap().tables().next().unwrap();
        assert_eq!(table.headers, vec!["", "Out_of_Sample", "All_History"]);
        assert_eq!(
            table.caption.as_deref(),
            Some("Out-of-Sample Months: 14, Backtest Months: 0")
        );

        assert!(doc.section(CUMULATIVE_RETURNS).is_some());
        let notes = texts(&doc, CUMULATIVE_RETURNS);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].starts_with("Cone omitted:"));
        assert!(doc.is_skipped(CONSISTENCY));
    }

    #[test]
    fn cumulative_returns_has_one_figure() {
        let (mock, dates) = base_mock();
        let report = MockReportPort::new();
        let doc = run_report_pipeline(
            &mock,
            &report,
            &files(),
            &sample_settings(dates[200]),
            Path::new("out.html"),
        )
        .unwrap();

        let section = doc.section(CUMULATIVE_RETURNS).unwrap();
        let figures: Vec<_> = section
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Figure(svg) => Some(svg),
                _ => None,
            })
            .collect();
        assert_eq!(figures.len(), 1);
        assert!(figures[0].starts_with("<svg"));
        assert!(figures[0].contains("SPY"));
    }

    #[test]
    fn factor_section_when_factors_given() {
        let (mock, dates) = base_mock();
        let factors = FactorSet::new(vec![
            make_returns(&dates, 0.004, 1.1).with_name("SMB"),
            make_returns(&dates, 0.003, 2.3).with_name("HML"),
        ])
        .unwrap();
        let mock = mock.with_factors(factors);
        let mut files = files();
        files.factors = Some(PathBuf::from("factors.csv"));

        let doc = run_report_pipeline(
            &mock,
            &MockReportPort::new(),
            &files,
            &sample_settings(dates[200]),
            Path::new("out.html"),
        )
        .unwrap();

        assert!(doc.section(FACTOR_EXPOSURE).is_some());
    }
}

mod positions {
    use super::*;

    #[test]
    fn positions_and_transactions_sections() {
        let (mock, dates) = base_mock();
        let mock = mock
            .with_positions(make_positions(&dates, false))
            .with_transactions(make_transactions(&dates));

        let doc = run_report_pipeline(
            &mock,
            &MockReportPort::new(),
            &with_positions(files()),
            &sample_settings(dates[200]),
            Path::new("out.html"),
        )
        .unwrap();

        let section = doc.section(POSITIONS).unwrap();
        let captions: Vec<_> = section
            .tables()
            .filter_map(|t| t.caption.clone())
            .collect();
        assert!(captions.iter().any(|c| c == "All positions ever held"));
        assert!(doc.section(TRANSACTIONS).is_some());
        assert!(texts(&doc, POSITIONS).is_empty());
    }

    #[test]
    fn negative_cash_is_noted() {
        let (mock, dates) = base_mock();
        let mock = mock
            .with_positions(make_positions(&dates, true))
            .with_transactions(make_transactions(&dates));

        let doc = run_report_pipeline(
            &mock,
            &MockReportPort::new(),
            &with_positions(files()),
            &sample_settings(dates[200]),
            Path::new("out.html"),
        )
        .unwrap();

        let notes = texts(&doc, POSITIONS);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("Cash weight is negative on 60 date(s)"));
        assert!(notes[0].contains(&dates[0].to_string()));
    }

    #[test]
    fn transactions_without_positions_skipped() {
        let (mock, dates) = base_mock();
        let mock = mock.with_transactions(make_transactions(&dates));
        let mut files = files();
        files.transactions = Some(PathBuf::from("transactions.csv"));

        let doc = run_report_pipeline(
            &mock,
            &MockReportPort::new(),
            &files,
            &sample_settings(dates[200]),
            Path::new("out.html"),
        )
        .unwrap();

        assert!(doc.is_skipped(TRANSACTIONS));
        assert!(doc.section(POSITIONS).is_none());
    }
}

mod errors {
    use super::*;

    #[test]
    fn data_error_stops_pipeline() {
        let (mock, dates) = base_mock();
        let mock = mock.with_error("spy.csv", "file not found");
        let report = MockReportPort::new();

        let err = run_report_pipeline(
            &mock,
            &report,
            &files(),
            &sample_settings(dates[200]),
            Path::new("out.html"),
        )
        .unwrap_err();

        match err {
            TearsheetError::DataLoad { file, reason } => {
                assert_eq!(file, "spy.csv");
                assert_eq!(reason, "file not found");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(report.written.borrow().is_none());
    }

    #[test]
    fn missing_optional_fixture_is_reported() {
        let (mock, dates) = base_mock();
        let err = run_report_pipeline(
            &mock,
            &MockReportPort::new(),
            &with_positions(files()),
            &sample_settings(dates[200]),
            Path::new("out.html"),
        )
        .unwrap_err();

        assert!(matches!(err, TearsheetError::DataLoad { .. }));
    }
}
