//! Tabular blocks of the tear sheet.

use crate::domain::aggregation::MonthlyReturnRow;
use crate::domain::drawdown::DrawdownEpisode;
use crate::domain::perf::PerfTable;
use crate::domain::positions::RankedPosition;
use crate::domain::report::{Cell, Table};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Rows shown as percentages in the performance table.
const PERCENT_ROWS: [&str; 4] = [
    "annual_return",
    "cumulative_returns",
    "annual_volatility",
    "max_drawdown",
];

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn stat(label: &str, value: Option<f64>) -> String {
    match value {
        Some(v) if PERCENT_ROWS.contains(&label) => percent(v),
        Some(v) => format!("{v:.2}"),
        None => String::new(),
    }
}

pub fn perf_table(table: &PerfTable) -> Table {
    let backtest = table.backtest.is_some();
    let live = table.out_of_sample.is_some();
    let mut headers = vec![String::new()];
    if backtest {
        headers.push("Backtest".to_string());
    }
    if live {
        headers.push("Out_of_Sample".to_string());
    }
    headers.push("All_History".to_string());

    let rows = table
        .rows()
        .into_iter()
        .map(|row| {
            let mut cells = vec![Cell::text(row.label)];
            if backtest {
                cells.push(Cell::text(stat(row.label, row.backtest)));
            }
            if live {
                cells.push(Cell::text(stat(row.label, row.out_of_sample)));
            }
            cells.push(Cell::text(stat(row.label, row.all_history)));
            cells
        })
        .collect();

    Table {
        caption: Some(format!(
            "Out-of-Sample Months: {}, Backtest Months: {}",
            table.out_of_sample_months(),
            table.backtest_months()
        )),
        headers,
        rows,
    }
}

/// Green for gains, red for losses, deeper with magnitude.
fn heat_color(value: f64, scale: f64) -> String {
    let t = if scale > 0.0 {
        (value.abs() / scale).min(1.0)
    } else {
        0.0
    };
    let fade = |full: f64| (255.0 - (255.0 - full) * t).round() as u8;
    if value >= 0.0 {
        format!("#{:02x}{:02x}{:02x}", fade(26.0), fade(152.0), fade(80.0))
    } else {
        format!("#{:02x}{:02x}{:02x}", fade(215.0), fade(48.0), fade(39.0))
    }
}

/// Year by month grid of compounded monthly returns, in percent.
pub fn monthly_heatmap(rows: &[MonthlyReturnRow]) -> Table {
    let scale = rows
        .iter()
        .flat_map(|r| r.months.iter().flatten())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));

    let mut headers = vec!["Year".to_string()];
    headers.extend(MONTH_NAMES.iter().map(|m| m.to_string()));
    Table {
        caption: Some("Monthly returns (%)".to_string()),
        headers,
        rows: rows
            .iter()
            .map(|row| {
                let mut cells = vec![Cell::text(row.year.to_string())];
                cells.extend(row.months.iter().map(|m| match m {
                    Some(v) => Cell::shaded(format!("{:.1}", v * 100.0), heat_color(*v, scale)),
                    None => Cell::text(""),
                }));
                cells
            })
            .collect(),
    }
}

pub fn drawdown_table(episodes: &[DrawdownEpisode]) -> Table {
    Table {
        caption: Some("Worst drawdown periods".to_string()),
        headers: ["Net drawdown in %", "Peak date", "Valley date", "Recovery date"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        rows: episodes
            .iter()
            .map(|e| {
                vec![
                    Cell::text(format!("{:.2}", e.depth * 100.0)),
                    Cell::text(e.peak_date.to_string()),
                    Cell::text(e.valley_date.to_string()),
                    Cell::text(
                        e.recovery_date
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "ongoing".to_string()),
                    ),
                ]
            })
            .collect(),
    }
}

pub fn ranking_table(caption: &str, value_header: &str, ranked: &[RankedPosition]) -> Table {
    Table {
        caption: Some(caption.to_string()),
        headers: vec!["Symbol".to_string(), value_header.to_string()],
        rows: ranked
            .iter()
            .map(|p| vec![Cell::text(p.symbol.clone()), Cell::text(percent(p.weight))])
            .collect(),
    }
}

/// Two-column label/value table.
pub fn key_value_table(caption: &str, rows: &[(&str, String)]) -> Table {
    Table {
        caption: Some(caption.to_string()),
        headers: Vec::new(),
        rows: rows
            .iter()
            .map(|(k, v)| vec![Cell::text(*k), Cell::text(v.clone())])
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::perf::PerfStats;
    use chrono::NaiveDate;

    fn stats(sharpe: f64) -> PerfStats {
        PerfStats {
            annual_return: 0.12,
            cumulative_return: 0.5,
            annual_volatility: 0.2,
            sharpe_ratio: sharpe,
            sortino_ratio: 1.5,
            calmar_ratio: 0.8,
            max_drawdown: -0.15,
            alpha: None,
            beta: Some(0.9),
        }
    }

    #[test]
    fn perf_table_drops_live_column_for_pure_backtest() {
        let table = perf_table(&PerfTable {
            backtest: Some(stats(1.0)),
            out_of_sample: None,
            all_history: stats(1.0),
            backtest_days: 252,
            out_of_sample_days: 0,
        });
        assert_eq!(table.headers, vec!["", "Backtest", "All_History"]);
        assert_eq!(table.rows[0][1].text, "12.0%");
        assert_eq!(table.rows[3][1].text, "1.00");
        assert_eq!(table.rows[7][1].text, "");
        assert_eq!(
            table.caption.as_deref(),
            Some("Out-of-Sample Months: 0, Backtest Months: 12")
        );
    }

    #[test]
    fn perf_table_drops_backtest_column_when_all_live() {
        let table = perf_table(&PerfTable {
            backtest: None,
            out_of_sample: Some(stats(2.0)),
            all_history: stats(2.0),
            backtest_days: 0,
            out_of_sample_days: 63,
        });
        assert_eq!(table.headers, vec!["", "Out_of_Sample", "All_History"]);
        assert_eq!(table.rows[3][1].text, "2.00");
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(
            table.caption.as_deref(),
            Some("Out-of-Sample Months: 3, Backtest Months: 0")
        );
    }

    #[test]
    fn heatmap_shades_by_sign() {
        let mut months = [None; 12];
        months[0] = Some(0.05);
        months[1] = Some(-0.05);
        let table = monthly_heatmap(&[MonthlyReturnRow { year: 2020, months }]);
        assert_eq!(table.headers.len(), 13);
        let row = &table.rows[0];
        assert_eq!(row[1].text, "5.0");
        assert_eq!(row[1].background.as_deref(), Some("#1a9850"));
        assert_eq!(row[2].background.as_deref(), Some("#d73027"));
        assert_eq!(row[3].background, None);
    }

    #[test]
    fn drawdown_table_marks_open_episodes() {
        let d = |m| NaiveDate::from_ymd_opt(2020, m, 1).unwrap();
        let table = drawdown_table(&[DrawdownEpisode {
            peak_date: d(1),
            valley_date: d(3),
            recovery_date: None,
            depth: 0.2,
        }]);
        assert_eq!(table.rows[0][0].text, "20.00");
        assert_eq!(table.rows[0][3].text, "ongoing");
    }
}
