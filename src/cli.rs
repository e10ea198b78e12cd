//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::analytics::BuiltinAnalytics;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::html_report_adapter::HtmlReportAdapter;
use crate::adapters::svg_report::TearsheetRenderer;
use crate::domain::config_validation::{
    load_data_files, load_report_settings, parse_live_start, validate_config, DataFiles,
    ReportSettings,
};
use crate::domain::error::TearsheetError;
use crate::domain::report::{Block, Table, TearsheetDocument, TearsheetInputs};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "tearsheet", about = "Strategy performance tear sheet generator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render the full HTML tear sheet
    Report {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the live start date (YYYY-MM-DD)
        #[arg(long)]
        live_start: Option<String>,
    },
    /// Print the summary tables
    Stats {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        live_start: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Report {
            config,
            output,
            live_start,
        } => run_report(&config, output.as_deref(), live_start.as_deref()),
        Command::Stats { config, live_start } => run_stats(&config, live_start.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: &TearsheetError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| fail(&err))
}

/// Directory that relative paths in a config file are resolved against.
fn config_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Validate the configuration and read its data file paths and report
/// settings, applying a live-start override.
pub fn build_settings(
    config: &FileConfigAdapter,
    live_start: Option<&str>,
) -> Result<(DataFiles, ReportSettings), TearsheetError> {
    validate_config(config)?;
    let files = load_data_files(config)?;
    let mut settings = load_report_settings(config)?;
    if let Some(date) = live_start {
        settings = settings.with_live_start(parse_live_start(date)?);
    }
    Ok((files, settings))
}

/// Load every configured input through `data`.
pub fn load_inputs(
    data: &dyn DataPort,
    files: &DataFiles,
) -> Result<TearsheetInputs, TearsheetError> {
    info!(returns = %files.returns.display(), "loading inputs");
    let inputs = TearsheetInputs {
        returns: data.load_returns(&files.returns)?,
        benchmark: data.load_returns(&files.benchmark)?,
        benchmark2: files
            .benchmark2
            .as_deref()
            .map(|p| data.load_returns(p))
            .transpose()?,
        factors: files
            .factors
            .as_deref()
            .map(|p| data.load_factors(p))
            .transpose()?,
        positions: files
            .positions
            .as_deref()
            .map(|p| data.load_positions(p))
            .transpose()?,
        transactions: files
            .transactions
            .as_deref()
            .map(|p| data.load_transactions(p))
            .transpose()?,
    };
    info!(
        returns = inputs.returns.len(),
        benchmark = inputs.benchmark.len(),
        factors = inputs.factors.is_some(),
        positions = inputs.positions.is_some(),
        transactions = inputs.transactions.is_some(),
        "inputs loaded"
    );
    Ok(inputs)
}

/// Load, render and write a tear sheet through the given ports.
pub fn run_report_pipeline(
    data: &dyn DataPort,
    report: &dyn ReportPort,
    files: &DataFiles,
    settings: &ReportSettings,
    output: &Path,
) -> Result<TearsheetDocument, TearsheetError> {
    let inputs = load_inputs(data, files)?;
    let analytics = BuiltinAnalytics::new();
    let document = TearsheetRenderer::new(&analytics, settings).render(&inputs);
    report.write(&document, output)?;
    Ok(document)
}

fn run_report(config_path: &Path, output: Option<&Path>, live_start: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let (files, settings) = match build_settings(&adapter, live_start) {
        Ok(v) => v,
        Err(e) => return fail(&e),
    };

    let base = config_dir(config_path);
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| base.join(&settings.output));
    let data = CsvAdapter::new(base);

    match run_report_pipeline(&data, &HtmlReportAdapter::new(), &files, &settings, &output) {
        Ok(document) => {
            if !document.skipped.is_empty() {
                eprintln!("{} section(s) skipped", document.skipped.len());
            }
            eprintln!("\nReport written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_stats(config_path: &Path, live_start: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let result = build_settings(&adapter, live_start).and_then(|(files, settings)| {
        let data = CsvAdapter::new(config_dir(config_path));
        let inputs = load_inputs(&data, &files)?;
        let analytics = BuiltinAnalytics::new();
        Ok(TearsheetRenderer::new(&analytics, &settings).render_stats(&inputs))
    });
    match result {
        Ok(document) => {
            print!("{}", format_document(&document));
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let (files, settings) = match build_settings(&adapter, None) {
        Ok(v) => v,
        Err(e) => return fail(&e),
    };

    eprintln!("\nData files:");
    eprintln!("  returns:      {}", files.returns.display());
    eprintln!("  benchmark:    {}", files.benchmark.display());
    for (label, path) in [
        ("benchmark2", &files.benchmark2),
        ("factors", &files.factors),
        ("positions", &files.positions),
        ("transactions", &files.transactions),
    ] {
        if let Some(path) = path {
            eprintln!("  {:<13} {}", format!("{label}:"), path.display());
        }
    }
    eprintln!("\nReport:");
    eprintln!("  title:        {}", settings.title);
    eprintln!("  live start:   {}", settings.live_start_date);
    match settings.cone_std {
        Some(std) => eprintln!("  cone:         {std} std, {} days ahead", settings.cone_horizon),
        None => eprintln!("  cone:         off"),
    }
    eprintln!("  output:       {}", settings.output.display());
    eprintln!("\nConfig validated successfully");
    ExitCode::SUCCESS
}

/// Plain-text rendering of the tables and text lines of a document.
pub fn format_document(document: &TearsheetDocument) -> String {
    let mut out = format!("{}\n{}\n", document.title, document.subtitle);
    for section in &document.sections {
        out.push_str(&format!("\n=== {} ===\n", section.title));
        for block in &section.blocks {
            match block {
                Block::Table(table) => out.push_str(&format_table(table)),
                Block::Text(text) => out.push_str(&format!("{text}\n")),
                Block::Note(text) => out.push_str(&format!("note: {text}\n")),
                Block::Figure(_) => {}
            }
        }
    }
    for skipped in &document.skipped {
        out.push_str(&format!("\nskipped {}: {}\n", skipped.title, skipped.reason));
    }
    out
}

fn format_table(table: &Table) -> String {
    let rows: Vec<Vec<&str>> = std::iter::once(table.headers.iter().map(String::as_str).collect())
        .filter(|h: &Vec<&str>| !h.is_empty())
        .chain(
            table
                .rows
                .iter()
                .map(|r| r.iter().map(|c| c.text.as_str()).collect()),
        )
        .collect();
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    if let Some(caption) = &table.caption {
        out.push_str(&format!("{caption}\n"));
    }
    for row in rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{cell:<width$}", width = widths[i]))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}
