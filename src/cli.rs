//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_source_adapter::CsvSourceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_store::SqliteStore;
use crate::adapters::svg_chart::write_chart;
use crate::adapters::yahoo_adapter::YahooAdapter;
use crate::domain::analysis::{AnalysisKind, analyze};
use crate::domain::error::StockDataError;
use crate::domain::fetch_window::{MAX_DAYS, MIN_DAYS};
use crate::domain::pipeline::{ImportReport, Pipeline};
use crate::domain::price_point::PricePoint;
use crate::domain::settings::Settings;
use crate::domain::ticker::normalize_ticker;
use crate::ports::quote_port::QuotePort;
use crate::ports::store_port::PriceStore;

#[derive(Parser, Debug)]
#[command(name = "stockdata", about = "Download, store and chart daily stock history")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch recent history for a ticker and merge it into the store
    Import {
        #[arg(short, long)]
        ticker: String,
        #[arg(short, long)]
        days: u32,
        /// Replay saved <TICKER>.csv files from this directory instead of downloading
        #[arg(long)]
        source_dir: Option<PathBuf>,
    },
    /// Print stored rows as CSV
    Show {
        #[arg(short, long)]
        ticker: String,
        #[arg(short, long, default_value_t = 30)]
        limit: usize,
    },
    /// Import, then chart one of the analysis views
    Analyze {
        /// volume, open-close or overnight
        #[arg(short, long)]
        kind: AnalysisKind,
        #[arg(short, long)]
        ticker: String,
        #[arg(short, long)]
        days: u32,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        source_dir: Option<PathBuf>,
    },
    /// Show the stored date range for a ticker
    Info {
        #[arg(short, long)]
        ticker: String,
    },
    /// List stored tickers
    List,
    /// Interactive menu
    Menu {
        #[arg(long)]
        source_dir: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let settings = match load_settings(cli.config.as_ref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match cli.command {
        Command::Import {
            ticker,
            days,
            source_dir,
        } => run_import(&settings, &ticker, days, source_dir.as_ref()),
        Command::Show { ticker, limit } => run_show(&settings, &ticker, limit),
        Command::Analyze {
            kind,
            ticker,
            days,
            output,
            source_dir,
        } => run_analyze(
            &settings,
            kind,
            &ticker,
            days,
            output.as_deref(),
            source_dir.as_ref(),
        ),
        Command::Info { ticker } => run_info(&settings, &ticker),
        Command::List => run_list(&settings),
        Command::Menu { source_dir } => run_menu(&settings, source_dir.as_ref()),
    }
}

pub fn load_settings(path: Option<&PathBuf>) -> Result<Settings, StockDataError> {
    match path {
        Some(path) => {
            let adapter =
                FileConfigAdapter::from_file(path).map_err(|e| StockDataError::ConfigParse {
                    file: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            Settings::from_config(&adapter)
        }
        None => Settings::from_config(&FileConfigAdapter::empty()),
    }
}

/// The offline replay source when `source_dir` is given, the download endpoint otherwise.
pub fn quote_source(
    settings: &Settings,
    source_dir: Option<&PathBuf>,
) -> Result<Box<dyn QuotePort>, StockDataError> {
    match source_dir {
        Some(dir) => Ok(Box::new(CsvSourceAdapter::new(dir.clone()))),
        None => Ok(Box::new(YahooAdapter::from_settings(settings)?)),
    }
}

fn open_store(settings: &Settings) -> Result<SqliteStore, ExitCode> {
    SqliteStore::from_settings(settings).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

/// The result line of an import, plus the skipped row count when non-zero.
pub fn write_report<W: Write>(mut out: W, report: &ImportReport) -> io::Result<()> {
    writeln!(out, "Stock data imported successfully! {}: {}", report.ticker, report.merge)?;
    if report.dropped > 0 {
        writeln!(out, "  {} invalid rows skipped", report.dropped)?;
    }
    Ok(())
}

fn print_report(report: &ImportReport) {
    if let Err(e) = write_report(io::stdout().lock(), report) {
        eprintln!("error: {e}");
    }
}

fn run_import(settings: &Settings, ticker: &str, days: u32, source_dir: Option<&PathBuf>) -> ExitCode {
    let store = match open_store(settings) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let source = match quote_source(settings, source_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match Pipeline::new(source.as_ref(), &store).import_history(ticker, days) {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Write points as CSV with the store's column names.
pub fn write_points<W: Write>(out: W, points: &[PricePoint]) -> Result<(), StockDataError> {
    let to_io = |e: csv::Error| StockDataError::Io(io::Error::other(e));
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record(["Ticker", "Date", "Open", "High", "Low", "Close", "Volume"])
        .map_err(to_io)?;
    for p in points {
        wtr.write_record([
            p.ticker.clone(),
            p.date_string(),
            p.open.to_string(),
            p.high.to_string(),
            p.low.to_string(),
            p.close.to_string(),
            p.volume.to_string(),
        ])
        .map_err(to_io)?;
    }
    wtr.flush()?;
    Ok(())
}

fn run_show(settings: &Settings, ticker: &str, limit: usize) -> ExitCode {
    let ticker = match normalize_ticker(ticker) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let store = match open_store(settings) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let result = store
        .query(&ticker, limit)
        .and_then(|points| {
            if points.is_empty() {
                eprintln!("{ticker}: no data stored");
            }
            write_points(io::stdout().lock(), &points)
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Import `days` of `ticker`, build the `kind` view from the store and write
/// it as SVG. Returns the import report and the chart path.
pub fn run_analysis(
    pipeline: &Pipeline<'_>,
    kind: AnalysisKind,
    ticker: &str,
    days: u32,
    output: Option<&Path>,
    chart_dir: &Path,
) -> Result<(ImportReport, PathBuf), StockDataError> {
    let report = pipeline.import_history(ticker, days)?;
    let view = analyze(pipeline.store(), kind, &report.ticker, days as usize)?;

    let path = match output {
        Some(p) => p.to_path_buf(),
        None => chart_dir.join(format!("{}_{}.svg", report.ticker, kind.slug())),
    };
    write_chart(&view, &path)?;
    Ok((report, path))
}

fn run_analyze(
    settings: &Settings,
    kind: AnalysisKind,
    ticker: &str,
    days: u32,
    output: Option<&Path>,
    source_dir: Option<&PathBuf>,
) -> ExitCode {
    let store = match open_store(settings) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let source = match quote_source(settings, source_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let pipeline = Pipeline::new(source.as_ref(), &store);

    match run_analysis(&pipeline, kind, ticker, days, output, &settings.chart_dir) {
        Ok((report, path)) => {
            print_report(&report);
            println!("Chart written to: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_info(settings: &Settings, ticker: &str) -> ExitCode {
    let ticker = match normalize_ticker(ticker) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let store = match open_store(settings) {
        Ok(s) => s,
        Err(code) => return code,
    };

    match store.data_range(&ticker) {
        Ok(Some((first, last, count))) => {
            println!("{ticker}: {count} days, {first} to {last}");
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("{ticker}: no data found");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_list(settings: &Settings) -> ExitCode {
    let store = match open_store(settings) {
        Ok(s) => s,
        Err(code) => return code,
    };

    match store.tickers() {
        Ok(tickers) => {
            for t in &tickers {
                println!("{t}");
            }
            eprintln!("{} tickers stored", tickers.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

const MENU_PROMPT: &str = "Enter choice as an integer: ";
const TICKER_PROMPT: &str = "Enter a Yahoo Finance stock ticker (no $ symbol): ";

/// Prompt and read one line. `None` at end of input.
pub fn read_line<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> io::Result<Option<String>> {
    write!(output, "{prompt}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Prompt until an integer is entered.
pub fn read_integer<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> io::Result<Option<i64>> {
    loop {
        let Some(line) = read_line(input, output, prompt)? else {
            return Ok(None);
        };
        match line.parse::<i64>() {
            Ok(n) => return Ok(Some(n)),
            Err(_) => writeln!(output, "Invalid integer!")?,
        }
    }
}

pub fn read_menu_choice<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> io::Result<Option<AnalysisKind>> {
    writeln!(output, "Analysis options:")?;
    for (i, kind) in AnalysisKind::ALL.iter().enumerate() {
        writeln!(output, "{}) {}", i + 1, kind.menu_label())?;
    }
    loop {
        let Some(n) = read_integer(input, output, MENU_PROMPT)? else {
            return Ok(None);
        };
        match AnalysisKind::from_menu(n) {
            Some(kind) => return Ok(Some(kind)),
            None => writeln!(output, "Error: Invalid selection")?,
        }
    }
}

pub fn read_days<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<Option<u32>> {
    let prompt =
        format!("Please enter the number of days to analyze as an integer({MIN_DAYS}-{MAX_DAYS}): ");
    loop {
        let Some(n) = read_integer(input, output, &prompt)? else {
            return Ok(None);
        };
        match u32::try_from(n) {
            Ok(days) if (MIN_DAYS..=MAX_DAYS).contains(&days) => return Ok(Some(days)),
            _ => writeln!(output, "Error: Invalid number of days")?,
        }
    }
}

/// The interactive loop: choose a view, a ticker and a window, import and chart.
/// Errors are printed and the loop continues; it returns at end of input.
pub fn menu_loop<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    pipeline: &Pipeline<'_>,
    chart_dir: &Path,
) -> io::Result<()> {
    loop {
        let Some(kind) = read_menu_choice(input, output)? else {
            return Ok(());
        };
        let Some(ticker) = read_line(input, output, TICKER_PROMPT)? else {
            return Ok(());
        };
        let Some(days) = read_days(input, output)? else {
            return Ok(());
        };

        match run_analysis(pipeline, kind, &ticker, days, None, chart_dir) {
            Ok((report, path)) => {
                writeln!(
                    output,
                    "Stock data imported successfully! ({})",
                    report.merge
                )?;
                writeln!(output, "Chart written to: {}", path.display())?;
            }
            Err(e) => writeln!(output, "Error [{}]: {}", e.kind(), e)?,
        }
    }
}

fn run_menu(settings: &Settings, source_dir: Option<&PathBuf>) -> ExitCode {
    let store = match open_store(settings) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let source = match quote_source(settings, source_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let pipeline = Pipeline::new(source.as_ref(), &store);

    let stdin = io::stdin();
    let stdout = io::stdout();
    match menu_loop(&mut stdin.lock(), &mut stdout.lock(), &pipeline, &settings.chart_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let err = StockDataError::from(e);
            eprintln!("error: {err}");
            (&err).into()
        }
    }
}
