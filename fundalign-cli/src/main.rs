//! fundalign CLI: align quarterly fundamentals with daily prices.
//!
//! Commands:
//! - `run`: align, normalize, and write both CSV artifacts
//! - `inspect`: list the document's sections with row and column counts
//! - `preview`: align in memory and print the head of the result

mod preview;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use fundalign_core::align::{RecoveryGranularity, UnmappedPeriodPolicy};
use fundalign_runner::{
    align_document, read_document, records_to_table, run_pipeline, section, DisplayOptions,
    LoadError, PipelineConfig,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fundalign",
    version,
    about = "Align quarterly fundamentals with daily price and indicator history"
)]
struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence when set).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Align, normalize, and write the aligned and normalized CSVs.
    Run {
        #[command(flatten)]
        common: CommonArgs,

        /// Directory for the CSV artifacts.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the run summary as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List every configured section with its row and column counts.
    Inspect {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Align in memory and print the first rows of the result.
    Preview {
        #[command(flatten)]
        common: CommonArgs,

        /// Rows to print.
        #[arg(long)]
        rows: Option<usize>,

        /// Columns to print.
        #[arg(long)]
        columns: Option<usize>,
    },
}

/// Flags shared by every command. Each one overrides the config file.
#[derive(Args)]
struct CommonArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input JSON document.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Symbol stamped onto the price rows.
    #[arg(long)]
    symbol: Option<String>,

    /// Drop rows whose period is not Q1-Q4 instead of failing.
    #[arg(long, default_value_t = false)]
    drop_unmapped: bool,

    /// Key used to decide whether a quarter already made it into the output.
    #[arg(long, value_enum)]
    recovery: Option<RecoveryArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum RecoveryArg {
    StartDate,
    IdentityKey,
}

impl From<RecoveryArg> for RecoveryGranularity {
    fn from(arg: RecoveryArg) -> Self {
        match arg {
            RecoveryArg::StartDate => RecoveryGranularity::StartDate,
            RecoveryArg::IdentityKey => RecoveryGranularity::IdentityKey,
        }
    }
}

impl CommonArgs {
    /// Config file (or defaults) with command-line overrides applied.
    fn resolve(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(symbol) = &self.symbol {
            config.symbol = symbol.clone();
        }
        if self.drop_unmapped {
            config.unmapped_periods = UnmappedPeriodPolicy::Drop;
        }
        if let Some(recovery) = self.recovery {
            config.recovery = recovery.into();
        }
        config.validate()?;
        debug!(?config, "resolved configuration");
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            common,
            output_dir,
            json,
        } => run_cmd(&common, output_dir, json),
        Commands::Inspect { common } => inspect_cmd(&common),
        Commands::Preview {
            common,
            rows,
            columns,
        } => preview_cmd(&common, rows, columns),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_cmd(common: &CommonArgs, output_dir: Option<PathBuf>, json: bool) -> Result<()> {
    let mut config = common.resolve()?;
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }

    let out = run_pipeline(&config).context("alignment run failed")?;
    let summary = &out.summary;

    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    let report = &summary.report;
    println!("Symbol:        {}", summary.symbol);
    println!("Rows:          {} ({} columns)", summary.rows, summary.columns);
    println!("  price rows:  {}", report.price_rows);
    println!("  matched:     {}", report.matched_rows);
    println!("  masked:      {}", report.masked_rows);
    println!("  unmatched:   {}", report.unmatched_rows);
    println!("  recovered:   {}", report.recovered_rows);
    if report.dropped_rows > 0 {
        println!("  dropped:     {}", report.dropped_rows);
    }
    if report.foreign_symbol_rows > 0 {
        println!("  foreign sym: {}", report.foreign_symbol_rows);
    }
    for warning in &report.duplicate_keys {
        println!("  warning:     {warning}");
    }
    println!("Normalized:    {} columns", summary.normalized_columns);
    println!("Fingerprint:   {}", summary.fingerprint);
    println!("Aligned CSV:   {}", summary.aligned_path.display());
    println!("Normalized CSV: {}", summary.normalized_path.display());
    Ok(())
}

fn inspect_cmd(common: &CommonArgs) -> Result<()> {
    let config = common.resolve()?;
    let doc = read_document(&config.input)
        .with_context(|| format!("reading {}", config.input.display()))?;

    println!("Document: {}", config.input.display());
    let sections = config
        .sections
        .fundamentals
        .iter()
        .chain(&config.sections.technicals)
        .chain(std::iter::once(&config.sections.price));

    let mut missing = 0usize;
    for name in sections {
        match section(&doc, name).and_then(|records| records_to_table(name, records)) {
            Ok(table) => println!(
                "  {name:<32} {:>6} rows  {:>4} columns",
                table.height(),
                table.width()
            ),
            Err(LoadError::MissingSection(_)) => {
                missing += 1;
                println!("  {name:<32} MISSING");
            }
            Err(e) => println!("  {name:<32} ERROR: {e}"),
        }
    }
    if missing > 0 {
        anyhow::bail!("{missing} configured section(s) missing from the document");
    }
    Ok(())
}

fn preview_cmd(common: &CommonArgs, rows: Option<usize>, columns: Option<usize>) -> Result<()> {
    let config = common.resolve()?;
    let doc = read_document(&config.input)
        .with_context(|| format!("reading {}", config.input.display()))?;
    let alignment = align_document(&doc, &config).context("alignment failed")?;

    let opts = DisplayOptions {
        max_rows: rows.unwrap_or(config.display.max_rows),
        max_columns: columns.unwrap_or(config.display.max_columns),
    };
    print!("{}", preview::render(&alignment.table, &opts));
    println!(
        "matched {} / masked {} / recovered {}",
        alignment.report.matched_rows, alignment.report.masked_rows, alignment.report.recovered_rows
    );
    Ok(())
}
