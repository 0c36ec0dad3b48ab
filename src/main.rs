/*!
 * s3-analyser CLI
 *
 * Prints the report on stdout; errors go to stderr with a structured exit
 * code.
 */

use clap::{Parser, ValueEnum};
use s3_analyser::{
    analysis::{self, Analyser},
    config::{AnalyserConfig, AnalysisMode, LogLevel},
    context::RunContext,
    error::{AnalyserError, Result, EXIT_SUCCESS},
    logging,
    protocol::aws,
    report::{ReportFormat, SizeUnit},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "s3-analyser")]
#[command(version, about = "Analyse the S3 buckets of an AWS account", long_about = None)]
struct Cli {
    /// File size unit
    #[arg(long, value_enum)]
    unit: Option<UnitArg>,

    /// Only select buckets that match a glob, e.g. "s3://mybucke*"
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,

    /// Number of parallel workers
    #[arg(long = "conc", value_name = "N")]
    concurrency: Option<usize>,

    /// Long running analysis listing every object
    #[arg(long)]
    raws3: bool,

    /// Report format
    #[arg(long, value_enum)]
    fmt: Option<FormatArg>,

    /// Page-size cap for object listings (raw mode)
    #[arg(long, value_name = "N")]
    max_keys: Option<i32>,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Push gateway URL (overrides PROM_GATEWAY)
    #[arg(long, value_name = "URL")]
    push_gateway: Option<String>,

    /// Gauge text file (overrides PROM_TEXT / S3_PROM_TEXT)
    #[arg(long, value_name = "PATH")]
    prom_text: Option<PathBuf>,

    /// Do not commit gauges
    #[arg(long)]
    no_export: bool,

    /// Region for account-wide calls
    #[arg(long)]
    region: Option<String>,

    /// Custom S3-compatible endpoint
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    #[arg(long, value_enum)]
    log_level: Option<LogLevelArg>,

    /// Write JSON logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum UnitArg {
    #[value(name = "B")]
    B,
    #[value(name = "KB")]
    Kb,
    #[value(name = "MB")]
    Mb,
    #[value(name = "GB")]
    Gb,
    #[value(name = "TB")]
    Tb,
}

impl From<UnitArg> for SizeUnit {
    fn from(arg: UnitArg) -> Self {
        match arg {
            UnitArg::B => SizeUnit::B,
            UnitArg::Kb => SizeUnit::KB,
            UnitArg::Mb => SizeUnit::MB,
            UnitArg::Gb => SizeUnit::GB,
            UnitArg::Tb => SizeUnit::TB,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum FormatArg {
    Plain,
    Simple,
    Grid,
    Pipe,
    Html,
    Tsv,
    Csv,
    Json,
    #[value(name = "json_pretty")]
    JsonPretty,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Plain => ReportFormat::Plain,
            FormatArg::Simple => ReportFormat::Simple,
            FormatArg::Grid => ReportFormat::Grid,
            FormatArg::Pipe => ReportFormat::Pipe,
            FormatArg::Html => ReportFormat::Html,
            FormatArg::Tsv => ReportFormat::Tsv,
            FormatArg::Csv => ReportFormat::Csv,
            FormatArg::Json => ReportFormat::Json,
            FormatArg::JsonPretty => ReportFormat::JsonPretty,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(report) => {
            println!("{}", report);
            EXIT_SUCCESS
        }
        Err(e) => {
            tracing::error!(category = %e.category(), remote = e.is_remote(), "Run failed: {}", e);
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<String> {
    let cli = Cli::parse();
    let config = build_config(cli)?;
    logging::init_logging(&config)?;
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AnalyserError::Config(format!("Failed to start runtime: {}", e)))?;

    // provider calls block on the runtime from this thread and the pool workers
    let (s3, cloudwatch) = runtime.block_on(aws::connect(&config.provider))?;
    tracing::info!("Connected to {} ({:?} mode)", s3.home_region(), config.mode);

    let ctx = RunContext::standalone(config.concurrency)?;
    analysis::run(&ctx, &Analyser::new(&s3, &cloudwatch), &config)
}

/// Layer defaults, the config file, the environment and the flags
fn build_config(cli: Cli) -> Result<AnalyserConfig> {
    let mut config = match cli.config {
        Some(ref path) => AnalyserConfig::from_file(path)?,
        None => AnalyserConfig::default(),
    };
    config.apply_env();

    if let Some(unit) = cli.unit {
        config.unit = unit.into();
    }
    if let Some(fmt) = cli.fmt {
        config.format = fmt.into();
    }
    if cli.prefix.is_some() {
        config.prefix = cli.prefix;
    }
    if cli.concurrency.is_some() {
        config.concurrency = cli.concurrency;
    }
    if cli.raws3 {
        config.mode = AnalysisMode::Raw;
    }
    if cli.max_keys.is_some() {
        config.max_keys = cli.max_keys;
    }
    if cli.push_gateway.is_some() {
        config.export.push_gateway = cli.push_gateway;
    }
    if let Some(path) = cli.prom_text {
        config.export.text_file = path.clone();
        config.export.raw_text_file = path;
    }
    if cli.no_export {
        config.export.enabled = false;
    }
    if cli.region.is_some() {
        config.provider.region = cli.region;
    }
    if cli.endpoint.is_some() {
        config.provider.endpoint = cli.endpoint;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log_file.is_some() {
        config.log_file = cli.log_file;
    }
    config.verbose |= cli.verbose;

    Ok(config)
}
