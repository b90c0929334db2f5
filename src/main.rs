use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bench_store::cli::{Cli, Command, QueryFormat, ReportFormat};
use bench_store::config::{ConfigError, StoreConfig};
use bench_store::ingest::{IngestError, Ingestor, RawRunRecord};
use bench_store::query::{self, NamePattern, QueryService};
use bench_store::regression::RegressionDetector;
use bench_store::store::{SeriesStore, StoreError};

/// Failure classes behind the process exit codes.
enum Failure {
    /// Caller mistake (bad flags, malformed input, invariant rejection): exit 1.
    Caller(anyhow::Error),
    /// Store or host fault (I/O, fsync timeout, corrupt file): exit 2.
    Infra(anyhow::Error),
}

impl Failure {
    fn exit_code(&self) -> i32 {
        match self {
            Failure::Caller(_) => 1,
            Failure::Infra(_) => 2,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Caller(err) | Failure::Infra(err) => write!(f, "{err:#}"),
        }
    }
}

impl From<ConfigError> for Failure {
    fn from(err: ConfigError) -> Self {
        Failure::Caller(err.into())
    }
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        if err.is_caller_error() {
            Failure::Caller(err.into())
        } else {
            Failure::Infra(err.into())
        }
    }
}

impl From<IngestError> for Failure {
    fn from(err: IngestError) -> Self {
        if err.is_caller_error() {
            Failure::Caller(err.into())
        } else {
            Failure::Infra(err.into())
        }
    }
}

/// Initialize tracing subscriber for diagnostic output
///
/// `-v` raises the default level; an explicit `RUST_LOG` wins over both.
fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "bench_store=warn",
        1 => "bench_store=info",
        2 => "bench_store=debug",
        _ => "bench_store=trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read the raw record, `-` meaning stdin.
fn read_input(path: &Path) -> io::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}

/// Write rendered output, `-` meaning stdout.
fn write_output(path: &Path, content: &str) -> io::Result<()> {
    if path.as_os_str() == "-" {
        io::stdout().write_all(content.as_bytes())
    } else {
        std::fs::write(path, content)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, Failure> {
    serde_json::to_string_pretty(value).map_err(|e| Failure::Infra(e.into()))
}

fn run_ingest(
    store: &SeriesStore,
    config: &StoreConfig,
    suite: &str,
    input: &Path,
    format: ReportFormat,
) -> Result<(), Failure> {
    let raw_json = read_input(input)
        .with_context(|| format!("failed to read {}", input.display()))
        .map_err(Failure::Caller)?;
    let raw: RawRunRecord = serde_json::from_str(&raw_json)
        .context("malformed run record")
        .map_err(Failure::Caller)?;

    let detector = RegressionDetector::new(config.detector.clone());
    let ingestor = Ingestor::new(store, detector);
    let report = ingestor.ingest(suite, raw.into_record())?;

    match format {
        ReportFormat::Text => print!("{}", report.to_report_string()),
        ReportFormat::Json => println!("{}", to_json(&report)?),
    }
    Ok(())
}

fn run_query(
    store: &SeriesStore,
    suite: &str,
    name: Option<&str>,
    format: QueryFormat,
    stats: bool,
) -> Result<(), Failure> {
    let pattern = name.map(NamePattern::parse).unwrap_or_default();
    let service = QueryService::new(store);

    if stats {
        let summaries = service.summaries(suite, &pattern)?;
        match format {
            QueryFormat::Json => println!("{}", to_json(&summaries)?),
            QueryFormat::Csv => print!("{}", query::summaries_to_csv(&summaries)),
        }
    } else {
        let series = service.series(suite, &pattern)?;
        match format {
            QueryFormat::Json => println!("{}", to_json(&series)?),
            QueryFormat::Csv => print!("{}", query::series_to_csv(&series)),
        }
    }
    Ok(())
}

fn run_export(store: &SeriesStore, suite: &str, out: &Path) -> Result<(), Failure> {
    let doc = QueryService::new(store).export(suite)?;
    let json = doc.to_json_pretty().map_err(|e| Failure::Infra(e.into()))?;
    write_output(out, &json)
        .with_context(|| format!("failed to write {}", out.display()))
        .map_err(Failure::Infra)?;
    Ok(())
}

fn run_suites(store: &SeriesStore) -> Result<(), Failure> {
    for suite in store.list_suites()? {
        println!("{suite}");
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Failure> {
    let mut config = StoreConfig::load(cli.config.as_deref())?;
    if let Some(root) = cli.store {
        config.root = root;
    }
    let store = config.build_store();

    match cli.command {
        Command::Ingest {
            suite,
            input,
            format,
        } => run_ingest(&store, &config, &suite, &input, format),
        Command::Query {
            suite,
            name,
            format,
            stats,
        } => run_query(&store, &suite, name.as_deref(), format, stats),
        Command::Export { suite, out } => run_export(&store, &suite, &out),
        Command::Suites => run_suites(&store),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(failure) = run(cli) {
        eprintln!("error: {failure}");
        std::process::exit(failure.exit_code());
    }
}
