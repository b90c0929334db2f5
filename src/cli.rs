//! CLI argument parsing for bench-store

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Report format for ingest results
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

/// Output format for query results
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum QueryFormat {
    /// JSON format for machine parsing (default)
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "bench-store")]
#[command(version)]
#[command(about = "Append-only benchmark history store with regression detection", long_about = None)]
pub struct Cli {
    /// Path to a bench-store.toml configuration file
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Store root directory (overrides config file and BENCH_STORE_PATH)
    #[arg(long = "store", value_name = "DIR", global = true)]
    pub store: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate and append one run record, then evaluate regressions
    Ingest {
        /// Suite the record belongs to
        #[arg(long = "suite", value_name = "ID")]
        suite: String,

        /// Raw bench JSON produced by the harness wrapper ("-" for stdin)
        #[arg(long = "input", value_name = "PATH")]
        input: PathBuf,

        /// Report format
        #[arg(long = "format", value_enum, default_value = "text")]
        format: ReportFormat,
    },

    /// Print benchmark history for a suite
    Query {
        /// Suite to read
        #[arg(long = "suite", value_name = "ID")]
        suite: String,

        /// Benchmark name pattern: `/`-separated segments, `*` matches one
        /// segment (e.g. add/interpreter or add/*)
        #[arg(long = "name", value_name = "PATTERN")]
        name: Option<String>,

        /// Output format
        #[arg(long = "format", value_enum, default_value = "json")]
        format: QueryFormat,

        /// Print per-benchmark summary statistics instead of raw series
        #[arg(long = "stats")]
        stats: bool,
    },

    /// Write a suite's full history document ("-" for stdout)
    Export {
        /// Suite to export
        #[arg(long = "suite", value_name = "ID")]
        suite: String,

        /// Output path
        #[arg(long = "out", value_name = "PATH")]
        out: PathBuf,
    },

    /// List suites with committed history
    Suites,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_ingest() {
        let cli = Cli::parse_from([
            "bench-store",
            "ingest",
            "--suite",
            "clarity-wasm",
            "--input",
            "run.json",
        ]);
        match cli.command {
            Command::Ingest {
                suite,
                input,
                format,
            } => {
                assert_eq!(suite, "clarity-wasm");
                assert_eq!(input, PathBuf::from("run.json"));
                assert!(matches!(format, ReportFormat::Text));
            }
            other => panic!("expected ingest, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_ingest_json_format() {
        let cli = Cli::parse_from([
            "bench-store",
            "ingest",
            "--suite",
            "s",
            "--input",
            "-",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Ingest { format, .. } => assert!(matches!(format, ReportFormat::Json)),
            other => panic!("expected ingest, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_query_defaults() {
        let cli = Cli::parse_from(["bench-store", "query", "--suite", "vm"]);
        match cli.command {
            Command::Query {
                suite,
                name,
                format,
                stats,
            } => {
                assert_eq!(suite, "vm");
                assert!(name.is_none());
                assert!(matches!(format, QueryFormat::Json));
                assert!(!stats);
            }
            other => panic!("expected query, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_query_pattern_and_csv() {
        let cli = Cli::parse_from([
            "bench-store",
            "query",
            "--suite",
            "vm",
            "--name",
            "add/*",
            "--format",
            "csv",
            "--stats",
        ]);
        match cli.command {
            Command::Query {
                name,
                format,
                stats,
                ..
            } => {
                assert_eq!(name.as_deref(), Some("add/*"));
                assert!(matches!(format, QueryFormat::Csv));
                assert!(stats);
            }
            other => panic!("expected query, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_export() {
        let cli = Cli::parse_from([
            "bench-store",
            "export",
            "--suite",
            "vm",
            "--out",
            "vm.json",
        ]);
        match cli.command {
            Command::Export { suite, out } => {
                assert_eq!(suite, "vm");
                assert_eq!(out, PathBuf::from("vm.json"));
            }
            other => panic!("expected export, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_suites() {
        let cli = Cli::parse_from(["bench-store", "suites"]);
        assert!(matches!(cli.command, Command::Suites));
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "bench-store",
            "suites",
            "--store",
            "/tmp/data",
            "--config",
            "custom.toml",
            "-vv",
        ]);
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/data")));
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_verbose_default_zero() {
        let cli = Cli::parse_from(["bench-store", "suites"]);
        assert_eq!(cli.verbose, 0);
    }
}
