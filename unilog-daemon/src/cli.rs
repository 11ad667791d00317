//! CLI argument definitions for unilog-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// How input files are consumed.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Read every input once, drain, and exit.
    Batch,
    /// Follow inputs for appended lines until interrupted.
    Tail,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::Tail => "tail",
        }
    }
}

/// unilog log ingestion daemon.
///
/// Parses raw log lines from files, filters them with declarative rules,
/// and delivers the surviving records to the configured sinks.
#[derive(Parser, Debug)]
#[command(name = "unilog-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to unilog.toml configuration file.
    ///
    /// When omitted, built-in defaults plus `UNILOG_*` environment overrides are used.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Ingestion mode.
    #[arg(short, long, value_enum, default_value_t = Mode::Batch)]
    pub mode: Mode,

    /// Input files or directories (overrides `pipeline.input_paths`).
    pub inputs: Vec<PathBuf>,

    /// Override parser name (json, apache, nginx, syslog, generic).
    #[arg(short, long)]
    pub parser: Option<String>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and filter rules, then exit without ingesting.
    #[arg(long)]
    pub validate: bool,
}
