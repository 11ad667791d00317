//! Logging initialization for unilog-daemon.
//!
//! Installs a `tracing-subscriber` registry from the `[general]` section of
//! `UnilogConfig`. Output goes to stderr; stdout is reserved for the run summary.

use std::str::FromStr;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use unilog_core::config::GeneralConfig;

/// Supported log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Multi-line human-readable output
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            )),
        }
    }
}

/// Level filter: `RUST_LOG` when set and valid, otherwise `general.log_level`.
pub fn env_filter(config: &GeneralConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

/// Initialize the global tracing subscriber.
///
/// Fails on an unknown format or when a global subscriber is already set.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let format: LogFormat = config.log_format.parse()?;
    let registry = tracing_subscriber::registry().with(env_filter(config));
    let base = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Json => registry.with(base.json()).try_init(),
        LogFormat::Pretty => registry.with(base.pretty()).try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))
}
