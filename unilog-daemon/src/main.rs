use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use unilog_core::config::UnilogConfig;
use unilog_daemon::cli::{DaemonCli, Mode};
use unilog_daemon::runner::{self, Runner};
use unilog_daemon::{logging, metrics_server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = match &cli.config {
        Some(path) => UnilogConfig::load(path).await,
        None => UnilogConfig::from_env(),
    }
    .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;

    // CLI flags take precedence over the config file and environment
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    if let Some(parser) = cli.parser {
        config.pipeline.parser = parser;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        Runner::from_config(&config, cli.inputs).await?;
        println!("configuration is valid");
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(mode = cli.mode.as_str(), "unilog-daemon starting");

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }

    let runner = Runner::from_config(&config, cli.inputs).await?;

    let cancel = CancellationToken::new();
    if cli.mode == Mode::Tail {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match runner::wait_for_shutdown_signal().await {
                Ok(signal) => tracing::info!(signal, "shutdown signal received"),
                Err(e) => tracing::error!(error = %e, "signal handler failed, stopping"),
            }
            cancel.cancel();
        });
    }

    let summary = runner.run(cli.mode, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    tracing::info!("unilog-daemon shut down");
    Ok(())
}
