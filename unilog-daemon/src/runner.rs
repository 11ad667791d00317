//! Run driver -- wires configuration, rules, dispatcher and sources together.
//!
//! # Batch mode
//!
//! 1. Start the dispatcher
//! 2. Scan every input file once
//! 3. Wait for the queue to drain
//! 4. Stop and report
//!
//! # Tail mode
//!
//! 1. Start the dispatcher
//! 2. Poll inputs for appended lines until the cancellation token fires
//! 3. Drain whatever was already enqueued, then stop and report

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use unilog_core::config::UnilogConfig;
use unilog_core::pipeline::Pipeline;
use unilog_pipeline::{
    BatchScanner, Dispatcher, DispatcherBuilder, DispatcherStats, FilterRule, PipelineConfig,
    RuleLoader, RuleSet, ScanReport, SharedRuleSet, TailSource,
};

use crate::cli::Mode;

/// Outcome of one run, printed to stdout when the daemon exits.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    pub mode: &'static str,
    pub parser: String,
    pub sinks: Vec<String>,
    /// Files read (batch) or followed (tail).
    pub files: usize,
    /// Inputs that could not be read.
    pub skipped: usize,
    pub enqueued: u64,
    pub parsed: u64,
    pub parse_failures: u64,
    pub rejected: u64,
    pub delivered: u64,
    pub sink_failures: u64,
    pub elapsed_ms: u64,
}

impl RunSummary {
    fn new(
        mode: Mode,
        dispatcher: &Dispatcher,
        report: ScanReport,
        stats: DispatcherStats,
        started: Instant,
    ) -> Self {
        Self {
            mode: mode.as_str(),
            parser: dispatcher.default_format().to_owned(),
            sinks: dispatcher.sink_names().into_iter().map(str::to_owned).collect(),
            files: report.files,
            skipped: report.skipped,
            enqueued: stats.enqueued,
            parsed: stats.parsed,
            parse_failures: stats.parse_failures,
            rejected: stats.rejected,
            delivered: stats.delivered,
            sink_failures: stats.sink_failures,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Merge the rules file (first) and inline `[[pipeline.filters]]` (after) into one set.
///
/// # Errors
///
/// Returns an error if the rules file cannot be read or any rule is invalid.
pub async fn load_rules(config: &PipelineConfig) -> Result<SharedRuleSet> {
    let from_file = match &config.rules_file {
        Some(path) => RuleLoader::load_file(path).await?,
        None => Vec::new(),
    };
    let inline = config.filters.iter().map(FilterRule::from);

    let rules = RuleSet::from_rules(from_file.into_iter().chain(inline))?;
    tracing::info!(rules = rules.len(), "filter rules ready");
    Ok(SharedRuleSet::from_rule_set(rules))
}

/// Configured run, ready to execute in either mode.
pub struct Runner {
    config: PipelineConfig,
    rules: SharedRuleSet,
}

impl Runner {
    /// Build from the loaded configuration.
    ///
    /// Non-empty `inputs` replace `pipeline.input_paths`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline settings are invalid or the rules fail to load.
    pub async fn from_config(config: &UnilogConfig, inputs: Vec<PathBuf>) -> Result<Self> {
        let mut pipeline = PipelineConfig::from_core(&config.pipeline);
        if !inputs.is_empty() {
            pipeline.input_paths = inputs;
        }
        pipeline
            .validate()
            .map_err(|e| anyhow::anyhow!("pipeline config validation failed: {}", e))?;

        let rules = load_rules(&pipeline).await?;
        Ok(Self {
            config: pipeline,
            rules,
        })
    }

    pub fn pipeline_config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn rules(&self) -> &SharedRuleSet {
        &self.rules
    }

    /// Run in the given mode. Tail mode stops when `cancel` fires.
    pub async fn run(&self, mode: Mode, cancel: CancellationToken) -> Result<RunSummary> {
        match mode {
            Mode::Batch => self.run_batch().await,
            Mode::Tail => self.run_tail(cancel).await,
        }
    }

    fn build_dispatcher(&self) -> Result<Dispatcher> {
        DispatcherBuilder::new()
            .config(self.config.clone())
            .rules(self.rules.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build dispatcher: {}", e))
    }

    fn require_inputs(&self, mode: Mode) -> Result<()> {
        if self.config.input_paths.is_empty() {
            return Err(anyhow::anyhow!(
                "{} mode requires at least one input path",
                mode.as_str()
            ));
        }
        Ok(())
    }

    /// Scan every input once and wait for all lines to reach the sinks.
    pub async fn run_batch(&self) -> Result<RunSummary> {
        self.require_inputs(Mode::Batch)?;
        let started = Instant::now();

        let mut dispatcher = self.build_dispatcher()?;
        dispatcher.start().await?;

        let scanner = BatchScanner::new(
            self.config.input_paths.iter().cloned(),
            dispatcher.default_format(),
        );
        let scanned = scanner.scan(&dispatcher.handle()).await;

        dispatcher.wait_for_completion().await;
        let stats = dispatcher.stats();
        dispatcher.stop().await?;

        let report = scanned?;
        Ok(RunSummary::new(Mode::Batch, &dispatcher, report, stats, started))
    }

    /// Follow inputs until `cancel` fires, then drain and stop.
    pub async fn run_tail(&self, cancel: CancellationToken) -> Result<RunSummary> {
        self.require_inputs(Mode::Tail)?;
        let started = Instant::now();

        let mut dispatcher = self.build_dispatcher()?;
        dispatcher.start().await?;

        let mut tail = TailSource::new(
            self.config.input_paths.iter().cloned(),
            dispatcher.default_format(),
            self.config.poll_interval(),
        );
        let tailed = tail.run(&dispatcher.handle(), &cancel).await;

        dispatcher.wait_for_completion().await;
        let stats = dispatcher.stats();
        dispatcher.stop().await?;
        tailed?;

        let report = ScanReport {
            files: self.config.input_paths.len(),
            ..ScanReport::default()
        };
        Ok(RunSummary::new(Mode::Tail, &dispatcher, report, stats, started))
    }
}

/// Wait for SIGTERM or SIGINT.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for Ctrl+C.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("CTRL_C")
}
