//! Runner integration tests.
//!
//! Tests the full flow: config -> rules -> dispatcher -> sources -> JSON export.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use unilog_core::config::UnilogConfig;
use unilog_daemon::cli::Mode;
use unilog_daemon::runner::{Runner, load_rules};
use unilog_pipeline::{FilterOutcome, JsonFileSink};

/// Helper: config writing into `output_dir`, with extra `[pipeline]` lines.
fn test_config(output_dir: &Path, pipeline_extra: &str) -> UnilogConfig {
    let toml_str = format!(
        r#"
[general]
log_level = "info"

[pipeline]
parser = "json"
sinks = ["json"]
output_dir = "{}"
output_file_stem = "run"
worker_count = 2
dequeue_timeout_ms = 20
stop_timeout_ms = 500
poll_interval_ms = 10
{pipeline_extra}
"#,
        output_dir.display()
    );
    UnilogConfig::parse(&toml_str).expect("test config should parse")
}

fn export(output_dir: &Path) -> JsonFileSink {
    JsonFileSink::in_dir(output_dir, "run")
}

#[tokio::test]
async fn test_batch_run_exports_every_line() {
    // Given: Two JSON lines in one input file
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(
        input.path().join("app.log"),
        "{\"level\":\"ERROR\",\"message\":\"disk full\"}\n{\"level\":\"INFO\",\"message\":\"ok\"}\n",
    )
    .unwrap();
    let config = test_config(output.path(), "");

    // When: Running in batch mode
    let runner = Runner::from_config(&config, vec![input.path().to_path_buf()])
        .await
        .expect("runner should build");
    let summary = runner.run_batch().await.expect("batch run should succeed");

    // Then: Both records are delivered and exported
    assert_eq!(summary.mode, "batch");
    assert_eq!(summary.files, 1);
    assert_eq!(summary.enqueued, 2);
    assert_eq!(summary.delivered, 2);
    assert_eq!(summary.sinks, vec!["json"]);
    assert_eq!(export(output.path()).read_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_batch_run_applies_inline_filters() {
    // Given: An inline rule keeping only ERROR records
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(
        input.path().join("app.log"),
        "{\"level\":\"ERROR\"}\n{\"level\":\"INFO\"}\n{\"level\":\"ERROR\"}\n",
    )
    .unwrap();
    let config = test_config(
        output.path(),
        r#"
[[pipeline.filters]]
field = "level"
in = ["ERROR"]
"#,
    );

    // When: Running in batch mode
    let runner = Runner::from_config(&config, vec![input.path().to_path_buf()])
        .await
        .unwrap();
    let summary = runner.run_batch().await.unwrap();

    // Then: INFO is rejected, both ERROR records are exported
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.delivered, 2);
    assert_eq!(export(output.path()).read_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rules_file_and_inline_filters_are_merged() {
    // Given: A rules file and an inline filter
    let dir = tempfile::tempdir().unwrap();
    let rules_path = dir.path().join("rules.yaml");
    std::fs::write(&rules_path, "- field: status\n  gt: 399\n").unwrap();
    let config = test_config(
        dir.path(),
        &format!(
            r#"
rules_file = "{}"

[[pipeline.filters]]
field = "method"
equals = "GET"
"#,
            rules_path.display()
        ),
    );
    let pipeline = unilog_pipeline::PipelineConfig::from_core(&config.pipeline);

    // When: Loading rules
    let rules = load_rules(&pipeline).await.expect("rules should load");

    // Then: File rule first, inline rule after
    assert_eq!(rules.len(), 2);
    let fields: Vec<String> = rules.snapshot().iter().map(|r| r.field.clone()).collect();
    assert_eq!(fields, vec!["status", "method"]);

    let record = unilog_core::types::Record::try_from(
        serde_json::json!({"status": 500, "method": "POST"}),
    )
    .unwrap();
    assert_eq!(rules.apply(&record), FilterOutcome::Rejected { rule_index: 1 });
}

#[tokio::test]
async fn test_invalid_rules_file_fails_runner_build() {
    // Given: A rules file with an unknown key
    let dir = tempfile::tempdir().unwrap();
    let rules_path = dir.path().join("rules.yaml");
    std::fs::write(&rules_path, "- field: status\n  bigger_than: 3\n").unwrap();
    let config = test_config(
        dir.path(),
        &format!("rules_file = \"{}\"\n", rules_path.display()),
    );

    // When: Building the runner
    let result = Runner::from_config(&config, Vec::new()).await;

    // Then: Should fail
    assert!(result.is_err(), "unknown rule keys should be rejected");
}

#[tokio::test]
async fn test_missing_rules_file_fails_runner_build() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), "rules_file = \"/nonexistent/rules.yaml\"\n");

    assert!(Runner::from_config(&config, Vec::new()).await.is_err());
}

#[tokio::test]
async fn test_cli_inputs_override_config_paths() {
    // Given: Config input paths and explicit CLI inputs
    let output = tempfile::tempdir().unwrap();
    let config = test_config(output.path(), "input_paths = [\"/from/config\"]\n");

    // When: Building with CLI inputs
    let runner = Runner::from_config(&config, vec!["/from/cli".into()])
        .await
        .unwrap();

    // Then: CLI inputs win
    assert_eq!(
        runner.pipeline_config().input_paths,
        vec![std::path::PathBuf::from("/from/cli")]
    );
}

#[tokio::test]
async fn test_batch_run_without_inputs_fails() {
    let output = tempfile::tempdir().unwrap();
    let config = test_config(output.path(), "input_paths = []\n");

    let runner = Runner::from_config(&config, Vec::new()).await.unwrap();
    assert!(runner.run_batch().await.is_err());
}

#[tokio::test]
async fn test_invalid_pipeline_settings_fail_runner_build() {
    let output = tempfile::tempdir().unwrap();
    let mut config = test_config(output.path(), "");
    config.pipeline.worker_count = 0;

    assert!(Runner::from_config(&config, Vec::new()).await.is_err());
}

#[tokio::test]
async fn test_tail_run_follows_until_cancelled() {
    // Given: An existing log file
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let log = input.path().join("app.log");
    std::fs::write(&log, "{\"message\":\"first\"}\n").unwrap();
    let config = test_config(output.path(), "");
    let runner = Runner::from_config(&config, vec![log.clone()]).await.unwrap();

    // When: Tailing, appending a line, then cancelling
    let cancel = CancellationToken::new();
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { runner.run(Mode::Tail, cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().append(true).open(&log).unwrap();
        file.write_all(b"{\"message\":\"second\"}\n").unwrap();
    }

    let sink = export(output.path());
    tokio::time::timeout(Duration::from_secs(5), async {
        while sink.read_all().await.unwrap().len() < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("both lines should be exported");

    cancel.cancel();
    let summary = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("tail run should stop after cancel")
        .unwrap()
        .expect("tail run should succeed");

    // Then: Both lines went through, nothing was lost on shutdown
    assert_eq!(summary.mode, "tail");
    assert_eq!(summary.files, 1);
    assert_eq!(summary.enqueued, 2);
    assert_eq!(summary.delivered, 2);
}

#[tokio::test]
async fn test_tail_run_reads_log_files_in_configured_directory() {
    // Given: A configured input directory holding one log file
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(
        input.path().join("app.log"),
        "{\"message\":\"a\"}\n{\"message\":\"b\"}\n",
    )
    .unwrap();
    let extra = format!("input_paths = [\"{}\"]", input.path().display());
    let config = test_config(output.path(), &extra);
    let runner = Runner::from_config(&config, Vec::new()).await.unwrap();

    // When: Tailing until both lines are exported, then cancelling
    let cancel = CancellationToken::new();
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { runner.run(Mode::Tail, cancel).await })
    };

    let sink = export(output.path());
    tokio::time::timeout(Duration::from_secs(5), async {
        while sink.read_all().await.unwrap().len() < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("lines from the directory should be exported");

    cancel.cancel();
    let summary = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("tail run should stop after cancel")
        .unwrap()
        .expect("tail run should succeed");

    // Then: The directory was expanded to its log file
    assert_eq!(summary.enqueued, 2);
    assert_eq!(summary.delivered, 2);
}
