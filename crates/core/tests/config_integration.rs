//! unilog.toml 통합 설정 테스트
//!
//! - unilog.toml.example 파싱 테스트
//! - 파일 로딩 테스트
//! - 환경변수 우선순위 테스트

use std::io::Write;

use unilog_core::config::UnilogConfig;
use unilog_core::error::{ConfigError, UnilogError};

/// 환경변수를 설정하고 클로저 실행 후 원래 값으로 복원합니다.
fn with_env<T>(key: &str, value: &str, f: impl FnOnce() -> T) -> T {
    let original = std::env::var(key).ok();
    // SAFETY: 환경변수를 만지는 테스트는 serial로 직렬화됩니다.
    unsafe { std::env::set_var(key, value) };
    let result = f();
    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var(key, val),
            None => std::env::remove_var(key),
        }
    }
    result
}

// =============================================================================
// unilog.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_and_validates() {
    let content = include_str!("../../../unilog.toml.example");
    let config = UnilogConfig::parse(content).expect("example config should parse");
    config
        .validate()
        .expect("example config should pass validation");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.pipeline.parser, "generic");
    assert_eq!(config.pipeline.sinks, vec!["json"]);
    assert_eq!(config.pipeline.worker_count, 4);
    assert!(config.pipeline.rules_file.is_none());
    assert!(!config.metrics.enabled);
}

#[test]
fn example_config_matches_defaults() {
    let content = include_str!("../../../unilog.toml.example");
    let parsed = UnilogConfig::parse(content).expect("should parse");
    let defaults = UnilogConfig::default();

    assert_eq!(parsed.pipeline.queue_capacity, defaults.pipeline.queue_capacity);
    assert_eq!(
        parsed.pipeline.dequeue_timeout_ms,
        defaults.pipeline.dequeue_timeout_ms
    );
    assert_eq!(parsed.pipeline.output_dir, defaults.pipeline.output_dir);
    assert_eq!(parsed.metrics.port, defaults.metrics.port);
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
#[serial_test::serial]
async fn load_reads_file_and_validates() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "[pipeline]\nparser = \"syslog\"\nsinks = [\"json\", \"s3\"]"
    )
    .expect("write");

    let config = UnilogConfig::load(file.path()).await.expect("should load");
    assert_eq!(config.pipeline.parser, "syslog");
    assert_eq!(config.pipeline.sinks, vec!["json", "s3"]);
}

#[tokio::test]
#[serial_test::serial]
async fn load_rejects_invalid_values() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[general]\nlog_format = \"xml\"").expect("write");

    let err = UnilogConfig::load(file.path()).await.unwrap_err();
    assert!(matches!(
        err,
        UnilogError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn wrong_type_is_parse_error() {
    let err = UnilogConfig::parse("[pipeline]\nworker_count = \"many\"").unwrap_err();
    assert!(matches!(
        err,
        UnilogError::Config(ConfigError::ParseFailed { .. })
    ));
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = "[pipeline]\nparser = \"json\"";
    let parser = with_env("UNILOG_PIPELINE_PARSER", "apache", || {
        let mut config = UnilogConfig::parse(toml).expect("should parse");
        config.apply_env_overrides();
        config.pipeline.parser
    });
    assert_eq!(parser, "apache");
}

#[test]
#[serial_test::serial]
fn env_override_numeric_field() {
    let workers = with_env("UNILOG_PIPELINE_WORKER_COUNT", "16", || {
        let mut config = UnilogConfig::default();
        config.apply_env_overrides();
        config.pipeline.worker_count
    });
    assert_eq!(workers, 16);
}

#[test]
#[serial_test::serial]
fn env_override_csv_for_sinks() {
    let sinks = with_env("UNILOG_PIPELINE_SINKS", "json, gcp", || {
        let mut config = UnilogConfig::default();
        config.apply_env_overrides();
        config.pipeline.sinks
    });
    assert_eq!(sinks, vec!["json", "gcp"]);
}

#[test]
#[serial_test::serial]
fn from_env_validates_overrides() {
    let result = with_env("UNILOG_GENERAL_LOG_LEVEL", "loud", UnilogConfig::from_env);
    assert!(result.is_err());
}
