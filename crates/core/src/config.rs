//! 설정 관리 -- unilog.toml 파싱 및 런타임 설정
//!
//! [`UnilogConfig`]는 데몬과 파이프라인이 사용하는 최상위 설정 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`UNILOG_PIPELINE_WORKER_COUNT=8` 형식)
//! 3. 설정 파일 (`unilog.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), unilog_core::error::UnilogError> {
//! use unilog_core::config::UnilogConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = UnilogConfig::load("unilog.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = UnilogConfig::parse("[pipeline]\nparser = \"json\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, UnilogError};

/// unilog 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnilogConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 파이프라인 설정
    #[serde(default)]
    pub pipeline: PipelineSection,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl UnilogConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, UnilogError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일 없이 기본값 + 환경변수 오버라이드로 설정을 만듭니다.
    pub fn from_env() -> Result<Self, UnilogError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, UnilogError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UnilogError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                UnilogError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, UnilogError> {
        toml::from_str(toml_str).map_err(|e| {
            UnilogError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `UNILOG_{SECTION}_{FIELD}`, 리스트는 쉼표 구분
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "UNILOG_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "UNILOG_GENERAL_LOG_FORMAT");

        // Pipeline
        let p = &mut self.pipeline;
        override_string(&mut p.parser, "UNILOG_PIPELINE_PARSER");
        override_csv(&mut p.sinks, "UNILOG_PIPELINE_SINKS");
        override_csv(&mut p.input_paths, "UNILOG_PIPELINE_INPUT_PATHS");
        override_string(&mut p.output_dir, "UNILOG_PIPELINE_OUTPUT_DIR");
        override_string(&mut p.output_file_stem, "UNILOG_PIPELINE_OUTPUT_FILE_STEM");
        override_usize(&mut p.worker_count, "UNILOG_PIPELINE_WORKER_COUNT");
        override_usize(&mut p.queue_capacity, "UNILOG_PIPELINE_QUEUE_CAPACITY");
        override_u64(
            &mut p.dequeue_timeout_ms,
            "UNILOG_PIPELINE_DEQUEUE_TIMEOUT_MS",
        );
        override_u64(&mut p.stop_timeout_ms, "UNILOG_PIPELINE_STOP_TIMEOUT_MS");
        override_u64(&mut p.poll_interval_ms, "UNILOG_PIPELINE_POLL_INTERVAL_MS");
        override_opt_string(&mut p.rules_file, "UNILOG_PIPELINE_RULES_FILE");

        // Metrics
        override_bool(&mut self.metrics.enabled, "UNILOG_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "UNILOG_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "UNILOG_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 파이프라인 수치 범위는 `unilog-pipeline`의 `PipelineConfig::validate`가 검사합니다.
    pub fn validate(&self) -> Result<(), UnilogError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.pipeline.parser.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.parser".to_owned(),
                reason: "parser name must not be empty".to_owned(),
            }
            .into());
        }

        if let Some(idx) = self
            .pipeline
            .filters
            .iter()
            .position(|rule| rule.field.is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: format!("pipeline.filters[{idx}].field"),
                reason: "field must not be empty".to_owned(),
            }
            .into());
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "metrics.port".to_owned(),
                reason: "port must be greater than 0 when metrics are enabled".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 파이프라인 설정 섹션 (`[pipeline]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// 사용할 파서 이름 (json, apache, nginx, syslog, generic)
    pub parser: String,
    /// 활성 싱크 이름 목록 (순서대로 호출)
    pub sinks: Vec<String>,
    /// 입력 파일 또는 디렉토리
    pub input_paths: Vec<String>,
    /// 로컬 싱크 출력 디렉토리
    pub output_dir: String,
    /// 출력 파일 이름 (확장자 제외)
    pub output_file_stem: String,
    /// 워커 수
    pub worker_count: usize,
    /// 작업 큐 용량
    pub queue_capacity: usize,
    /// 워커 dequeue 대기 시간 (밀리초)
    pub dequeue_timeout_ms: u64,
    /// 정지 시 워커 join 대기 시간 (밀리초)
    pub stop_timeout_ms: u64,
    /// tail 폴링 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// YAML 필터 규칙 파일 경로
    pub rules_file: Option<String>,
    /// 인라인 필터 규칙
    pub filters: Vec<FilterRuleConfig>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            parser: "generic".to_owned(),
            sinks: vec!["json".to_owned()],
            input_paths: vec!["./logs".to_owned()],
            output_dir: "./output".to_owned(),
            output_file_stem: "unilog_export".to_owned(),
            worker_count: 4,
            queue_capacity: 10_000,
            dequeue_timeout_ms: 1_000,
            stop_timeout_ms: 2_000,
            poll_interval_ms: 1_000,
            rules_file: None,
            filters: Vec::new(),
        }
    }
}

/// 필터 규칙 설정
///
/// 조건이 하나도 없는 규칙은 필드 존재 여부와 무관하게 항상 만족됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterRuleConfig {
    /// 검사할 필드 이름
    pub field: String,
    /// 값이 정확히 일치해야 함
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<serde_json::Value>,
    /// 값이 목록 중 하나여야 함
    #[serde(default, rename = "in", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<serde_json::Value>>,
    /// 값의 문자열 표현에서 검색할 정규식
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// 값이 이보다 커야 함
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    /// 값이 이보다 작아야 함
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
}

/// 메트릭 설정 (`[metrics]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 익스포터 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = if val.trim().is_empty() { None } else { Some(val) };
    }
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, type_name: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.trim().parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = type_name,
                "failed to parse env var, ignoring"
            ),
        }
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key, "bool");
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key, "usize");
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key, "u16");
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key, "u64");
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
