//! 로그 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`PipelineSection`](unilog_core::config::PipelineSection)을
//! 기반으로 디스패처, 소스, 싱크가 사용하는 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use unilog_core::config::UnilogConfig;
//! use unilog_pipeline::config::PipelineConfig;
//!
//! let core_config = UnilogConfig::default();
//! let config = PipelineConfig::from_core(&core_config.pipeline);
//! config.validate()?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use unilog_core::config::{FilterRuleConfig, PipelineSection};

use crate::error::LogPipelineError;

const MAX_WORKER_COUNT: usize = 256;
const MAX_QUEUE_CAPACITY: usize = 10_000_000;

/// 로그 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 파서 이름
    pub parser: String,
    /// 싱크 이름 목록 (호출 순서)
    pub sinks: Vec<String>,
    /// 입력 파일/디렉토리
    pub input_paths: Vec<PathBuf>,
    /// 로컬 싱크 출력 디렉토리
    pub output_dir: PathBuf,
    /// 출력 파일 이름 (확장자 제외)
    pub output_file_stem: String,
    /// 워커 수
    pub worker_count: usize,
    /// 작업 큐 용량
    pub queue_capacity: usize,
    /// dequeue 대기 시간 (밀리초)
    pub dequeue_timeout_ms: u64,
    /// 정지 시 워커 join 대기 시간 (밀리초)
    pub stop_timeout_ms: u64,
    /// tail 폴링 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// YAML 필터 규칙 파일
    pub rules_file: Option<PathBuf>,
    /// 인라인 필터 규칙
    pub filters: Vec<FilterRuleConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_core(&PipelineSection::default())
    }
}

impl PipelineConfig {
    /// core의 `PipelineSection`에서 파이프라인 설정을 생성합니다.
    pub fn from_core(core: &PipelineSection) -> Self {
        Self {
            parser: core.parser.clone(),
            sinks: core.sinks.clone(),
            input_paths: core.input_paths.iter().map(PathBuf::from).collect(),
            output_dir: PathBuf::from(&core.output_dir),
            output_file_stem: core.output_file_stem.clone(),
            worker_count: core.worker_count,
            queue_capacity: core.queue_capacity,
            dequeue_timeout_ms: core.dequeue_timeout_ms,
            stop_timeout_ms: core.stop_timeout_ms,
            poll_interval_ms: core.poll_interval_ms,
            rules_file: core.rules_file.as_ref().map(PathBuf::from),
            filters: core.filters.clone(),
        }
    }

    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.worker_count == 0 || self.worker_count > MAX_WORKER_COUNT {
            return Err(LogPipelineError::Config {
                field: "worker_count".to_owned(),
                reason: format!("must be 1-{MAX_WORKER_COUNT}"),
            });
        }

        if self.queue_capacity == 0 || self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(LogPipelineError::Config {
                field: "queue_capacity".to_owned(),
                reason: format!("must be 1-{MAX_QUEUE_CAPACITY}"),
            });
        }

        for (field, value) in [
            ("dequeue_timeout_ms", self.dequeue_timeout_ms),
            ("stop_timeout_ms", self.stop_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(LogPipelineError::Config {
                    field: field.to_owned(),
                    reason: "must be greater than 0".to_owned(),
                });
            }
        }

        if self.sinks.is_empty() {
            return Err(LogPipelineError::Config {
                field: "sinks".to_owned(),
                reason: "at least one sink must be configured".to_owned(),
            });
        }

        if self.output_file_stem.is_empty()
            || self.output_file_stem.contains(['/', '\\'])
            || self.output_file_stem == ".."
        {
            return Err(LogPipelineError::Config {
                field: "output_file_stem".to_owned(),
                reason: "must be a plain, non-empty file name".to_owned(),
            });
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parser(mut self, name: impl Into<String>) -> Self {
        self.config.parser = name.into();
        self
    }

    pub fn sinks(mut self, sinks: Vec<String>) -> Self {
        self.config.sinks = sinks;
        self
    }

    pub fn input_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config.input_paths = paths;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn output_file_stem(mut self, stem: impl Into<String>) -> Self {
        self.config.output_file_stem = stem.into();
        self
    }

    pub fn worker_count(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn dequeue_timeout(mut self, timeout: Duration) -> Self {
        self.config.dequeue_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.config.stop_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = duration_ms(interval);
        self
    }

    pub fn rules_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rules_file = Some(path.into());
        self
    }

    pub fn filters(mut self, filters: Vec<FilterRuleConfig>) -> Self {
        self.config.filters = filters;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
