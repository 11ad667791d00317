#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`parser`]: 형식별 파서(JSON, Apache/Nginx, Syslog, generic)와 이름 기반 레지스트리
//! - [`filter`]: 선언적 필터 규칙 엔진 (AND 결합, 단락 거부)
//! - [`collector`]: tail 소스와 배치 파일 스캐너
//! - [`dispatcher`]: 바운디드 큐 + 워커 풀 (Pipeline trait 구현)
//! - [`sink`]: 싱크 레지스트리, 팬아웃, 로컬 JSON/오브젝트 스토어 싱크
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! TailSource / BatchScanner -> Dispatcher queue -> workers
//!                                                   |-> ParserRegistry
//!                                                   |-> SharedRuleSet
//!                                                   '-> SinkFanout -> sinks
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;

pub mod collector;
pub mod filter;
pub mod parser;
pub mod sink;

// --- 주요 타입 re-export ---

// 디스패처
pub use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherHandle, DispatcherStats, WorkItem};

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::LogPipelineError;

// 파서
pub use parser::{
    AccessLogParser, GenericParser, JsonLogParser, ParserRegistry, Resolved, SyslogParser,
};

// 필터
pub use filter::{FilterEngine, FilterOutcome, FilterRule, RuleLoader, RuleSet, SharedRuleSet};

// 소스
pub use collector::{BatchScanner, ScanReport, TailSource, TailState};

// 싱크
pub use sink::{
    FanoutReport, JsonFileSink, ObjectStoreSink, ObjectUploader, SinkFanout, SinkRegistry,
};
