//! 로그 파싱 모듈 -- 형식별 파서와 이름 기반 레지스트리
//!
//! [`ParserRegistry`]는 형식 이름을 파서에 매핑합니다.
//! 각 파서는 core의 [`LogParser`] trait을 구현합니다.
//!
//! # 지원 형식
//! - `json`: 구조화 JSON ([`JsonLogParser`])
//! - `apache`, `nginx`: 접근 로그 ([`AccessLogParser`])
//! - `syslog`: RFC 5424 / RFC 3164 ([`SyslogParser`])
//! - `generic`: 패턴 또는 key=value ([`GenericParser`])
//!
//! # 사용 예시
//! ```ignore
//! use unilog_pipeline::parser::ParserRegistry;
//!
//! let registry = ParserRegistry::with_defaults();
//! let record = registry.parse("apache", line)?;
//! // 알 수 없는 이름은 generic 파서로 대체되고 경고가 남습니다.
//! let record = registry.parse("unknown", "k=v")?;
//! ```

pub mod access;
pub mod generic;
pub mod json;
pub mod syslog;
pub mod timestamp;

pub use access::AccessLogParser;
pub use generic::GenericParser;
pub use json::JsonLogParser;
pub use syslog::SyslogParser;
pub use timestamp::normalize_iso8601;

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use metrics::counter;
use unilog_core::error::UnilogError;
use unilog_core::metrics as m;
use unilog_core::pipeline::LogParser;
use unilog_core::types::Record;

use crate::error::LogPipelineError;

/// 대체 파서 이름
pub const FALLBACK_PARSER: &str = "generic";

/// 파서 조회 결과
#[derive(Clone)]
pub struct Resolved {
    /// 사용할 파서
    pub parser: Arc<dyn LogParser>,
    /// 요청한 이름이 없어 generic 파서로 대체되었는지
    pub fell_back: bool,
}

/// 파서 레지스트리 -- 형식 이름 → 파서
///
/// 조회(`resolve`)는 여러 워커에서 동시에 호출되므로 읽기 잠금만 사용합니다.
/// 등록/해제는 드물다고 가정하고 쓰기 잠금을 사용합니다.
pub struct ParserRegistry {
    parsers: RwLock<HashMap<String, Arc<dyn LogParser>>>,
    /// `generic` 이름이 해제된 경우에도 사용할 내장 대체 파서
    fallback: Arc<dyn LogParser>,
    fallback_count: AtomicU64,
}

impl ParserRegistry {
    /// 빈 레지스트리를 생성합니다. 조회는 항상 내장 generic 파서로 대체됩니다.
    pub fn new() -> Self {
        Self {
            parsers: RwLock::new(HashMap::new()),
            fallback: Arc::new(GenericParser::new()),
            fallback_count: AtomicU64::new(0),
        }
    }

    /// 기본 파서 세트(json, apache, nginx, syslog, generic)로 레지스트리를 생성합니다.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register("json", Arc::new(JsonLogParser::new()));
        registry.register("apache", Arc::new(AccessLogParser::apache()));
        registry.register("nginx", Arc::new(AccessLogParser::nginx()));
        registry.register("syslog", Arc::new(SyslogParser::new()));
        registry.register(FALLBACK_PARSER, Arc::new(GenericParser::new()));
        registry
    }

    /// 파서를 등록합니다. 같은 이름이 있으면 덮어쓰고 경고를 남깁니다.
    ///
    /// 이전 파서가 있었다면 반환합니다.
    pub fn register(
        &self,
        name: impl Into<String>,
        parser: Arc<dyn LogParser>,
    ) -> Option<Arc<dyn LogParser>> {
        let name = name.into();
        let mut parsers = self.parsers.write().unwrap_or_else(PoisonError::into_inner);
        let previous = parsers.insert(name.clone(), parser);
        if previous.is_some() {
            tracing::warn!(parser = %name, "overwriting existing parser registration");
        } else {
            tracing::debug!(parser = %name, "registered parser");
        }
        previous
    }

    /// 파서 등록을 해제합니다.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn LogParser>> {
        self.parsers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// 이름으로 파서를 조회합니다. 실패하지 않습니다.
    ///
    /// 이름이 없으면 `generic` 등록 파서(없으면 내장 generic 파서)로 대체하고,
    /// 경고 로그와 대체 카운터로 관측 가능하게 남깁니다.
    pub fn resolve(&self, name: &str) -> Resolved {
        let parsers = self.parsers.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(parser) = parsers.get(name) {
            return Resolved {
                parser: Arc::clone(parser),
                fell_back: false,
            };
        }

        let parser = parsers
            .get(FALLBACK_PARSER)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback));
        drop(parsers);

        self.fallback_count.fetch_add(1, Ordering::Relaxed);
        counter!(m::PIPELINE_PARSER_FALLBACKS_TOTAL).increment(1);
        tracing::warn!(
            requested = name,
            fallback = FALLBACK_PARSER,
            "unknown parser, falling back to generic"
        );

        Resolved {
            parser,
            fell_back: true,
        }
    }

    /// 이름으로 파서를 찾아 한 줄을 파싱합니다.
    pub fn parse(&self, name: &str, line: &str) -> Result<Record, UnilogError> {
        self.resolve(name).parser.parse(line)
    }

    /// 등록된 파서 이름 목록
    pub fn list_names(&self) -> BTreeSet<String> {
        self.parsers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// 이름 등록 여부
    pub fn contains(&self, name: &str) -> bool {
        self.parsers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// 알 수 없는 이름으로 대체된 누적 횟수
    pub fn fallback_count(&self) -> u64 {
        self.fallback_count.load(Ordering::Relaxed)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// 파서 공통 전처리: 크기 검사, 줄끝 `\r`/`\n` 제거, 빈 줄 거부
pub(crate) fn prepare_line<'a>(
    format: &str,
    line: &'a str,
    max_input_size: usize,
) -> Result<&'a str, LogPipelineError> {
    if line.len() > max_input_size {
        return Err(LogPipelineError::parse(
            format,
            0,
            format!(
                "input too large: {} bytes (max: {max_input_size})",
                line.len()
            ),
        ));
    }

    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(LogPipelineError::parse(format, 0, "empty input"));
    }
    Ok(line)
}
