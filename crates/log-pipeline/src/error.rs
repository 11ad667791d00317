//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 로그 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogPipelineError> for UnilogError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use unilog_core::error::{ConfigError, ParseError, PipelineError, SinkError, UnilogError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 로그 파싱 실패
    #[error("parse error: {format} at offset {offset}: {reason}")]
    Parse {
        /// 파서 형식 (json, apache, syslog 등)
        format: String,
        /// 실패 위치 (바이트 오프셋)
        offset: usize,
        /// 실패 사유
        reason: String,
    },

    /// 지원하지 않는 로그 형식
    #[error("unsupported log format: {0}")]
    UnsupportedFormat(String),

    /// 필터 규칙 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 규칙 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 필터 규칙 유효성 검증 실패
    #[error("rule validation error: field '{field}': {reason}")]
    RuleValidation {
        /// 규칙이 검사하는 필드
        field: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 수집기 에러 (파일 I/O 등)
    #[error("collector error: {source_type}: {reason}")]
    Collector {
        /// 수집 소스 유형 (tail, batch)
        source_type: String,
        /// 에러 사유
        reason: String,
    },

    /// 싱크 에러
    #[error("sink error: {sink}: {reason}")]
    Sink {
        /// 싱크 이름
        sink: String,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl LogPipelineError {
    /// 파싱 실패 에러를 생성합니다.
    pub(crate) fn parse(format: &str, offset: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            format: format.to_owned(),
            offset,
            reason: reason.into(),
        }
    }
}

impl From<LogPipelineError> for UnilogError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Parse {
                format,
                offset,
                reason,
            } => UnilogError::Parse(ParseError::Failed {
                format,
                offset,
                reason,
            }),
            LogPipelineError::UnsupportedFormat(name) => {
                UnilogError::Parse(ParseError::UnsupportedFormat(name))
            }
            LogPipelineError::Config { field, reason } => {
                UnilogError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogPipelineError::Sink { sink, reason } => {
                UnilogError::Sink(SinkError::Write(format!("{sink}: {reason}")))
            }
            LogPipelineError::Channel(reason) => {
                UnilogError::Pipeline(PipelineError::ChannelSend(reason))
            }
            LogPipelineError::Io(e) => UnilogError::Io(e),
            other => UnilogError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = LogPipelineError::parse("syslog", 42, "unexpected character");
        let msg = err.to_string();
        assert!(msg.contains("syslog"));
        assert!(msg.contains("42"));
        assert!(msg.contains("unexpected character"));
    }

    #[test]
    fn parse_error_keeps_its_kind_in_unilog_error() {
        let err: UnilogError = LogPipelineError::parse("json", 0, "not an object").into();
        assert!(matches!(
            err,
            UnilogError::Parse(ParseError::Failed { .. })
        ));
    }

    #[test]
    fn config_error_converts_to_config_variant() {
        let err: UnilogError = LogPipelineError::Config {
            field: "worker_count".to_owned(),
            reason: "must be 1-256".to_owned(),
        }
        .into();
        assert!(matches!(err, UnilogError::Config(_)));
    }

    #[test]
    fn rule_load_error_becomes_init_failure() {
        let err: UnilogError = LogPipelineError::RuleLoad {
            path: "rules.yaml".to_owned(),
            reason: "invalid YAML".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            UnilogError::Pipeline(PipelineError::InitFailed(_))
        ));
        assert!(err.to_string().contains("rules.yaml"));
    }
}
