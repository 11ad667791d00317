//! JSON 로그 파서
//!
//! 한 줄이 하나의 JSON 객체인 구조화 로그를 파싱합니다.
//! 최상위 키는 값 그대로 레코드 필드가 되며, 문자열 `timestamp`는
//! 해석 가능하면 ISO-8601로 정규화하고 아니면 그대로 둡니다.
//!
//! # 사용 예시
//! ```ignore
//! use unilog_pipeline::parser::JsonLogParser;
//! use unilog_core::pipeline::LogParser;
//!
//! let parser = JsonLogParser::new();
//! let record = parser.parse(r#"{"level":"ERROR","message":"disk full"}"#)?;
//! assert_eq!(record.level(), "ERROR");
//! ```

use serde_json::Value;
use unilog_core::error::UnilogError;
use unilog_core::pipeline::LogParser;
use unilog_core::types::Record;

use super::{prepare_line, timestamp};
use crate::error::LogPipelineError;

const FORMAT: &str = "json";

/// 기본 최대 입력 크기 (1MB)
const DEFAULT_MAX_INPUT_SIZE: usize = 1024 * 1024;

/// JSON 로그 파서
pub struct JsonLogParser {
    /// 최대 허용 입력 크기 (바이트)
    max_input_size: usize,
}

impl JsonLogParser {
    pub fn new() -> Self {
        Self {
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
        }
    }

    /// 최대 입력 크기를 설정합니다.
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = size;
        self
    }

    fn parse_json(&self, line: &str) -> Result<Record, LogPipelineError> {
        let line = prepare_line(FORMAT, line, self.max_input_size)?;

        let value: Value = serde_json::from_str(line)
            .map_err(|e| LogPipelineError::parse(FORMAT, e.column(), e.to_string()))?;

        let mut record = Record::try_from(value).map_err(|other| {
            LogPipelineError::parse(
                FORMAT,
                0,
                format!("top-level value must be an object, got {}", kind_of(&other)),
            )
        })?;

        let normalized = record.timestamp().and_then(timestamp::normalize_iso8601);
        if let Some(ts) = normalized {
            record.insert("timestamp", ts);
        }

        Ok(record)
    }
}

impl Default for JsonLogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LogParser for JsonLogParser {
    fn format_name(&self) -> &str {
        FORMAT
    }

    fn parse(&self, line: &str) -> Result<Record, UnilogError> {
        self.parse_json(line).map_err(UnilogError::from)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
