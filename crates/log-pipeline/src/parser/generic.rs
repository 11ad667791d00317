//! 범용 파서 -- 사용자 패턴 또는 key=value 토큰화
//!
//! 1. 패턴이 주어지면 라인 시작에 고정하여 매칭하고, 이름 있는 그룹을 필드로 만듭니다.
//!    매칭되지 않은 선택적 그룹은 null입니다.
//! 2. 패턴이 없거나 매칭에 실패하면 공백으로 나눈 `key=value` 토큰을 필드로 만듭니다.
//!
//! 어느 쪽도 필드를 추출하지 못하면 파싱 실패입니다.
//! 필드 이름 변경 맵은 추출 후 적용되며, 문자열 `timestamp`는 가능하면 정규화합니다.

use regex::Regex;
use serde_json::Value;
use unilog_core::error::UnilogError;
use unilog_core::pipeline::LogParser;
use unilog_core::types::Record;

use super::{prepare_line, timestamp};
use crate::error::LogPipelineError;

const FORMAT: &str = "generic";

/// 범용 최대 입력 크기 (64KB)
const MAX_INPUT_SIZE: usize = 64 * 1024;

/// 범용 파서
#[derive(Default)]
pub struct GenericParser {
    pattern: Option<Regex>,
    /// 설정 순서대로 적용되는 (원래 이름, 새 이름)
    field_map: Vec<(String, String)>,
}

impl GenericParser {
    /// key=value 토큰화만 사용하는 파서를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 이름 있는 캡처 그룹 패턴을 설정합니다.
    ///
    /// 패턴은 라인 시작에 고정됩니다. 이름 있는 그룹이 없으면 에러입니다.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, LogPipelineError> {
        let anchored = if pattern.starts_with('^') {
            pattern.to_owned()
        } else {
            format!("^(?:{pattern})")
        };
        let regex = Regex::new(&anchored)?;
        if regex.capture_names().flatten().next().is_none() {
            return Err(LogPipelineError::Config {
                field: "generic.pattern".to_owned(),
                reason: "pattern must contain at least one named group".to_owned(),
            });
        }
        self.pattern = Some(regex);
        Ok(self)
    }

    /// 필드 이름 변경 맵(원래 이름 → 새 이름)을 설정합니다.
    ///
    /// 변경은 주어진 순서대로 적용되므로 `a→b, b→c`는 `a`를 `c`로 옮깁니다.
    /// 같은 원래 이름이 다시 나오면 처음 위치에서 새 이름만 바뀝니다.
    pub fn with_field_map<I, K, V>(mut self, map: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.field_map.clear();
        for (from, to) in map {
            let (from, to) = (from.into(), to.into());
            match self.field_map.iter_mut().find(|(existing, _)| *existing == from) {
                Some(entry) => entry.1 = to,
                None => self.field_map.push((from, to)),
            }
        }
        self
    }

    fn parse_generic(&self, line: &str) -> Result<Record, LogPipelineError> {
        let line = prepare_line(FORMAT, line, MAX_INPUT_SIZE)?;

        let mut record = self
            .pattern_fields(line)
            .unwrap_or_else(|| key_value_fields(line));

        if record.is_empty() {
            return Err(LogPipelineError::parse(
                FORMAT,
                0,
                "line did not match the pattern and has no key=value pairs",
            ));
        }

        for (from, to) in &self.field_map {
            if let Some(value) = record.remove(from) {
                record.insert(to.clone(), value);
            }
        }

        let normalized = record.timestamp().and_then(timestamp::normalize_iso8601);
        if let Some(ts) = normalized {
            record.insert("timestamp", ts);
        }

        Ok(record)
    }

    /// 패턴이 있고 매칭되면 그룹 필드를 반환합니다.
    fn pattern_fields(&self, line: &str) -> Option<Record> {
        let regex = self.pattern.as_ref()?;
        let caps = regex.captures(line)?;
        let record = regex
            .capture_names()
            .flatten()
            .map(|name| {
                let value = caps
                    .name(name)
                    .map_or(Value::Null, |m| Value::from(m.as_str()));
                (name.to_owned(), value)
            })
            .collect();
        Some(record)
    }
}

impl LogParser for GenericParser {
    fn format_name(&self) -> &str {
        FORMAT
    }

    fn parse(&self, line: &str) -> Result<Record, UnilogError> {
        self.parse_generic(line).map_err(UnilogError::from)
    }
}

/// 공백 구분 `key=value` 토큰을 필드로 만듭니다. 값은 첫 `=` 이후 전부입니다.
fn key_value_fields(line: &str) -> Record {
    line.split_whitespace()
        .filter_map(|token| token.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_owned(), Value::from(value)))
        .collect()
}
