//! 규칙 평가 로직 -- 조건 매칭 및 정규식 사전 컴파일
//!
//! [`CompiledRule`]은 규칙 추가 시점에 정규식을 한 번 컴파일합니다.
//! 잘못된 정규식은 추가 시점 에러이며 평가 중에는 실패하지 않습니다.

use std::borrow::Cow;

use regex::Regex;
use serde_json::Value;
use unilog_core::types::Record;

use super::types::FilterRule;
use crate::error::LogPipelineError;

/// 정규식이 컴파일된 규칙
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: FilterRule,
    regex: Option<Regex>,
}

impl CompiledRule {
    /// 규칙을 검증하고 정규식을 컴파일합니다.
    pub fn compile(rule: FilterRule) -> Result<Self, LogPipelineError> {
        rule.validate()?;
        let regex = rule
            .regex
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| LogPipelineError::RuleValidation {
                    field: rule.field.clone(),
                    reason: format!("invalid regex: {e}"),
                })
            })
            .transpose()?;
        Ok(Self { rule, regex })
    }

    /// 원본 규칙
    pub fn rule(&self) -> &FilterRule {
        &self.rule
    }

    /// 레코드가 규칙을 만족하는지 평가합니다.
    ///
    /// 필드가 없으면 만족입니다. 숫자 비교에서 변환에 실패하면 불만족입니다.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(value) = record.get(&self.rule.field) else {
            return true;
        };

        if let Some(expected) = &self.rule.equals {
            if !scalar_eq(value, expected) {
                return false;
            }
        }

        if let Some(candidates) = &self.rule.one_of {
            if !candidates.iter().any(|c| scalar_eq(value, c)) {
                return false;
            }
        }

        if let Some(regex) = &self.regex {
            if !regex.is_match(&text_of(value)) {
                return false;
            }
        }

        if self.rule.gt.is_some() || self.rule.lt.is_some() {
            let Some(n) = coerce_number(value) else {
                return false;
            };
            if self.rule.gt.is_some_and(|bound| n <= bound) {
                return false;
            }
            if self.rule.lt.is_some_and(|bound| n >= bound) {
                return false;
            }
        }

        true
    }
}

/// 두 숫자는 수치로 비교하고 나머지는 JSON 값 동등성으로 비교합니다.
fn scalar_eq(value: &Value, expected: &Value) -> bool {
    match (value, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => value == expected,
    }
}

/// 정규식 검색 대상: 문자열은 원문, 그 외는 JSON 표현
///
/// bool과 null은 JSON 철자(`true`, `false`, `null`)로 검색합니다.
/// `True`/`None` 같은 언어별 표기는 매칭되지 않습니다.
fn text_of(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}

/// 숫자 또는 숫자 문자열만 변환합니다. bool/null/배열/객체는 `None`.
///
/// bool은 1/0으로 보지 않습니다. `"up": true`가 `gt: 0`을 통과하지 않도록
/// 숫자가 아닌 값은 모두 거부 쪽으로 처리합니다.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
        _ => None,
    }
}
