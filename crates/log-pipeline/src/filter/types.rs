//! 필터 규칙 데이터 구조

use serde::{Deserialize, Serialize};
use serde_json::Value;
use unilog_core::config::FilterRuleConfig;

use crate::error::LogPipelineError;

/// 필터 규칙
///
/// 레코드에 `field`가 없으면 규칙은 건너뜁니다(만족으로 간주).
/// 필드가 있으면 지정된 모든 조건이 성립해야 합니다.
///
/// ```yaml
/// - field: status
///   gt: 399
/// - field: level
///   in: [ERROR, CRITICAL]
/// - field: message
///   regex: "timeout|failed"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterRule {
    /// 검사할 필드 이름
    pub field: String,
    /// 값이 정확히 일치해야 함
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    /// 값이 목록 중 하나여야 함
    #[serde(default, rename = "in", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Value>>,
    /// 값의 문자열 표현에서 검색할 정규식 (비고정)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// 숫자로 변환한 값이 이보다 커야 함
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    /// 숫자로 변환한 값이 이보다 작아야 함
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
}

impl FilterRule {
    /// 조건 없는 규칙을 생성합니다.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    pub fn equals(mut self, value: impl Into<Value>) -> Self {
        self.equals = Some(value.into());
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn regex(mut self, pattern: impl Into<String>) -> Self {
        self.regex = Some(pattern.into());
        self
    }

    pub fn gt(mut self, bound: f64) -> Self {
        self.gt = Some(bound);
        self
    }

    pub fn lt(mut self, bound: f64) -> Self {
        self.lt = Some(bound);
        self
    }

    /// 조건이 하나라도 있는지
    pub fn has_conditions(&self) -> bool {
        self.equals.is_some()
            || self.one_of.is_some()
            || self.regex.is_some()
            || self.gt.is_some()
            || self.lt.is_some()
    }

    /// 규칙 유효성을 검증합니다. 정규식 문법은 컴파일 시점에 검사합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.field.trim().is_empty() {
            return Err(self.invalid("field must not be empty"));
        }

        if let Some(value) = &self.equals {
            if !is_scalar(value) {
                return Err(self.invalid("equals must be a scalar"));
            }
        }

        if let Some(values) = &self.one_of {
            if let Some(idx) = values.iter().position(|v| !is_scalar(v)) {
                return Err(self.invalid(format!("in[{idx}] must be a scalar")));
            }
        }

        for (name, bound) in [("gt", self.gt), ("lt", self.lt)] {
            if bound.is_some_and(|b| !b.is_finite()) {
                return Err(self.invalid(format!("{name} must be a finite number")));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> LogPipelineError {
        LogPipelineError::RuleValidation {
            field: self.field.clone(),
            reason: reason.into(),
        }
    }
}

impl From<&FilterRuleConfig> for FilterRule {
    fn from(config: &FilterRuleConfig) -> Self {
        Self {
            field: config.field.clone(),
            equals: config.equals.clone(),
            one_of: config.one_of.clone(),
            regex: config.regex.clone(),
            gt: config.gt,
            lt: config.lt,
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}
