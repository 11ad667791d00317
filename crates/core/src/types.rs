//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 파서가 생성하고, 필터와 싱크가 소비하는 [`Record`]를 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 레벨 필드가 없을 때 싱크가 사용하는 기본값
pub const DEFAULT_LEVEL: &str = "INFO";

/// 정규화된 로그 레코드
///
/// 필드 이름 → 값(문자열, 숫자, bool, null, 중첩 객체) 매핑입니다.
/// `timestamp`, `level`, `message` 세 필드는 의미상 특별하지만 필수는 아닙니다.
/// 나머지 필드는 형식별로 그대로 전달됩니다 (ip, status, host, app, pid 등).
///
/// 필터를 통과한 레코드는 싱크에 `&[Record]`로만 전달되므로 불변입니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// 빈 레코드를 생성합니다.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// 필드를 설정합니다. 기존 값이 있으면 반환합니다.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// 필드 값을 조회합니다.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// 필드를 제거하고 값을 반환합니다.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// 필드 존재 여부 (값이 null이어도 존재로 간주)
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 필드 이름 순서로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// 문자열 필드를 조회합니다. 문자열이 아니면 `None`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// 로그 레벨. 없거나 문자열이 아니면 [`DEFAULT_LEVEL`].
    pub fn level(&self) -> &str {
        self.get_str("level").unwrap_or(DEFAULT_LEVEL)
    }

    /// 로그 메시지. 없으면 빈 문자열.
    pub fn message(&self) -> &str {
        self.get_str("message").unwrap_or("")
    }

    /// 정규화된 ISO-8601 타임스탬프. 없거나 null이면 `None`.
    pub fn timestamp(&self) -> Option<&str> {
        self.get_str("timestamp")
    }

    /// 내부 맵에 대한 참조
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// 내부 맵으로 변환합니다.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.0)
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    /// JSON 객체만 레코드가 될 수 있습니다. 그 외 값은 그대로 돌려줍니다.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level(), self.message())?;
        if let Some(ts) = self.timestamp() {
            write!(f, " @ {ts}")?;
        }
        Ok(())
    }
}
