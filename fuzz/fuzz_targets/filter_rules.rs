#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

use unilog_core::types::Record;
use unilog_pipeline::filter::{FilterEngine, FilterRule, RuleSet};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 규칙 목록 (최대 8개로 제한)
    rules: Vec<FuzzRule>,
    /// 레코드 필드
    fields: Vec<(FuzzField, FuzzValue)>,
}

#[derive(Arbitrary, Debug)]
struct FuzzRule {
    field: FuzzField,
    equals: Option<FuzzValue>,
    one_of: Option<Vec<FuzzValue>>,
    regex: Option<String>,
    gt: Option<f64>,
    lt: Option<f64>,
}

#[derive(Arbitrary, Debug, Clone, Copy)]
enum FuzzField {
    Level,
    Status,
    Message,
    Missing,
}

#[derive(Arbitrary, Debug, Clone)]
enum FuzzValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FuzzField {
    fn as_str(self) -> &'static str {
        match self {
            FuzzField::Level => "level",
            FuzzField::Status => "status",
            FuzzField::Message => "message",
            FuzzField::Missing => "missing",
        }
    }
}

impl From<FuzzValue> for Value {
    fn from(value: FuzzValue) -> Self {
        match value {
            FuzzValue::Null => Value::Null,
            FuzzValue::Bool(b) => Value::Bool(b),
            FuzzValue::Int(n) => Value::from(n),
            FuzzValue::Float(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
            FuzzValue::Text(s) => Value::String(s),
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    let mut rules = RuleSet::new();
    for r in input.rules.into_iter().take(8) {
        let mut rule = FilterRule::new(r.field.as_str());
        rule.equals = r.equals.map(Value::from);
        rule.one_of = r.one_of.map(|vs| vs.into_iter().map(Value::from).collect());
        rule.regex = r.regex;
        rule.gt = r.gt;
        rule.lt = r.lt;
        // 검증 실패는 크래시가 아님
        let _ = rules.add_rule(rule);
    }

    let record: Record = input
        .fields
        .into_iter()
        .map(|(field, value)| (field.as_str().to_owned(), Value::from(value)))
        .collect();

    // 같은 입력에 대한 평가는 항상 같은 결과
    let first = FilterEngine::apply(&record, &rules);
    assert_eq!(first, FilterEngine::apply(&record, &rules));
});
