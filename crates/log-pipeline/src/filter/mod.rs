//! 필터 엔진 -- 선언적 규칙으로 레코드 수락/거부
//!
//! 규칙은 선언 순서대로 평가되며 AND로 결합됩니다.
//! 처음 실패한 규칙에서 평가를 멈추고 레코드를 거부합니다.
//!
//! # 규칙 목록
//! - [`RuleSet`]: 호출자가 소유하는 순서 있는 규칙 목록
//! - [`SharedRuleSet`]: 워커들이 공유하는 잠금 보호 규칙 목록.
//!   비어 있는 상태로 생성되고 `add_rule`/`clear_rules`로만 변경되며
//!   암묵적으로 초기화되지 않습니다.
//!
//! # 사용 예시
//! ```ignore
//! let mut rules = RuleSet::new();
//! rules.add_rule(FilterRule::new("status").gt(399.0))?;
//!
//! match FilterEngine::apply(&record, &rules) {
//!     FilterOutcome::Accepted => sink(record),
//!     FilterOutcome::Rejected { .. } => {}
//! }
//! ```

pub mod loader;
pub mod matcher;
pub mod types;

pub use loader::RuleLoader;
pub use matcher::CompiledRule;
pub use types::FilterRule;

use std::sync::{Arc, PoisonError, RwLock};

use unilog_core::config::FilterRuleConfig;
use unilog_core::types::Record;

use crate::error::LogPipelineError;

/// 필터 평가 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// 모든 규칙 만족
    Accepted,
    /// `rule_index`번째 규칙에서 거부
    Rejected { rule_index: usize },
}

impl FilterOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// 순서 있는 컴파일된 규칙 목록
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 규칙 목록으로부터 생성합니다. 하나라도 잘못되면 에러입니다.
    pub fn from_rules(
        rules: impl IntoIterator<Item = FilterRule>,
    ) -> Result<Self, LogPipelineError> {
        let mut set = Self::new();
        for rule in rules {
            set.add_rule(rule)?;
        }
        Ok(set)
    }

    /// 설정의 인라인 규칙으로부터 생성합니다.
    pub fn from_config(filters: &[FilterRuleConfig]) -> Result<Self, LogPipelineError> {
        Self::from_rules(filters.iter().map(FilterRule::from))
    }

    /// 규칙을 끝에 추가합니다. 정규식은 여기서 컴파일됩니다.
    pub fn add_rule(&mut self, rule: FilterRule) -> Result<(), LogPipelineError> {
        let compiled = CompiledRule::compile(rule)?;
        tracing::debug!(field = %compiled.rule().field, "added filter rule");
        self.rules.push(compiled);
        Ok(())
    }

    /// 모든 규칙을 제거합니다.
    pub fn clear_rules(&mut self) {
        self.rules.clear();
        tracing::debug!("cleared filter rules");
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterRule> {
        self.rules.iter().map(CompiledRule::rule)
    }
}

/// 필터 엔진
///
/// 상태가 없으며 평가는 레코드와 규칙 목록을 변경하지 않습니다.
pub struct FilterEngine;

impl FilterEngine {
    /// 레코드를 규칙 목록에 대해 평가합니다.
    pub fn apply(record: &Record, rules: &RuleSet) -> FilterOutcome {
        match rules.rules.iter().position(|rule| !rule.matches(record)) {
            Some(rule_index) => FilterOutcome::Rejected { rule_index },
            None => FilterOutcome::Accepted,
        }
    }
}

/// 워커 간 공유되는 규칙 목록
///
/// 복제본은 같은 목록을 가리킵니다. 평가는 읽기 잠금, 변경은 쓰기 잠금을 사용하므로
/// 실행 중 변경이 평가와 경합하지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct SharedRuleSet {
    inner: Arc<RwLock<RuleSet>>,
}

impl SharedRuleSet {
    /// 빈 공유 목록을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rule_set(rules: RuleSet) -> Self {
        Self {
            inner: Arc::new(RwLock::new(rules)),
        }
    }

    pub fn add_rule(&self, rule: FilterRule) -> Result<(), LogPipelineError> {
        // 컴파일은 잠금 밖에서
        let compiled = CompiledRule::compile(rule)?;
        let mut rules = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(field = %compiled.rule().field, "added filter rule");
        rules.rules.push(compiled);
        Ok(())
    }

    pub fn clear_rules(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .rules
            .clear();
        tracing::info!("cleared filter rules");
    }

    /// 목록 전체를 교체합니다.
    pub fn replace(&self, rules: RuleSet) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = rules;
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 현재 목록의 복사본
    pub fn snapshot(&self) -> RuleSet {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// 읽기 잠금 아래에서 레코드를 평가합니다.
    pub fn apply(&self, record: &Record) -> FilterOutcome {
        let rules = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        FilterEngine::apply(record, &rules)
    }
}
