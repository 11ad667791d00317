//! 필터 규칙 파일 로더 -- YAML 규칙 목록을 디스크에서 로드합니다.

use std::path::Path;

use super::types::FilterRule;
use crate::error::LogPipelineError;

const MAX_RULE_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
const MAX_RULES_COUNT: usize = 10_000;

/// 필터 규칙 파일 로더
///
/// 파일은 규칙의 YAML 시퀀스입니다.
/// ```yaml
/// - field: level
///   in: [ERROR, CRITICAL]
/// - field: status
///   gt: 399
/// ```
pub struct RuleLoader;

impl RuleLoader {
    /// YAML 파일에서 규칙 목록을 로드합니다.
    ///
    /// # Errors
    /// - 파일을 읽을 수 없거나 10MB를 넘는 경우
    /// - YAML 문법 오류 또는 규칙 검증 실패
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Vec<FilterRule>, LogPipelineError> {
        let path = path.as_ref();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| LogPipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(LogPipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| LogPipelineError::RuleLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        let rules = Self::parse_yaml(&content, &path.display().to_string())?;
        tracing::info!(path = %path.display(), count = rules.len(), "loaded filter rules");
        Ok(rules)
    }

    /// YAML 문자열을 규칙 목록으로 파싱합니다. 빈 문서는 빈 목록입니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<Vec<FilterRule>, LogPipelineError> {
        let rules: Option<Vec<FilterRule>> =
            serde_yaml::from_str(yaml_str).map_err(|e| LogPipelineError::RuleLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;
        let rules = rules.unwrap_or_default();

        if rules.len() > MAX_RULES_COUNT {
            return Err(LogPipelineError::RuleLoad {
                path: source.to_owned(),
                reason: format!("too many rules: max {MAX_RULES_COUNT}"),
            });
        }

        for rule in &rules {
            rule.validate()?;
        }

        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_valid_yaml() {
        let yaml = r#"
- field: level
  in: [ERROR, CRITICAL]
- field: status
  gt: 399
- field: message
  regex: "timeout|failed"
"#;
        let rules = RuleLoader::parse_yaml(yaml, "rules.yml").unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].one_of, Some(vec![json!("ERROR"), json!("CRITICAL")]));
        assert_eq!(rules[1].gt, Some(399.0));
        assert_eq!(rules[2].regex.as_deref(), Some("timeout|failed"));
    }

    #[test]
    fn empty_document_is_empty_list() {
        assert!(RuleLoader::parse_yaml("", "empty.yml").unwrap().is_empty());
    }

    #[test]
    fn parse_invalid_yaml_returns_error() {
        let result = RuleLoader::parse_yaml("not: [valid: yaml: {{{", "bad.yml");
        assert!(result.is_err());
    }

    #[test]
    fn parse_yaml_with_empty_field_fails_validation() {
        let result = RuleLoader::parse_yaml("- field: \"\"\n  equals: x\n", "r.yml");
        assert!(matches!(result, Err(LogPipelineError::RuleValidation { .. })));
    }

    #[tokio::test]
    async fn load_file_reads_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, "- field: level\n  equals: ERROR\n").unwrap();
        let rules = RuleLoader::load_file(&path).await.unwrap();
        assert_eq!(rules, vec![FilterRule::new("level").equals("ERROR")]);
    }

    #[tokio::test]
    async fn load_nonexistent_file_returns_error() {
        let result = RuleLoader::load_file("/nonexistent/path/rules.yml").await;
        assert!(matches!(result, Err(LogPipelineError::RuleLoad { .. })));
    }
}
