#![no_main]

use libfuzzer_sys::fuzz_target;
use unilog_pipeline::filter::{RuleLoader, RuleSet};

fuzz_target!(|data: &[u8]| {
    // YAML 파서는 &str을 받으므로 UTF-8 변환 필요
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        // 정규식 컴파일 실패는 에러로 반환되어야 함
        if let Ok(rules) = RuleLoader::parse_yaml(yaml_str, "fuzz-input.yml") {
            let _ = RuleSet::from_rules(rules);
        }
    }
});
