#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use unilog_pipeline::parser::ParserRegistry;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 등록되지 않은 이름은 generic fallback 경로
    format: String,
    line: String,
}

fuzz_target!(|input: FuzzInput| {
    let registry = ParserRegistry::with_defaults();
    let resolved = registry.resolve(&input.format);
    assert_eq!(resolved.fell_back, !registry.contains(&input.format));
    let _ = registry.parse(&input.format, &input.line);
});
