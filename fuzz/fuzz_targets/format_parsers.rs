#![no_main]

use libfuzzer_sys::fuzz_target;
use unilog_core::pipeline::LogParser;
use unilog_pipeline::parser::{AccessLogParser, GenericParser, JsonLogParser, SyslogParser};

fuzz_target!(|data: &[u8]| {
    // 파서는 &str을 받으므로 손실 변환
    let line = String::from_utf8_lossy(data);

    let _ = JsonLogParser::new().parse(&line);
    let _ = AccessLogParser::apache().parse(&line);
    let _ = SyslogParser::new().parse(&line);
    let _ = GenericParser::new().parse(&line);
});
