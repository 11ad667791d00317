//! Apache/Nginx 접근 로그 파서
//!
//! combined 형식을 먼저 시도하고, 실패하면 common(CLF) 형식으로 파싱합니다.
//!
//! ```text
//! common:   127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /a.gif HTTP/1.0" 200 2326
//! combined: <common> "http://referer/" "Mozilla/4.08"
//! ```
//!
//! 결과 필드: `ip, ident, user, status, size, method, path, protocol, timestamp`
//! (+ combined일 때 `referer, user_agent`)

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Number, Value};
use unilog_core::error::UnilogError;
use unilog_core::pipeline::LogParser;
use unilog_core::types::Record;

use super::{prepare_line, timestamp};
use crate::error::LogPipelineError;

/// 접근 로그 최대 입력 크기 (64KB)
const MAX_INPUT_SIZE: usize = 64 * 1024;

static COMMON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?P<ip>\S+) (?P<ident>\S+) (?P<user>\S+) \[(?P<time>.*?)\] "(?P<request>.*?)" (?P<status>\d{3}) (?P<size>\S+)"#,
    )
    .expect("failed creating access log regex")
});

static COMBINED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?P<ip>\S+) (?P<ident>\S+) (?P<user>\S+) \[(?P<time>.*?)\] "(?P<request>.*?)" (?P<status>\d{3}) (?P<size>\S+) "(?P<referer>.*?)" "(?P<user_agent>.*?)""#,
    )
    .expect("failed creating access log regex")
});

/// 접근 로그 파서
///
/// `apache`와 `nginx` 두 이름으로 등록되며 같은 문법을 사용합니다.
pub struct AccessLogParser {
    format: &'static str,
}

impl AccessLogParser {
    /// `apache` 이름의 파서
    pub fn apache() -> Self {
        Self { format: "apache" }
    }

    /// `nginx` 이름의 파서
    pub fn nginx() -> Self {
        Self { format: "nginx" }
    }

    fn parse_access(&self, line: &str) -> Result<Record, LogPipelineError> {
        let line = prepare_line(self.format, line, MAX_INPUT_SIZE)?;

        let (caps, combined) = match COMBINED_RE.captures(line) {
            Some(caps) => (caps, true),
            None => match COMMON_RE.captures(line) {
                Some(caps) => (caps, false),
                None => {
                    return Err(LogPipelineError::parse(
                        self.format,
                        0,
                        "line matches neither combined nor common log format",
                    ));
                }
            },
        };

        let mut record = Record::new();
        for name in ["ip", "ident", "user"] {
            record.insert(name, group(&caps, name));
        }

        let status = group(&caps, "status");
        let status: u16 = status
            .parse()
            .map_err(|_| LogPipelineError::parse(self.format, 0, "invalid status code"))?;
        record.insert("status", status);
        record.insert("size", size_value(group(&caps, "size")));

        if combined {
            record.insert("referer", group(&caps, "referer"));
            record.insert("user_agent", group(&caps, "user_agent"));
        }

        let tokens: Vec<&str> = group(&caps, "request").split_whitespace().collect();
        match tokens.as_slice() {
            [method, path, protocol] => {
                record.insert("method", *method);
                record.insert("path", *path);
                record.insert("protocol", *protocol);
            }
            _ => {
                for name in ["method", "path", "protocol"] {
                    record.insert(name, Value::Null);
                }
            }
        }

        let ts = timestamp::normalize_access_log(group(&caps, "time"));
        record.insert("timestamp", ts.map_or(Value::Null, Value::String));

        Ok(record)
    }
}

impl LogParser for AccessLogParser {
    fn format_name(&self) -> &str {
        self.format
    }

    fn parse(&self, line: &str) -> Result<Record, UnilogError> {
        self.parse_access(line).map_err(UnilogError::from)
    }
}

fn group<'a>(caps: &Captures<'a>, name: &str) -> &'a str {
    caps.name(name).map_or("", |m| m.as_str())
}

/// 전부 숫자인 크기 토큰만 정수로 변환합니다. `-` 등은 null.
fn size_value(raw: &str) -> Value {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Value::Null;
    }
    match raw.parse::<u64>() {
        Ok(n) => Value::Number(n.into()),
        // u64 범위를 넘는 숫자 토큰
        Err(_) => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COMMON: &str =
        r#"127.0.0.1 - - [10/Oct/2000:13:55:36 +0000] "GET /x HTTP/1.0" 200 2326"#;
    const COMBINED: &str = r#"10.0.0.7 - alice [15/Jan/2024:12:00:00 +0900] "POST /api/login HTTP/1.1" 401 - "https://example.com/" "curl/8.4.0""#;

    #[test]
    fn parses_common_format() {
        let record = AccessLogParser::apache().parse(COMMON).unwrap();
        assert_eq!(record.get("ip"), Some(&json!("127.0.0.1")));
        assert_eq!(record.get("status"), Some(&json!(200)));
        assert_eq!(record.get("size"), Some(&json!(2326)));
        assert_eq!(record.get("method"), Some(&json!("GET")));
        assert_eq!(record.get("path"), Some(&json!("/x")));
        assert_eq!(record.get("protocol"), Some(&json!("HTTP/1.0")));
        assert_eq!(record.timestamp(), Some("2000-10-10T13:55:36+00:00"));
        assert!(!record.contains("referer"));
        assert!(!record.contains("time"));
        assert!(!record.contains("request"));
    }

    #[test]
    fn parses_combined_format() {
        let record = AccessLogParser::nginx().parse(COMBINED).unwrap();
        assert_eq!(record.get("user"), Some(&json!("alice")));
        assert_eq!(record.get("status"), Some(&json!(401)));
        assert_eq!(record.get("size"), Some(&Value::Null));
        assert_eq!(record.get("referer"), Some(&json!("https://example.com/")));
        assert_eq!(record.get("user_agent"), Some(&json!("curl/8.4.0")));
        assert_eq!(record.timestamp(), Some("2024-01-15T12:00:00+09:00"));
    }

    #[test]
    fn malformed_request_nulls_all_three_parts() {
        let line = r#"127.0.0.1 - - [10/Oct/2000:13:55:36 +0000] "-" 400 0"#;
        let record = AccessLogParser::apache().parse(line).unwrap();
        for name in ["method", "path", "protocol"] {
            assert_eq!(record.get(name), Some(&Value::Null), "{name}");
        }
        assert_eq!(record.get("size"), Some(&json!(0)));
    }

    #[test]
    fn bad_date_is_null_not_failure() {
        let line = r#"127.0.0.1 - - [not a date] "GET / HTTP/1.1" 200 5"#;
        let record = AccessLogParser::apache().parse(line).unwrap();
        assert_eq!(record.get("timestamp"), Some(&Value::Null));
    }

    #[test]
    fn non_matching_line_fails() {
        let parser = AccessLogParser::apache();
        assert!(parser.parse("just some text").is_err());
        assert!(parser.parse("").is_err());
    }

    #[test]
    fn format_names_differ() {
        assert_eq!(AccessLogParser::apache().format_name(), "apache");
        assert_eq!(AccessLogParser::nginx().format_name(), "nginx");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn status_and_size_are_typed(
                request in "[A-Za-z0-9/. ]{0,30}",
                status in 100u16..600,
                size in "[0-9a-z-]{1,6}",
            ) {
                let line = format!(
                    r#"10.0.0.1 - - [10/Oct/2000:13:55:36 +0000] "{request}" {status} {size}"#
                );
                let record = AccessLogParser::apache().parse(&line).unwrap();

                prop_assert_eq!(record.get("status"), Some(&Value::from(status)));
                let size_is_int = size.bytes().all(|b| b.is_ascii_digit());
                prop_assert_eq!(record.get("size").is_some_and(Value::is_u64), size_is_int);
                prop_assert_eq!(record.get("size") == Some(&Value::Null), !size_is_int);

                let three_tokens = request.split_whitespace().count() == 3;
                for name in ["method", "path", "protocol"] {
                    prop_assert_eq!(record.get(name) == Some(&Value::Null), !three_tokens);
                }
            }

            #[test]
            fn parse_arbitrary_text_does_not_panic(line in ".{0,300}") {
                let _ = AccessLogParser::nginx().parse(&line);
            }
        }
    }
}
