//! Syslog 파서 (RFC 5424 우선, RFC 3164 fallback)
//!
//! # RFC 5424 메시지 형식
//! ```text
//! <PRI>VERSION TIMESTAMP HOSTNAME APP-NAME PROCID MSGID STRUCTURED-DATA MSG
//! ```
//!
//! # RFC 3164 (BSD) 메시지 형식
//! ```text
//! [<PRI>]Mmm dd HH:MM:SS HOSTNAME APP[PID]: MSG
//! ```
//!
//! RFC 3164 타임스탬프에는 연도가 없으므로 현재 UTC 연도로 보완합니다.
//! 타임스탬프 해석 실패는 레코드 실패가 아니라 `timestamp: null`입니다.
//!
//! # 사용 예시
//! ```ignore
//! use unilog_pipeline::parser::SyslogParser;
//! use unilog_core::pipeline::LogParser;
//!
//! let parser = SyslogParser::new();
//! let record = parser.parse("<34>1 2024-01-15T12:00:00Z host sshd 1234 - - Failed password")?;
//! assert_eq!(record.get_str("app"), Some("sshd"));
//! ```

use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use regex::{Captures, Regex};
use serde_json::Value;
use unilog_core::error::UnilogError;
use unilog_core::pipeline::LogParser;
use unilog_core::types::Record;

use super::{prepare_line, timestamp};
use crate::error::LogPipelineError;

const FORMAT: &str = "syslog";

/// 유효한 최대 PRI 값: facility 최댓값 23 * 8 + severity 최댓값 7
const MAX_SYSLOG_PRI: u16 = 191;

static RFC5424_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^<(?P<priority>\d+)>(?P<version>\d+) (?P<timestamp>[\d\-T:.Z+]+) (?P<host>\S+) (?P<app>\S+) (?P<pid>\S+) (?P<msgid>\S+) (?P<structured_data>-|\[.*?\]) (?P<message>.+)",
    )
    .expect("failed creating RFC 5424 regex")
});

static RFC3164_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:<(?P<priority>\d+)>)?(?P<month>\w{3})\s+(?P<day>\d{1,2})\s+(?P<time>\d{2}:\d{2}:\d{2})\s+(?P<host>\S+)\s+(?P<app>\S+?)(?:\[(?P<pid>\d+)\])?:\s+(?P<message>.+)",
    )
    .expect("failed creating RFC 3164 regex")
});

/// Syslog 파서
///
/// ## 지원 기능
/// - PRI 필드에서 facility/severity 디코딩
/// - severity에서 `level` 도출 (레코드에 `level`이 없을 때)
/// - RFC 5424 타임스탬프 정규화 (`Z` → `+00:00`)
/// - RFC 3164 타임스탬프 연도 보완
pub struct SyslogParser {
    /// 최대 허용 입력 크기 (바이트)
    max_input_size: usize,
    /// RFC 3164 연도 고정값 (테스트용, None이면 현재 UTC 연도)
    fixed_year: Option<i32>,
}

impl SyslogParser {
    /// 기본 설정으로 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self {
            max_input_size: 64 * 1024, // 64KB
            fixed_year: None,
        }
    }

    /// 최대 입력 크기를 설정합니다.
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = size;
        self
    }

    /// RFC 3164 타임스탬프에 사용할 연도를 고정합니다.
    pub fn with_year(mut self, year: i32) -> Self {
        self.fixed_year = Some(year);
        self
    }

    /// PRI 값에서 facility와 severity를 분리합니다.
    ///
    /// PRI = facility * 8 + severity
    fn decode_pri(pri: u16) -> (u16, u16) {
        (pri / 8, pri % 8)
    }

    /// Syslog severity를 레벨 문자열로 매핑합니다.
    ///
    /// - 0 Emergency, 1 Alert, 2 Critical -> CRITICAL
    /// - 3 Error -> ERROR
    /// - 4 Warning -> WARN
    /// - 5 Notice, 6 Informational -> INFO
    /// - 7 Debug -> DEBUG
    fn severity_to_level(severity: u16) -> &'static str {
        match severity {
            0..=2 => "CRITICAL",
            3 => "ERROR",
            4 => "WARN",
            5 | 6 => "INFO",
            _ => "DEBUG",
        }
    }

    fn parse_syslog(&self, line: &str) -> Result<Record, LogPipelineError> {
        let line = prepare_line(FORMAT, line, self.max_input_size)?;

        let mut record = if let Some(caps) = RFC5424_RE.captures(line) {
            Self::rfc5424_record(&caps)?
        } else if let Some(caps) = RFC3164_RE.captures(line) {
            self.rfc3164_record(&caps)?
        } else {
            return Err(LogPipelineError::parse(
                FORMAT,
                0,
                "line matches neither RFC 5424 nor RFC 3164",
            ));
        };

        Self::apply_priority(&mut record)?;
        Ok(record)
    }

    fn rfc5424_record(caps: &Captures<'_>) -> Result<Record, LogPipelineError> {
        let mut record = Record::new();

        let version: u32 = group(caps, "version")
            .parse()
            .map_err(|_| LogPipelineError::parse(FORMAT, 0, "invalid VERSION field"))?;
        record.insert("priority", group(caps, "priority"));
        record.insert("version", version);

        let raw_ts = group(caps, "timestamp").replace('Z', "+00:00");
        let ts = timestamp::normalize_iso8601(&raw_ts);
        record.insert("timestamp", ts.map_or(Value::Null, Value::String));

        for name in ["host", "app", "pid", "msgid", "structured_data", "message"] {
            record.insert(name, group(caps, name));
        }
        Ok(record)
    }

    fn rfc3164_record(&self, caps: &Captures<'_>) -> Result<Record, LogPipelineError> {
        let mut record = Record::new();

        if let Some(pri) = caps.name("priority") {
            record.insert("priority", pri.as_str());
        }
        for name in ["month", "day", "time", "host", "app"] {
            record.insert(name, group(caps, name));
        }
        record.insert(
            "pid",
            caps.name("pid")
                .map_or(Value::Null, |m| Value::from(m.as_str())),
        );
        record.insert("message", group(caps, "message"));

        let year = self.fixed_year.unwrap_or_else(|| Utc::now().year());
        let ts = timestamp::normalize_bsd_syslog(
            group(caps, "month"),
            group(caps, "day"),
            group(caps, "time"),
            year,
        );
        record.insert("timestamp", ts.map_or(Value::Null, Value::String));
        Ok(record)
    }

    /// `priority` 문자열을 정수로 바꾸고 facility/severity/level을 채웁니다.
    fn apply_priority(record: &mut Record) -> Result<(), LogPipelineError> {
        let Some(raw) = record.get_str("priority") else {
            return Ok(());
        };

        let pri: u16 = raw
            .parse()
            .ok()
            .filter(|p| *p <= MAX_SYSLOG_PRI)
            .ok_or_else(|| {
                LogPipelineError::parse(
                    FORMAT,
                    1,
                    format!("PRI value '{raw}' out of valid range (0-{MAX_SYSLOG_PRI})"),
                )
            })?;

        let (facility, severity) = Self::decode_pri(pri);
        record.insert("priority", pri);
        record.insert("facility", facility);
        record.insert("severity", severity);
        if !record.contains("level") {
            record.insert("level", Self::severity_to_level(severity));
        }
        Ok(())
    }
}

impl Default for SyslogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LogParser for SyslogParser {
    fn format_name(&self) -> &str {
        FORMAT
    }

    fn parse(&self, line: &str) -> Result<Record, UnilogError> {
        self.parse_syslog(line).map_err(UnilogError::from)
    }
}

fn group<'a>(caps: &Captures<'a>, name: &str) -> &'a str {
    caps.name(name).map_or("", |m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_rfc5424_basic() {
        let parser = SyslogParser::new();
        let record = parser
            .parse("<34>1 2024-01-15T12:00:00Z myhost sshd 1234 - - Failed password for root")
            .unwrap();
        assert_eq!(record.get("priority"), Some(&json!(34)));
        assert_eq!(record.get("version"), Some(&json!(1)));
        assert_eq!(record.get_str("host"), Some("myhost"));
        assert_eq!(record.get_str("app"), Some("sshd"));
        assert_eq!(record.get_str("pid"), Some("1234"));
        assert_eq!(record.get_str("msgid"), Some("-"));
        assert_eq!(record.get_str("structured_data"), Some("-"));
        assert_eq!(record.message(), "Failed password for root");
        assert_eq!(record.timestamp(), Some("2024-01-15T12:00:00+00:00"));
    }

    #[test]
    fn parse_rfc5424_with_structured_data_and_offset() {
        let parser = SyslogParser::new();
        let record = parser
            .parse(r#"<165>1 2024-01-15T12:00:00.123+09:00 web nginx 99 ID47 [req path="/x"] slow request"#)
            .unwrap();
        assert_eq!(record.get_str("structured_data"), Some(r#"[req path="/x"]"#));
        assert_eq!(record.timestamp(), Some("2024-01-15T12:00:00.123000+09:00"));
        // 165 = local4(20) * 8 + notice(5)
        assert_eq!(record.get("facility"), Some(&json!(20)));
        assert_eq!(record.get("severity"), Some(&json!(5)));
        assert_eq!(record.level(), "INFO");
    }

    #[test]
    fn rfc5424_nil_timestamp_is_null() {
        let parser = SyslogParser::new();
        let record = parser.parse("<14>1 - host app - - - hello").unwrap();
        assert_eq!(record.get("timestamp"), Some(&Value::Null));
        assert_eq!(record.message(), "hello");
    }

    #[test]
    fn parse_rfc3164_with_pid() {
        let parser = SyslogParser::new().with_year(2024);
        let record = parser
            .parse("Jan  5 08:15:00 gateway sshd[4242]: Accepted publickey for deploy")
            .unwrap();
        assert_eq!(record.get_str("month"), Some("Jan"));
        assert_eq!(record.get_str("day"), Some("5"));
        assert_eq!(record.get_str("host"), Some("gateway"));
        assert_eq!(record.get_str("app"), Some("sshd"));
        assert_eq!(record.get_str("pid"), Some("4242"));
        assert_eq!(record.timestamp(), Some("2024-01-05T08:15:00"));
        assert!(!record.contains("priority"));
        assert!(!record.contains("level"));
    }

    #[test]
    fn parse_rfc3164_without_pid_has_null_pid() {
        let parser = SyslogParser::new().with_year(2024);
        let record = parser.parse("<11>Mar 10 10:00:00 db kernel: oom-killer invoked").unwrap();
        assert_eq!(record.get("pid"), Some(&Value::Null));
        assert_eq!(record.get("priority"), Some(&json!(11)));
        assert_eq!(record.level(), "ERROR");
    }

    #[test]
    fn rfc3164_uses_current_year_by_default() {
        let record = SyslogParser::new()
            .parse("Jun 01 00:00:00 h app: m")
            .unwrap();
        let year = Utc::now().year().to_string();
        assert!(record.timestamp().unwrap().starts_with(&year));
    }

    #[test]
    fn severity_mapping() {
        assert_eq!(SyslogParser::severity_to_level(0), "CRITICAL");
        assert_eq!(SyslogParser::severity_to_level(2), "CRITICAL");
        assert_eq!(SyslogParser::severity_to_level(3), "ERROR");
        assert_eq!(SyslogParser::severity_to_level(4), "WARN");
        assert_eq!(SyslogParser::severity_to_level(6), "INFO");
        assert_eq!(SyslogParser::severity_to_level(7), "DEBUG");
    }

    #[test]
    fn decode_pri_values() {
        assert_eq!(SyslogParser::decode_pri(0), (0, 0));
        assert_eq!(SyslogParser::decode_pri(34), (4, 2));
        assert_eq!(SyslogParser::decode_pri(191), (23, 7));
    }

    #[test]
    fn pri_out_of_range_fails() {
        let parser = SyslogParser::new();
        assert!(parser.parse("<192>1 - host app - - - msg").is_err());
    }

    #[test]
    fn non_syslog_fails() {
        let parser = SyslogParser::new();
        assert!(parser.parse("this is not syslog").is_err());
        assert!(parser.parse("").is_err());
    }

    #[test]
    fn too_large_input_fails() {
        let parser = SyslogParser::new().with_max_input_size(16);
        assert!(parser
            .parse("<34>1 2024-01-15T12:00:00Z myhost sshd 1234 - - long message")
            .is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_arbitrary_bytes_does_not_panic(bytes in prop::collection::vec(any::<u8>(), 0..1000)) {
                let line = String::from_utf8_lossy(&bytes);
                let _ = SyslogParser::new().parse(&line);
            }

            #[test]
            fn pri_splits_into_facility_and_severity(pri in 0u8..=191) {
                let line = format!("<{pri}>1 2024-01-15T12:00:00Z host app - - - msg");
                let record = SyslogParser::new().parse(&line).unwrap();
                prop_assert_eq!(record.get("facility"), Some(&serde_json::Value::from(pri / 8)));
                prop_assert_eq!(record.get("severity"), Some(&serde_json::Value::from(pri % 8)));
            }
        }
    }
}
