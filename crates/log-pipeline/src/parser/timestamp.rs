//! 타임스탬프 정규화
//!
//! 파서마다 다른 입력 형식을 하나의 ISO-8601 표현으로 맞춥니다.
//!
//! 출력 형식: `YYYY-MM-DDTHH:MM:SS[.ffffff][±HH:MM]`
//! - 소수 초는 0이 아닐 때만 마이크로초 6자리로 출력
//! - 오프셋은 입력에 있었을 때만 출력 (`Z`는 `+00:00`)

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};

/// 오프셋이 있는 입력 형식 (RFC 3339 외)
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// 오프셋이 없는 입력 형식
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Apache/Nginx 접근 로그 날짜 형식 (`10/Oct/2000:13:55:36 -0700`)
pub const ACCESS_LOG_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// ISO-8601 계열 문자열을 정규화합니다. 해석할 수 없으면 `None`.
pub fn normalize_iso8601(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(render_offset(&dt));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, fmt) {
            return Some(render_offset(&dt));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(render_naive(&dt));
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| render_naive(&dt))
}

/// 접근 로그의 대괄호 안 날짜를 정규화합니다.
pub fn normalize_access_log(input: &str) -> Option<String> {
    DateTime::parse_from_str(input.trim(), ACCESS_LOG_FORMAT)
        .ok()
        .map(|dt| render_offset(&dt))
}

/// 연도가 없는 RFC 3164 타임스탬프를 주어진 연도로 보완하여 정규화합니다.
///
/// `month`는 `Jan` 형식, `time`은 `HH:MM:SS` 형식입니다.
pub fn normalize_bsd_syslog(month: &str, day: &str, time: &str, year: i32) -> Option<String> {
    let candidate = format!("{month} {day:0>2} {year} {time}");
    NaiveDateTime::parse_from_str(&candidate, "%b %d %Y %H:%M:%S")
        .ok()
        .map(|dt| render_naive(&dt))
}

fn render_naive(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

fn render_offset(dt: &DateTime<FixedOffset>) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f%:z").to_string()
    }
}
