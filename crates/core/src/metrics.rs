//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 파이프라인은 이 상수로 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `unilog_`
//! - 모듈명: `pipeline_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(unilog_core::metrics::PIPELINE_RECORDS_PARSED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 파서 형식 레이블 키 (json, apache, syslog, ...)
pub const LABEL_PARSER_FORMAT: &str = "format";

/// 싱크 이름 레이블 키 (json, s3, ...)
pub const LABEL_SINK: &str = "sink";

// ─── Pipeline 메트릭 ───────────────────────────────────────────────

/// 큐에 들어간 라인 수 (counter)
pub const PIPELINE_LINES_ENQUEUED_TOTAL: &str = "unilog_pipeline_lines_enqueued_total";

/// 파싱에 성공한 레코드 수 (counter, label: format)
pub const PIPELINE_RECORDS_PARSED_TOTAL: &str = "unilog_pipeline_records_parsed_total";

/// 파싱 실패 수 (counter, label: format)
pub const PIPELINE_PARSE_FAILURES_TOTAL: &str = "unilog_pipeline_parse_failures_total";

/// 알 수 없는 파서 이름으로 generic 파서가 대신 사용된 횟수 (counter)
pub const PIPELINE_PARSER_FALLBACKS_TOTAL: &str = "unilog_pipeline_parser_fallbacks_total";

/// 필터 규칙으로 버려진 레코드 수 (counter)
pub const PIPELINE_RECORDS_FILTERED_TOTAL: &str = "unilog_pipeline_records_filtered_total";

/// Fanout에 전달된 레코드 수 (counter)
pub const PIPELINE_RECORDS_DELIVERED_TOTAL: &str = "unilog_pipeline_records_delivered_total";

/// 싱크 쓰기 실패 수 (counter, label: sink)
pub const PIPELINE_SINK_FAILURES_TOTAL: &str = "unilog_pipeline_sink_failures_total";

/// 소스 파일 읽기 실패 수 (counter)
pub const PIPELINE_SOURCE_READ_FAILURES_TOTAL: &str = "unilog_pipeline_source_read_failures_total";

/// tail 소스가 내보낸 라인 수 (counter)
pub const PIPELINE_TAIL_LINES_EMITTED_TOTAL: &str = "unilog_pipeline_tail_lines_emitted_total";

/// 처리 중인 항목 수 (gauge, 큐 대기 + 워커 처리 중)
pub const PIPELINE_ITEMS_IN_FLIGHT: &str = "unilog_pipeline_items_in_flight";

/// 항목 하나의 parse → filter → fanout 처리 시간 (histogram, 초)
pub const PIPELINE_ITEM_DURATION_SECONDS: &str = "unilog_pipeline_item_duration_seconds";

// ─── Daemon 메트릭 ─────────────────────────────────────────────────

/// 데몬 빌드 정보 (gauge, 항상 1)
pub const DAEMON_BUILD_INFO: &str = "unilog_daemon_build_info";

/// 처리 시간 히스토그램 버킷 (초)
pub const PROCESSING_DURATION_BUCKETS: &[f64] = &[
    0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0,
];

/// 정의된 모든 메트릭 이름
pub const ALL_METRIC_NAMES: &[&str] = &[
    PIPELINE_LINES_ENQUEUED_TOTAL,
    PIPELINE_RECORDS_PARSED_TOTAL,
    PIPELINE_PARSE_FAILURES_TOTAL,
    PIPELINE_PARSER_FALLBACKS_TOTAL,
    PIPELINE_RECORDS_FILTERED_TOTAL,
    PIPELINE_RECORDS_DELIVERED_TOTAL,
    PIPELINE_SINK_FAILURES_TOTAL,
    PIPELINE_SOURCE_READ_FAILURES_TOTAL,
    PIPELINE_TAIL_LINES_EMITTED_TOTAL,
    PIPELINE_ITEMS_IN_FLIGHT,
    PIPELINE_ITEM_DURATION_SECONDS,
    DAEMON_BUILD_INFO,
];

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없어도 안전합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        PIPELINE_LINES_ENQUEUED_TOTAL,
        "Total number of raw lines pushed into the dispatcher queue"
    );
    describe_counter!(
        PIPELINE_RECORDS_PARSED_TOTAL,
        "Total number of lines successfully parsed into records"
    );
    describe_counter!(
        PIPELINE_PARSE_FAILURES_TOTAL,
        "Total number of lines that did not match the parser grammar"
    );
    describe_counter!(
        PIPELINE_PARSER_FALLBACKS_TOTAL,
        "Total number of unknown parser names resolved to the generic parser"
    );
    describe_counter!(
        PIPELINE_RECORDS_FILTERED_TOTAL,
        "Total number of records rejected by filter rules"
    );
    describe_counter!(
        PIPELINE_RECORDS_DELIVERED_TOTAL,
        "Total number of records handed to the sink fanout"
    );
    describe_counter!(
        PIPELINE_SINK_FAILURES_TOTAL,
        "Total number of failed sink writes"
    );
    describe_counter!(
        PIPELINE_SOURCE_READ_FAILURES_TOTAL,
        "Total number of file read failures in the tailing source"
    );
    describe_counter!(
        PIPELINE_TAIL_LINES_EMITTED_TOTAL,
        "Total number of new lines emitted by the tailing source"
    );
    describe_gauge!(
        PIPELINE_ITEMS_IN_FLIGHT,
        "Items enqueued but not yet fully processed"
    );
    describe_histogram!(
        PIPELINE_ITEM_DURATION_SECONDS,
        "Per-item parse, filter and fanout latency in seconds"
    );
    describe_gauge!(DAEMON_BUILD_INFO, "Daemon build information");
}
