//! 로그 파서 벤치마크
//!
//! 형식별 파서와 레지스트리 경유 파싱의 처리량을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use unilog_core::pipeline::LogParser;
use unilog_pipeline::parser::{
    AccessLogParser, GenericParser, JsonLogParser, ParserRegistry, SyslogParser,
};

const JSON_SHORT: &str =
    r#"{"timestamp":"2024-01-15T12:00:00Z","level":"ERROR","message":"disk full"}"#;

/// 중첩 객체 포함
const JSON_LONG: &str = r#"{"timestamp":"2024-01-15T12:00:00.123456Z","host":"production-web-server-01","service":"api-gateway","message":"API request completed","level":"INFO","request_id":"550e8400-e29b-41d4-a716-446655440000","duration_ms":245,"http":{"method":"POST","path":"/api/v1/users","status":201},"metadata":{"region":"us-east-1","version":"2.5.1"}}"#;

const APACHE_COMMON: &str =
    r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326"#;

const NGINX_COMBINED: &str = r#"203.0.113.7 - - [15/Jan/2024:12:00:00 +0000] "POST /api/v1/login HTTP/1.1" 401 512 "https://example.com/" "Mozilla/5.0 (X11; Linux x86_64)""#;

const SYSLOG_5424: &str =
    "<34>1 2024-01-15T12:00:00Z myhost sshd 1234 - - Failed password for root";

const SYSLOG_3164: &str = "<34>Jan 15 12:00:00 myhost sshd[42]: Failed password for root";

const GENERIC_PATTERN: &str = "2024-01-15T12:00:00Z ERROR [db] connection refused";

const GENERIC_KV: &str = "level=warn service=cache hit_ratio=0.42 message=\"evictions rising\"";

fn bench_json(c: &mut Criterion) {
    let parser = JsonLogParser::new();
    let mut group = c.benchmark_group("json");

    group.throughput(Throughput::Elements(1));
    group.bench_function("short", |b| {
        b.iter(|| parser.parse(black_box(JSON_SHORT)).unwrap())
    });
    group.bench_function("long_nested", |b| {
        b.iter(|| parser.parse(black_box(JSON_LONG)).unwrap())
    });

    group.finish();
}

fn bench_access(c: &mut Criterion) {
    let apache = AccessLogParser::apache();
    let nginx = AccessLogParser::nginx();
    let mut group = c.benchmark_group("access");

    group.throughput(Throughput::Elements(1));
    group.bench_function("apache_common", |b| {
        b.iter(|| apache.parse(black_box(APACHE_COMMON)).unwrap())
    });
    group.bench_function("nginx_combined", |b| {
        b.iter(|| nginx.parse(black_box(NGINX_COMBINED)).unwrap())
    });

    group.finish();
}

fn bench_syslog(c: &mut Criterion) {
    let parser = SyslogParser::new();
    let mut group = c.benchmark_group("syslog");

    group.throughput(Throughput::Elements(1));
    group.bench_function("rfc5424", |b| {
        b.iter(|| parser.parse(black_box(SYSLOG_5424)).unwrap())
    });
    group.bench_function("rfc3164", |b| {
        b.iter(|| parser.parse(black_box(SYSLOG_3164)).unwrap())
    });

    group.finish();
}

fn bench_generic(c: &mut Criterion) {
    let kv = GenericParser::new();
    let pattern = GenericParser::new()
        .with_pattern(r"(?P<timestamp>\S+) (?P<level>[A-Z]+) \[(?P<component>[^\]]+)\] (?P<message>.*)")
        .unwrap();
    let mut group = c.benchmark_group("generic");

    group.throughput(Throughput::Elements(1));
    group.bench_function("pattern", |b| {
        b.iter(|| pattern.parse(black_box(GENERIC_PATTERN)).unwrap())
    });
    group.bench_function("key_value", |b| {
        b.iter(|| kv.parse(black_box(GENERIC_KV)).unwrap())
    });

    group.finish();
}

/// 레지스트리 조회 비용 포함, 알 수 없는 이름은 fallback 경로
fn bench_registry(c: &mut Criterion) {
    let registry = ParserRegistry::with_defaults();
    let mut group = c.benchmark_group("registry");

    let inputs = [
        ("json", JSON_SHORT),
        ("apache", APACHE_COMMON),
        ("syslog", SYSLOG_5424),
        ("unknown", GENERIC_KV),
    ];

    for (format, line) in inputs {
        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", format), &line, |b, line| {
            b.iter(|| registry.parse(black_box(format), black_box(line)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_json,
    bench_access,
    bench_syslog,
    bench_generic,
    bench_registry
);
criterion_main!(benches);
