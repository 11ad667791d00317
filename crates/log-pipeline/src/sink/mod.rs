//! 싱크 팬아웃 -- 이름으로 설정된 여러 싱크에 레코드를 독립적으로 전달합니다.
//!
//! # 구성
//! - [`SinkRegistry`]: 이름 → 싱크 매핑. 외부 싱크(parquet, elastic 등)는
//!   호출자가 [`SinkRegistry::register`]로 추가합니다.
//! - [`SinkFanout`]: 설정 순서대로 각 싱크의 `write`를 호출합니다.
//!   한 싱크의 실패는 로그와 카운터로만 남고 나머지 싱크는 계속 시도됩니다.
//! - [`JsonFileSink`]: 로컬 JSON 배열 파일
//! - [`CsvFileSink`]: 로컬 CSV 파일 (헤더 1회 + 행 추가)
//! - [`ObjectStoreSink`]: 로컬 JSON 파일 생성 후 외부 업로더 호출

pub mod csv_file;
pub mod json_file;
pub mod upload;

pub use csv_file::CsvFileSink;
pub use json_file::JsonFileSink;
pub use upload::{ObjectStoreSink, ObjectUploader};

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use metrics::counter;
use unilog_core::metrics as m;
use unilog_core::pipeline::DynSink;
use unilog_core::types::Record;

/// 이름 → 싱크 레지스트리
#[derive(Default, Clone)]
pub struct SinkRegistry {
    sinks: HashMap<String, Arc<dyn DynSink>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 로컬 싱크를 등록한 레지스트리
    ///
    /// - `json`: `{output_dir}/{stem}.json`
    /// - `csv`: `{output_dir}/{stem}.csv`
    pub fn with_local_defaults(output_dir: impl AsRef<Path>, stem: &str) -> Self {
        let output_dir = output_dir.as_ref();
        let mut registry = Self::new();
        registry.register("json", Arc::new(JsonFileSink::in_dir(output_dir, stem)));
        registry.register("csv", Arc::new(CsvFileSink::in_dir(output_dir, stem)));
        registry
    }

    /// 싱크를 등록합니다. 같은 이름이 있으면 덮어쓰고 경고를 남깁니다.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        sink: Arc<dyn DynSink>,
    ) -> Option<Arc<dyn DynSink>> {
        let name = name.into();
        let previous = self.sinks.insert(name.clone(), sink);
        if previous.is_some() {
            tracing::warn!(sink = %name, "overwriting existing sink registration");
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DynSink>> {
        self.sinks.get(name).cloned()
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.sinks.keys().cloned().collect()
    }
}

/// 팬아웃 한 번의 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// 성공한 싱크 수
    pub succeeded: usize,
    /// 실패한 싱크 이름
    pub failed: Vec<String>,
}

impl FanoutReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 싱크 팬아웃
///
/// 싱크 상태를 소유하지 않으며 각 싱크가 자기 영속성을 관리합니다.
#[derive(Clone, Default)]
pub struct SinkFanout {
    sinks: Vec<Arc<dyn DynSink>>,
}

impl SinkFanout {
    pub fn new(sinks: Vec<Arc<dyn DynSink>>) -> Self {
        Self { sinks }
    }

    /// 설정된 이름 순서대로 레지스트리에서 싱크를 찾습니다.
    ///
    /// 등록되지 않은 이름은 경고 로그를 남기고 건너뜁니다.
    pub fn from_names<S: AsRef<str>>(names: &[S], registry: &SinkRegistry) -> Self {
        let sinks = names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                let sink = registry.get(name);
                if sink.is_none() {
                    tracing::warn!(
                        sink = name,
                        available = ?registry.names(),
                        "unsupported sink, skipping"
                    );
                }
                sink
            })
            .collect();
        Self { sinks }
    }

    /// 호출 순서대로 싱크 이름
    pub fn names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// 모든 싱크에 레코드를 씁니다. 실패하지 않습니다.
    pub async fn write(&self, records: &[Record]) -> FanoutReport {
        let mut report = FanoutReport::default();
        if records.is_empty() {
            tracing::warn!("no records to write");
            return report;
        }

        for sink in &self.sinks {
            match sink.write(records).await {
                Ok(()) => {
                    report.succeeded += 1;
                    tracing::trace!(sink = sink.name(), count = records.len(), "sink write ok");
                }
                Err(e) => {
                    tracing::error!(sink = sink.name(), error = %e, "sink write failed");
                    counter!(m::PIPELINE_SINK_FAILURES_TOTAL, m::LABEL_SINK => sink.name().to_owned())
                        .increment(1);
                    report.failed.push(sink.name().to_owned());
                }
            }
        }

        report
    }
}
