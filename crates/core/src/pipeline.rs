//! 파이프라인 trait -- 모듈 확장 포인트 정의
//!
//! - [`LogParser`]: 한 줄을 하나의 [`Record`]로 파싱
//! - [`Sink`] / [`DynSink`]: 레코드 배치를 저장/전달하는 출력 대상
//! - [`Enricher`]: 실행 후 레코드에 anomaly/cluster 태그를 붙이는 외부 협력자
//! - [`Pipeline`]: start/stop/health_check 생명주기

use std::future::Future;
use std::pin::Pin;

use crate::error::{SinkError, UnilogError};
use crate::types::Record;

/// `dyn` 호환 trait에서 사용하는 박싱된 future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 로그 파서 trait
///
/// 새로운 로그 형식을 지원하려면 이 trait을 구현합니다.
/// 구현체는 순수 함수처럼 동작해야 하며, 여러 워커에서 동시에 호출됩니다.
pub trait LogParser: Send + Sync {
    /// 지원하는 로그 형식 이름
    fn format_name(&self) -> &str;

    /// 원시 라인을 레코드로 파싱
    ///
    /// 문법에 맞지 않으면 에러를 반환합니다. 패닉하지 않습니다.
    fn parse(&self, line: &str) -> Result<Record, UnilogError>;
}

/// 레코드 출력 대상 trait
///
/// 싱크는 자기 영속성을 스스로 관리합니다. 레코드는 공유 참조로 전달되므로
/// 싱크가 수정할 수 없습니다.
pub trait Sink: Send + Sync {
    /// 싱크 이름 (예: `"json"`, `"s3"`)
    fn name(&self) -> &str;

    /// 레코드 배치를 씁니다.
    fn write(&self, records: &[Record]) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// dyn-compatible 싱크 trait
///
/// `Sink` trait은 RPITIT를 사용하므로 `dyn Sink`가 불가합니다.
/// `DynSink`는 `BoxFuture`를 반환하여 `Vec<Arc<dyn DynSink>>`로
/// 싱크를 동적 관리할 수 있게 합니다.
pub trait DynSink: Send + Sync {
    /// 싱크 이름
    fn name(&self) -> &str;

    /// 레코드 배치를 씁니다.
    fn write<'a>(&'a self, records: &'a [Record]) -> BoxFuture<'a, Result<(), SinkError>>;
}

/// Sink를 구현한 타입은 자동으로 DynSink도 구현됩니다.
impl<T: Sink> DynSink for T {
    fn name(&self) -> &str {
        Sink::name(self)
    }

    fn write<'a>(&'a self, records: &'a [Record]) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(Sink::write(self, records))
    }
}

/// 선택적 보강(enrichment) 인터페이스
///
/// 이상 탐지/클러스터링 점수기를 추상화합니다. 파이프라인은 이 trait을
/// 자동으로 호출하지 않으며, 배치/tail 드라이버가 실행 후 호출할 수 있습니다.
/// 반환 레코드에는 `anomaly: bool` 또는 `cluster: integer` 필드가 추가됩니다.
pub trait Enricher: Send + Sync {
    /// 보강기 이름
    fn name(&self) -> &str;

    /// 레코드 배치에 점수 필드를 추가하여 반환합니다.
    fn score(&self, records: Vec<Record>) -> Vec<Record>;
}

/// 모듈 건강 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작하지만 성능 저하
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

/// 생명주기를 가지는 파이프라인 모듈 trait
pub trait Pipeline: Send {
    /// 모듈을 시작합니다. 백그라운드 태스크를 띄우고 즉시 반환합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), UnilogError>> + Send;

    /// 모듈을 정지합니다 (graceful shutdown).
    fn stop(&mut self) -> impl Future<Output = Result<(), UnilogError>> + Send;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    struct MemorySink {
        written: Mutex<Vec<Record>>,
    }

    impl Sink for MemorySink {
        fn name(&self) -> &str {
            "memory"
        }

        async fn write(&self, records: &[Record]) -> Result<(), SinkError> {
            self.written
                .lock()
                .map_err(|e| SinkError::Write(e.to_string()))?
                .extend_from_slice(records);
            Ok(())
        }
    }

    struct TagAll;

    impl Enricher for TagAll {
        fn name(&self) -> &str {
            "tag-all"
        }

        fn score(&self, records: Vec<Record>) -> Vec<Record> {
            records
                .into_iter()
                .map(|mut r| {
                    r.insert("anomaly", false);
                    r
                })
                .collect()
        }
    }

    #[tokio::test]
    async fn sink_is_usable_as_dyn_sink() {
        let sink = Arc::new(MemorySink {
            written: Mutex::new(Vec::new()),
        });
        let dyn_sink: Arc<dyn DynSink> = sink.clone();
        assert_eq!(dyn_sink.name(), "memory");

        let records = vec![Record::new(), Record::new()];
        dyn_sink.write(&records).await.unwrap();
        assert_eq!(sink.written.lock().unwrap().len(), 2);
    }

    #[test]
    fn enricher_adds_field() {
        let out = TagAll.score(vec![Record::new()]);
        assert_eq!(out[0].get("anomaly"), Some(&serde_json::Value::Bool(false)));
    }

    #[test]
    fn health_status_predicates() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(HealthStatus::Unhealthy("stopped".to_owned()).is_unhealthy());
        assert!(!HealthStatus::Degraded("slow".to_owned()).is_unhealthy());
    }
}
