//! 디스패처 -- 바운디드 작업 큐와 고정 크기 워커 풀
//!
//! 생산자(배치 스캐너, tail 소스)가 `(형식, 원시 라인)` 항목을 큐에 넣으면
//! 워커들이 꺼내어 parse → filter → sink fanout을 수행합니다.
//!
//! ```text
//! producers --enqueue--> mpsc(queue_capacity) --> worker 0..N
//!                                                   |  ParserRegistry::resolve/parse
//!                                                   |  SharedRuleSet::apply
//!                                                   v  SinkFanout::write([record])
//! ```
//!
//! # 드레인 배리어
//! in-flight 카운터는 enqueue 시 증가하고 워커가 항목 처리를 마친 뒤 감소합니다.
//! [`DispatcherHandle::wait_for_completion`]은 카운터가 0이 될 때까지 기다리므로
//! 큐에 남은 항목뿐 아니라 워커가 처리 중인 항목까지 포함합니다.
//!
//! # 순서
//! 한 생산자가 넣은 순서대로 큐에 들어가지만, 여러 워커가 동시에 꺼내므로
//! 싱크에 도달하는 전역 순서는 보장되지 않습니다.

use std::slice;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use unilog_core::error::{PipelineError, UnilogError};
use unilog_core::metrics as m;
use unilog_core::pipeline::{HealthStatus, Pipeline};

use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::filter::{FilterOutcome, RuleSet, SharedRuleSet};
use crate::parser::ParserRegistry;
use crate::sink::{SinkFanout, SinkRegistry};

/// 큐 항목
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// 파서 이름
    pub format: String,
    /// 원시 라인
    pub line: String,
}

/// 디스패처 누적 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    pub enqueued: u64,
    pub parsed: u64,
    pub parse_failures: u64,
    /// 필터에서 거부된 레코드
    pub rejected: u64,
    /// 팬아웃에 전달된 레코드
    pub delivered: u64,
    /// 싱크별 쓰기 실패 합계
    pub sink_failures: u64,
}

impl DispatcherStats {
    /// 처리가 끝난 항목 수 (파싱 실패 + 거부 + 전달)
    pub fn completed(&self) -> u64 {
        self.parse_failures + self.rejected + self.delivered
    }
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    parsed: AtomicU64,
    parse_failures: AtomicU64,
    rejected: AtomicU64,
    delivered: AtomicU64,
    sink_failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> DispatcherStats {
        DispatcherStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            parsed: self.parsed.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
        }
    }
}

/// 워커와 핸들이 공유하는 상태
struct Shared {
    registry: Arc<ParserRegistry>,
    rules: SharedRuleSet,
    fanout: SinkFanout,
    /// 실행 중일 때만 `Some`
    sender: RwLock<Option<mpsc::Sender<WorkItem>>>,
    in_flight: AtomicUsize,
    drained: Notify,
    counters: Counters,
}

impl Shared {
    fn sender(&self) -> Option<mpsc::Sender<WorkItem>> {
        self.sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_sender(&self, sender: Option<mpsc::Sender<WorkItem>>) {
        *self.sender.write().unwrap_or_else(PoisonError::into_inner) = sender;
    }

    /// 항목 하나의 처리 완료. 0에 도달하면 대기자를 깨웁니다.
    fn finish_item(&self) {
        let previous = self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_sub(1))
            })
            .unwrap_or_else(|n| n);
        gauge!(m::PIPELINE_ITEMS_IN_FLIGHT).decrement(1.0);
        if previous <= 1 {
            self.drained.notify_waiters();
        }
    }

    async fn process(&self, item: WorkItem) {
        let started = std::time::Instant::now();
        let resolved = self.registry.resolve(&item.format);
        let format = resolved.parser.format_name().to_owned();

        let record = match resolved.parser.parse(&item.line) {
            Ok(record) => record,
            Err(e) => {
                self.counters.parse_failures.fetch_add(1, Ordering::Relaxed);
                counter!(m::PIPELINE_PARSE_FAILURES_TOTAL, m::LABEL_PARSER_FORMAT => format.clone())
                    .increment(1);
                tracing::warn!(parser = %format, error = %e, "failed to parse line, dropping");
                return;
            }
        };
        self.counters.parsed.fetch_add(1, Ordering::Relaxed);
        counter!(m::PIPELINE_RECORDS_PARSED_TOTAL, m::LABEL_PARSER_FORMAT => format).increment(1);

        if let FilterOutcome::Rejected { rule_index } = self.rules.apply(&record) {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            counter!(m::PIPELINE_RECORDS_FILTERED_TOTAL).increment(1);
            tracing::trace!(rule_index, "record rejected by filter");
            return;
        }

        let report = self.fanout.write(slice::from_ref(&record)).await;
        self.counters.delivered.fetch_add(1, Ordering::Relaxed);
        self.counters
            .sink_failures
            .fetch_add(report.failed.len() as u64, Ordering::Relaxed);
        counter!(m::PIPELINE_RECORDS_DELIVERED_TOTAL).increment(1);
        histogram!(m::PIPELINE_ITEM_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    }
}

/// 생산자용 복제 가능한 핸들
///
/// 디스패처 자체를 빌리지 않고도 enqueue와 드레인 대기를 할 수 있습니다.
#[derive(Clone)]
pub struct DispatcherHandle {
    shared: Arc<Shared>,
}

impl DispatcherHandle {
    /// 항목을 큐에 넣습니다. 큐가 가득 차면 공간이 생길 때까지 기다립니다.
    ///
    /// # Errors
    /// - 시작 전이거나 정지 후: `PipelineError::NotRunning`
    /// - 정지와 경합하여 채널이 닫힌 경우: `PipelineError::ChannelSend`
    pub async fn enqueue(
        &self,
        format: impl Into<String>,
        line: impl Into<String>,
    ) -> Result<(), PipelineError> {
        let sender = self.shared.sender().ok_or(PipelineError::NotRunning)?;

        // 워커가 처리하기 전에 카운터가 올라가 있어야 합니다.
        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);
        gauge!(m::PIPELINE_ITEMS_IN_FLIGHT).increment(1.0);

        let item = WorkItem {
            format: format.into(),
            line: line.into(),
        };
        if let Err(e) = sender.send(item).await {
            self.shared.finish_item();
            return Err(PipelineError::ChannelSend(e.to_string()));
        }

        self.shared.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        counter!(m::PIPELINE_LINES_ENQUEUED_TOTAL).increment(1);
        Ok(())
    }

    /// 호출 전에 enqueue된 모든 항목이 처리를 마칠 때까지 기다립니다.
    pub async fn wait_for_completion(&self) {
        loop {
            let notified = self.shared.drained.notified();
            tokio::pin!(notified);
            // 카운터 확인 전에 등록해야 notify_waiters를 놓치지 않습니다.
            notified.as_mut().enable();

            if self.shared.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// 큐에 있거나 처리 중인 항목 수
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> DispatcherStats {
        self.shared.counters.snapshot()
    }

    /// 실행 중인지 (enqueue 가능 여부)
    pub fn is_running(&self) -> bool {
        self.shared.sender().is_some()
    }
}

/// 디스패처 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatcherState {
    Initialized,
    Running,
    Stopped,
}

/// 디스패처 -- 워커 풀 생명주기 관리
///
/// core의 [`Pipeline`] trait을 구현합니다. `start()`는 워커를 띄우고 즉시 반환하며,
/// `stop()`은 협조적으로 워커를 정지시키고 `stop_timeout` 안에 끝나지 않은 워커는 중단합니다.
///
/// # 사용 예시
/// ```ignore
/// let mut dispatcher = DispatcherBuilder::new().config(config).build()?;
/// dispatcher.start().await?;
///
/// let handle = dispatcher.handle();
/// handle.enqueue("json", r#"{"level":"ERROR"}"#).await?;
/// handle.wait_for_completion().await;
///
/// dispatcher.stop().await?;
/// println!("{:?}", dispatcher.stats());
/// ```
pub struct Dispatcher {
    config: PipelineConfig,
    shared: Arc<Shared>,
    state: DispatcherState,
    receiver: Option<Arc<Mutex<mpsc::Receiver<WorkItem>>>>,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// 생산자 핸들
    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// [`DispatcherHandle::enqueue`] 참고
    pub async fn enqueue(
        &self,
        format: impl Into<String>,
        line: impl Into<String>,
    ) -> Result<(), PipelineError> {
        self.handle().enqueue(format, line).await
    }

    /// [`DispatcherHandle::wait_for_completion`] 참고
    pub async fn wait_for_completion(&self) {
        self.handle().wait_for_completion().await;
    }

    pub fn stats(&self) -> DispatcherStats {
        self.shared.counters.snapshot()
    }

    /// 워커가 공유하는 필터 규칙. 실행 중에도 변경할 수 있습니다.
    pub fn rules(&self) -> &SharedRuleSet {
        &self.shared.rules
    }

    pub fn parser_registry(&self) -> &Arc<ParserRegistry> {
        &self.shared.registry
    }

    /// 생산자가 사용할 기본 파서 이름
    pub fn default_format(&self) -> &str {
        &self.config.parser
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.shared.fanout.names()
    }

    pub fn state_name(&self) -> &str {
        match self.state {
            DispatcherState::Initialized => "initialized",
            DispatcherState::Running => "running",
            DispatcherState::Stopped => "stopped",
        }
    }

    fn spawn_workers(&mut self) -> Result<(), PipelineError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PipelineError::InitFailed(format!("no tokio runtime: {e}")))?;

        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        let rx = Arc::new(Mutex::new(rx));
        self.cancel = CancellationToken::new();

        let dequeue_timeout = self.config.dequeue_timeout();
        self.workers = (0..self.config.worker_count)
            .map(|id| {
                runtime.spawn(worker_loop(
                    id,
                    Arc::clone(&self.shared),
                    Arc::clone(&rx),
                    self.cancel.clone(),
                    dequeue_timeout,
                ))
            })
            .collect();

        self.receiver = Some(rx);
        self.shared.set_sender(Some(tx));
        Ok(())
    }

    async fn join_workers(&mut self) {
        let deadline = tokio::time::Instant::now() + self.config.stop_timeout();
        for (id, mut handle) in self.workers.drain(..).enumerate() {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(worker = id, error = %e, "worker task failed"),
                Err(_) => {
                    handle.abort();
                    tracing::warn!(worker = id, "worker did not stop in time, aborted");
                }
            }
        }
    }

    async fn discard_queued(&mut self) {
        let Some(rx) = self.receiver.take() else {
            return;
        };
        let mut rx = rx.lock().await;
        rx.close();
        let mut discarded = 0usize;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            tracing::warn!(discarded, "discarded queued items on stop");
        }
    }
}

impl Pipeline for Dispatcher {
    async fn start(&mut self) -> Result<(), UnilogError> {
        if self.state == DispatcherState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        self.spawn_workers()?;
        self.state = DispatcherState::Running;
        tracing::info!(
            workers = self.config.worker_count,
            queue_capacity = self.config.queue_capacity,
            sinks = ?self.shared.fanout.names(),
            "dispatcher started"
        );
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), UnilogError> {
        if self.state != DispatcherState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        tracing::info!("stopping dispatcher");

        // 새 enqueue 차단 후 워커 취소
        self.shared.set_sender(None);
        self.cancel.cancel();
        self.join_workers().await;
        self.discard_queued().await;

        let abandoned = self.shared.in_flight.swap(0, Ordering::AcqRel);
        if abandoned > 0 {
            tracing::warn!(abandoned, "items were not processed before stop");
        }
        gauge!(m::PIPELINE_ITEMS_IN_FLIGHT).set(0.0);
        self.shared.drained.notify_waiters();

        self.state = DispatcherState::Stopped;
        let stats = self.stats();
        tracing::info!(
            enqueued = stats.enqueued,
            delivered = stats.delivered,
            parse_failures = stats.parse_failures,
            rejected = stats.rejected,
            "dispatcher stopped"
        );
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            DispatcherState::Running => {
                let Some(sender) = self.shared.sender() else {
                    return HealthStatus::Unhealthy("queue closed".to_owned());
                };
                let max = sender.max_capacity();
                let used = max.saturating_sub(sender.capacity());
                let utilization = used as f64 / max as f64;
                if utilization > 0.9 {
                    HealthStatus::Degraded(format!(
                        "queue utilization high: {:.1}%",
                        utilization * 100.0
                    ))
                } else {
                    HealthStatus::Healthy
                }
            }
            DispatcherState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            DispatcherState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

async fn worker_loop(
    id: usize,
    shared: Arc<Shared>,
    rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    cancel: CancellationToken,
    dequeue_timeout: Duration,
) {
    tracing::debug!(worker = id, "worker started");
    loop {
        let received = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = async {
                let mut rx = rx.lock().await;
                tokio::time::timeout(dequeue_timeout, rx.recv()).await
            } => received,
        };

        match received {
            Ok(Some(item)) => {
                shared.process(item).await;
                shared.finish_item();
            }
            // 채널 닫힘
            Ok(None) => break,
            // dequeue 타임아웃: 취소 여부를 다시 확인
            Err(_) => continue,
        }
    }
    tracing::debug!(worker = id, "worker stopped");
}

/// 디스패처 빌더
///
/// 지정하지 않은 구성 요소는 설정에서 만듭니다.
/// - 파서 레지스트리: [`ParserRegistry::with_defaults`]
/// - 필터 규칙: 설정의 인라인 `filters`
/// - 팬아웃: 설정의 `sinks` 이름을 싱크 레지스트리(기본은 로컬 `json`)에서 조회
pub struct DispatcherBuilder {
    config: PipelineConfig,
    registry: Option<Arc<ParserRegistry>>,
    rules: Option<SharedRuleSet>,
    sinks: Option<SinkRegistry>,
    fanout: Option<SinkFanout>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            registry: None,
            rules: None,
            sinks: None,
            fanout: None,
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn parser_registry(mut self, registry: Arc<ParserRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 공유 규칙 목록을 지정합니다. 설정의 인라인 규칙은 무시됩니다.
    pub fn rules(mut self, rules: SharedRuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn sink_registry(mut self, sinks: SinkRegistry) -> Self {
        self.sinks = Some(sinks);
        self
    }

    /// 팬아웃을 직접 지정합니다. 설정의 `sinks`는 무시됩니다.
    pub fn fanout(mut self, fanout: SinkFanout) -> Self {
        self.fanout = Some(fanout);
        self
    }

    /// # Errors
    /// - 설정 검증 실패
    /// - 인라인 필터 규칙 컴파일 실패
    pub fn build(self) -> Result<Dispatcher, LogPipelineError> {
        self.config.validate()?;

        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(ParserRegistry::with_defaults()));
        if !registry.contains(&self.config.parser) {
            tracing::warn!(
                parser = %self.config.parser,
                "configured parser is not registered, lines will use the generic fallback"
            );
        }

        let rules = match self.rules {
            Some(rules) => rules,
            None => SharedRuleSet::from_rule_set(RuleSet::from_config(&self.config.filters)?),
        };

        let fanout = match self.fanout {
            Some(fanout) => fanout,
            None => {
                let sinks = self.sinks.unwrap_or_else(|| {
                    SinkRegistry::with_local_defaults(
                        &self.config.output_dir,
                        &self.config.output_file_stem,
                    )
                });
                SinkFanout::from_names(&self.config.sinks, &sinks)
            }
        };
        if fanout.is_empty() {
            tracing::warn!("no usable sinks configured, accepted records will be discarded");
        }

        let shared = Arc::new(Shared {
            registry,
            rules,
            fanout,
            sender: RwLock::new(None),
            in_flight: AtomicUsize::new(0),
            drained: Notify::new(),
            counters: Counters::default(),
        });

        Ok(Dispatcher {
            config: self.config,
            shared,
            state: DispatcherState::Initialized,
            receiver: None,
            cancel: CancellationToken::new(),
            workers: Vec::new(),
        })
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
