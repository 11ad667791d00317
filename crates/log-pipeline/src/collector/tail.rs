//! 파일 tail 소스
//!
//! 설정된 파일 목록을 주기적으로 폴링하여 마지막 오프셋 이후에 추가된 바이트만 읽고,
//! 새 라인을 디스패처로 보냅니다. `tail -f`와 유사하지만 비동기 폴링 방식입니다.
//!
//! # 동작
//! - 파일별 [`TailState`]는 첫 폴링 시 오프셋 0으로 생성되고 이 소스만 소유합니다.
//! - 디렉토리 입력은 매 틱마다 안의 `*.log` 파일로 펼칩니다. 나중에 생긴 파일도
//!   처음부터 읽습니다.
//! - 줄바꿈으로 끝난 라인만 내보냅니다. 끝나지 않은 마지막 라인은 오프셋을 넘기지 않고
//!   다음 틱에서 다시 읽습니다. 단, 한 틱 읽기 한도를 채우도록 줄바꿈이 없으면
//!   읽은 만큼을 한 라인으로 내보냅니다. 이때 끝에 걸린 UTF-8 문자는 다음 틱으로 넘깁니다.
//! - 한 파일의 읽기 실패는 경고 로그를 남기고 이번 틱에서만 건너뜁니다.
//!
//! # 로테이션
//! 로테이션/truncation은 감지하지 않습니다. 파일이 오프셋보다 짧아지면
//! 그 길이를 다시 넘을 때까지 아무것도 읽지 않습니다.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use metrics::counter;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;
use unilog_core::metrics as m;

use crate::dispatcher::DispatcherHandle;
use crate::error::LogPipelineError;

use super::batch::log_files_in;

/// 한 틱에서 파일 하나당 읽는 최대 바이트 (8MB)
const DEFAULT_MAX_BYTES_PER_TICK: u64 = 8 * 1024 * 1024;

const SOURCE_TYPE: &str = "tail";

/// 파일별 tail 상태
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailState {
    /// 다음 읽기 위치 (바이트)
    pub offset: u64,
    /// 지금까지 소비한 바이트 합계
    pub bytes_read: u64,
}

/// tail 소스가 내보낸 라인
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailLine {
    pub path: PathBuf,
    pub line: String,
}

/// 파일 tail 소스
pub struct TailSource {
    paths: Vec<PathBuf>,
    format: String,
    poll_interval: Duration,
    max_bytes_per_tick: u64,
    states: HashMap<PathBuf, TailState>,
}

impl TailSource {
    /// `format` 파서로 처리할 파일 목록의 tail 소스를 생성합니다.
    pub fn new(
        paths: impl IntoIterator<Item = impl Into<PathBuf>>,
        format: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            format: format.into(),
            poll_interval,
            max_bytes_per_tick: DEFAULT_MAX_BYTES_PER_TICK,
            states: HashMap::new(),
        }
    }

    /// 한 틱의 파일당 읽기 한도를 설정합니다 (최소 1바이트).
    pub fn with_max_bytes_per_tick(mut self, max: u64) -> Self {
        self.max_bytes_per_tick = max.max(1);
        self
    }

    /// 설정된 입력 경로 (디렉토리는 펼치기 전 그대로)
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// 이번 틱에 읽을 파일 목록. 디렉토리는 `*.log` 파일로 펼칩니다.
    ///
    /// 존재하지 않는 경로는 그대로 두어 읽기 실패로 집계됩니다.
    async fn targets(&self) -> Vec<PathBuf> {
        let mut files = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let is_dir = tokio::fs::metadata(path)
                .await
                .is_ok_and(|meta| meta.is_dir());
            if !is_dir {
                files.push(path.clone());
                continue;
            }
            match log_files_in(path).await {
                Ok(found) => files.extend(found),
                Err(e) => {
                    counter!(m::PIPELINE_SOURCE_READ_FAILURES_TOTAL).increment(1);
                    tracing::warn!(dir = %path.display(), error = %e, "failed to list tailed directory, skipping this tick");
                }
            }
        }
        files
    }

    /// 파일의 현재 오프셋. 아직 폴링하지 않았으면 `None`.
    pub fn offset(&self, path: impl AsRef<Path>) -> Option<u64> {
        self.states.get(path.as_ref()).map(|s| s.offset)
    }

    /// 파일에서 지금까지 읽은 바이트. 아직 폴링하지 않았으면 `None`.
    pub fn bytes_read(&self, path: impl AsRef<Path>) -> Option<u64> {
        self.states.get(path.as_ref()).map(|s| s.bytes_read)
    }

    pub fn state(&self, path: impl AsRef<Path>) -> Option<TailState> {
        self.states.get(path.as_ref()).copied()
    }

    /// 모든 파일을 한 번 폴링하고 새 라인을 파일 순서대로 반환합니다.
    pub async fn poll_once(&mut self) -> Vec<TailLine> {
        let mut emitted = Vec::new();

        for path in self.targets().await {
            let state = self.states.entry(path.clone()).or_default();
            match read_appended(&path, state, self.max_bytes_per_tick).await {
                Ok(lines) => {
                    emitted.extend(lines.into_iter().map(|line| TailLine {
                        path: path.clone(),
                        line,
                    }));
                }
                Err(e) => {
                    counter!(m::PIPELINE_SOURCE_READ_FAILURES_TOTAL).increment(1);
                    tracing::warn!(path = %path.display(), error = %e, "failed to read tailed file, skipping this tick");
                }
            }
        }

        if !emitted.is_empty() {
            counter!(m::PIPELINE_TAIL_LINES_EMITTED_TOTAL).increment(emitted.len() as u64);
            tracing::debug!(lines = emitted.len(), "tail tick emitted lines");
        }
        emitted
    }

    /// 취소될 때까지 폴링하며 새 라인을 디스패처로 보냅니다.
    ///
    /// 취소는 정상 종료이며 `Ok(())`를 반환합니다.
    /// 디스패처가 정지하여 enqueue가 실패하면 에러를 반환합니다.
    pub async fn run(
        &mut self,
        handle: &DispatcherHandle,
        cancel: &CancellationToken,
    ) -> Result<(), LogPipelineError> {
        tracing::info!(
            files = self.paths.len(),
            parser = %self.format,
            interval_ms = self.poll_interval.as_millis() as u64,
            "tail source started"
        );

        while !cancel.is_cancelled() {
            for TailLine { line, .. } in self.poll_once().await {
                handle
                    .enqueue(self.format.as_str(), line)
                    .await
                    .map_err(|e| LogPipelineError::Channel(e.to_string()))?;
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        tracing::info!("tail source stopped");
        Ok(())
    }
}

/// 오프셋 이후 추가된 완결 라인을 읽고 상태를 갱신합니다.
async fn read_appended(
    path: &Path,
    state: &mut TailState,
    max_bytes: u64,
) -> Result<Vec<String>, LogPipelineError> {
    let collector_err = |what: &str, e: std::io::Error| LogPipelineError::Collector {
        source_type: SOURCE_TYPE.to_owned(),
        reason: format!("{}: {what}: {e}", path.display()),
    };

    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| collector_err("open failed", e))?;
    let len = file
        .metadata()
        .await
        .map_err(|e| collector_err("metadata failed", e))?
        .len();

    if len <= state.offset {
        return Ok(Vec::new());
    }

    file.seek(SeekFrom::Start(state.offset))
        .await
        .map_err(|e| collector_err("seek failed", e))?;

    let want = (len - state.offset).min(max_bytes);
    let mut buf = Vec::with_capacity(want as usize);
    (&mut file)
        .take(want)
        .read_to_end(&mut buf)
        .await
        .map_err(|e| collector_err("read failed", e))?;

    let consumed = match buf.iter().rposition(|&b| b == b'\n') {
        Some(pos) => pos + 1,
        // 한도를 가득 채운 줄바꿈 없는 덩어리는 강제로 내보냄
        None if buf.len() as u64 >= max_bytes => char_boundary_cut(&buf),
        None => 0,
    };

    let lines = split_lines(&buf[..consumed]);
    state.offset += consumed as u64;
    state.bytes_read += consumed as u64;
    Ok(lines)
}

/// 끝에 잘린 UTF-8 멀티바이트 문자가 있으면 그 앞까지의 길이를 반환합니다.
///
/// 잘린 문자만으로 이루어진 덩어리는 진행을 위해 전체 길이를 반환합니다.
fn char_boundary_cut(buf: &[u8]) -> usize {
    let len = buf.len();
    for back in 1..=len.min(4) {
        let byte = buf[len - back];
        // continuation byte (10xxxxxx)
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back && back < len { len - back } else { len };
    }
    len
}

/// 줄바꿈으로 나누고 빈 라인은 버립니다. 잘못된 UTF-8은 대체 문자로 바꿉니다.
pub(crate) fn split_lines(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|&b| b == b'\n')
        .map(|raw| String::from_utf8_lossy(raw).trim_end_matches('\r').to_owned())
        .filter(|line| !line.trim().is_empty())
        .collect()
}
