//! 배치 파일 스캐너
//!
//! 입력 경로를 펼쳐(파일은 그대로, 디렉토리는 그 안의 `*.log` 파일을 이름순으로)
//! 각 파일의 라인을 디스패처로 보냅니다. 읽을 수 없는 경로는 경고 후 건너뜁니다.

use std::path::{Path, PathBuf};

use metrics::counter;
use tokio::io::{AsyncBufReadExt, BufReader};
use unilog_core::metrics as m;

use crate::dispatcher::DispatcherHandle;
use crate::error::LogPipelineError;

const SOURCE_TYPE: &str = "batch";

/// 스캔 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// 읽은 파일 수
    pub files: usize,
    /// enqueue한 라인 수
    pub lines: usize,
    /// 건너뛴 경로 수 (없음, 읽기 실패)
    pub skipped: usize,
}

/// 배치 파일 스캐너
pub struct BatchScanner {
    paths: Vec<PathBuf>,
    format: String,
}

impl BatchScanner {
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>, format: impl Into<String>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            format: format.into(),
        }
    }

    /// 입력 경로를 파일 목록으로 펼칩니다.
    pub async fn expand(&self) -> Vec<PathBuf> {
        let mut report = ScanReport::default();
        self.expand_into(&mut report).await
    }

    async fn expand_into(&self, report: &mut ScanReport) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for path in &self.paths {
            match tokio::fs::metadata(path).await {
                Ok(meta) if meta.is_dir() => match log_files_in(path).await {
                    Ok(found) => {
                        tracing::debug!(dir = %path.display(), count = found.len(), "found log files");
                        files.extend(found);
                    }
                    Err(e) => {
                        report.skipped += 1;
                        tracing::warn!(path = %path.display(), error = %e, "failed to list directory, skipping");
                    }
                },
                Ok(_) => files.push(path.clone()),
                Err(e) => {
                    report.skipped += 1;
                    tracing::warn!(path = %path.display(), error = %e, "input path not found, skipping");
                }
            }
        }
        files
    }

    /// 모든 입력 파일의 라인을 디스패처로 보냅니다.
    ///
    /// 파일 하나의 읽기 실패는 건너뛰고 계속합니다.
    /// 디스패처가 실행 중이 아니면 에러입니다.
    pub async fn scan(&self, handle: &DispatcherHandle) -> Result<ScanReport, LogPipelineError> {
        let mut report = ScanReport::default();
        let files = self.expand_into(&mut report).await;
        tracing::info!(files = files.len(), parser = %self.format, "scanning input files");

        for file in &files {
            match self.scan_file(file, handle).await {
                Ok(lines) => {
                    report.files += 1;
                    report.lines += lines;
                    tracing::debug!(path = %file.display(), lines, "enqueued file");
                }
                Err(LogPipelineError::Collector { reason, .. }) => {
                    report.skipped += 1;
                    counter!(m::PIPELINE_SOURCE_READ_FAILURES_TOTAL).increment(1);
                    tracing::warn!(path = %file.display(), error = %reason, "failed to read input file, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            files = report.files,
            lines = report.lines,
            skipped = report.skipped,
            "batch scan complete"
        );
        Ok(report)
    }

    async fn scan_file(&self, path: &Path, handle: &DispatcherHandle) -> Result<usize, LogPipelineError> {
        let read_err = |e: std::io::Error| LogPipelineError::Collector {
            source_type: SOURCE_TYPE.to_owned(),
            reason: format!("{}: {e}", path.display()),
        };

        let file = tokio::fs::File::open(path).await.map_err(read_err)?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut lines = 0;

        loop {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf).await.map_err(read_err)?;
            if n == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            handle
                .enqueue(self.format.as_str(), line)
                .await
                .map_err(|e| LogPipelineError::Channel(e.to_string()))?;
            lines += 1;
        }

        Ok(lines)
    }
}

/// 디렉토리 안의 `*.log` 파일 (하위 디렉토리 제외, 이름순)
pub(crate) async fn log_files_in(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_log = path.extension().is_some_and(|ext| ext == "log");
        if is_log && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
