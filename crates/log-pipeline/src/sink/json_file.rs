//! 로컬 JSON 배열 파일 싱크
//!
//! 파일 전체가 하나의 JSON 배열입니다. 쓰기마다 기존 배열을 읽어 이어 붙인 뒤
//! 임시 파일에 쓰고 rename으로 교체합니다(append-by-rewrite).
//! 기존 파일이 손상되었으면 에러 로그를 남기고 새 배열로 시작합니다.
//!
//! # 비용
//! 쓰기 한 번이 파일 전체를 읽고 다시 씁니다. 디스패처는 레코드마다 한 건짜리 배치로
//! 쓰므로 n건을 내보내는 I/O는 O(n²)입니다. 큰 배치 실행에는 행 단위로 덧붙이는
//! [`CsvFileSink`](super::CsvFileSink)가 적합합니다.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::sync::Mutex;
use unilog_core::error::SinkError;
use unilog_core::pipeline::Sink;
use unilog_core::types::Record;

/// JSON 배열 파일 싱크
pub struct JsonFileSink {
    name: String,
    path: PathBuf,
    /// 같은 싱크에 대한 동시 쓰기 직렬화
    lock: Mutex<()>,
}

impl JsonFileSink {
    /// `json` 이름으로 지정 경로에 쓰는 싱크를 생성합니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::named("json", path)
    }

    /// 이름을 지정하여 생성합니다.
    pub fn named(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `{output_dir}/{stem}.json`에 쓰는 싱크를 생성합니다.
    pub fn in_dir(output_dir: impl AsRef<Path>, stem: &str) -> Self {
        Self::new(output_dir.as_ref().join(format!("{stem}.json")))
    }

    /// 출력 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 파일에 저장된 레코드를 읽습니다. 파일이 없으면 빈 목록입니다.
    pub async fn read_all(&self) -> Result<Vec<Value>, SinkError> {
        let _guard = self.lock.lock().await;
        self.load_existing().await
    }

    async fn load_existing(&self) -> Result<Vec<Value>, SinkError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<Value>>(&content) {
            Ok(existing) => Ok(existing),
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "existing JSON output is corrupted, starting a fresh array"
                );
                Ok(Vec::new())
            }
        }
    }
}

impl Sink for JsonFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, records: &[Record]) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }

        let _guard = self.lock.lock().await;

        let mut all = self.load_existing().await?;
        all.extend(records.iter().cloned().map(Value::from));

        let body =
            serde_json::to_vec_pretty(&all).map_err(|e| SinkError::Serialize(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, body).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        tracing::debug!(
            sink = %self.name,
            path = %self.path.display(),
            written = records.len(),
            total = all.len(),
            "wrote records to JSON file"
        );
        Ok(())
    }
}
