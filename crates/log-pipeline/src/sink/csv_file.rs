//! 로컬 CSV 파일 싱크
//!
//! 열은 `timestamp,level,message,data` 고정입니다. 헤더는 파일이 비어 있을 때 한 번만 쓰고
//! 이후 쓰기는 행을 덧붙입니다. `data`에는 나머지 필드를 JSON 객체 문자열로 담습니다.
//!
//! 레코드에 값이 없으면 `timestamp`는 쓰는 시각(UTC), `level`은 `INFO`,
//! `message`는 빈 문자열로 채웁니다.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use unilog_core::error::SinkError;
use unilog_core::pipeline::Sink;
use unilog_core::types::Record;

/// CSV 헤더
pub const CSV_HEADER: [&str; 4] = ["timestamp", "level", "message", "data"];

/// CSV 파일 싱크
pub struct CsvFileSink {
    name: String,
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvFileSink {
    /// `csv` 이름으로 지정 경로에 쓰는 싱크를 생성합니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            name: "csv".to_owned(),
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `{output_dir}/{stem}.csv`에 쓰는 싱크를 생성합니다.
    pub fn in_dir(output_dir: impl AsRef<Path>, stem: &str) -> Self {
        Self::new(output_dir.as_ref().join(format!("{stem}.csv")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn needs_header(&self) -> Result<bool, SinkError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

fn csv_err(e: impl std::fmt::Display) -> SinkError {
    SinkError::Serialize(e.to_string())
}

/// 레코드 하나를 CSV 행으로 만듭니다.
fn row_of(record: &Record) -> Result<[String; 4], SinkError> {
    let data: Map<String, Value> = record
        .iter()
        .filter(|(key, _)| !CSV_HEADER[..3].contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let timestamp = record
        .timestamp()
        .map(str::to_owned)
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

    Ok([
        timestamp,
        record.level().to_owned(),
        record.message().to_owned(),
        serde_json::to_string(&data).map_err(csv_err)?,
    ])
}

/// 헤더(선택)와 행들을 CSV 바이트로 인코딩합니다.
fn encode(records: &[Record], with_header: bool) -> Result<Vec<u8>, SinkError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if with_header {
        writer.write_record(CSV_HEADER).map_err(csv_err)?;
    }
    for record in records {
        writer.write_record(row_of(record)?).map_err(csv_err)?;
    }
    writer.into_inner().map_err(csv_err)
}

impl Sink for CsvFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, records: &[Record]) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }

        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = encode(records, self.needs_header().await?)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&body).await?;
        file.flush().await?;

        tracing::debug!(
            sink = %self.name,
            path = %self.path.display(),
            written = records.len(),
            "appended records to CSV file"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|row| row.unwrap().iter().map(str::to_owned).collect())
            .collect()
    }

    #[tokio::test]
    async fn header_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvFileSink::in_dir(dir.path().join("out"), "export");

        sink.write(&[record(json!({"timestamp": "t1", "level": "ERROR", "message": "a"}))])
            .await
            .unwrap();
        sink.write(&[record(json!({"timestamp": "t2", "level": "WARN", "message": "b"}))])
            .await
            .unwrap();

        let rows = read_rows(sink.path());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], CSV_HEADER.map(str::to_owned).to_vec());
        assert_eq!(rows[1][..3], ["t1", "ERROR", "a"]);
        assert_eq!(rows[2][..3], ["t2", "WARN", "b"]);
        assert!(sink.path().ends_with("out/export.csv"));
    }

    #[tokio::test]
    async fn missing_fields_get_defaults_and_extras_go_to_data() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvFileSink::in_dir(dir.path(), "export");

        sink.write(&[record(json!({"status": 404, "path": "/a,b"}))])
            .await
            .unwrap();

        let rows = read_rows(sink.path());
        let row = &rows[1];
        assert!(!row[0].is_empty());
        assert_eq!(row[1], "INFO");
        assert_eq!(row[2], "");
        let data: Value = serde_json::from_str(&row[3]).unwrap();
        assert_eq!(data, json!({"status": 404, "path": "/a,b"}));
    }

    #[tokio::test]
    async fn empty_batch_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvFileSink::in_dir(dir.path(), "export");
        sink.write(&[]).await.unwrap();
        assert!(!sink.path().exists());
    }

    #[tokio::test]
    async fn unwritable_path_is_a_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let sink = CsvFileSink::new(blocker.join("export.csv"));
        let err = sink.write(&[record(json!({"a": 1}))]).await.unwrap_err();
        assert!(matches!(err, SinkError::Write(_)));
    }
}
