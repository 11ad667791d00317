//! 클라우드 오브젝트 스토어 싱크
//!
//! 레코드를 먼저 로컬 JSON 파일로 만든 뒤, 외부 업로더에 그 파일 경로를 넘깁니다.
//! 업로드 방식(S3, GCS, Azure Blob 등)은 [`ObjectUploader`] 구현체의 몫입니다.

use std::future::Future;
use std::path::{Path, PathBuf};

use unilog_core::error::SinkError;
use unilog_core::pipeline::Sink;
use unilog_core::types::Record;

use super::json_file::JsonFileSink;

/// 로컬 파일을 원격 저장소로 올리는 외부 협력자
pub trait ObjectUploader: Send + Sync {
    /// 파일을 업로드합니다. 실패는 `SinkError::Upload`로 보고합니다.
    fn upload(&self, path: &Path) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// 로컬 JSON 파일 + 업로드 싱크 (`s3`, `gcp`, `azure`)
pub struct ObjectStoreSink<U> {
    local: JsonFileSink,
    uploader: U,
}

impl<U: ObjectUploader> ObjectStoreSink<U> {
    /// `{output_dir}/{stem}_{name}.json`을 로컬 파일로 사용합니다.
    ///
    /// 싱크마다 파일을 분리하여 `json` 싱크와 같은 파일을 두 번 쓰지 않습니다.
    pub fn new(name: &str, output_dir: impl AsRef<Path>, stem: &str, uploader: U) -> Self {
        let path = output_dir.as_ref().join(format!("{stem}_{name}.json"));
        Self {
            local: JsonFileSink::named(name, path),
            uploader,
        }
    }

    /// 업로드 대상 로컬 파일 경로
    pub fn local_path(&self) -> &Path {
        self.local.path()
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }
}

impl<U: ObjectUploader> Sink for ObjectStoreSink<U> {
    fn name(&self) -> &str {
        Sink::name(&self.local)
    }

    async fn write(&self, records: &[Record]) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }
        self.local.write(records).await?;

        let path: PathBuf = self.local.path().to_path_buf();
        self.uploader.upload(&path).await?;
        tracing::info!(sink = %Sink::name(self), path = %path.display(), "uploaded local export");
        Ok(())
    }
}
