//! 에러 타입 -- 도메인별 에러 정의

/// unilog 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum UnilogError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 싱크 쓰기 에러
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline not running")]
    NotRunning,
}

/// 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 지원하지 않는 형식
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 파싱 실패
    #[error("{format} parse failed at offset {offset}: {reason}")]
    Failed {
        format: String,
        offset: usize,
        reason: String,
    },

    /// 입력 데이터 초과
    #[error("input too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },
}

/// 싱크 쓰기 에러
///
/// 싱크 이름은 Fanout이 로그에 함께 남기므로 여기에는 사유만 담습니다.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// 직렬화 실패
    #[error("serialization failed: {0}")]
    Serialize(String),

    /// 쓰기 실패 (파일, 네트워크 등)
    #[error("write failed: {0}")]
    Write(String),

    /// 업로드 실패 (오브젝트 스토어)
    #[error("upload failed: {0}")]
    Upload(String),
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Write(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_unilog_error() {
        let err: UnilogError = ConfigError::InvalidValue {
            field: "pipeline.worker_count".to_owned(),
            reason: "must be 1-256".to_owned(),
        }
        .into();
        assert!(matches!(err, UnilogError::Config(_)));
        assert!(err.to_string().contains("pipeline.worker_count"));
    }

    #[test]
    fn parse_error_display_includes_format() {
        let err = ParseError::Failed {
            format: "apache".to_owned(),
            offset: 0,
            reason: "no grammar matched".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("apache"));
        assert!(msg.contains("no grammar matched"));
    }

    #[test]
    fn io_error_becomes_sink_write_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SinkError = io.into();
        assert!(matches!(err, SinkError::Write(_)));
    }
}
