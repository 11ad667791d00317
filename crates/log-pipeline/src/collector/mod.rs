//! 라인 소스 -- 파일에서 원시 라인을 읽어 디스패처로 보냅니다.
//!
//! # 소스
//! - [`TailSource`]: 커져가는 파일을 폴링하며 새로 추가된 라인만 전달 (tail 모드)
//! - [`BatchScanner`]: 정적 파일/디렉토리를 한 번 읽어 전달 (batch 모드)
//!
//! 두 소스 모두 [`DispatcherHandle`](crate::dispatcher::DispatcherHandle)을 통해
//! `(파서 이름, 라인)`을 enqueue하는 단일 생산자입니다.
//! 한 소스 안에서는 파일 순서대로 enqueue됩니다.

pub mod batch;
pub mod tail;

pub use batch::{BatchScanner, ScanReport};
pub use tail::{TailLine, TailSource, TailState};
