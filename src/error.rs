//! 에러 타입 정의

use thiserror::Error;

/// Speedcast 프로토콜 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("패킷 길이 부족: expected {expected} bytes, got {got}")]
    PacketTooShort { expected: usize, got: usize },

    #[error("유효하지 않은 매직 쿠키: expected {expected:08X}, got {got:08X}")]
    InvalidMagicCookie { expected: u32, got: u32 },

    #[error("메시지 타입 불일치: expected {expected:#04x}, got {got:#04x}")]
    MessageTypeMismatch { expected: u8, got: u8 },

    #[error("유효하지 않은 크기 요청: {0:?}")]
    InvalidSizeRequest(String),

    #[error("유효하지 않은 설정: {0}")]
    InvalidConfig(String),

    #[error("연결 종료")]
    ConnectionClosed,

    #[error("태스크 조인 실패: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
