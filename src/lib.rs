//! # Speedcast
//!
//! 브로드캐스트 기반 서버 탐색 + TCP/UDP 처리량 측정 프로토콜
//!
//! ## 핵심 특징
//! - **Offer 브로드캐스트**: 서버가 1초마다 UDP/TCP 포트를 알림
//! - **첫 Offer 채택**: 클라이언트는 처음 받은 유효한 Offer의 서버로 세션 시작
//! - **TCP 전송**: 개행 종료 10진수 크기 요청 → 정확히 그 바이트 수만큼 스트림
//! - **UDP 전송**: 세그먼트 단위 fire-and-forget, 수신 측은 세그먼트 집합으로 손실 계산
//! - **타임아웃 종료**: UDP 전송 끝은 수신 무음 타임아웃으로만 판단

pub mod config;
pub mod discovery;
pub mod error;
pub mod net;
pub mod packet;
pub mod receiver;
pub mod segment;
pub mod sender;
pub mod server;
pub mod session;
pub mod stats;
pub mod tcp;

pub use config::Config;
pub use discovery::{Broadcaster, DiscoveryListener, ServerOffer};
pub use error::{Error, Result};
pub use packet::{MessageType, OfferPacket, PayloadHeader, RequestPacket};
pub use segment::{segment_count, SegmentTracker};
pub use server::Server;
pub use session::TransferSession;
pub use stats::{TransferCounter, TransferKind, TransferReport};

/// 매직 쿠키 (패킷 식별용)
pub const MAGIC_COOKIE: u32 = 0xabcd_dcba;

/// 잘 알려진 탐색(브로드캐스트) 포트
pub const DISCOVERY_PORT: u16 = 13117;

/// 세그먼트당 기본 최대 페이로드 크기 (바이트)
pub const DEFAULT_PAYLOAD_SIZE: usize = 1024;

/// UDP 데이터그램 최대 크기 (IPv4 기준)
pub const MAX_DATAGRAM_SIZE: usize = 65_507;
