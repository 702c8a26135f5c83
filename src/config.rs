//! 프로토콜 설정

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::packet::PayloadHeader;
use crate::{Error, Result, DEFAULT_PAYLOAD_SIZE, DISCOVERY_PORT, MAX_DATAGRAM_SIZE};

/// Speedcast 설정 (서버/클라이언트 공용)
#[derive(Debug, Clone)]
pub struct Config {
    /// 탐색 포트 (Offer 브로드캐스트 대상 / 클라이언트 수신 포트)
    pub discovery_port: u16,

    /// 서버 UDP 포트 (0이면 임의 할당, Offer에는 실제 포트가 실림)
    pub udp_port: u16,

    /// 서버 TCP 포트 (0이면 임의 할당)
    pub tcp_port: u16,

    /// Offer 브로드캐스트 대상 주소
    pub broadcast_addr: IpAddr,

    /// Offer 전송 주기 (밀리초)
    pub offer_interval_ms: u64,

    /// 세그먼트당 최대 페이로드 크기 (바이트)
    pub payload_size: usize,

    /// 세그먼트 전송 간격 (마이크로초)
    /// 0이면 최대 속도로 전송
    pub segment_interval_us: u64,

    /// UDP 수신 무음 타임아웃 (밀리초), 전송 종료 신호
    pub receive_timeout_ms: u64,

    /// TCP 송수신 버퍼 크기
    pub tcp_buffer_size: usize,

    /// UDP 수신 버퍼 크기
    pub recv_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discovery_port: DISCOVERY_PORT,
            udp_port: 20001,
            tcp_port: 20002,
            broadcast_addr: IpAddr::V4(Ipv4Addr::BROADCAST),
            offer_interval_ms: 1000,          // 1초
            payload_size: DEFAULT_PAYLOAD_SIZE,
            segment_interval_us: 1000,        // 1ms
            receive_timeout_ms: 1000,         // 1초 무음이면 종료
            tcp_buffer_size: 64 * 1024,       // 64KB
            recv_buffer_size: 64 * 1024,
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 루프백 테스트용 설정
    ///
    /// 임의 포트 + 127.0.0.1 브로드캐스트 + 짧은 타이머
    pub fn loopback() -> Self {
        Self {
            discovery_port: 0,
            udp_port: 0,
            tcp_port: 0,
            broadcast_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            offer_interval_ms: 50,
            segment_interval_us: 0,
            receive_timeout_ms: 300,
            ..Self::default()
        }
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        let max_payload = MAX_DATAGRAM_SIZE - PayloadHeader::LEN;
        if self.payload_size == 0 || self.payload_size > max_payload {
            return Err(Error::InvalidConfig(format!(
                "payload_size must be within 1..={}, got {}",
                max_payload, self.payload_size
            )));
        }
        if self.offer_interval_ms == 0 {
            return Err(Error::InvalidConfig("offer_interval_ms must be non-zero".into()));
        }
        if self.receive_timeout_ms == 0 {
            return Err(Error::InvalidConfig("receive_timeout_ms must be non-zero".into()));
        }
        if self.tcp_buffer_size == 0 {
            return Err(Error::InvalidConfig("tcp_buffer_size must be non-zero".into()));
        }
        if self.recv_buffer_size < PayloadHeader::LEN + self.payload_size {
            return Err(Error::InvalidConfig(format!(
                "recv_buffer_size {} cannot hold a {} byte datagram",
                self.recv_buffer_size,
                PayloadHeader::LEN + self.payload_size
            )));
        }
        Ok(())
    }

    /// Offer 브로드캐스트 대상
    pub fn broadcast_target(&self) -> SocketAddr {
        SocketAddr::new(self.broadcast_addr, self.discovery_port)
    }

    pub fn offer_interval(&self) -> Duration {
        Duration::from_millis(self.offer_interval_ms)
    }

    pub fn segment_interval(&self) -> Duration {
        Duration::from_micros(self.segment_interval_us)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.broadcast_target().to_string(), "255.255.255.255:13117");
        assert_eq!(config.receive_timeout(), Duration::from_secs(1));
        assert!(Config::loopback().validate().is_ok());
    }

    #[test]
    fn test_payload_size_bounds() {
        let mut config = Config::default();
        config.payload_size = 0;
        assert!(config.validate().is_err());

        config.payload_size = MAX_DATAGRAM_SIZE;
        assert!(config.validate().is_err());

        config.payload_size = 4096;
        config.recv_buffer_size = 1024;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
