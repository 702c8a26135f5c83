//! UDP 수신자 (클라이언트측)
//!
//! - Request 1회 전송 후 세그먼트 수신
//! - 수신 세그먼트 집합으로 손실/중복 계산
//! - 종료 신호는 수신 무음 타임아웃뿐 (별도 종료 패킷 없음)

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::packet::{PayloadHeader, RequestPacket};
use crate::segment::SegmentTracker;
use crate::stats::TransferReport;
use crate::{Config, Result};

/// UDP 전송 1회 수신자
pub struct Receiver {
    socket: UdpSocket,
    server_addr: SocketAddr,
    receive_timeout: Duration,
    recv_buffer_size: usize,
}

impl Receiver {
    /// 서버 주소 체계에 맞는 임의 포트 바인딩
    pub async fn bind(server_addr: SocketAddr, config: &Config) -> Result<Self> {
        let bind_addr = match server_addr.ip() {
            IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };

        Ok(Self {
            socket: UdpSocket::bind(bind_addr).await?,
            server_addr,
            receive_timeout: config.receive_timeout(),
            recv_buffer_size: config.recv_buffer_size,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Request 전송 후 무음 타임아웃까지 수신
    ///
    /// 경과 시간은 요청 전송부터 마지막 유효 세그먼트 도착까지
    pub async fn run(self, file_size: u64, id: u64) -> Result<TransferReport> {
        self.socket
            .send_to(&RequestPacket::new(file_size).to_bytes(), self.server_addr)
            .await?;

        let start = Instant::now();
        let mut last_arrival: Option<Instant> = None;
        let mut tracker = SegmentTracker::new();
        let mut buf = vec![0u8; self.recv_buffer_size];

        loop {
            let (len, addr) =
                match tokio::time::timeout(self.receive_timeout, self.socket.recv_from(&mut buf)).await {
                    Ok(received) => received?,
                    Err(_) => break,
                };

            let header = match PayloadHeader::from_bytes(&buf[..len]) {
                Ok(header) => header,
                Err(e) => {
                    debug!("Discarding datagram from {}: {}", addr, e);
                    continue;
                }
            };
            if let Err(e) = header.validate() {
                debug!("Ignoring datagram from {}: {}", addr, e);
                continue;
            }

            tracker.record(&header, len - PayloadHeader::LEN);
            last_arrival = Some(Instant::now());
        }

        let elapsed = match last_arrival {
            Some(at) => at.duration_since(start),
            None => start.elapsed(),
        };

        if tracker.duplicates > 0 || tracker.out_of_range > 0 {
            info!(
                "UDP transfer #{}: {} duplicate, {} out-of-range segments",
                id, tracker.duplicates, tracker.out_of_range
            );
        }

        Ok(TransferReport::udp(id, file_size, &tracker, elapsed))
    }
}

/// UDP 전송 1회 (클라이언트측)
pub async fn udp_transfer(
    server_addr: SocketAddr,
    file_size: u64,
    id: u64,
    config: &Config,
) -> Result<TransferReport> {
    Receiver::bind(server_addr, config).await?.run(file_size, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    use crate::packet::{encode_offer, MessageType};

    fn payload(total: u64, index: u64, body: usize) -> Vec<u8> {
        let mut buf = BytesMut::new();
        PayloadHeader::new(total, index).write_to(&mut buf);
        buf.put_bytes(0, body);
        buf.to_vec()
    }

    /// 요청을 받으면 지정된 데이터그램들을 보내는 가짜 서버
    async fn fake_server(datagrams: Vec<Vec<u8>>) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, client) = socket.recv_from(&mut buf).await.unwrap();
            let request = RequestPacket::from_bytes(&buf[..len]).unwrap();
            assert_eq!(request.message_type, MessageType::Request.as_u8());

            for datagram in datagrams {
                socket.send_to(&datagram, client).await.unwrap();
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_loss_duplicates_and_foreign_packets() {
        let total = 10;
        let mut datagrams: Vec<Vec<u8>> = (1..=total)
            .filter(|i| *i != 4 && *i != 7)
            .map(|i| payload(total, i, 100))
            .collect();
        datagrams.push(payload(total, 1, 100));

        let mut bad_cookie = payload(total, 4, 100);
        bad_cookie[0] = 0;
        datagrams.push(bad_cookie);
        datagrams.push(encode_offer(1, 2).to_vec());
        datagrams.push(vec![0xab; 5]);

        let server = fake_server(datagrams).await;
        let mut config = Config::loopback();
        config.receive_timeout_ms = 200;

        let report = udp_transfer(server, 1000, 5, &config).await.unwrap();
        let segments = report.segments.as_ref().unwrap();

        assert_eq!(segments.total_segments, 10);
        assert_eq!(segments.received_segments, 8);
        assert_eq!(segments.duplicate_segments, 1);
        assert!((segments.completeness_percent - 80.0).abs() < 1e-9);
        assert_eq!(report.bytes_received, 800);
        assert_eq!(report.id, 5);
    }

    #[tokio::test]
    async fn test_silence_reports_zero() {
        let server = fake_server(Vec::new()).await;
        let mut config = Config::loopback();
        config.receive_timeout_ms = 100;

        let start = Instant::now();
        let report = udp_transfer(server, 4096, 1, &config).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(100));
        assert_eq!(report.completeness_percent(), Some(0.0));
        assert_eq!(report.bytes_received, 0);
        assert_eq!(report.throughput_bps(), 0.0);
    }
}
