//! UDP 송신자 (서버측)
//!
//! - Request 패킷 수신 → 요청마다 별도 태스크로 세그먼트 스트림
//! - 재전송/ACK 없음, 세그먼트 단위 fire-and-forget
//! - 세그먼트 사이 고정 간격으로 페이싱

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{BufMut, BytesMut};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::packet::{PayloadHeader, RequestPacket};
use crate::segment::{segment_body_len, segment_count};
use crate::{Config, Result};

/// 세그먼트 스트림 1회 전송, 보낸 세그먼트 수 반환
pub async fn send_segments(
    socket: &UdpSocket,
    client_addr: SocketAddr,
    file_size: u64,
    payload_size: usize,
    interval: Duration,
) -> Result<u64> {
    let total_segments = segment_count(file_size, payload_size);
    let mut buf = BytesMut::with_capacity(PayloadHeader::LEN + payload_size);

    for segment_index in 1..=total_segments {
        buf.clear();
        PayloadHeader::new(total_segments, segment_index).write_to(&mut buf);
        // 본문은 의미 없는 채움 데이터
        buf.put_bytes(b'x', segment_body_len(file_size, payload_size, segment_index));

        socket.send_to(&buf, client_addr).await?;

        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }

    Ok(total_segments)
}

/// UDP 요청 처리 루프
pub struct Sender {
    /// 설정
    config: Config,

    /// 서버 UDP 소켓 (Offer 브로드캐스트와 공유)
    socket: Arc<UdpSocket>,
}

impl Sender {
    /// 새 송신자 생성
    pub fn new(config: Config, socket: Arc<UdpSocket>) -> Self {
        Self { config, socket }
    }

    /// shutdown 신호까지 요청 수신
    ///
    /// 수신 에러와 잘못된 패킷은 해당 반복만 버리고 계속 진행
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut buf = vec![0u8; self.config.recv_buffer_size];

        while !*shutdown.borrow() {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, addr)) => {
                            if let Err(e) = self.handle_message(&buf[..len], addr) {
                                debug!("Discarding datagram from {}: {}", addr, e);
                            }
                        }
                        Err(e) => {
                            warn!("수신 에러: {}", e);
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        debug!("UDP request listener stopped");
    }

    /// Request 검증 후 전송 태스크 생성
    fn handle_message(&self, data: &[u8], addr: SocketAddr) -> Result<()> {
        let request = RequestPacket::from_bytes(data)?;
        request.validate()?;

        info!("Received UDP request from {} for {} bytes", addr, request.file_size);

        let socket = self.socket.clone();
        let payload_size = self.config.payload_size;
        let interval = self.config.segment_interval();

        tokio::spawn(async move {
            let start = Instant::now();
            match send_segments(&socket, addr, request.file_size, payload_size, interval).await {
                Ok(total_segments) => info!(
                    "UDP transfer to {} done: {} segments in {:.2}s",
                    addr,
                    total_segments,
                    start.elapsed().as_secs_f64()
                ),
                Err(e) => warn!("UDP 전송 에러 ({}): {}", addr, e),
            }
        });

        Ok(())
    }
}
