//! 서버 탐색
//!
//! - Broadcaster (서버측): Offer 패킷을 주기적으로 브로드캐스트
//! - DiscoveryListener (클라이언트측): 처음 받은 유효한 Offer의 서버를 선택

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::packet::OfferPacket;
use crate::{net, Config, Result};

/// 탐색된 서버
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOffer {
    /// Offer를 보낸 주소
    pub addr: IpAddr,
    pub udp_port: u16,
    pub tcp_port: u16,
}

impl ServerOffer {
    pub fn udp_endpoint(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.udp_port)
    }

    pub fn tcp_endpoint(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.tcp_port)
    }
}

impl fmt::Display for ServerOffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (udp {}, tcp {})", self.addr, self.udp_port, self.tcp_port)
    }
}

/// Offer 브로드캐스터
pub struct Broadcaster {
    socket: Arc<UdpSocket>,

    /// 한 번 만들어 재사용
    packet: Bytes,

    target: SocketAddr,

    interval: Duration,
}

impl Broadcaster {
    pub fn new(socket: Arc<UdpSocket>, udp_port: u16, tcp_port: u16, config: &Config) -> Self {
        Self {
            socket,
            packet: OfferPacket::new(udp_port, tcp_port).to_bytes(),
            target: config.broadcast_target(),
            interval: config.offer_interval(),
        }
    }

    /// shutdown 신호까지 Offer 전송 반복
    ///
    /// 전송 실패는 로그만 남기고 계속 진행
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Broadcasting offers to {} every {:?}", self.target, self.interval);

        while !*shutdown.borrow() {
            match self.socket.send_to(&self.packet, self.target).await {
                Ok(_) => debug!("Offer sent to {}", self.target),
                Err(e) => warn!("Offer 전송 실패: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        debug!("Broadcaster stopped");
    }
}

/// Offer 수신기
pub struct DiscoveryListener {
    socket: UdpSocket,
}

impl DiscoveryListener {
    /// 탐색 포트 바인딩 (주소 재사용)
    pub fn bind(port: u16) -> Result<Self> {
        Ok(Self {
            socket: net::bind_discovery_socket(port)?,
        })
    }

    pub fn local_port(&self) -> Result<u16> {
        Ok(self.socket.local_addr()?.port())
    }

    /// 첫 번째 유효한 Offer를 받을 때까지 대기
    ///
    /// 소켓을 소비하므로 이후 도착하는 Offer는 읽히지 않음
    pub async fn wait_for_offer(self) -> Result<ServerOffer> {
        let mut buf = vec![0u8; 1024];

        loop {
            let (len, addr) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!("탐색 수신 에러: {}", e);
                    continue;
                }
            };

            let offer = match OfferPacket::from_bytes(&buf[..len]) {
                Ok(offer) => offer,
                Err(e) => {
                    debug!("Discarding datagram from {}: {}", addr, e);
                    continue;
                }
            };

            if let Err(e) = offer.validate() {
                debug!("Ignoring non-offer datagram from {}: {}", addr, e);
                continue;
            }

            let server = ServerOffer {
                addr: addr.ip(),
                udp_port: offer.udp_port,
                tcp_port: offer.tcp_port,
            };
            info!("Received offer from {}", server);
            return Ok(server);
        }
    }
}

/// 설정된 탐색 포트에서 서버 하나를 찾음
pub async fn discover_server(config: &Config) -> Result<ServerOffer> {
    let listener = DiscoveryListener::bind(config.discovery_port)?;
    info!(
        "Client started, listening for offer requests on port {}...",
        listener.local_port()?
    );
    listener.wait_for_offer().await
}
