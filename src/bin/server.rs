//! Speedcast 서버
//!
//! 1초마다 Offer를 브로드캐스트하고 TCP/UDP 전송 요청을 처리
//!
//! 사용법:
//!   cargo run --release --bin speedcast-server -- [OPTIONS]
//!
//! 예시:
//!   # 기본 포트
//!   cargo run --release --bin speedcast-server
//!
//!   # 임의 포트 + 페이싱 없음
//!   cargo run --release --bin speedcast-server -- --udp-port 0 --tcp-port 0 --segment-interval-us 0

use std::net::IpAddr;

use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use speedcast::{Config, Server};

/// Speedcast Server - broadcast-discovered throughput test server
#[derive(Parser, Debug)]
#[command(name = "speedcast-server", version, about)]
struct Args {
    /// UDP data port (0 = ephemeral)
    #[arg(long, default_value_t = Config::default().udp_port)]
    udp_port: u16,

    /// TCP listening port (0 = ephemeral)
    #[arg(long, default_value_t = Config::default().tcp_port)]
    tcp_port: u16,

    /// Port clients listen on for offers
    #[arg(long, default_value_t = speedcast::DISCOVERY_PORT)]
    discovery_port: u16,

    /// Offer broadcast address
    #[arg(long, default_value = "255.255.255.255")]
    broadcast_addr: IpAddr,

    /// Offer broadcast interval in milliseconds
    #[arg(long, default_value_t = Config::default().offer_interval_ms)]
    offer_interval_ms: u64,

    /// Maximum payload bytes per UDP segment
    #[arg(long, default_value_t = speedcast::DEFAULT_PAYLOAD_SIZE)]
    payload_size: usize,

    /// Delay between UDP segments in microseconds (0 = no pacing)
    #[arg(long, default_value_t = Config::default().segment_interval_us)]
    segment_interval_us: u64,
}

impl Args {
    fn into_config(self) -> Config {
        Config {
            udp_port: self.udp_port,
            tcp_port: self.tcp_port,
            discovery_port: self.discovery_port,
            broadcast_addr: self.broadcast_addr,
            offer_interval_ms: self.offer_interval_ms,
            payload_size: self.payload_size,
            segment_interval_us: self.segment_interval_us,
            ..Config::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();

    info!("Speedcast Server starting...");
    info!("Discovery target: {}", config.broadcast_target());
    info!("Payload size: {} bytes", config.payload_size);
    info!("Segment interval: {:?}", config.segment_interval());

    // 바인딩 실패는 여기서 종료
    let server = Server::bind(config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down server...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // 시그널 없이 계속 실행 (sender를 살려 둠)
                warn!("Ctrl-C handler unavailable: {}", e);
                std::future::pending::<()>().await;
                drop(shutdown_tx);
            }
        }
    });

    server.run(shutdown_rx).await?;
    Ok(())
}
