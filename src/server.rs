//! 서버 수명주기
//!
//! 바인딩 실패는 치명적 에러로 반환. 바인딩 이후 백그라운드 루프 3개
//! (Offer 브로드캐스트, TCP 수락, UDP 요청 수신)가 shutdown 신호까지 실행됨

use std::sync::Arc;

use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::watch;
use tracing::info;

use crate::discovery::Broadcaster;
use crate::sender::Sender;
use crate::{net, tcp, Config, Result};

/// Speedcast 서버
pub struct Server {
    config: Config,
    udp_socket: Arc<UdpSocket>,
    tcp_listener: TcpListener,
    udp_port: u16,
    tcp_port: u16,
}

impl Server {
    /// UDP/TCP 포트 바인딩
    pub async fn bind(config: Config) -> Result<Self> {
        config.validate()?;

        let udp_socket = net::bind_server_udp(config.udp_port).await?;
        let tcp_listener = net::bind_tcp_listener(config.tcp_port)?;
        let udp_port = udp_socket.local_addr()?.port();
        let tcp_port = tcp_listener.local_addr()?.port();

        Ok(Self {
            config,
            udp_socket: Arc::new(udp_socket),
            tcp_listener,
            udp_port,
            tcp_port,
        })
    }

    /// 실제 바인딩된 UDP 포트
    pub fn udp_port(&self) -> u16 {
        self.udp_port
    }

    /// 실제 바인딩된 TCP 포트
    pub fn tcp_port(&self) -> u16 {
        self.tcp_port
    }

    /// shutdown 신호(true)까지 실행
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("Server started, listening on IP address {}", net::local_ip());
        info!("UDP port: {}, TCP port: {}", self.udp_port, self.tcp_port);

        let broadcaster = Broadcaster::new(
            self.udp_socket.clone(),
            self.udp_port,
            self.tcp_port,
            &self.config,
        );
        let broadcast_task = tokio::spawn(broadcaster.run(shutdown.clone()));

        let tcp_task = tokio::spawn(tcp::serve_tcp(
            self.tcp_listener,
            self.config.tcp_buffer_size,
            shutdown.clone(),
        ));

        let sender = Sender::new(self.config, self.udp_socket);
        let udp_task = tokio::spawn(async move { sender.run(shutdown).await });

        let (broadcast_result, tcp_result, udp_result) =
            tokio::join!(broadcast_task, tcp_task, udp_task);
        broadcast_result?;
        tcp_result?;
        udp_result?;

        info!("Server stopped");
        Ok(())
    }
}
