//! 소켓 생성 유틸리티
//!
//! socket2로 주소 재사용 옵션을 설정한 뒤 tokio 소켓으로 변환

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::net::{TcpListener, UdpSocket};
use tracing::debug;

/// 탐색 포트 수신 소켓 (주소 재사용)
///
/// 같은 호스트의 여러 클라이언트가 동시에 탐색 포트를 열 수 있어야 함
pub fn bind_discovery_socket(port: u16) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket.set_reuse_port(true)?;
    socket.set_broadcast(true)?;

    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    socket.bind(&SockAddr::from(addr))?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    let udp = UdpSocket::from_std(std_socket)?;

    debug!("Discovery socket bound to {}", udp.local_addr()?);
    Ok(udp)
}

/// 서버 UDP 소켓 (Offer 브로드캐스트 + 요청 수신 + 세그먼트 송신 공용)
pub async fn bind_server_udp(port: u16) -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)).await?;
    socket.set_broadcast(true)?;
    Ok(socket)
}

/// 서버 TCP 리스너
pub fn bind_tcp_listener(port: u16) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;

    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    socket.bind(&SockAddr::from(addr))?;
    socket.listen(128)?;
    socket.set_nonblocking(true)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

/// 기본 경로의 로컬 IPv4 주소
///
/// UDP connect는 패킷을 보내지 않고 라우팅만 결정함. 실패하면 0.0.0.0
pub fn local_ip() -> IpAddr {
    let probe = || -> io::Result<IpAddr> {
        let socket = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
        Ok(socket.local_addr()?.ip())
    };
    probe().unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_discovery_port_can_be_shared() {
        let first = bind_discovery_socket(0).unwrap();
        let port = first.local_addr().unwrap().port();

        // SO_REUSEADDR/SO_REUSEPORT로 같은 포트 재바인딩 가능
        let second = bind_discovery_socket(port).unwrap();
        assert_eq!(second.local_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn test_ephemeral_ports_are_resolved() {
        let udp = bind_server_udp(0).await.unwrap();
        let tcp = bind_tcp_listener(0).unwrap();
        assert_ne!(udp.local_addr().unwrap().port(), 0);
        assert_ne!(tcp.local_addr().unwrap().port(), 0);
    }
}
