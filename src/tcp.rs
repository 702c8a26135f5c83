//! TCP 전송
//!
//! - 서버: 개행 종료 10진수 크기 요청을 읽고 정확히 그 바이트 수만큼 전송 후 종료
//! - 클라이언트: 크기 요청 후 연결 종료 또는 요청 크기 도달까지 수신하여 처리율 측정

use std::net::SocketAddr;
use std::time::Instant;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::stats::TransferReport;
use crate::{Error, Result};

/// 크기 요청 줄 최대 길이 (u64 최대 20자리 + 여유)
pub const MAX_SIZE_LINE: usize = 32;

/// 크기 요청 한 줄 파싱
pub async fn read_size_request<R>(reader: &mut R) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader.take(MAX_SIZE_LINE as u64).read_line(&mut line).await?;
    if n == 0 {
        return Err(Error::ConnectionClosed);
    }

    let trimmed = line.trim();
    trimmed
        .parse::<u64>()
        .map_err(|_| Error::InvalidSizeRequest(trimmed.to_string()))
}

/// 연결 하나 처리 (서버측), 전송한 바이트 수 반환
///
/// 성공/실패와 관계없이 반환 시 연결이 닫힘
pub async fn handle_tcp_connection(mut stream: TcpStream, buffer_size: usize) -> Result<u64> {
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);

    let file_size = read_size_request(&mut reader).await?;
    info!("Received TCP request for {} bytes", file_size);

    // 내용은 의미 없음, 바이트 수만 측정
    let filler = vec![b'x'; buffer_size.max(1)];
    let mut remaining = file_size;

    while remaining > 0 {
        let n = remaining.min(filler.len() as u64) as usize;
        writer.write_all(&filler[..n]).await?;
        remaining -= n as u64;
    }

    writer.shutdown().await?;
    debug!("TCP transfer sent {} bytes", file_size);
    Ok(file_size)
}

/// TCP 수락 루프 (서버측)
///
/// 연결마다 태스크 하나. 수락 에러는 로그만 남기고 계속
pub async fn serve_tcp(listener: TcpListener, buffer_size: usize, mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        info!("Accepted TCP connection from {}", addr);
                        tokio::spawn(async move {
                            if let Err(e) = handle_tcp_connection(stream, buffer_size).await {
                                warn!("TCP 전송 에러 ({}): {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        warn!("TCP 수락 에러: {}", e);
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

    debug!("TCP acceptor stopped");
}

/// TCP 전송 1회 (클라이언트측)
pub async fn tcp_transfer(
    server: SocketAddr,
    file_size: u64,
    id: u64,
    buffer_size: usize,
) -> Result<TransferReport> {
    let mut stream = TcpStream::connect(server).await?;
    stream.write_all(format!("{}\n", file_size).as_bytes()).await?;

    let start = Instant::now();
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut bytes_received = 0u64;

    while bytes_received < file_size {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        bytes_received += n as u64;
    }

    let report = TransferReport::tcp(id, file_size, bytes_received, start.elapsed());
    if report.is_partial() {
        warn!(
            "TCP transfer #{} closed early: {}/{} bytes",
            id, bytes_received, file_size
        );
    }
    Ok(report)
}
