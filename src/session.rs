//! 전송 세션 (클라이언트측 오케스트레이터)
//!
//! 탐색 1회 → 세션 1회. TCP/UDP 전송을 요청 수만큼 동시에 실행하고
//! 모든 태스크가 끝나야 세션이 끝남

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::discovery::ServerOffer;
use crate::stats::{TransferCounter, TransferKind, TransferReport};
use crate::{receiver, tcp, Config, Result};

/// 탐색 이후 생성되는 세션 정보
#[derive(Debug, Clone)]
pub struct TransferSession {
    pub server: ServerOffer,
    pub file_size: u64,
    pub tcp_connections: usize,
    pub udp_connections: usize,
}

impl TransferSession {
    pub fn new(server: ServerOffer, file_size: u64, tcp_connections: usize, udp_connections: usize) -> Self {
        Self {
            server,
            file_size,
            tcp_connections,
            udp_connections,
        }
    }

    pub fn total_transfers(&self) -> usize {
        self.tcp_connections + self.udp_connections
    }
}

/// 전송 태스크 결과 (태스크마다 독립)
#[derive(Debug)]
pub struct TransferOutcome {
    pub id: u64,
    pub kind: TransferKind,
    pub result: Result<TransferReport>,
}

/// 세션 실행
///
/// 각 태스크의 성공/실패는 서로 영향 없음. 결과는 로그로 보고하고
/// 모든 태스크가 끝난 뒤 태스크 순서대로 반환
pub async fn run_session(
    session: &TransferSession,
    config: &Config,
    counter: &Arc<TransferCounter>,
) -> Vec<TransferOutcome> {
    let mut handles: Vec<(u64, TransferKind, JoinHandle<Result<TransferReport>>)> =
        Vec::with_capacity(session.total_transfers());

    for _ in 0..session.tcp_connections {
        let id = counter.next_id();
        let server = session.server.tcp_endpoint();
        let file_size = session.file_size;
        let buffer_size = config.tcp_buffer_size;

        let handle = tokio::spawn(async move {
            tcp::tcp_transfer(server, file_size, id, buffer_size).await
        });
        handles.push((id, TransferKind::Tcp, handle));
    }

    for _ in 0..session.udp_connections {
        let id = counter.next_id();
        let server = session.server.udp_endpoint();
        let file_size = session.file_size;
        let config = config.clone();

        let handle = tokio::spawn(async move {
            receiver::udp_transfer(server, file_size, id, &config).await
        });
        handles.push((id, TransferKind::Udp, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (id, kind, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(report) => info!("{}", report),
            Err(e) => warn!("Error in {} transfer #{}: {}", kind, id, e),
        }
        outcomes.push(TransferOutcome { id, kind, result });
    }

    outcomes
}
