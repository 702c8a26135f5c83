//! Speedcast 통합 테스트 (루프백)

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use speedcast::discovery::DiscoveryListener;
use speedcast::session::{run_session, TransferSession};
use speedcast::stats::TransferKind;
use speedcast::{receiver, tcp, Config, Result, Server, ServerOffer, TransferCounter};

struct TestServer {
    offer: ServerOffer,
    discovery_port: u16,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<()>>,
}

impl TestServer {
    async fn stop(self) {
        self.shutdown.send(true).unwrap();
        let result = timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server should stop")
            .unwrap();
        assert!(result.is_ok());
    }
}

/// 서버 시작 후 브로드캐스트된 Offer로 탐색
async fn start_and_discover(mut config: Config) -> TestServer {
    let listener = DiscoveryListener::bind(0).unwrap();
    config.discovery_port = listener.local_port().unwrap();

    let server = Server::bind(config.clone()).await.unwrap();
    let (udp_port, tcp_port) = (server.udp_port(), server.tcp_port());

    let (shutdown, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(server.run(shutdown_rx));

    let offer = timeout(Duration::from_secs(5), listener.wait_for_offer())
        .await
        .expect("offer should be broadcast")
        .unwrap();
    assert_eq!(offer.udp_port, udp_port);
    assert_eq!(offer.tcp_port, tcp_port);

    TestServer {
        offer,
        discovery_port: config.discovery_port,
        shutdown,
        task,
    }
}

#[tokio::test]
async fn test_discovery_then_parallel_session() {
    let config = Config::loopback();
    let server = start_and_discover(config.clone()).await;

    let session = TransferSession::new(server.offer, 64 * 1024, 2, 2);
    let counter = Arc::new(TransferCounter::new());

    let outcomes = timeout(Duration::from_secs(10), run_session(&session, &config, &counter))
        .await
        .expect("session should complete");

    assert_eq!(outcomes.len(), 4);
    assert_eq!(
        outcomes.iter().filter(|o| o.kind == TransferKind::Tcp).count(),
        2
    );

    for outcome in &outcomes {
        let report = outcome.result.as_ref().expect("transfer should succeed");
        assert_eq!(report.bytes_received, 64 * 1024);
        assert!(!report.is_partial());
        if report.kind == TransferKind::Udp {
            let segments = report.segments.as_ref().unwrap();
            assert_eq!(segments.total_segments, 64);
            assert_eq!(segments.received_segments, 64);
            assert_eq!(report.completeness_percent(), Some(100.0));
        }
    }

    // 번호는 세션 안에서 중복 없음
    let mut ids: Vec<u64> = outcomes.iter().map(|o| o.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);

    server.stop().await;
}

#[tokio::test]
async fn test_udp_example_scenario() {
    let mut config = Config::loopback();
    config.segment_interval_us = 1000;
    config.receive_timeout_ms = 500;
    let server = start_and_discover(config.clone()).await;

    let report = timeout(
        Duration::from_secs(30),
        receiver::udp_transfer(server.offer.udp_endpoint(), 1_000_000, 1, &config),
    )
    .await
    .expect("transfer should finish")
    .unwrap();

    let segments = report.segments.as_ref().unwrap();
    assert_eq!(segments.total_segments, 977);
    assert_eq!(segments.received_segments, 977);
    assert_eq!(report.bytes_received, 1_000_000);
    assert!(report.to_string().contains("100.00%"));

    server.stop().await;
}

#[tokio::test]
async fn test_tcp_against_running_server() {
    let config = Config::loopback();
    let server = start_and_discover(config.clone()).await;

    let report = tcp::tcp_transfer(server.offer.tcp_endpoint(), 3_000_001, 1, config.tcp_buffer_size)
        .await
        .unwrap();
    assert_eq!(report.bytes_received, 3_000_001);
    assert!(report.throughput_bps() > 0.0);

    server.stop().await;
}

#[tokio::test]
async fn test_sessions_repeat_with_fresh_discovery() {
    let config = Config::loopback();
    let server = start_and_discover(config.clone()).await;
    let counter = Arc::new(TransferCounter::new());

    for _ in 0..2 {
        let listener = DiscoveryListener::bind(server.discovery_port).unwrap();
        let offer = timeout(Duration::from_secs(5), listener.wait_for_offer())
            .await
            .unwrap()
            .unwrap();

        let session = TransferSession::new(offer, 4096, 1, 1);
        let outcomes = run_session(&session, &config, &counter).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
    }

    // 두 세션에 걸쳐 번호가 이어짐
    assert_eq!(counter.next_id(), 5);
    server.stop().await;
}
