//! Speedcast 클라이언트
//!
//! Offer 수신 → 세션 (TCP/UDP 동시 전송) → 다시 Offer 대기, 종료 시그널까지 반복
//!
//! 사용법:
//!   cargo run --release --bin speedcast-client -- [OPTIONS]
//!
//! 예시:
//!   # 크기/연결 수를 매 세션마다 입력
//!   cargo run --release --bin speedcast-client
//!
//!   # 1MB, TCP 2개, UDP 2개, JSON 출력
//!   cargo run --release --bin speedcast-client -- --size 1000000 --tcp 2 --udp 2 --json

use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use speedcast::discovery::discover_server;
use speedcast::session::{run_session, TransferSession};
use speedcast::{Config, TransferCounter};

/// Speedcast Client - discovers a server and measures TCP/UDP throughput
#[derive(Parser, Debug, Clone)]
#[command(name = "speedcast-client", version, about)]
struct Args {
    /// Port to listen on for server offers
    #[arg(long, default_value_t = speedcast::DISCOVERY_PORT)]
    discovery_port: u16,

    /// Bytes to request per transfer (prompted when omitted)
    #[arg(short, long)]
    size: Option<u64>,

    /// Number of concurrent TCP transfers (prompted when omitted)
    #[arg(long)]
    tcp: Option<usize>,

    /// Number of concurrent UDP transfers (prompted when omitted)
    #[arg(long)]
    udp: Option<usize>,

    /// Silence in milliseconds that ends a UDP transfer
    #[arg(long, default_value_t = Config::default().receive_timeout_ms)]
    receive_timeout_ms: u64,

    /// Print one JSON line per transfer report
    #[arg(long)]
    json: bool,

    /// Exit after a single session
    #[arg(long)]
    once: bool,
}

/// stdin에서 값 하나 입력 (잘못된 입력이면 다시 질문)
fn prompt<T: FromStr>(label: &str) -> io::Result<T> {
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("{}: ", label);
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
        }
        match line.trim().parse() {
            Ok(value) => return Ok(value),
            Err(_) => println!("Invalid value: {:?}", line.trim()),
        }
    }
}

/// 세션 파라미터 (명령행에 없으면 입력)
fn session_parameters(args: &Args) -> io::Result<(u64, usize, usize)> {
    let file_size = match args.size {
        Some(size) => size,
        None => prompt("Enter file size (bytes)")?,
    };
    let tcp = match args.tcp {
        Some(tcp) => tcp,
        None => prompt("Enter number of TCP connections")?,
    };
    let udp = match args.udp {
        Some(udp) => udp,
        None => prompt("Enter number of UDP connections")?,
    };
    Ok((file_size, tcp, udp))
}

async fn run_client(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config {
        discovery_port: args.discovery_port,
        receive_timeout_ms: args.receive_timeout_ms,
        ..Config::default()
    };
    config.validate()?;

    let counter = Arc::new(TransferCounter::new());

    loop {
        let server = discover_server(&config).await?;

        let prompt_args = args.clone();
        let (file_size, tcp, udp) =
            tokio::task::spawn_blocking(move || session_parameters(&prompt_args)).await??;

        let session = TransferSession::new(server, file_size, tcp, udp);
        info!(
            "Starting session with {}: {} bytes, {} TCP, {} UDP",
            server, file_size, tcp, udp
        );

        let outcomes = run_session(&session, &config, &counter).await;

        if args.json {
            for outcome in &outcomes {
                if let Ok(report) = &outcome.result {
                    println!("{}", serde_json::to_string(report)?);
                }
            }
        }

        info!("All transfers complete, listening to offer requests");

        if args.once {
            return Ok(());
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
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tokio::select! {
        result = run_client(args) => result,
        _ = tokio::signal::ctrl_c() => {
            // 입력 대기 중인 blocking 태스크를 기다리지 않고 종료
            info!("Client stopped");
            std::process::exit(0);
        }
    }
}
