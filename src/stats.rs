//! 전송 통계

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::segment::SegmentTracker;

/// 전송 번호 발급기
///
/// 동시에 실행되는 전송 태스크가 공유하며 번호는 중복되지 않음
#[derive(Debug)]
pub struct TransferCounter {
    next: AtomicU64,
}

impl TransferCounter {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for TransferCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// 전송 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Tcp,
    Udp,
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferKind::Tcp => write!(f, "TCP"),
            TransferKind::Udp => write!(f, "UDP"),
        }
    }
}

/// UDP 세그먼트 통계
#[derive(Debug, Clone, Serialize)]
pub struct SegmentSummary {
    pub total_segments: u64,
    pub received_segments: u64,
    pub duplicate_segments: u64,
    pub completeness_percent: f64,
}

impl From<&SegmentTracker> for SegmentSummary {
    fn from(tracker: &SegmentTracker) -> Self {
        Self {
            total_segments: tracker.total_segments,
            received_segments: tracker.received_count(),
            duplicate_segments: tracker.duplicates,
            completeness_percent: tracker.completeness_percent(),
        }
    }
}

/// 전송 1회 완료 보고
#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    /// 전송 번호
    pub id: u64,

    pub kind: TransferKind,

    /// 요청 크기 (바이트)
    pub requested_bytes: u64,

    /// 실제 수신 바이트
    pub bytes_received: u64,

    /// 경과 시간 (초)
    pub elapsed_secs: f64,

    /// UDP 전송만 존재
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<SegmentSummary>,
}

impl TransferReport {
    pub fn tcp(id: u64, requested_bytes: u64, bytes_received: u64, elapsed: Duration) -> Self {
        Self {
            id,
            kind: TransferKind::Tcp,
            requested_bytes,
            bytes_received,
            elapsed_secs: elapsed.as_secs_f64(),
            segments: None,
        }
    }

    pub fn udp(id: u64, requested_bytes: u64, tracker: &SegmentTracker, elapsed: Duration) -> Self {
        Self {
            id,
            kind: TransferKind::Udp,
            requested_bytes,
            bytes_received: tracker.bytes_received,
            elapsed_secs: elapsed.as_secs_f64(),
            segments: Some(SegmentSummary::from(tracker)),
        }
    }

    /// 처리율 (bits/sec), 경과 시간이 0이면 0
    pub fn throughput_bps(&self) -> f64 {
        if self.elapsed_secs == 0.0 {
            return 0.0;
        }
        self.bytes_received as f64 * 8.0 / self.elapsed_secs
    }

    pub fn throughput_mbps(&self) -> f64 {
        self.throughput_bps() / 1_000_000.0
    }

    /// 요청보다 적게 받은 경우
    pub fn is_partial(&self) -> bool {
        self.bytes_received < self.requested_bytes
    }

    /// 전달 완전성 (%), TCP는 None
    pub fn completeness_percent(&self) -> Option<f64> {
        self.segments.as_ref().map(|s| s.completeness_percent)
    }
}

impl fmt::Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} transfer #{} finished, total time: {:.2} seconds, total speed: ",
            self.kind, self.id, self.elapsed_secs
        )?;
        if self.elapsed_secs == 0.0 {
            write!(f, "n/a")?;
        } else {
            write!(f, "{:.2} Mbps", self.throughput_mbps())?;
        }

        match &self.segments {
            Some(segments) => write!(
                f,
                ", percentage of packets received successfully: {:.2}% ({}/{} segments)",
                segments.completeness_percent,
                segments.received_segments,
                segments.total_segments
            )?,
            None if self.is_partial() => write!(
                f,
                " (partial: {}/{} bytes)",
                self.bytes_received, self.requested_bytes
            )?,
            None => {}
        }
        Ok(())
    }
}
