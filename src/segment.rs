//! 세그먼트 계산과 수신 세그먼트 집합
//!
//! - 송신측: 전송 크기를 `payload_size` 단위 세그먼트로 분할 (1부터 번호)
//! - 수신측: 받은 segment_index 집합으로 전달 완전성 계산

use std::collections::HashSet;

use crate::packet::PayloadHeader;

/// 세그먼트 번호 (1부터 시작)
pub type SegmentIndex = u64;

/// 총 세그먼트 수 = ceil(file_size / payload_size)
pub fn segment_count(file_size: u64, payload_size: usize) -> u64 {
    if payload_size == 0 {
        return 0;
    }
    file_size.div_ceil(payload_size as u64)
}

/// `index`번 세그먼트의 본문 길이 (마지막 세그먼트만 짧을 수 있음)
pub fn segment_body_len(file_size: u64, payload_size: usize, index: SegmentIndex) -> usize {
    let offset = (index.saturating_sub(1)).saturating_mul(payload_size as u64);
    file_size.saturating_sub(offset).min(payload_size as u64) as usize
}

/// 세그먼트 삽입 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    /// 새 세그먼트
    New,
    /// 이미 받은 세그먼트
    Duplicate,
    /// 1..=total_segments 범위 밖
    OutOfRange,
}

/// 수신 세그먼트 집합 (UDP 전송 1회 단위)
#[derive(Debug, Default)]
pub struct SegmentTracker {
    received: HashSet<SegmentIndex>,

    /// 가장 최근에 관측한 total_segments
    pub total_segments: u64,

    /// 수신 본문 바이트 (새 세그먼트만)
    pub bytes_received: u64,

    /// 중복 수신 수
    pub duplicates: u64,

    /// 범위 밖 세그먼트 수
    pub out_of_range: u64,
}

impl SegmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 헤더 + 본문 길이 기록
    pub fn record(&mut self, header: &PayloadHeader, body_len: usize) -> Insert {
        self.total_segments = header.total_segments;

        let index = header.segment_index;
        if index == 0 || index > header.total_segments {
            self.out_of_range += 1;
            return Insert::OutOfRange;
        }

        if !self.received.insert(index) {
            self.duplicates += 1;
            return Insert::Duplicate;
        }

        self.bytes_received += body_len as u64;
        Insert::New
    }

    /// 수신한 고유 세그먼트 수
    pub fn received_count(&self) -> u64 {
        self.received.len() as u64
    }

    /// 전달 완전성 (%), total_segments == 0이면 0
    pub fn completeness_percent(&self) -> f64 {
        if self.total_segments == 0 {
            return 0.0;
        }
        self.received_count() as f64 / self.total_segments as f64 * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.total_segments > 0 && self.received_count() == self.total_segments
    }
}
