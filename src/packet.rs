//! 프로토콜 패킷 정의
//!
//! 모든 정수 필드는 네트워크 바이트 순서(big-endian)의 고정 레이아웃
//!
//! | 패킷 | 레이아웃 | 크기 |
//! |---|---|---|
//! | Offer | u32 cookie, u8 type, u16 udp_port, u16 tcp_port | 9 |
//! | Request | u32 cookie, u8 type, u64 file_size | 13 |
//! | Payload 헤더 | u32 cookie, u8 type, u64 total_segments, u64 segment_index | 21 (+ 본문) |
//!
//! 디코딩은 타입 필드를 읽기만 하고 검증하지 않음. 검증은 `validate()`로 호출자가 수행.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{Error, Result, MAGIC_COOKIE};

/// 메시지 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// 서버 존재 알림 (브로드캐스트)
    Offer = 0x2,

    /// UDP 전송 요청 (클라이언트 → 서버)
    Request = 0x3,

    /// 세그먼트 데이터 (서버 → 클라이언트)
    Payload = 0x4,
}

impl MessageType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// 쿠키/타입 공통 검증
fn check_header(magic_cookie: u32, message_type: u8, expected: MessageType) -> Result<()> {
    if magic_cookie != MAGIC_COOKIE {
        return Err(Error::InvalidMagicCookie {
            expected: MAGIC_COOKIE,
            got: magic_cookie,
        });
    }
    if message_type != expected.as_u8() {
        return Err(Error::MessageTypeMismatch {
            expected: expected.as_u8(),
            got: message_type,
        });
    }
    Ok(())
}

fn ensure_len(bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() < expected {
        return Err(Error::PacketTooShort {
            expected,
            got: bytes.len(),
        });
    }
    Ok(())
}

/// Offer 패킷 (서버 → 브로드캐스트)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferPacket {
    pub magic_cookie: u32,
    pub message_type: u8,
    /// 서버 UDP 데이터 포트
    pub udp_port: u16,
    /// 서버 TCP 리스닝 포트
    pub tcp_port: u16,
}

impl OfferPacket {
    pub const LEN: usize = 4 + 1 + 2 + 2;

    pub fn new(udp_port: u16, tcp_port: u16) -> Self {
        Self {
            magic_cookie: MAGIC_COOKIE,
            message_type: MessageType::Offer.as_u8(),
            udp_port,
            tcp_port,
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::LEN);
        buf.put_u32(self.magic_cookie);
        buf.put_u8(self.message_type);
        buf.put_u16(self.udp_port);
        buf.put_u16(self.tcp_port);
        buf.freeze()
    }

    /// 앞 9바이트만 읽음 (나머지는 무시)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ensure_len(bytes, Self::LEN)?;
        let mut buf = &bytes[..Self::LEN];
        Ok(Self {
            magic_cookie: buf.get_u32(),
            message_type: buf.get_u8(),
            udp_port: buf.get_u16(),
            tcp_port: buf.get_u16(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        check_header(self.magic_cookie, self.message_type, MessageType::Offer)
    }
}

/// Request 패킷 (클라이언트 → 서버 UDP 포트)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPacket {
    pub magic_cookie: u32,
    pub message_type: u8,
    /// 요청 전송 크기 (바이트)
    pub file_size: u64,
}

impl RequestPacket {
    pub const LEN: usize = 4 + 1 + 8;

    pub fn new(file_size: u64) -> Self {
        Self {
            magic_cookie: MAGIC_COOKIE,
            message_type: MessageType::Request.as_u8(),
            file_size,
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::LEN);
        buf.put_u32(self.magic_cookie);
        buf.put_u8(self.message_type);
        buf.put_u64(self.file_size);
        buf.freeze()
    }

    /// 앞 13바이트만 읽음
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ensure_len(bytes, Self::LEN)?;
        let mut buf = &bytes[..Self::LEN];
        Ok(Self {
            magic_cookie: buf.get_u32(),
            message_type: buf.get_u8(),
            file_size: buf.get_u64(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        check_header(self.magic_cookie, self.message_type, MessageType::Request)
    }
}

/// Payload 헤더 (서버 → 클라이언트, 뒤에 본문이 붙음)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadHeader {
    pub magic_cookie: u32,
    pub message_type: u8,
    /// 이번 전송의 총 세그먼트 수
    pub total_segments: u64,
    /// 세그먼트 번호 (1부터 시작)
    pub segment_index: u64,
}

impl PayloadHeader {
    pub const LEN: usize = 4 + 1 + 8 + 8;

    pub fn new(total_segments: u64, segment_index: u64) -> Self {
        Self {
            magic_cookie: MAGIC_COOKIE,
            message_type: MessageType::Payload.as_u8(),
            total_segments,
            segment_index,
        }
    }

    /// 헤더를 버퍼에 기록 (본문은 호출자가 이어 붙임)
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u32(self.magic_cookie);
        buf.put_u8(self.message_type);
        buf.put_u64(self.total_segments);
        buf.put_u64(self.segment_index);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::LEN);
        self.write_to(&mut buf);
        buf.freeze()
    }

    /// 앞 21바이트만 읽음 (본문 무시)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ensure_len(bytes, Self::LEN)?;
        let mut buf = &bytes[..Self::LEN];
        Ok(Self {
            magic_cookie: buf.get_u32(),
            message_type: buf.get_u8(),
            total_segments: buf.get_u64(),
            segment_index: buf.get_u64(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        check_header(self.magic_cookie, self.message_type, MessageType::Payload)
    }
}

pub fn encode_offer(udp_port: u16, tcp_port: u16) -> Bytes {
    OfferPacket::new(udp_port, tcp_port).to_bytes()
}

pub fn decode_offer(bytes: &[u8]) -> Result<OfferPacket> {
    OfferPacket::from_bytes(bytes)
}

pub fn encode_request(file_size: u64) -> Bytes {
    RequestPacket::new(file_size).to_bytes()
}

pub fn decode_request(bytes: &[u8]) -> Result<RequestPacket> {
    RequestPacket::from_bytes(bytes)
}

pub fn encode_payload(total_segments: u64, segment_index: u64) -> Bytes {
    PayloadHeader::new(total_segments, segment_index).to_bytes()
}

pub fn decode_payload(bytes: &[u8]) -> Result<PayloadHeader> {
    PayloadHeader::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_layout() {
        let bytes = encode_offer(0x1234, 0xABCD);
        assert_eq!(
            bytes.as_ref(),
            &[0xab, 0xcd, 0xdc, 0xba, 0x02, 0x12, 0x34, 0xAB, 0xCD]
        );

        let offer = decode_offer(&bytes).unwrap();
        assert_eq!(offer, OfferPacket::new(0x1234, 0xABCD));
        assert!(offer.validate().is_ok());
    }

    #[test]
    fn test_request_roundtrip_ignores_trailing() {
        let mut bytes = encode_request(u64::MAX - 7).to_vec();
        assert_eq!(bytes.len(), RequestPacket::LEN);
        bytes.extend_from_slice(b"trailing garbage");

        let request = decode_request(&bytes).unwrap();
        assert_eq!(request.file_size, u64::MAX - 7);
        assert_eq!(request.message_type, MessageType::Request.as_u8());
    }

    #[test]
    fn test_payload_header_with_body() {
        let mut buf = BytesMut::new();
        PayloadHeader::new(977, 42).write_to(&mut buf);
        buf.put_bytes(b'x', 1024);

        let header = decode_payload(&buf).unwrap();
        assert_eq!(header.total_segments, 977);
        assert_eq!(header.segment_index, 42);
        assert_eq!(encode_payload(977, 42).len(), PayloadHeader::LEN);
    }

    #[test]
    fn test_short_buffers_rejected() {
        let offer = encode_offer(1, 2);
        assert!(matches!(
            decode_offer(&offer[..8]),
            Err(Error::PacketTooShort { expected: 9, got: 8 })
        ));
        assert!(decode_request(&encode_request(5)[..12]).is_err());
        assert!(decode_payload(&encode_payload(1, 1)[..20]).is_err());
        assert!(decode_payload(&[]).is_err());
    }

    #[test]
    fn test_unknown_type_is_decodable_but_invalid() {
        let mut bytes = encode_offer(10, 20).to_vec();
        bytes[4] = 0x7f;

        let offer = decode_offer(&bytes).unwrap();
        assert_eq!(offer.message_type, 0x7f);
        assert!(matches!(
            offer.validate(),
            Err(Error::MessageTypeMismatch { expected: 0x02, got: 0x7f })
        ));
    }

    #[test]
    fn test_wrong_cookie_is_invalid() {
        let mut bytes = encode_request(100).to_vec();
        bytes[0] = 0x00;

        let request = decode_request(&bytes).unwrap();
        assert!(matches!(
            request.validate(),
            Err(Error::InvalidMagicCookie { .. })
        ));
    }

    #[test]
    fn test_request_bytes_are_not_a_valid_payload() {
        let bytes = encode_payload(3, 1);
        let as_request = decode_request(&bytes).unwrap();
        assert!(as_request.validate().is_err());
    }
}
