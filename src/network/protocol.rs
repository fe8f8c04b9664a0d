//! Beacon wire protocol: fixed-size frames, one UDP datagram per message.
//!
//! Every frame starts with the same 8-byte prefix, followed by a payload
//! whose size depends only on the kind:
//!
//! ```text
//! ┌──────────────┬────────────────┬──────────────────────────────┐
//! │ kind (u32)   │ source (u32)   │ payload                      │
//! └──────────────┴────────────────┴──────────────────────────────┘
//!   1 Position     -> lat f64, lon f64, alt f64      (32 bytes total)
//!   2 Heartbeat    -> (none)                          (8 bytes total)
//!   3 Text         -> [u8; 64], last byte always 0   (72 bytes total)
//! ```
//!
//! All fields are little-endian. Floats travel as IEEE-754 bit patterns.
//! That is the layout x86 nodes have always put on the wire, so frames
//! stay compatible with existing deployments while no longer depending on
//! the host's byte order.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::constants::{PREFIX_SIZE, TEXT_CAPACITY};
use crate::error::DecodeError;
use crate::peer::{PeerId, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageKind {
    Position = 1,
    Heartbeat = 2,
    Text = 3,
}

impl MessageKind {
    /// Exact frame length for this kind, prefix included.
    pub const fn wire_size(self) -> usize {
        match self {
            Self::Position => PREFIX_SIZE + 3 * 8,
            Self::Heartbeat => PREFIX_SIZE,
            Self::Text => PREFIX_SIZE + TEXT_CAPACITY,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Heartbeat => "heartbeat",
            Self::Text => "text",
        }
    }
}

impl TryFrom<u32> for MessageKind {
    type Error = DecodeError;
    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(Self::Position),
            2 => Ok(Self::Heartbeat),
            3 => Ok(Self::Text),
            other => Err(DecodeError::UnknownKind(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionReport {
    pub source: PeerId,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub source: PeerId,
}

/// Short chat line. The body never exceeds `TEXT_CAPACITY - 1` bytes and
/// never contains a NUL, so it always survives a trip through the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    pub source: PeerId,
    body: String,
}

impl TextMessage {
    pub fn new(source: PeerId, body: &str) -> Self {
        let body = body.split('\0').next().unwrap_or_default();
        Self {
            source,
            body: truncate_to_capacity(body).to_string(),
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Position(PositionReport),
    Heartbeat(Heartbeat),
    Text(TextMessage),
}

impl Message {
    pub fn position(source: PeerId, position: Position) -> Self {
        Self::Position(PositionReport { source, position })
    }

    pub fn heartbeat(source: PeerId) -> Self {
        Self::Heartbeat(Heartbeat { source })
    }

    pub fn text(source: PeerId, body: &str) -> Self {
        Self::Text(TextMessage::new(source, body))
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Position(_) => MessageKind::Position,
            Self::Heartbeat(_) => MessageKind::Heartbeat,
            Self::Text(_) => MessageKind::Text,
        }
    }

    pub fn source(&self) -> PeerId {
        match self {
            Self::Position(r) => r.source,
            Self::Heartbeat(h) => h.source,
            Self::Text(t) => t.source,
        }
    }

    /// Serialize into a frame of exactly `self.kind().wire_size()` bytes.
    pub fn encode(&self) -> Bytes {
        let kind = self.kind();
        let mut buf = BytesMut::with_capacity(kind.wire_size());
        buf.put_u32_le(kind as u32);
        buf.put_u32_le(self.source().get());

        match self {
            Self::Position(r) => {
                buf.put_f64_le(r.position.lat);
                buf.put_f64_le(r.position.lon);
                buf.put_f64_le(r.position.alt);
            }
            Self::Heartbeat(_) => {}
            Self::Text(t) => {
                let body = truncate_to_capacity(&t.body).as_bytes();
                let mut text = [0u8; TEXT_CAPACITY];
                text[..body.len()].copy_from_slice(body);
                buf.put_slice(&text);
            }
        }

        debug_assert_eq!(buf.len(), kind.wire_size());
        buf.freeze()
    }

    /// Parse one frame. The length must match the kind exactly.
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        if frame.len() < PREFIX_SIZE {
            return Err(DecodeError::TooShort {
                len: frame.len(),
                min: PREFIX_SIZE,
            });
        }

        let mut buf = frame;
        let raw_kind = buf.get_u32_le();
        let source = PeerId(buf.get_u32_le());
        let kind = MessageKind::try_from(raw_kind)?;

        if frame.len() != kind.wire_size() {
            return Err(DecodeError::SizeMismatch {
                kind: raw_kind,
                expected: kind.wire_size(),
                actual: frame.len(),
            });
        }

        let message = match kind {
            MessageKind::Position => {
                let lat = buf.get_f64_le();
                let lon = buf.get_f64_le();
                let alt = buf.get_f64_le();
                Self::Position(PositionReport {
                    source,
                    position: Position { lat, lon, alt },
                })
            }
            MessageKind::Heartbeat => Self::Heartbeat(Heartbeat { source }),
            MessageKind::Text => {
                let mut text = [0u8; TEXT_CAPACITY];
                buf.copy_to_slice(&mut text);
                // Senders are not trusted to terminate the buffer.
                text[TEXT_CAPACITY - 1] = 0;
                let end = text.iter().position(|&b| b == 0).unwrap_or(TEXT_CAPACITY - 1);
                Self::Text(TextMessage::new(source, &sanitize_text(&text[..end])))
            }
        };

        Ok(message)
    }
}

/// Decode a received text field byte for byte: each invalid UTF-8 byte
/// becomes `?`, so the body keeps its length instead of growing past the
/// capacity the way U+FFFD replacement would.
fn sanitize_text(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len());
    for chunk in raw.utf8_chunks() {
        out.push_str(chunk.valid());
        for _ in chunk.invalid() {
            out.push('?');
        }
    }
    out
}

/// Longest prefix of `body` that fits the text field with its terminator,
/// cut on a char boundary.
fn truncate_to_capacity(body: &str) -> &str {
    let max = TEXT_CAPACITY - 1;
    if body.len() <= max {
        return body;
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_sizes() {
        assert_eq!(MessageKind::Position.wire_size(), 32);
        assert_eq!(MessageKind::Heartbeat.wire_size(), 8);
        assert_eq!(MessageKind::Text.wire_size(), 72);

        assert_eq!(Message::heartbeat(PeerId(1)).encode().len(), 8);
        assert_eq!(Message::text(PeerId(1), "").encode().len(), 72);
    }

    #[test]
    fn test_position_roundtrip() {
        let msg = Message::position(PeerId(1), Position::new(50.0, -1.0, 101.0));
        assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn test_heartbeat_roundtrip() {
        let msg = Message::heartbeat(PeerId(u32::MAX));
        assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn test_text_roundtrip() {
        let msg = Message::text(PeerId(7), "Hello from Node 7");
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert_eq!(decoded, msg);
        match decoded {
            Message::Text(t) => assert_eq!(t.body(), "Hello from Node 7"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_long_text_is_truncated_and_terminated() {
        let long = "x".repeat(200);
        let frame = Message::text(PeerId(2), &long).encode();
        assert_eq!(frame.len(), 72);
        assert_eq!(frame[71], 0, "last byte must be a terminator");

        match Message::decode(&frame).unwrap() {
            Message::Text(t) => assert_eq!(t.body(), "x".repeat(63)),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // 31 two-byte chars = 62 bytes, the 32nd would straddle byte 63.
        let body = "é".repeat(40);
        let msg = TextMessage::new(PeerId(1), &body);
        assert_eq!(msg.body().len(), 62);
        assert_eq!(msg.body(), "é".repeat(31));
    }

    #[test]
    fn test_unterminated_text_from_sender_is_forced_terminated() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&3u32.to_le_bytes());
        frame.extend_from_slice(&9u32.to_le_bytes());
        frame.extend_from_slice(&[b'a'; TEXT_CAPACITY]);

        match Message::decode(&frame).unwrap() {
            Message::Text(t) => {
                assert_eq!(t.source, PeerId(9));
                assert_eq!(t.body(), "a".repeat(63));
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_too_short() {
        for len in 0..PREFIX_SIZE {
            let frame = vec![1u8; len];
            assert_eq!(
                Message::decode(&frame),
                Err(DecodeError::TooShort { len, min: PREFIX_SIZE })
            );
        }
    }

    #[test]
    fn test_decode_unknown_kind() {
        for raw in [0u32, 4, 99, u32::MAX] {
            let mut frame = Vec::new();
            frame.extend_from_slice(&raw.to_le_bytes());
            frame.extend_from_slice(&1u32.to_le_bytes());
            assert_eq!(Message::decode(&frame), Err(DecodeError::UnknownKind(raw)));
        }
    }

    #[test]
    fn test_decode_size_mismatch() {
        let frame = Message::position(PeerId(1), Position::new(1.0, 2.0, 3.0)).encode();

        // One byte short, and one byte too many.
        assert!(matches!(
            Message::decode(&frame[..31]),
            Err(DecodeError::SizeMismatch { kind: 1, expected: 32, actual: 31 })
        ));
        let mut long = frame.to_vec();
        long.push(0);
        assert!(matches!(
            Message::decode(&long),
            Err(DecodeError::SizeMismatch { expected: 32, actual: 33, .. })
        ));

        // Heartbeat prefix carrying a stray payload.
        let mut hb = Message::heartbeat(PeerId(1)).encode().to_vec();
        hb.extend_from_slice(&[0u8; 4]);
        assert!(matches!(
            Message::decode(&hb),
            Err(DecodeError::SizeMismatch { kind: 2, expected: 8, actual: 12 })
        ));
    }

    #[test]
    fn test_prefix_is_little_endian() {
        let frame = Message::heartbeat(PeerId(0x0102_0304)).encode();
        assert_eq!(&frame[..], &[2, 0, 0, 0, 4, 3, 2, 1]);
    }

    #[test]
    fn test_interior_nul_ends_body() {
        let msg = TextMessage::new(PeerId(1), "ab\0cd");
        assert_eq!(msg.body(), "ab");
    }

    #[test]
    fn test_invalid_utf8_keeps_its_length() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&3u32.to_le_bytes());
        frame.extend_from_slice(&4u32.to_le_bytes());
        let mut text = [0xFFu8; TEXT_CAPACITY];
        text[..2].copy_from_slice(b"ok");
        frame.extend_from_slice(&text);

        match Message::decode(&frame).unwrap() {
            Message::Text(t) => {
                assert_eq!(t.body().len(), TEXT_CAPACITY - 1);
                assert_eq!(t.body(), format!("ok{}", "?".repeat(61)));
            }
            other => panic!("expected text, got {:?}", other),
        }
    }
}
