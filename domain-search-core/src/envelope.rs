//! gRPC-Web envelope framing.
//!
//! Every message on a gRPC-Web body travels in an envelope:
//!
//! ```text
//! [flag:1][length:4][payload:length]
//! ```
//!
//! Data frames carry one encoded message. The final frame of a response
//! carries the trailer block instead and has the high bit of the flag set.

use bytes::{Buf, Bytes, BytesMut};

/// gRPC-Web envelope flags.
pub mod frame_flags {
    /// Data frame holding one encoded message.
    pub const DATA: u8 = 0x00;
    /// Compressed data frame. Compression is never negotiated by this client.
    pub const COMPRESSED: u8 = 0x01;
    /// Trailer frame holding the status block.
    pub const TRAILER: u8 = 0x80;
}

/// Envelope header size (flag + length).
pub const ENVELOPE_HEADER_SIZE: usize = 5;

/// What a frame carries, derived from its flag byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Data,
    Trailer,
    /// Any flag this client does not understand.
    Unknown(u8),
}

impl FrameKind {
    pub fn from_flag(flag: u8) -> Self {
        match flag {
            frame_flags::DATA => FrameKind::Data,
            frame_flags::TRAILER => FrameKind::Trailer,
            other => FrameKind::Unknown(other),
        }
    }
}

/// One complete envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub flag: u8,
    pub payload: Bytes,
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        FrameKind::from_flag(self.flag)
    }

    pub fn is_trailer(&self) -> bool {
        self.kind() == FrameKind::Trailer
    }
}

/// Wrap a payload in a single envelope.
pub fn wrap_envelope(payload: &[u8], flag: u8) -> Bytes {
    let mut frame = BytesMut::with_capacity(ENVELOPE_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&[flag]);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame.freeze()
}

/// Parse an envelope header.
///
/// Returns `(flag, length)`, or `None` when fewer than
/// [`ENVELOPE_HEADER_SIZE`] bytes are available.
pub fn parse_envelope_header(data: &[u8]) -> Option<(u8, u32)> {
    if data.len() < ENVELOPE_HEADER_SIZE {
        return None;
    }
    let flag = data[0];
    let length = u32::from_be_bytes([data[1], data[2], data[3], data[4]]);
    Some((flag, length))
}

/// Incremental frame parser.
///
/// Bytes are pushed as they arrive from the transport, in chunks of any
/// size. A frame is only handed out once its header and full payload are
/// buffered; partial frames stay in the buffer untouched.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: BytesMut,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk to the buffer.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Take the next complete frame, if one is buffered.
    pub fn next_frame(&mut self) -> Option<Frame> {
        let (flag, length) = parse_envelope_header(&self.buffer)?;
        let frame_size = ENVELOPE_HEADER_SIZE.checked_add(length as usize)?;
        if self.buffer.len() < frame_size {
            return None;
        }

        self.buffer.advance(ENVELOPE_HEADER_SIZE);
        let payload = self.buffer.split_to(length as usize).freeze();
        Some(Frame { flag, payload })
    }

    /// Iterate over every complete frame currently buffered.
    pub fn drain(&mut self) -> impl Iterator<Item = Frame> + '_ {
        std::iter::from_fn(move || self.next_frame())
    }

    /// Bytes held that do not yet form a complete frame.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard everything buffered.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_of(frames: &[(u8, &[u8])]) -> Vec<u8> {
        frames
            .iter()
            .flat_map(|(flag, payload)| wrap_envelope(payload, *flag).to_vec())
            .collect()
    }

    #[test]
    fn test_wrap_envelope() {
        let frame = wrap_envelope(b"hello", frame_flags::DATA);

        assert_eq!(frame[0], frame_flags::DATA);
        assert_eq!(
            u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]),
            5
        );
        assert_eq!(&frame[5..], b"hello");
    }

    #[test]
    fn test_wrap_empty_payload() {
        let frame = wrap_envelope(&[], frame_flags::DATA);
        assert_eq!(&frame[..], &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_parse_envelope_header() {
        let data = [0x80, 0x00, 0x00, 0x01, 0x02, b'x'];
        assert_eq!(parse_envelope_header(&data), Some((0x80, 258)));
        assert_eq!(parse_envelope_header(&data[..4]), None);
    }

    #[test]
    fn test_frame_kind() {
        assert_eq!(FrameKind::from_flag(0x00), FrameKind::Data);
        assert_eq!(FrameKind::from_flag(0x80), FrameKind::Trailer);
        assert_eq!(FrameKind::from_flag(0x01), FrameKind::Unknown(0x01));
    }

    #[test]
    fn test_parser_single_frame() {
        let mut parser = FrameParser::new();
        parser.push(&wrap_envelope(b"abc", frame_flags::DATA));

        let frame = parser.next_frame().unwrap();
        assert_eq!(frame.kind(), FrameKind::Data);
        assert_eq!(&frame.payload[..], b"abc");
        assert!(parser.next_frame().is_none());
        assert!(parser.is_empty());
    }

    #[test]
    fn test_parser_waits_for_partial_header() {
        let mut parser = FrameParser::new();
        parser.push(&[0x00, 0x00, 0x00]);
        assert!(parser.next_frame().is_none());
        assert_eq!(parser.buffered_len(), 3);
    }

    #[test]
    fn test_parser_waits_for_partial_payload() {
        let bytes = wrap_envelope(b"hello world", frame_flags::DATA);
        let mut parser = FrameParser::new();
        parser.push(&bytes[..8]);

        assert!(parser.next_frame().is_none());
        // Nothing consumed from the incomplete frame.
        assert_eq!(parser.buffered_len(), 8);

        parser.push(&bytes[8..]);
        assert_eq!(&parser.next_frame().unwrap().payload[..], b"hello world");
    }

    #[test]
    fn test_parser_empty_payload_frame() {
        let mut parser = FrameParser::new();
        parser.push(&[0x00, 0, 0, 0, 0]);
        let frame = parser.next_frame().unwrap();
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_parser_multiple_frames_in_one_chunk() {
        let bytes = stream_of(&[
            (frame_flags::DATA, b"one"),
            (frame_flags::DATA, b"two"),
            (frame_flags::TRAILER, b"grpc-status: 0\r\n"),
        ]);
        let mut parser = FrameParser::new();
        parser.push(&bytes);

        let frames: Vec<Frame> = parser.drain().collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(&frames[0].payload[..], b"one");
        assert_eq!(&frames[1].payload[..], b"two");
        assert!(frames[2].is_trailer());
        assert!(parser.is_empty());
    }

    #[test]
    fn test_parser_is_chunk_boundary_independent() {
        let bytes = stream_of(&[
            (frame_flags::DATA, b""),
            (frame_flags::DATA, b"first message"),
            (frame_flags::DATA, &[0xAA; 300]),
            (frame_flags::TRAILER, b"grpc-status: 0\r\ngrpc-message: ok\r\n"),
        ]);

        let mut whole = FrameParser::new();
        whole.push(&bytes);
        let expected: Vec<Frame> = whole.drain().collect();
        assert_eq!(expected.len(), 4);

        for chunk_size in [1, 2, 3, 4, 5, 6, 7, 13, 64, 311] {
            let mut parser = FrameParser::new();
            let mut frames = Vec::new();
            for chunk in bytes.chunks(chunk_size) {
                parser.push(chunk);
                frames.extend(parser.drain());
            }
            assert_eq!(frames, expected, "chunk size {chunk_size}");
            assert!(parser.is_empty());
        }
    }

    #[test]
    fn test_parser_clear() {
        let mut parser = FrameParser::new();
        parser.push(&[0x00, 0x00, 0x00, 0x00, 0x09, 1, 2]);
        parser.clear();
        assert_eq!(parser.buffered_len(), 0);
        assert!(parser.next_frame().is_none());
    }
}
