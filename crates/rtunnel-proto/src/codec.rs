use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ErrorCode, ProtocolError, Result};
use crate::frame::{
    Flags, Frame, FrameType, HEADER_SIZE, LENGTH_PREFIX_SIZE, MAGIC, MAX_FRAME_SIZE, VERSION,
};

/// Length prefix plus fixed header: everything before the payload.
pub const PREFIXED_HEADER_SIZE: usize = LENGTH_PREFIX_SIZE + HEADER_SIZE;

/// Fixed header fields, validated.
struct FrameHeader {
    frame_type: FrameType,
    flags: Flags,
    stream_id: u32,
}

/// Encode a frame into the wire format, appending it to `dst`.
///
/// Wire format (big-endian):
/// ```text
/// ┌────────────┬──────────┬─────────┬──────┬───────┬─────────────┬──────────┐
/// │ Length     │ Magic    │ Version │ Type │ Flags │ Stream ID   │ Payload  │
/// │ (4B)       │ 0x52 0x54│ (1B)    │ (1B) │ (1B)  │ (4B)        │ (N)      │
/// │ = 9 + N    │ "RT"     │         │      │       │             │          │
/// └────────────┴──────────┴─────────┴──────┴───────┴─────────────┴──────────┘
/// ```
///
/// `dst` is left untouched when the frame is rejected.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> std::result::Result<(), ProtocolError> {
    encode_frame_with_limit(frame, dst, MAX_FRAME_SIZE)
}

pub(crate) fn encode_frame_with_limit(
    frame: &Frame,
    dst: &mut BytesMut,
    max_frame_size: usize,
) -> std::result::Result<(), ProtocolError> {
    let length = check_outgoing(frame, max_frame_size)?;
    dst.reserve(LENGTH_PREFIX_SIZE + length as usize);
    put_header(dst, frame, length);
    dst.put_slice(&frame.payload);
    Ok(())
}

/// Serialize a frame straight to a byte sink.
///
/// Version and size are checked before anything is written. After that, sink
/// errors are returned as-is and bytes already written stay written; encode
/// into a buffer with [`encode_frame`] first if the write has to be atomic.
pub fn write_frame<W: Write + ?Sized>(dst: &mut W, frame: &Frame) -> Result<()> {
    let length = check_outgoing(frame, MAX_FRAME_SIZE)?;

    let mut header = [0u8; PREFIXED_HEADER_SIZE];
    let mut cursor = &mut header[..];
    put_header(&mut cursor, frame, length);

    dst.write_all(&header)?;
    if !frame.payload.is_empty() {
        dst.write_all(&frame.payload)?;
    }
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet, in
/// which case nothing is consumed. The length, magic, version and type are
/// checked as soon as their bytes are present, so a bad header fails before
/// the payload arrives. On success, consumes exactly one frame.
pub fn decode_frame(
    src: &mut BytesMut,
    max_frame_size: usize,
) -> std::result::Result<Option<Frame>, ProtocolError> {
    if src.len() < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let declared = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
    let length = check_length(declared, max_frame_size)?;

    if src.len() < PREFIXED_HEADER_SIZE {
        return Ok(None);
    }
    let header = parse_header(&src[LENGTH_PREFIX_SIZE..PREFIXED_HEADER_SIZE])?;

    let total = LENGTH_PREFIX_SIZE + length;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(PREFIXED_HEADER_SIZE);
    let payload = src.split_to(length - HEADER_SIZE).freeze();

    Ok(Some(header.into_frame(payload)))
}

/// Read exactly one frame from a byte source.
///
/// Consumes the length prefix and exactly `length` further bytes, nothing
/// more. Running out of input at any point returns the source's
/// [`std::io::ErrorKind::UnexpectedEof`] error unchanged.
pub fn read_frame<R: Read + ?Sized>(src: &mut R) -> Result<Frame> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    src.read_exact(&mut prefix)?;
    let length = check_length(u32::from_be_bytes(prefix) as usize, MAX_FRAME_SIZE)?;

    let mut header = [0u8; HEADER_SIZE];
    src.read_exact(&mut header)?;
    let header = parse_header(&header)?;

    let mut payload = vec![0u8; length - HEADER_SIZE];
    src.read_exact(&mut payload)?;

    Ok(header.into_frame(Bytes::from(payload)))
}

fn check_outgoing(frame: &Frame, max_frame_size: usize) -> std::result::Result<u32, ProtocolError> {
    if frame.version != VERSION {
        return Err(ProtocolError::new(
            ErrorCode::InvalidVersion,
            format!(
                "invalid protocol version {} (expected {VERSION})",
                frame.version
            ),
        ));
    }

    let max = max_frame_size.min(MAX_FRAME_SIZE);
    let length = frame.frame_len();
    if length > max {
        return Err(ProtocolError::new(
            ErrorCode::FrameTooLarge,
            format!("frame too large ({length} bytes, max {max})"),
        ));
    }
    // `max` never exceeds MAX_FRAME_SIZE, which fits in a u32.
    Ok(length as u32)
}

fn check_length(length: usize, max_frame_size: usize) -> std::result::Result<usize, ProtocolError> {
    if length < HEADER_SIZE {
        return Err(ProtocolError::new(
            ErrorCode::BadFrame,
            format!("invalid frame size ({length} bytes, min {HEADER_SIZE})"),
        ));
    }
    let max = max_frame_size.min(MAX_FRAME_SIZE);
    if length > max {
        return Err(ProtocolError::new(
            ErrorCode::FrameTooLarge,
            format!("frame too large ({length} bytes, max {max})"),
        ));
    }
    Ok(length)
}

fn put_header<B: BufMut>(dst: &mut B, frame: &Frame, length: u32) {
    dst.put_u32(length);
    dst.put_slice(&MAGIC);
    dst.put_u8(frame.version);
    dst.put_u8(frame.frame_type.as_u8());
    dst.put_u8(frame.flags.bits());
    dst.put_u32(frame.stream_id);
}

/// Validate the 9 header bytes that follow the length prefix.
///
/// Magic comes first: until it matches, no other field can be trusted.
fn parse_header(header: &[u8]) -> std::result::Result<FrameHeader, ProtocolError> {
    if header[0..2] != MAGIC {
        return Err(ProtocolError::new(
            ErrorCode::BadFrame,
            "invalid magic marker",
        ));
    }

    if header[2] != VERSION {
        return Err(ProtocolError::new(
            ErrorCode::InvalidVersion,
            format!("invalid protocol version {} (expected {VERSION})", header[2]),
        ));
    }

    let frame_type = FrameType::from_u8(header[3]).ok_or_else(|| {
        ProtocolError::new(
            ErrorCode::BadFrame,
            format!("invalid frame type 0x{:02x}", header[3]),
        )
    })?;

    Ok(FrameHeader {
        frame_type,
        flags: Flags::from_bits_retain(header[4]),
        stream_id: u32::from_be_bytes([header[5], header[6], header[7], header[8]]),
    })
}

impl FrameHeader {
    fn into_frame(self, payload: Bytes) -> Frame {
        Frame {
            version: VERSION,
            frame_type: self.frame_type,
            flags: self.flags,
            stream_id: self.stream_id,
            payload,
        }
    }
}

/// Configuration for buffered frame I/O.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum frame size (header + payload) in bytes. Default: 16 MiB.
    ///
    /// Can only tighten the protocol limit; larger values are clamped to
    /// [`MAX_FRAME_SIZE`].
    pub max_frame_size: usize,
}

impl FrameConfig {
    /// The limit actually enforced.
    pub fn effective_max_frame_size(&self) -> usize {
        self.max_frame_size.min(MAX_FRAME_SIZE)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, ErrorKind};

    use super::*;
    use crate::error::FrameError;
    use crate::frame::{CONTROL_STREAM_ID, MAX_PAYLOAD_SIZE};

    fn encoded(frame: &Frame) -> Vec<u8> {
        let mut buf = Vec::new();
        write_frame(&mut buf, frame).unwrap();
        buf
    }

    fn decode_err(bytes: &[u8]) -> FrameError {
        read_frame(&mut Cursor::new(bytes)).unwrap_err()
    }

    fn protocol_code(err: &FrameError) -> ErrorCode {
        err.protocol()
            .map(ProtocolError::code)
            .unwrap_or_else(|| panic!("expected protocol error, got {err:?}"))
    }

    #[test]
    fn encode_decode_roundtrip() {
        let cases = vec![
            (
                "control frame - auth",
                Frame::auth(Bytes::from_static(br#"{"token":"test-token"}"#)),
            ),
            (
                "data frame - open stream",
                Frame::open_stream(1, "GET / HTTP/1.1\r\nHost: example.com\r\n\r\n"),
            ),
            (
                "data frame - end stream",
                Frame::data(1, "Response body").with_flags(Flags::END_STREAM),
            ),
            (
                "data frame - error flag",
                Frame::data(1, "Error message").with_flags(Flags::ERROR),
            ),
            ("heartbeat", Frame::heartbeat()),
            ("empty payload", Frame::close(1)),
            ("large payload", Frame::data(1, vec![0u8; 1024 * 1024])),
            (
                "max stream id",
                Frame::data(u32::MAX, "x").with_flags(Flags::ACK),
            ),
        ];

        for (name, frame) in cases {
            let wire = encoded(&frame);
            assert_eq!(wire.len(), frame.wire_size(), "{name}");

            let decoded = read_frame(&mut Cursor::new(&wire)).unwrap();
            assert_eq!(decoded, frame, "{name}");

            let mut buf = BytesMut::from(&wire[..]);
            let decoded = decode_frame(&mut buf, MAX_FRAME_SIZE).unwrap().unwrap();
            assert_eq!(decoded, frame, "{name}");
            assert!(buf.is_empty(), "{name}");
        }
    }

    #[test]
    fn wire_layout_is_byte_exact() {
        let frame = Frame::data(1, "Response body").with_flags(Flags::END_STREAM);
        let wire = encoded(&frame);

        let mut expected = vec![
            0x00, 0x00, 0x00, 0x16, // length = 9 + 13
            0x52, 0x54, // magic "RT"
            0x01, // version
            0x03, // type = Data
            0x01, // flags = EndStream
            0x00, 0x00, 0x00, 0x01, // stream id
        ];
        expected.extend_from_slice(b"Response body");
        assert_eq!(wire, expected);
    }

    #[test]
    fn write_frame_and_encode_frame_agree() {
        let frame = Frame::open_stream(42, "CONNECT").with_flags(Flags::ACK);
        let mut buf = BytesMut::new();
        encode_frame(&frame, &mut buf).unwrap();
        assert_eq!(&buf[..], &encoded(&frame)[..]);
    }

    #[test]
    fn heartbeat_round_trip_is_control_frame() {
        let wire = encoded(&Frame::heartbeat());
        assert_eq!(wire.len(), PREFIXED_HEADER_SIZE);

        let decoded = read_frame(&mut Cursor::new(wire)).unwrap();
        assert_eq!(decoded.frame_type, FrameType::Heartbeat);
        assert_eq!(decoded.stream_id, CONTROL_STREAM_ID);
        assert!(decoded.payload.is_empty());
        assert!(decoded.is_control_frame());
    }

    #[test]
    fn max_payload_round_trips() {
        let frame = Frame::data(7, vec![0xAB; MAX_PAYLOAD_SIZE]);
        let wire = encoded(&frame);
        assert_eq!(wire.len(), LENGTH_PREFIX_SIZE + MAX_FRAME_SIZE);

        let decoded = read_frame(&mut Cursor::new(wire)).unwrap();
        assert_eq!(decoded.payload.len(), MAX_PAYLOAD_SIZE);
        assert_eq!(decoded, frame);
    }

    #[test]
    fn encode_rejects_oversized_frame_without_output() {
        let frame = Frame::data(1, vec![0u8; MAX_PAYLOAD_SIZE + 1]);

        let mut sink = Vec::new();
        let err = write_frame(&mut sink, &frame).unwrap_err();
        assert_eq!(protocol_code(&err), ErrorCode::FrameTooLarge);
        assert!(sink.is_empty());

        let mut buf = BytesMut::from(&b"keep"[..]);
        let err = encode_frame(&frame, &mut buf).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FrameTooLarge);
        assert_eq!(&buf[..], b"keep");
    }

    #[test]
    fn encode_rejects_wrong_version_without_output() {
        let mut frame = Frame::auth("test");
        frame.version = 0xFF;

        let mut sink = Vec::new();
        let err = write_frame(&mut sink, &frame).unwrap_err();
        assert_eq!(protocol_code(&err), ErrorCode::InvalidVersion);
        assert!(sink.is_empty());

        let mut buf = BytesMut::new();
        let err = encode_frame(&frame, &mut buf).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidVersion);
        assert!(buf.is_empty());
    }

    #[test]
    fn corrupted_magic_is_bad_frame() {
        let wire = encoded(&Frame::auth("test"));
        assert_eq!(&wire[4..6], &MAGIC);

        for index in [4, 5] {
            let mut corrupted = wire.clone();
            corrupted[index] = 0xFF;

            let err = decode_err(&corrupted);
            assert_eq!(protocol_code(&err), ErrorCode::BadFrame);

            let mut buf = BytesMut::from(&corrupted[..]);
            let err = decode_frame(&mut buf, MAX_FRAME_SIZE).unwrap_err();
            assert_eq!(err.code(), ErrorCode::BadFrame);
        }
    }

    #[test]
    fn corrupted_version_is_invalid_version() {
        let mut wire = encoded(&Frame::auth("test"));
        wire[6] = 0xFF;

        let err = decode_err(&wire);
        assert_eq!(protocol_code(&err), ErrorCode::InvalidVersion);
    }

    #[test]
    fn unknown_frame_type_is_bad_frame() {
        for bad_type in [0x00, 0x06, 0xFF] {
            let mut wire = encoded(&Frame::data(1, "test"));
            wire[7] = bad_type;

            let err = decode_err(&wire);
            assert_eq!(protocol_code(&err), ErrorCode::BadFrame);
        }
    }

    #[test]
    fn magic_is_checked_before_version_and_type() {
        let mut wire = encoded(&Frame::data(1, "test"));
        wire[4] = 0x00;
        wire[6] = 0x09;
        wire[7] = 0x09;

        let err = decode_err(&wire);
        assert_eq!(protocol_code(&err), ErrorCode::BadFrame);
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn unknown_flag_bits_are_preserved() {
        let mut wire = encoded(&Frame::data(1, "test"));
        wire[8] = 0xFF;

        let decoded = read_frame(&mut Cursor::new(wire)).unwrap();
        assert_eq!(decoded.flags.bits(), 0xFF);
        assert!(decoded.is_end_stream() && decoded.is_ack() && decoded.is_error());
    }

    #[test]
    fn declared_length_too_large() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&((MAX_FRAME_SIZE + 1) as u32).to_be_bytes());
        wire.extend_from_slice(&MAGIC);

        let err = decode_err(&wire);
        assert_eq!(protocol_code(&err), ErrorCode::FrameTooLarge);

        let mut buf = BytesMut::from(&wire[..]);
        let err = decode_frame(&mut buf, MAX_FRAME_SIZE).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FrameTooLarge);
    }

    #[test]
    fn declared_length_below_header_size() {
        for length in [0u32, 1, (HEADER_SIZE - 1) as u32] {
            let err = decode_err(&length.to_be_bytes());
            assert_eq!(protocol_code(&err), ErrorCode::BadFrame, "length {length}");
        }
    }

    #[test]
    fn decode_frame_respects_tighter_limit() {
        let wire = encoded(&Frame::data(1, vec![1u8; 64]));
        let mut buf = BytesMut::from(&wire[..]);
        let err = decode_frame(&mut buf, 32).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FrameTooLarge);
    }

    #[test]
    fn truncated_input_is_eof() {
        let wire = encoded(&Frame::auth("test"));

        // Missing one byte, the whole payload, everything after the length,
        // part of the length prefix, and everything.
        for keep in [
            wire.len() - 1,
            PREFIXED_HEADER_SIZE,
            LENGTH_PREFIX_SIZE,
            2,
            0,
        ] {
            let err = decode_err(&wire[..keep]);
            assert!(err.is_eof(), "keep {keep}: {err:?}");
            assert!(err.protocol().is_none());
        }
    }

    #[test]
    fn declared_length_longer_than_data_is_eof() {
        let mut incomplete = vec![0x00, 0x00, 0x00, 0x20];
        incomplete.extend_from_slice(&MAGIC);
        incomplete.extend_from_slice(&[VERSION, FrameType::Auth.as_u8(), 0x00]);
        incomplete.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let err = decode_err(&incomplete);
        assert!(matches!(err, FrameError::Io(ref e) if e.kind() == ErrorKind::UnexpectedEof));
    }

    #[test]
    fn read_frame_consumes_exactly_one_frame() {
        let mut wire = encoded(&Frame::data(1, "first"));
        let first_len = wire.len();
        wire.extend_from_slice(&encoded(&Frame::data(2, "second")));

        let mut cursor = Cursor::new(wire);
        let first = read_frame(&mut cursor).unwrap();
        assert_eq!(first.payload.as_ref(), b"first");
        assert_eq!(cursor.position() as usize, first_len);

        let second = read_frame(&mut cursor).unwrap();
        assert_eq!(second.stream_id, 2);
        assert!(read_frame(&mut cursor).unwrap_err().is_eof());
    }

    #[test]
    fn decode_incomplete_header() {
        let wire = encoded(&Frame::data(1, "hello"));
        for keep in [0, 3, LENGTH_PREFIX_SIZE, PREFIXED_HEADER_SIZE - 1] {
            let mut buf = BytesMut::from(&wire[..keep]);
            assert!(decode_frame(&mut buf, MAX_FRAME_SIZE).unwrap().is_none());
            assert_eq!(buf.len(), keep);
        }
    }

    #[test]
    fn decode_incomplete_payload() {
        let wire = encoded(&Frame::data(1, "hello"));
        let mut buf = BytesMut::from(&wire[..wire.len() - 2]);

        assert!(decode_frame(&mut buf, MAX_FRAME_SIZE).unwrap().is_none());
        assert_eq!(buf.len(), wire.len() - 2);

        buf.extend_from_slice(&wire[wire.len() - 2..]);
        let frame = decode_frame(&mut buf, MAX_FRAME_SIZE).unwrap().unwrap();
        assert_eq!(frame.payload.as_ref(), b"hello");
    }

    #[test]
    fn decode_frame_rejects_bad_header_before_payload_arrives() {
        let wire = encoded(&Frame::data(1, vec![0u8; 4096]));
        let mut partial = BytesMut::from(&wire[..PREFIXED_HEADER_SIZE + 10]);
        partial[4] = 0x00;

        let err = decode_frame(&mut partial, MAX_FRAME_SIZE).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadFrame);
    }

    #[test]
    fn multiple_frames_in_one_buffer() {
        let mut buf = BytesMut::new();
        encode_frame(&Frame::data(1, "first"), &mut buf).unwrap();
        encode_frame(&Frame::data(2, "second"), &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, MAX_FRAME_SIZE).unwrap().unwrap();
        assert_eq!(f1.stream_id, 1);
        assert_eq!(f1.payload.as_ref(), b"first");

        let f2 = decode_frame(&mut buf, MAX_FRAME_SIZE).unwrap().unwrap();
        assert_eq!(f2.stream_id, 2);
        assert_eq!(f2.payload.as_ref(), b"second");

        assert!(buf.is_empty());
    }

    #[test]
    fn sink_error_is_returned_unchanged() {
        struct BrokenPipe;

        impl Write for BrokenPipe {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::from(ErrorKind::BrokenPipe))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = write_frame(&mut BrokenPipe, &Frame::heartbeat()).unwrap_err();
        assert!(matches!(err, FrameError::Io(ref e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn frame_config_clamps_to_protocol_limit() {
        let cfg = FrameConfig {
            max_frame_size: usize::MAX,
        };
        assert_eq!(cfg.effective_max_frame_size(), MAX_FRAME_SIZE);
        assert_eq!(
            FrameConfig::default().effective_max_frame_size(),
            MAX_FRAME_SIZE
        );
    }
}
