//! Wire framing for the rtunnel reverse-tunnel protocol.
//!
//! Every logical stream (proxied HTTP, TCP or WebSocket traffic) is carried
//! over one transport connection as a sequence of frames:
//! - A 4-byte big-endian length (bytes that follow it)
//! - A 2-byte magic marker ("RT") for stream synchronization
//! - Version, frame type and flags, one byte each
//! - A 4-byte big-endian stream ID (0 = control plane)
//! - The opaque payload
//!
//! Encoding and decoding are stateless; every malformed input is rejected
//! with a [`ProtocolError`] before a frame reaches the caller.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod error_payload;
pub mod frame;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::TunnelCodec;
pub use codec::{
    decode_frame, encode_frame, read_frame, write_frame, FrameConfig, PREFIXED_HEADER_SIZE,
};
pub use error::{
    as_protocol_error, ErrorCategory, ErrorCode, FrameError, ProtocolError, Result,
};
pub use error_payload::ErrorPayload;
pub use frame::{
    is_valid_frame_type, Flags, Frame, FrameType, CONTROL_STREAM_ID, HEADER_SIZE,
    LENGTH_PREFIX_SIZE, MAGIC, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, VERSION,
};
pub use reader::FrameReader;
pub use writer::FrameWriter;
