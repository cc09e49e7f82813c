//! Frame model: protocol constants, frame types, flags and predicates.

use bytes::Bytes;

/// The single protocol version this crate speaks.
pub const VERSION: u8 = 1;

/// Magic marker "RT" (0x52 0x54), used to detect stream desynchronization.
pub const MAGIC: [u8; 2] = [0x52, 0x54];

/// Fixed header after the length prefix: magic (2), version (1), type (1),
/// flags (1) and stream ID (4).
pub const HEADER_SIZE: usize = 9;

/// Size of the big-endian length prefix that precedes every frame.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Maximum frame size (header + payload, excluding the length prefix): 16 MiB.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Largest payload a single frame can carry.
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - HEADER_SIZE;

/// Stream ID reserved for the control plane (auth, heartbeat, global errors).
pub const CONTROL_STREAM_ID: u32 = 0;

/// Frame kinds. Closed set: any other wire value is rejected on decode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Auth = 0x01,
    OpenStream = 0x02,
    Data = 0x03,
    Close = 0x04,
    Heartbeat = 0x05,
}

impl FrameType {
    pub const ALL: [FrameType; 5] = [
        FrameType::Auth,
        FrameType::OpenStream,
        FrameType::Data,
        FrameType::Close,
        FrameType::Heartbeat,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(FrameType::Auth),
            0x02 => Some(FrameType::OpenStream),
            0x03 => Some(FrameType::Data),
            0x04 => Some(FrameType::Close),
            0x05 => Some(FrameType::Heartbeat),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns a human-readable name for the frame type.
    pub fn name(self) -> &'static str {
        match self {
            FrameType::Auth => "AUTH",
            FrameType::OpenStream => "OPEN_STREAM",
            FrameType::Data => "DATA",
            FrameType::Close => "CLOSE",
            FrameType::Heartbeat => "HEARTBEAT",
        }
    }
}

/// Returns true if `value` is one of the five frame type bytes.
pub fn is_valid_frame_type(value: u8) -> bool {
    FrameType::from_u8(value).is_some()
}

bitflags::bitflags! {
    /// Independent frame flag bits.
    ///
    /// Bits outside the named ones are kept as-is; what a flag means for a
    /// given frame type is up to the session layer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        /// FIN: the sender is done with this stream (HTTP response done, TCP
        /// half-close, WebSocket close).
        const END_STREAM = 1 << 0;
        /// Acknowledges a received frame.
        const ACK = 1 << 1;
        /// The payload carries an error code and message.
        const ERROR = 1 << 2;
    }
}

/// One unit of wire communication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Protocol version; must be [`VERSION`] to be encoded.
    pub version: u8,
    pub frame_type: FrameType,
    pub flags: Flags,
    /// `0` is the control plane, anything else a data stream.
    pub stream_id: u32,
    /// Opaque payload; never inspected by the codec.
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame at the current protocol version with no flags set.
    pub fn new(frame_type: FrameType, stream_id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            version: VERSION,
            frame_type,
            flags: Flags::empty(),
            stream_id,
            payload: payload.into(),
        }
    }

    /// Replace the flag set.
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    pub fn auth(payload: impl Into<Bytes>) -> Self {
        Self::new(FrameType::Auth, CONTROL_STREAM_ID, payload)
    }

    pub fn open_stream(stream_id: u32, payload: impl Into<Bytes>) -> Self {
        Self::new(FrameType::OpenStream, stream_id, payload)
    }

    pub fn data(stream_id: u32, payload: impl Into<Bytes>) -> Self {
        Self::new(FrameType::Data, stream_id, payload)
    }

    pub fn close(stream_id: u32) -> Self {
        Self::new(FrameType::Close, stream_id, Bytes::new())
    }

    pub fn heartbeat() -> Self {
        Self::new(FrameType::Heartbeat, CONTROL_STREAM_ID, Bytes::new())
    }

    /// Value of the length prefix for this frame (header + payload).
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// The total wire size of this frame, length prefix included.
    pub fn wire_size(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.frame_len()
    }

    pub fn is_control_frame(&self) -> bool {
        self.stream_id == CONTROL_STREAM_ID
    }

    pub fn is_data_stream(&self) -> bool {
        self.stream_id > CONTROL_STREAM_ID
    }

    /// True if any bit of `flag` is set on this frame.
    pub fn has_flag(&self, flag: Flags) -> bool {
        self.flags.intersects(flag)
    }

    pub fn is_end_stream(&self) -> bool {
        self.has_flag(Flags::END_STREAM)
    }

    pub fn is_ack(&self) -> bool {
        self.has_flag(Flags::ACK)
    }

    pub fn is_error(&self) -> bool {
        self.has_flag(Flags::ERROR)
    }
}
