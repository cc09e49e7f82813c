//! Payload layout for frames carrying [`Flags::ERROR`].
//!
//! ```text
//! ┌──────────────┬──────────────────────┐
//! │ Code (2B BE) │ Message (UTF-8, rest) │
//! └──────────────┴──────────────────────┘
//! ```
//!
//! The frame codec never looks inside payloads; this is for the session layer
//! when it reports an error to the peer or reads one back.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ErrorCode, ProtocolError};
use crate::frame::{Flags, Frame, FrameType};

const CODE_SIZE: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(CODE_SIZE + self.message.len());
        buf.put_u16(self.code.as_u16());
        buf.put_slice(self.message.as_bytes());
        buf.freeze()
    }

    /// Parse an error payload; failures are reported as `BadPayload`.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < CODE_SIZE {
            return Err(ProtocolError::new(
                ErrorCode::BadPayload,
                format!("error payload too short ({} bytes)", payload.len()),
            ));
        }

        let raw = u16::from_be_bytes([payload[0], payload[1]]);
        let code = ErrorCode::from_u16(raw).ok_or_else(|| {
            ProtocolError::new(ErrorCode::BadPayload, format!("unknown error code {raw}"))
        })?;

        let message = std::str::from_utf8(&payload[CODE_SIZE..]).map_err(|err| {
            ProtocolError::new(
                ErrorCode::BadPayload,
                format!("error message is not valid UTF-8: {err}"),
            )
        })?;

        Ok(Self::new(code, message))
    }

    pub fn into_protocol_error(self) -> ProtocolError {
        ProtocolError::new(self.code, self.message)
    }
}

impl From<&ProtocolError> for ErrorPayload {
    fn from(err: &ProtocolError) -> Self {
        Self::new(err.code(), err.message())
    }
}

impl Frame {
    /// Build a frame of `frame_type` with the `ERROR` flag set, carrying `err`.
    ///
    /// Use stream `0` for connection-wide errors.
    pub fn error(frame_type: FrameType, stream_id: u32, err: &ProtocolError) -> Self {
        Frame::new(frame_type, stream_id, ErrorPayload::from(err).encode()).with_flags(Flags::ERROR)
    }

    /// Parse the payload of a frame carrying the `ERROR` flag.
    ///
    /// Returns `None` for frames without the flag.
    pub fn error_payload(&self) -> Option<Result<ErrorPayload, ProtocolError>> {
        self.is_error().then(|| ErrorPayload::decode(&self.payload))
    }
}
