use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Stable numeric error codes shared by logging, metrics and on-wire error
/// frames.
///
/// Values are never renumbered or reused. New conditions get new variants
/// appended to their category range.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Unknown = 0,

    // Generic framing
    InvalidVersion = 1001,
    FrameTooLarge = 1002,
    BadFrame = 1003,
    BadPayload = 1004,

    // Auth / handshake
    Unauthorized = 2001,
    AuthExpired = 2002,

    // Stream
    StreamNotFound = 3001,
    StreamClosed = 3002,
}

/// Broad grouping of an [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Generic,
    Auth,
    Stream,
}

impl ErrorCategory {
    /// Framing errors mean the byte stream can no longer be trusted, so the
    /// connection carrying them has to be closed. Auth and stream errors are
    /// scoped to a session or a single stream.
    pub fn is_connection_fatal(self) -> bool {
        matches!(self, ErrorCategory::Generic)
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorCategory::Generic => "generic",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Stream => "stream",
        }
    }
}

impl ErrorCode {
    /// Every registered code, in ascending numeric order.
    pub const ALL: [ErrorCode; 9] = [
        ErrorCode::Unknown,
        ErrorCode::InvalidVersion,
        ErrorCode::FrameTooLarge,
        ErrorCode::BadFrame,
        ErrorCode::BadPayload,
        ErrorCode::Unauthorized,
        ErrorCode::AuthExpired,
        ErrorCode::StreamNotFound,
        ErrorCode::StreamClosed,
    ];

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Look up a code by its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_u16() == value)
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::Unknown => "UNKNOWN",
            ErrorCode::InvalidVersion => "INVALID_VERSION",
            ErrorCode::FrameTooLarge => "FRAME_TOO_LARGE",
            ErrorCode::BadFrame => "BAD_FRAME",
            ErrorCode::BadPayload => "BAD_PAYLOAD",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::AuthExpired => "AUTH_EXPIRED",
            ErrorCode::StreamNotFound => "STREAM_NOT_FOUND",
            ErrorCode::StreamClosed => "STREAM_CLOSED",
        }
    }

    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorCode::Unauthorized | ErrorCode::AuthExpired => ErrorCategory::Auth,
            ErrorCode::StreamNotFound | ErrorCode::StreamClosed => ErrorCategory::Stream,
            _ => ErrorCategory::Generic,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// The one error value the protocol layer produces for malformed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    code: ErrorCode,
    message: String,
}

impl ProtocolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "protocol error ({})", self.code)
        } else {
            write!(f, "protocol error ({}): {}", self.code, self.message)
        }
    }
}

impl StdError for ProtocolError {}

impl From<ProtocolError> for io::Error {
    fn from(err: ProtocolError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

/// Errors returned by the frame codec.
///
/// `Io` carries the byte source or sink's own error untouched, so a truncated
/// stream shows up as [`io::ErrorKind::UnexpectedEof`] and stays
/// distinguishable from a peer sending a malformed frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The peer sent (or the caller tried to send) a structurally invalid frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    /// The protocol error, if this is one.
    pub fn protocol(&self) -> Option<&ProtocolError> {
        match self {
            FrameError::Protocol(err) => Some(err),
            FrameError::Io(_) => None,
        }
    }

    /// True when the source ran out of bytes before a complete frame arrived.
    pub fn is_eof(&self) -> bool {
        matches!(self, FrameError::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// Extract a [`ProtocolError`] from an arbitrary error, if it carries one.
///
/// Looks at the error itself, inside [`FrameError`], inside an [`io::Error`]
/// built from a `ProtocolError`, and then down the `source()` chain. Returns
/// `None` for `None` or for any unrelated error.
pub fn as_protocol_error<'a>(err: Option<&'a (dyn StdError + 'static)>) -> Option<&'a ProtocolError> {
    let mut current = err;
    while let Some(err) = current {
        if let Some(found) = unwrap_protocol_error(err) {
            return Some(found);
        }
        current = err.source();
    }
    None
}

fn unwrap_protocol_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a ProtocolError> {
    if let Some(pe) = err.downcast_ref::<ProtocolError>() {
        return Some(pe);
    }
    if let Some(frame_err) = err.downcast_ref::<FrameError>() {
        return match frame_err {
            FrameError::Protocol(pe) => Some(pe),
            FrameError::Io(io_err) => io_err
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<ProtocolError>()),
        };
    }
    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        return io_err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<ProtocolError>());
    }
    None
}
