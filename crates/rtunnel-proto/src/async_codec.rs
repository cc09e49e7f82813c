//! `tokio_util::codec` adapter for use with `Framed`, `FramedRead` and
//! `FramedWrite`.

use std::io;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame_with_limit, FrameConfig};
use crate::error::FrameError;
use crate::frame::Frame;

/// Frame codec for async streams.
#[derive(Debug, Clone, Default)]
pub struct TunnelCodec {
    config: FrameConfig,
}

impl TunnelCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Decoder for TunnelCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        decode_frame(src, self.config.effective_max_frame_size()).map_err(FrameError::Protocol)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("stream closed mid-frame ({} bytes buffered)", src.len()),
            ))),
        }
    }
}

impl Encoder<&Frame> for TunnelCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: &Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame_with_limit(frame, dst, self.config.effective_max_frame_size())
            .map_err(FrameError::Protocol)
    }
}

impl Encoder<Frame> for TunnelCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        Encoder::<&Frame>::encode(self, &frame, dst)
    }
}
