//! Reverse-tunnel wire framing.
//!
//! rtunnel multiplexes many logical streams (proxied HTTP, TCP and WebSocket
//! traffic) over one transport connection. This crate is the entry point for
//! the framing layer every session builds on.
//!
//! # Crate Structure
//!
//! - [`proto`]: Frame model, codec, error codes and buffered frame I/O
//!
//! The `rtunnel` binary (behind the `cli` feature) encodes and decodes frames
//! for debugging captured traffic.

/// Re-export protocol types.
pub mod proto {
    pub use rtunnel_proto::*;
}
