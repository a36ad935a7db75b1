//! Timber Protocol - syslog wire grammar for the Timber logging toolkit
//!
//! This crate provides the protocol layer shared by the transport writer
//! and receivers:
//! - `SyslogMessage` - tagged message model (undecoded / RFC 3164 / RFC 5424)
//! - `SyslogDecoder` - streaming decoder reassembling messages from a byte
//!   stream or datagrams, with resynchronization on malformed input
//! - `SyslogEncoder` - record-to-wire encoder for four encoding/framing
//!   combinations
//! - `Record` / `Attr` - the seam to the host logging facility
//! - `MessageBuffer` / `BufferPool` - reusable encode buffers
//!
//! # Design Principles
//!
//! - **Errors stay local**: malformed wire input degrades to
//!   `SyslogMessage::Undecoded`, never an error; only the encode path can
//!   fail, and only on oversized octet frames.
//! - **No I/O here**: the decoder is fed bytes and the encoder returns
//!   framed `bytes::Bytes`; sockets live in `timber-transport`.
//! - **Bounded memory**: both the octet length header and the
//!   resynchronization scan are capped at `DECODE_LIMIT` bytes.

mod buffer;
mod decoder;
mod encoder;
mod error;
mod message;
mod parse;
mod record;

pub use buffer::{BufferPool, MessageBuffer};
pub use decoder::{DECODE_LIMIT, SyslogDecoder};
pub use encoder::{
    DEFAULT_FACILITY, SYSLOG_MSGID_KEY, SyslogEncoder, SyslogEncoderConfig, SyslogFormat,
    severity_for,
};
pub use error::EncodeError;
pub use message::{
    Rfc3164Message, Rfc5424Message, SdElement, SdParam, SyslogMessage, UndecodedMessage,
};
pub use record::{Attr, Level, Record, SourceLocation, Value};

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};
