//! Protocol error types.
//!
//! Malformed wire input is not an error: the decoder degrades it to
//! [`crate::SyslogMessage::Undecoded`]. Errors here cover the encode path
//! only.

use thiserror::Error;

/// Errors that can occur while encoding a record.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The serialized payload is too large for its octet-framing length
    /// header to fit the reserved buffer prefix.
    #[error("message too large for octet framing: {size} bytes")]
    MessageTooLarge { size: usize },
}
