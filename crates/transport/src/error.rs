//! Transport error types.
//!
//! Configuration problems (an unrecognized network scheme) are detected at
//! construction time; everything else is socket I/O surfaced from the dial,
//! write, and receive paths.

use std::io;

use thiserror::Error;

/// Errors from the syslog transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Scheme string matched none of the supported networks.
    #[error("unrecognized syslog network scheme: '{0}'")]
    UnrecognizedScheme(String),

    /// Failed to bind a receiver socket.
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Failed to reach the write target.
    #[error("failed to dial {address}: {source}")]
    Dial {
        address: String,
        #[source]
        source: io::Error,
    },

    /// TLS handshake with the write target failed.
    #[error("TLS handshake with {address} failed: {source}")]
    Tls {
        address: String,
        #[source]
        source: native_tls::Error,
    },

    /// Write on an established connection failed; the connection has been
    /// discarded and the next write redials.
    #[error("write failed: {0}")]
    Write(#[from] io::Error),

    /// The receiver's message channel is closed.
    #[error("message channel closed")]
    ChannelClosed,
}

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;
