//! Timber Transport - syslog delivery and receive loops
//!
//! This crate moves the frames built by `timber-protocol` across the
//! network and feeds received bytes back through its decoder:
//! - `SyslogWriter` - lazy-dial, mutex-guarded writer with
//!   reconnect-on-write-failure over UDP, TCP, or TCP+TLS
//! - `SyslogTcpReceiver` - accept loop with one decoder per connection
//! - `SyslogUdpReceiver` - datagram loop with one decoder per socket
//! - `NetworkScheme` - the nine accepted network schemes
//!
//! # Concurrency
//!
//! Concurrent log calls serialize through the writer's mutex; there is no
//! internal queue and at most one in-flight write. Each receiver
//! connection runs independently and owns its decoder. Cancellation goes
//! through `CancellationToken` (receivers) or `SyslogWriter::close`;
//! blocking happens only in socket I/O.

mod common;
mod error;
mod scheme;
mod tcp;
mod udp;
mod writer;

pub use common::{
    ReceiverMetrics, ReceiverMetricsSnapshot, WriterMetrics, WriterMetricsSnapshot,
};
pub use error::TransportError;
pub use scheme::NetworkScheme;
pub use tcp::{SyslogTcpReceiver, SyslogTcpReceiverConfig};
pub use udp::{SyslogUdpReceiver, SyslogUdpReceiverConfig};
pub use writer::{SyslogWriter, SyslogWriterConfig, TlsOptions};

// Re-export the protocol types receivers emit and writers consume
pub use timber_protocol::{SyslogDecoder, SyslogEncoder, SyslogMessage};

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
