//! Shared metrics for receivers and the writer.

use std::sync::atomic::{AtomicU64, Ordering};

use timber_protocol::SyslogMessage;

/// Metrics common to the TCP and UDP receivers.
#[derive(Debug, Default)]
pub struct ReceiverMetrics {
    /// Currently open connections (TCP) or running reader tasks (UDP).
    pub connections_active: AtomicU64,

    /// Connections/readers opened since start.
    pub connections_total: AtomicU64,

    /// Raw bytes fed into the decoder.
    pub bytes_received: AtomicU64,

    /// Messages that decoded as RFC 3164 or RFC 5424.
    pub messages_decoded: AtomicU64,

    /// Messages emitted as undecoded.
    pub messages_undecoded: AtomicU64,

    /// Read or channel errors.
    pub errors: AtomicU64,
}

impl ReceiverMetrics {
    pub const fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            messages_decoded: AtomicU64::new(0),
            messages_undecoded: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn bytes_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record one decoded message by variant.
    #[inline]
    pub fn message(&self, message: &SyslogMessage) {
        match message {
            SyslogMessage::Undecoded(_) => {
                self.messages_undecoded.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.messages_decoded.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReceiverMetricsSnapshot {
        ReceiverMetricsSnapshot {
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            messages_decoded: self.messages_decoded.load(Ordering::Relaxed),
            messages_undecoded: self.messages_undecoded.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of receiver metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiverMetricsSnapshot {
    pub connections_active: u64,
    pub connections_total: u64,
    pub bytes_received: u64,
    pub messages_decoded: u64,
    pub messages_undecoded: u64,
    pub errors: u64,
}

/// Metrics for the transport writer.
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Successful writes.
    pub writes: AtomicU64,

    /// Bytes delivered.
    pub bytes_written: AtomicU64,

    /// Writes that failed and invalidated the connection.
    pub write_errors: AtomicU64,

    /// Dial attempts that succeeded (initial and redials).
    pub dials: AtomicU64,
}

impl WriterMetrics {
    pub const fn new() -> Self {
        Self {
            writes: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            dials: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn write(&self, bytes: u64) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn dial(&self) {
        self.dials.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WriterMetricsSnapshot {
        WriterMetricsSnapshot {
            writes: self.writes.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            dials: self.dials.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of writer metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriterMetricsSnapshot {
    pub writes: u64,
    pub bytes_written: u64,
    pub write_errors: u64,
    pub dials: u64,
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
