//! Syslog UDP receiver.
//!
//! One task owns the socket and its decoder. Message boundaries are
//! datagram boundaries under correct framing use, so no bytes accumulate
//! across receive calls; a datagram carrying several framed messages still
//! runs the full decode loop and yields all of them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use socket2::SockRef;
use timber_protocol::{SyslogDecoder, SyslogMessage};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::ReceiverMetrics;
use crate::error::TransportError;

/// Default syslog port (privileged - may need root).
const DEFAULT_PORT: u16 = 514;

/// Default maximum datagram size (8KB).
const DEFAULT_MAX_DATAGRAM_SIZE: usize = 8192;

/// Default kernel receive buffer (1MB) to absorb bursts.
const DEFAULT_SOCKET_BUFFER_SIZE: usize = 1024 * 1024;

/// Syslog UDP receiver configuration.
#[derive(Debug, Clone)]
pub struct SyslogUdpReceiverConfig {
    /// Receiver identifier for logging.
    pub id: String,

    /// Bind address (e.g. "0.0.0.0").
    pub address: String,

    /// Listen port.
    pub port: u16,

    /// Largest datagram accepted; longer ones are truncated by the socket.
    pub max_datagram_size: usize,

    /// Kernel receive buffer size (SO_RCVBUF).
    pub socket_buffer_size: usize,
}

impl Default for SyslogUdpReceiverConfig {
    fn default() -> Self {
        Self {
            id: "syslog_udp".into(),
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            socket_buffer_size: DEFAULT_SOCKET_BUFFER_SIZE,
        }
    }
}

impl SyslogUdpReceiverConfig {
    /// Create config with a custom port.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// The socket address to bind to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Syslog receiver over UDP.
pub struct SyslogUdpReceiver {
    config: SyslogUdpReceiverConfig,
    sender: mpsc::Sender<SyslogMessage>,
    metrics: Arc<ReceiverMetrics>,
    running: Arc<AtomicBool>,
}

impl SyslogUdpReceiver {
    pub fn new(config: SyslogUdpReceiverConfig, sender: mpsc::Sender<SyslogMessage>) -> Self {
        Self {
            config,
            sender,
            metrics: Arc::new(ReceiverMetrics::new()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn metrics(&self) -> &Arc<ReceiverMetrics> {
        &self.metrics
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Bind and receive datagrams until cancelled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), TransportError> {
        let bind_addr = self.config.bind_address();
        let socket = UdpSocket::bind(&bind_addr)
            .await
            .map_err(|source| TransportError::Bind {
                address: bind_addr.clone(),
                source,
            })?;

        // Best effort; a small kernel buffer only costs burst tolerance.
        let sock_ref = SockRef::from(&socket);
        if let Err(error) = sock_ref.set_recv_buffer_size(self.config.socket_buffer_size) {
            tracing::warn!(error = %error, "failed to set SO_RCVBUF");
        }

        self.running.store(true, Ordering::Relaxed);
        self.metrics.connection_opened();

        tracing::info!(
            receiver_id = %self.config.id,
            address = %bind_addr,
            "syslog UDP receiver listening"
        );

        let result = self.receive_loop(socket, cancel).await;
        self.metrics.connection_closed();
        self.running.store(false, Ordering::Relaxed);
        tracing::info!(receiver_id = %self.config.id, "syslog UDP receiver stopped");
        result
    }

    async fn receive_loop(
        &self,
        socket: UdpSocket,
        cancel: CancellationToken,
    ) -> Result<(), TransportError> {
        // The socket's single reader owns the decoder.
        let mut decoder = SyslogDecoder::new();
        let mut buf = vec![0u8; self.config.max_datagram_size];

        loop {
            if !self.running.load(Ordering::Relaxed) {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = socket.recv_from(&mut buf) => {
                    match received {
                        Ok((n, _peer)) => {
                            self.metrics.bytes_received(n as u64);
                            // Feed exactly this datagram and drain every
                            // message it contains.
                            decoder.feed(&buf[..n]);
                            for message in decoder.decode() {
                                self.metrics.message(&message);
                                if self.sender.send(message).await.is_err() {
                                    return Err(TransportError::ChannelClosed);
                                }
                            }
                        }
                        Err(error) => {
                            self.metrics.error();
                            tracing::debug!(
                                receiver_id = %self.config.id,
                                error = %error,
                                "syslog UDP receive error"
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod udp_test;
