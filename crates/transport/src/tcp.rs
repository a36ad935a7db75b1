//! Syslog TCP receiver.
//!
//! Accepts connections and reassembles syslog messages from each byte
//! stream. Every connection gets its own [`SyslogDecoder`]: the handler
//! reads into a scratch buffer, feeds the decoder, and immediately drains
//! all complete messages onto the output channel. Partial frames stay
//! buffered in the decoder until the next read.
//!
//! Malformed input never terminates a connection; it surfaces as
//! `SyslogMessage::Undecoded` like any other message.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use timber_protocol::{SyslogDecoder, SyslogMessage};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::ReceiverMetrics;
use crate::error::TransportError;

/// Default syslog port (privileged - may need root).
const DEFAULT_PORT: u16 = 514;

/// Default per-connection read buffer (8KB).
const DEFAULT_READ_BUFFER_SIZE: usize = 8192;

/// Syslog TCP receiver configuration.
#[derive(Debug, Clone)]
pub struct SyslogTcpReceiverConfig {
    /// Receiver identifier for logging.
    pub id: String,

    /// Bind address (e.g. "0.0.0.0").
    pub address: String,

    /// Listen port.
    pub port: u16,

    /// Scratch buffer size per connection read.
    pub read_buffer_size: usize,

    /// TCP nodelay on accepted connections.
    pub nodelay: bool,
}

impl Default for SyslogTcpReceiverConfig {
    fn default() -> Self {
        Self {
            id: "syslog_tcp".into(),
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            nodelay: true,
        }
    }
}

impl SyslogTcpReceiverConfig {
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

/// Syslog receiver over TCP.
///
/// Decoded messages are forwarded on the channel handed to [`Self::new`];
/// the receiver stops when cancelled or when the channel closes.
pub struct SyslogTcpReceiver {
    config: SyslogTcpReceiverConfig,
    sender: mpsc::Sender<SyslogMessage>,
    metrics: Arc<ReceiverMetrics>,
    running: Arc<AtomicBool>,
}

impl SyslogTcpReceiver {
    pub fn new(config: SyslogTcpReceiverConfig, sender: mpsc::Sender<SyslogMessage>) -> Self {
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

    /// Bind and accept connections until cancelled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), TransportError> {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| TransportError::Bind {
                address: bind_addr.clone(),
                source,
            })?;

        self.running.store(true, Ordering::Relaxed);

        tracing::info!(
            receiver_id = %self.config.id,
            address = %bind_addr,
            "syslog TCP receiver listening"
        );

        self.accept_loop(listener, cancel).await
    }

    async fn accept_loop(
        &self,
        listener: TcpListener,
        cancel: CancellationToken,
    ) -> Result<(), TransportError> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.running.store(false, Ordering::Relaxed);
                    break;
                }
                accepted = listener.accept() => {
                    if !self.running.load(Ordering::Relaxed) {
                        break;
                    }
                    match accepted {
                        Ok((stream, peer_addr)) => {
                            self.metrics.connection_opened();
                            if self.config.nodelay {
                                if let Err(error) = stream.set_nodelay(true) {
                                    tracing::debug!(error = %error, "failed to set TCP_NODELAY");
                                }
                            }

                            let handler = ConnectionHandler {
                                sender: self.sender.clone(),
                                metrics: Arc::clone(&self.metrics),
                                cancel: cancel.clone(),
                                peer_addr,
                                read_buffer_size: self.config.read_buffer_size,
                            };
                            tokio::spawn(async move {
                                let peer = handler.peer_addr;
                                if let Err(error) = handler.handle(stream).await {
                                    tracing::debug!(
                                        peer = %peer,
                                        error = %error,
                                        "syslog connection ended with error"
                                    );
                                }
                            });
                        }
                        Err(error) => {
                            if self.running.load(Ordering::Relaxed) {
                                tracing::warn!(error = %error, "syslog TCP accept error");
                                self.metrics.error();
                            }
                        }
                    }
                }
            }
        }

        tracing::info!(receiver_id = %self.config.id, "syslog TCP receiver stopped");
        Ok(())
    }
}

/// Handles a single accepted connection.
struct ConnectionHandler {
    sender: mpsc::Sender<SyslogMessage>,
    metrics: Arc<ReceiverMetrics>,
    cancel: CancellationToken,
    peer_addr: SocketAddr,
    read_buffer_size: usize,
}

impl ConnectionHandler {
    async fn handle(self, mut stream: TcpStream) -> Result<(), TransportError> {
        // One decoder per connection; it owns all partial-frame state.
        let mut decoder = SyslogDecoder::new();
        let mut buf = vec![0u8; self.read_buffer_size];

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                read = stream.read(&mut buf) => {
                    match read {
                        Ok(0) => break, // EOF
                        Ok(n) => {
                            self.metrics.bytes_received(n as u64);
                            decoder.feed(&buf[..n]);
                            for message in decoder.decode() {
                                self.metrics.message(&message);
                                if self.sender.send(message).await.is_err() {
                                    self.metrics.connection_closed();
                                    return Err(TransportError::ChannelClosed);
                                }
                            }
                        }
                        Err(error) => {
                            if !is_connection_reset(&error) {
                                self.metrics.error();
                                tracing::debug!(
                                    peer = %self.peer_addr,
                                    error = %error,
                                    "syslog TCP read error"
                                );
                            }
                            break;
                        }
                    }
                }
            }
        }

        self.metrics.connection_closed();
        Ok(())
    }
}

/// Check if an error is a connection reset (expected during shutdown).
fn is_connection_reset(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;
