//! Syslog transport writer.
//!
//! Delivers fully framed messages produced by the encoder. The writer owns
//! at most one live connection, opened lazily on the first write and
//! protected by a mutex, so concurrent log calls serialize into at most one
//! in-flight write. A failed write closes and discards the connection; the
//! next write redials. That is the sole retry mechanism - the failed write
//! itself is never retried in place, and a dial failure surfaces to the
//! caller, who decides whether a later write should try again.
//!
//! Closing the writer (or the peer resetting the connection) unblocks any
//! pending socket operation; there is no timeout layer beyond the connect
//! timeout - callers wanting write deadlines apply them at the connection
//! level.

use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket, lookup_host};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_native_tls::TlsStream;

use crate::common::{WriterMetrics, WriterMetricsSnapshot};
use crate::error::TransportError;
use crate::scheme::NetworkScheme;

/// Default connect timeout (10s), TLS handshake included.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default keepalive probe interval (30s).
const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// TLS options for the `*+tls` schemes.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// Server name presented during the handshake; defaults to the host
    /// part of the target address.
    pub domain: Option<String>,

    /// Skip certificate validation (intended for tests).
    pub insecure_skip_verify: bool,
}

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct SyslogWriterConfig {
    /// Network scheme used to dial.
    pub scheme: NetworkScheme,

    /// Target address as `host:port`.
    pub address: String,

    /// Timeout for connect and TLS handshake.
    pub connect_timeout: Duration,

    /// TCP nodelay (disable Nagle's algorithm).
    pub nodelay: bool,

    /// TCP keepalive probe interval; `None` disables keepalive.
    pub keepalive: Option<Duration>,

    /// TLS options, used only by TLS schemes.
    pub tls: TlsOptions,
}

impl SyslogWriterConfig {
    pub fn new(scheme: NetworkScheme, address: impl Into<String>) -> Self {
        Self {
            scheme,
            address: address.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            nodelay: true,
            keepalive: Some(DEFAULT_KEEPALIVE_INTERVAL),
            tls: TlsOptions::default(),
        }
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }
}

/// A live connection to the target.
enum Connection {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Udp(UdpSocket),
}

impl Connection {
    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => {
                stream.write_all(frame).await?;
                stream.flush().await
            }
            Self::Tls(stream) => {
                stream.write_all(frame).await?;
                stream.flush().await
            }
            Self::Udp(socket) => socket.send(frame).await.map(|_| ()),
        }
    }
}

/// Mutex-guarded, lazily dialed syslog writer.
pub struct SyslogWriter {
    config: SyslogWriterConfig,
    connection: Mutex<Option<Connection>>,
    metrics: Arc<WriterMetrics>,
}

impl SyslogWriter {
    pub fn new(config: SyslogWriterConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
            metrics: Arc::new(WriterMetrics::new()),
        }
    }

    pub fn config(&self) -> &SyslogWriterConfig {
        &self.config
    }

    pub fn metrics(&self) -> WriterMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Deliver one framed message.
    ///
    /// Dials lazily when no connection is held. On a write error the
    /// connection is dropped so the next call redials; the error is
    /// returned without retrying the write.
    pub async fn write(&self, frame: &[u8]) -> Result<usize, TransportError> {
        let mut guard = self.connection.lock().await;
        let connection = match guard.take() {
            Some(connection) => guard.insert(connection),
            None => {
                let dialed = self.dial().await?;
                self.metrics.dial();
                guard.insert(dialed)
            }
        };
        match connection.send(frame).await {
            Ok(()) => {
                self.metrics.write(frame.len() as u64);
                Ok(frame.len())
            }
            Err(source) => {
                *guard = None;
                self.metrics.write_error();
                tracing::debug!(
                    target = %self.config.address,
                    error = %source,
                    "syslog write failed, connection discarded"
                );
                Err(TransportError::Write(source))
            }
        }
    }

    /// Tear down the held connection, if any. Idempotent; the next write
    /// redials.
    pub async fn close(&self) {
        let mut guard = self.connection.lock().await;
        guard.take();
    }

    /// Whether a connection is currently held.
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    async fn dial(&self) -> Result<Connection, TransportError> {
        let scheme = self.config.scheme;
        if scheme.is_datagram() {
            self.dial_udp().await
        } else if scheme.is_tls() {
            self.dial_tls().await
        } else {
            Ok(Connection::Tcp(self.dial_tcp().await?))
        }
    }

    async fn resolve(&self) -> Result<Vec<SocketAddr>, TransportError> {
        let family = self.config.scheme.family();
        let addrs: Vec<SocketAddr> = lookup_host(self.config.address.as_str())
            .await
            .map_err(|source| TransportError::Dial {
                address: self.config.address.clone(),
                source,
            })?
            .filter(|addr| family.matches(addr))
            .collect();
        if addrs.is_empty() {
            return Err(TransportError::Dial {
                address: self.config.address.clone(),
                source: io::Error::new(
                    ErrorKind::AddrNotAvailable,
                    "no resolved address matches the configured family",
                ),
            });
        }
        Ok(addrs)
    }

    async fn dial_tcp(&self) -> Result<TcpStream, TransportError> {
        let addrs = self.resolve().await?;
        let mut last_error = io::Error::new(ErrorKind::AddrNotAvailable, "no usable address");
        for addr in addrs {
            match timeout(self.config.connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    self.tune_tcp(&stream);
                    tracing::debug!(target = %self.config.address, peer = %addr, "syslog target dialed");
                    return Ok(stream);
                }
                Ok(Err(source)) => last_error = source,
                Err(_) => {
                    last_error = io::Error::new(ErrorKind::TimedOut, "connection timed out");
                }
            }
        }
        Err(TransportError::Dial {
            address: self.config.address.clone(),
            source: last_error,
        })
    }

    async fn dial_tls(&self) -> Result<Connection, TransportError> {
        let stream = self.dial_tcp().await?;
        let connector = self
            .tls_connector()
            .map_err(|source| TransportError::Tls {
                address: self.config.address.clone(),
                source,
            })?;
        let connector = tokio_native_tls::TlsConnector::from(connector);
        let domain = match &self.config.tls.domain {
            Some(domain) => domain.clone(),
            None => host_part(&self.config.address),
        };
        let handshake = timeout(self.config.connect_timeout, connector.connect(&domain, stream));
        match handshake.await {
            Ok(Ok(stream)) => Ok(Connection::Tls(Box::new(stream))),
            Ok(Err(source)) => Err(TransportError::Tls {
                address: self.config.address.clone(),
                source,
            }),
            Err(_) => Err(TransportError::Dial {
                address: self.config.address.clone(),
                source: io::Error::new(ErrorKind::TimedOut, "TLS handshake timed out"),
            }),
        }
    }

    async fn dial_udp(&self) -> Result<Connection, TransportError> {
        let addrs = self.resolve().await?;
        let mut last_error = io::Error::new(ErrorKind::AddrNotAvailable, "no usable address");
        for addr in addrs {
            let bind_addr = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
            let socket = match UdpSocket::bind(bind_addr).await {
                Ok(socket) => socket,
                Err(source) => {
                    last_error = source;
                    continue;
                }
            };
            match socket.connect(addr).await {
                Ok(()) => return Ok(Connection::Udp(socket)),
                Err(source) => last_error = source,
            }
        }
        Err(TransportError::Dial {
            address: self.config.address.clone(),
            source: last_error,
        })
    }

    fn tls_connector(&self) -> Result<native_tls::TlsConnector, native_tls::Error> {
        let mut builder = native_tls::TlsConnector::builder();
        if self.config.tls.insecure_skip_verify {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        builder.build()
    }

    /// Socket tuning is best effort; failures are logged, not fatal.
    fn tune_tcp(&self, stream: &TcpStream) {
        if self.config.nodelay {
            if let Err(error) = stream.set_nodelay(true) {
                tracing::debug!(error = %error, "failed to set TCP_NODELAY");
            }
        }
        if let Some(interval) = self.config.keepalive {
            let sock_ref = SockRef::from(stream);
            let keepalive = TcpKeepalive::new().with_time(interval);
            if let Err(error) = sock_ref.set_tcp_keepalive(&keepalive) {
                tracing::debug!(error = %error, "failed to set TCP keepalive");
            }
        }
    }
}

/// Host part of a `host:port` address, with IPv6 brackets stripped.
fn host_part(address: &str) -> String {
    let host = match address.rsplit_once(':') {
        Some((host, _)) => host,
        None => address,
    };
    host.trim_start_matches('[').trim_end_matches(']').to_string()
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
