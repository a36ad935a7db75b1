//! Tests for the transport writer

use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, UdpSocket};

use super::*;
use crate::error::TransportError;
use crate::scheme::NetworkScheme;

fn tcp_config(address: String) -> SyslogWriterConfig {
    SyslogWriterConfig::new(NetworkScheme::Tcp, address)
        .with_connect_timeout(Duration::from_secs(1))
}

#[test]
fn test_config_defaults() {
    let config = SyslogWriterConfig::new(NetworkScheme::Tcp, "logs.example.com:514");
    assert_eq!(config.scheme, NetworkScheme::Tcp);
    assert_eq!(config.address, "logs.example.com:514");
    assert!(config.nodelay);
    assert!(config.keepalive.is_some());
    assert!(config.tls.domain.is_none());
    assert!(!config.tls.insecure_skip_verify);
}

#[test]
fn test_host_part() {
    assert_eq!(host_part("logs.example.com:514"), "logs.example.com");
    assert_eq!(host_part("127.0.0.1:6514"), "127.0.0.1");
    assert_eq!(host_part("[::1]:514"), "::1");
    assert_eq!(host_part("bare-host"), "bare-host");
}

#[tokio::test]
async fn test_lazy_dial_and_tcp_delivery() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let writer = SyslogWriter::new(tcp_config(addr.to_string()));
    assert!(!writer.is_connected().await, "no dial before the first write");

    let frame = b"<34>Oct 11 22:14:15 mymachine su: hello\n";
    let written = writer.write(frame).await.unwrap();
    assert_eq!(written, frame.len());
    assert!(writer.is_connected().await);

    let (mut stream, _) = listener.accept().await.unwrap();
    let mut received = vec![0u8; frame.len()];
    stream.read_exact(&mut received).await.unwrap();
    assert_eq!(received, frame);

    let metrics = writer.metrics();
    assert_eq!(metrics.dials, 1);
    assert_eq!(metrics.writes, 1);
    assert_eq!(metrics.bytes_written, frame.len() as u64);
}

#[tokio::test]
async fn test_connection_reused_across_writes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let writer = SyslogWriter::new(tcp_config(addr.to_string()));
    writer.write(b"first\n").await.unwrap();
    writer.write(b"second\n").await.unwrap();

    let (mut stream, _) = listener.accept().await.unwrap();
    let mut received = vec![0u8; 13];
    stream.read_exact(&mut received).await.unwrap();
    assert_eq!(received, b"first\nsecond\n");

    assert_eq!(writer.metrics().dials, 1, "one connection for both writes");
}

#[tokio::test]
async fn test_dial_failure_surfaces_without_retry() {
    // Grab a port and release it so the dial is refused
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let writer = SyslogWriter::new(tcp_config(addr.to_string()));
    let error = writer.write(b"frame\n").await.unwrap_err();
    assert!(matches!(error, TransportError::Dial { .. }));
    assert!(!writer.is_connected().await);
    assert_eq!(writer.metrics().dials, 0);

    // A later write retries the dial; with a listener back, it succeeds
    let listener = TcpListener::bind(addr).await.unwrap();
    writer.write(b"frame\n").await.unwrap();
    assert!(writer.is_connected().await);
    drop(listener);
}

#[tokio::test]
async fn test_write_failure_discards_connection_and_redials() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let writer = SyslogWriter::new(tcp_config(addr.to_string()));
    writer.write(b"first\n").await.unwrap();

    // Accept and immediately close the peer side
    let (stream, _) = listener.accept().await.unwrap();
    drop(stream);
    drop(listener);

    // The peer close is detected after at most a few writes; the failing
    // write is not retried in place, it just invalidates the connection
    let mut saw_error = false;
    for _ in 0..50 {
        match writer.write(b"probe\n").await {
            Ok(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            Err(TransportError::Write(_)) => {
                saw_error = true;
                break;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(saw_error, "peer close never surfaced as a write error");
    assert!(!writer.is_connected().await, "failed write must drop the connection");

    // Next write redials once a listener is back
    let listener = TcpListener::bind(addr).await.unwrap();
    writer.write(b"after-redial\n").await.unwrap();
    assert!(writer.is_connected().await);
    assert!(writer.metrics().write_errors >= 1);
    drop(listener);
}

#[tokio::test]
async fn test_udp_delivery() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = receiver.local_addr().unwrap();

    let config = SyslogWriterConfig::new(NetworkScheme::Udp, addr.to_string());
    let writer = SyslogWriter::new(config);

    let frame = b"<34>Oct 11 22:14:15 mymachine su: datagram\n";
    writer.write(frame).await.unwrap();

    let mut buf = vec![0u8; 1024];
    let (n, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..n], frame);
}

#[tokio::test]
async fn test_udp4_scheme_restricts_family() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = receiver.local_addr().unwrap();

    let config = SyslogWriterConfig::new(NetworkScheme::Udp4, addr.to_string());
    let writer = SyslogWriter::new(config);
    writer.write(b"v4 only\n").await.unwrap();

    let mut buf = vec![0u8; 64];
    let (n, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..n], b"v4 only\n");
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let writer = SyslogWriter::new(tcp_config(addr.to_string()));
    writer.write(b"frame\n").await.unwrap();
    assert!(writer.is_connected().await);

    writer.close().await;
    assert!(!writer.is_connected().await);
    writer.close().await;
    assert!(!writer.is_connected().await);

    // The writer remains usable after close
    writer.write(b"again\n").await.unwrap();
    assert_eq!(writer.metrics().dials, 2);
}
