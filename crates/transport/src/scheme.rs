//! Network scheme selection for the transport writer.
//!
//! Mirrors the address families accepted by the writer: plain UDP/TCP in
//! unspecified, IPv4-only, and IPv6-only flavors, plus TLS-wrapped TCP.
//! An unrecognized scheme is a configuration error raised at parse time,
//! never a runtime I/O error.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::TransportError;

/// Network scheme used to dial the syslog target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkScheme {
    Udp,
    Udp4,
    Udp6,
    /// Plain TCP (the default, also selected by the empty string).
    #[default]
    Tcp,
    Tcp4,
    Tcp6,
    TcpTls,
    Tcp4Tls,
    Tcp6Tls,
}

impl NetworkScheme {
    /// Whether this scheme delivers datagrams rather than a byte stream.
    pub fn is_datagram(self) -> bool {
        matches!(self, Self::Udp | Self::Udp4 | Self::Udp6)
    }

    /// Whether the connection is wrapped in TLS.
    pub fn is_tls(self) -> bool {
        matches!(self, Self::TcpTls | Self::Tcp4Tls | Self::Tcp6Tls)
    }

    /// Address family this scheme restricts resolution to.
    pub(crate) fn family(self) -> AddressFamily {
        match self {
            Self::Udp4 | Self::Tcp4 | Self::Tcp4Tls => AddressFamily::V4,
            Self::Udp6 | Self::Tcp6 | Self::Tcp6Tls => AddressFamily::V6,
            _ => AddressFamily::Any,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Udp4 => "udp4",
            Self::Udp6 => "udp6",
            Self::Tcp => "tcp",
            Self::Tcp4 => "tcp4",
            Self::Tcp6 => "tcp6",
            Self::TcpTls => "tcp+tls",
            Self::Tcp4Tls => "tcp4+tls",
            Self::Tcp6Tls => "tcp6+tls",
        }
    }
}

impl fmt::Display for NetworkScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkScheme {
    type Err = TransportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "" | "tcp" => Ok(Self::Tcp),
            "tcp4" => Ok(Self::Tcp4),
            "tcp6" => Ok(Self::Tcp6),
            "udp" => Ok(Self::Udp),
            "udp4" => Ok(Self::Udp4),
            "udp6" => Ok(Self::Udp6),
            "tcp+tls" => Ok(Self::TcpTls),
            "tcp4+tls" => Ok(Self::Tcp4Tls),
            "tcp6+tls" => Ok(Self::Tcp6Tls),
            other => Err(TransportError::UnrecognizedScheme(other.to_string())),
        }
    }
}

/// Address family restriction for resolved targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AddressFamily {
    Any,
    V4,
    V6,
}

impl AddressFamily {
    pub(crate) fn matches(self, addr: &SocketAddr) -> bool {
        match self {
            Self::Any => true,
            Self::V4 => addr.is_ipv4(),
            Self::V6 => addr.is_ipv6(),
        }
    }
}

#[cfg(test)]
#[path = "scheme_test.rs"]
mod scheme_test;
