//! Syslog message model
//!
//! Every decoded message keeps the original wire bytes alongside its parsed
//! fields so receivers can quote or re-emit exactly what arrived. Input that
//! matches neither grammar is preserved as [`UndecodedMessage`] rather than
//! being dropped or raised as an error.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime};

/// A syslog message reassembled from the wire.
///
/// The three variants are mutually exclusive shapes over one capability set:
/// length, raw bytes, and a quoted string rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum SyslogMessage {
    /// A fully received frame that failed both grammars, or bytes discarded
    /// during resynchronization.
    Undecoded(UndecodedMessage),
    /// RFC 3164 (BSD syslog) message.
    Rfc3164(Rfc3164Message),
    /// RFC 5424 (IETF syslog) message.
    Rfc5424(Rfc5424Message),
}

impl SyslogMessage {
    /// Raw bytes of the message as received, including any framing header.
    pub fn raw(&self) -> &[u8] {
        match self {
            Self::Undecoded(message) => &message.raw,
            Self::Rfc3164(message) => &message.raw,
            Self::Rfc5424(message) => &message.raw,
        }
    }

    /// Length of the raw message in bytes.
    pub fn len(&self) -> usize {
        self.raw().len()
    }

    /// Whether the raw message is empty.
    pub fn is_empty(&self) -> bool {
        self.raw().is_empty()
    }
}

impl fmt::Display for SyslogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.raw()))
    }
}

/// A raw, fully received frame that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndecodedMessage {
    pub(crate) raw: Vec<u8>,
}

impl UndecodedMessage {
    pub(crate) fn new(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    /// Raw bytes of the frame.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// An RFC 3164 message: `<PRI>Mmm dd hh:mm:ss HOSTNAME TAG: MESSAGE`.
///
/// The timestamp carries no year or zone; the year parses as 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Rfc3164Message {
    pub(crate) raw: Vec<u8>,
    /// Facility (0-23), the PRI value divided by 8.
    pub facility: u8,
    /// Severity (0-7), the PRI value modulo 8.
    pub severity: u8,
    /// Local-time stamp at month/day/time resolution.
    pub timestamp: NaiveDateTime,
    pub hostname: String,
    /// Message tag, including any trailing `:`.
    pub tag: String,
    /// Message content up to the frame boundary, newline stripped.
    pub content: String,
}

impl Rfc3164Message {
    /// Raw bytes of the frame.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// An RFC 5424 message.
///
/// Header fields set to the literal placeholder `-` are preserved as that
/// string, not normalized to empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Rfc5424Message {
    pub(crate) raw: Vec<u8>,
    /// Facility (0-23), the PRI value divided by 8.
    pub facility: u8,
    /// Severity (0-7), the PRI value modulo 8.
    pub severity: u8,
    /// Protocol version, always 1.
    pub version: u8,
    pub timestamp: DateTime<FixedOffset>,
    pub hostname: String,
    pub app_name: String,
    pub proc_id: String,
    pub msg_id: String,
    /// Structured-data elements in wire order; empty when the SD field is `-`.
    pub structured_data: Vec<SdElement>,
    /// Free-text message body, newline stripped.
    pub message: String,
}

impl Rfc5424Message {
    /// Raw bytes of the frame.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// One structured-data element: `[id key="value" ...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdElement {
    pub id: String,
    /// Parameters in wire order.
    pub params: Vec<SdParam>,
}

/// A structured-data parameter with its value unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdParam {
    pub key: String,
    pub value: String,
}

#[cfg(test)]
#[path = "message_test.rs"]
mod message_test;
