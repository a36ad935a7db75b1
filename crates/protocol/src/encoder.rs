//! Syslog encoder.
//!
//! Serializes a [`Record`] into one fully framed wire message under one of
//! four encoding/framing combinations. The encoder is independent of the
//! decoder; the two share only the wire grammar.
//!
//! # Encodings
//!
//! - **RFC 3164** - `<PRI>` + fixed-width local stamp + `host app[pid]: ` +
//!   message, with attributes appended as `key="value"` tags.
//! - **RFC 5424** - `<PRI>1 ` + RFC 3339 stamp + `host app pid ` + MSGID +
//!   structured data + message. All attributes aggregate into a single
//!   synthetic `[Attrs@1 ...]` element, rendered only if at least one
//!   attribute exists.
//!
//! Either encoding can use implicit framing (trailing newline) or RFC 6587
//! octet framing (exact byte count prefix).
//!
//! The attribute key `"syslog"` is reserved: its value becomes the RFC 5424
//! MSGID and it is never rendered as a tag or structured-data parameter.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{Local, SecondsFormat};

use crate::buffer::{BufferPool, MessageBuffer};
use crate::error::EncodeError;
use crate::record::{Attr, Level, Record, Value};

/// Attribute key carrying the RFC 5424 MSGID.
pub const SYSLOG_MSGID_KEY: &str = "syslog";

/// Facility used when the configured one is out of range: 16, "local0".
pub const DEFAULT_FACILITY: u8 = 16;

/// Opening of the synthetic structured-data element aggregating record
/// attributes; staged conditionally so an attribute-less record rolls it
/// back to the nil field.
const SD_BLOCK_OPEN: &str = " [Attrs@1";

/// Supported encoding/framing combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyslogFormat {
    /// RFC 3164 with implicit (newline) framing.
    Rfc3164,
    /// RFC 3164 with RFC 6587 octet framing.
    Rfc3164Octet,
    /// RFC 5424 with implicit (newline) framing.
    Rfc5424,
    /// RFC 5424 with RFC 6587 octet framing (the default).
    #[default]
    Rfc5424Octet,
}

impl SyslogFormat {
    /// Parse a configuration value, warning and falling back to the
    /// default on anything unrecognized. The empty string selects the
    /// default.
    pub fn from_config(value: &str) -> Self {
        match value {
            "" => Self::default(),
            "rfc3164" => Self::Rfc3164,
            "rfc3164+framing" => Self::Rfc3164Octet,
            "rfc5424" => Self::Rfc5424,
            "rfc5424+framing" => Self::Rfc5424Octet,
            other => {
                tracing::warn!(encoding = %other, "unrecognized syslog encoding, using default");
                Self::default()
            }
        }
    }

    /// Whether messages are newline-terminated rather than length-prefixed.
    pub fn implicit_framing(self) -> bool {
        matches!(self, Self::Rfc3164 | Self::Rfc5424)
    }

    fn is_rfc3164(self) -> bool {
        matches!(self, Self::Rfc3164 | Self::Rfc3164Octet)
    }
}

/// Encoder configuration.
///
/// Validation happens at [`SyslogEncoder::new`]: an out-of-range facility
/// or unrecognized encoding string warns and falls back to its documented
/// default instead of failing construction. Callers requiring strict
/// validation must inspect the configuration beforehand.
#[derive(Debug, Clone)]
pub struct SyslogEncoderConfig {
    pub format: SyslogFormat,
    /// Syslog facility, 0-23.
    pub facility: u8,
    /// Application name for the header; defaults to the executable name.
    pub app_name: Option<String>,
    /// Hostname for the header; defaults to the machine hostname.
    pub hostname: Option<String>,
}

impl Default for SyslogEncoderConfig {
    fn default() -> Self {
        Self {
            format: SyslogFormat::default(),
            facility: DEFAULT_FACILITY,
            app_name: None,
            hostname: None,
        }
    }
}

/// Encoder for one target format.
///
/// Cheap to clone; clones share the scratch-buffer pool. Derived encoders
/// from [`Self::with_attrs`] and [`Self::with_group`] carry pre-rendered
/// attribute bytes and the group stack.
#[derive(Debug, Clone)]
pub struct SyslogEncoder {
    format: SyslogFormat,
    facility: u8,
    /// Pre-rendered ` host app[pid]: ` / ` host app pid ` header.
    header: String,
    /// MSGID used when no record attribute overrides it.
    msg_id: String,
    /// Attribute bytes rendered once by [`Self::with_attrs`].
    prerendered: Vec<Bytes>,
    groups: Vec<String>,
    pool: Arc<BufferPool>,
}

impl SyslogEncoder {
    pub fn new(config: SyslogEncoderConfig) -> Self {
        let facility = if config.facility > 23 {
            tracing::warn!(
                facility = config.facility,
                "out-of-range syslog facility, using local0"
            );
            DEFAULT_FACILITY
        } else {
            config.facility
        };
        let host = config
            .hostname
            .filter(|h| !h.is_empty())
            .unwrap_or_else(default_hostname);
        let app = config
            .app_name
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(default_app_name);
        let proc_id = std::process::id();
        let header = if config.format.is_rfc3164() {
            format!(" {host} {app}[{proc_id}]: ")
        } else {
            format!(" {host} {app} {proc_id} ")
        };
        Self {
            format: config.format,
            facility,
            header,
            msg_id: "-".to_string(),
            prerendered: Vec::new(),
            groups: Vec::new(),
            pool: Arc::new(BufferPool::default()),
        }
    }

    pub fn format(&self) -> SyslogFormat {
        self.format
    }

    pub fn facility(&self) -> u8 {
        self.facility
    }

    /// Encode one record into a fully framed wire message.
    pub fn encode(&self, record: &Record) -> Result<Bytes, EncodeError> {
        let mut buffer = self.pool.get();
        for group in &self.groups {
            buffer.push_group(group);
        }
        if self.format.is_rfc3164() {
            self.encode_rfc3164(&mut buffer, record);
        } else {
            self.encode_rfc5424(&mut buffer, record);
        }
        let framed = buffer.framed(self.format.implicit_framing());
        self.pool.put(buffer);
        framed
    }

    /// Derive an encoder with the given attributes rendered once up front.
    /// A reserved `"syslog"` attribute becomes the derived encoder's MSGID
    /// instead of being rendered.
    #[must_use]
    pub fn with_attrs(&self, attrs: &[Attr]) -> Self {
        if attrs.is_empty() {
            return self.clone();
        }
        let mut buffer = self.pool.get();
        for group in &self.groups {
            buffer.push_group(group);
        }
        let mut msg_id = None;
        for attr in attrs {
            if attr.key == SYSLOG_MSGID_KEY && !matches!(attr.value, Value::Group(_)) {
                msg_id = Some(attr.value.to_string());
            } else {
                self.append_attr(&mut buffer, attr);
            }
        }
        let rendered = Bytes::copy_from_slice(buffer.payload());
        self.pool.put(buffer);

        let mut encoder = self.clone();
        if !rendered.is_empty() {
            encoder.prerendered.push(rendered);
        }
        if let Some(id) = msg_id {
            encoder.msg_id = id;
        }
        encoder
    }

    /// Derive an encoder whose subsequent attributes render inside the
    /// named group.
    #[must_use]
    pub fn with_group(&self, name: &str) -> Self {
        if name.is_empty() {
            return self.clone();
        }
        let mut encoder = self.clone();
        encoder.groups.push(name.to_string());
        encoder
    }

    fn encode_rfc3164(&self, buffer: &mut MessageBuffer, record: &Record) {
        self.append_pri(buffer, record.level);
        let timestamp = record.timestamp.unwrap_or_else(Local::now);
        buffer.append_str(&timestamp.format("%b %e %H:%M:%S").to_string());
        buffer.append_str(&self.header);
        buffer.append_str(&record.message);
        for rendered in &self.prerendered {
            buffer.append_bytes(rendered);
        }
        for attr in &record.attrs {
            self.append_attr(buffer, attr);
        }
    }

    fn encode_rfc5424(&self, buffer: &mut MessageBuffer, record: &Record) {
        self.append_pri(buffer, record.level);
        buffer.append_str("1 ");
        let timestamp = record.timestamp.unwrap_or_else(Local::now);
        buffer.append_str(&timestamp.to_rfc3339_opts(SecondsFormat::Secs, true));
        buffer.append_str(&self.header);
        self.append_msg_id(buffer, record);
        // The structured-data block only materializes if an attribute
        // follows; otherwise it rolls back to the nil `-` field.
        buffer.append_conditional(SD_BLOCK_OPEN);
        for rendered in &self.prerendered {
            buffer.append_bytes(rendered);
        }
        for attr in &record.attrs {
            self.append_attr(buffer, attr);
        }
        buffer.complete_conditional("] ", " - ");
        buffer.append_str(&record.message);
    }

    fn append_pri(&self, buffer: &mut MessageBuffer, level: Level) {
        let pri = (u16::from(self.facility) << 3) | u16::from(severity_for(level));
        buffer.append_char('<');
        buffer.append_str(&pri.to_string());
        buffer.append_char('>');
    }

    fn append_msg_id(&self, buffer: &mut MessageBuffer, record: &Record) {
        let msg_id = record
            .attrs
            .iter()
            .find(|attr| attr.key == SYSLOG_MSGID_KEY && !matches!(attr.value, Value::Group(_)))
            .map(|attr| attr.value.to_string());
        match msg_id {
            Some(id) => buffer.append_str(&id),
            None => buffer.append_str(&self.msg_id),
        }
    }

    /// Render one attribute as ` path.key="value"`, flattening groups into
    /// the dot-joined key prefix. The reserved MSGID key is skipped.
    fn append_attr(&self, buffer: &mut MessageBuffer, attr: &Attr) {
        match &attr.value {
            Value::Group(members) => {
                if attr.key.is_empty() {
                    for member in members {
                        self.append_attr(buffer, member);
                    }
                } else {
                    buffer.push_group(&attr.key);
                    for member in members {
                        self.append_attr(buffer, member);
                    }
                    buffer.pop_group();
                }
            }
            value => {
                if attr.key == SYSLOG_MSGID_KEY {
                    return;
                }
                buffer.append_char(' ');
                buffer.append_group_path();
                buffer.append_str(&attr.key);
                buffer.append_char('=');
                buffer.append_str(&quoted(value));
            }
        }
    }
}

/// Map a level onto a syslog severity via ordered thresholds: the
/// dedicated notice level, then at-or-above error, at-or-below warn,
/// at-or-below info, and debug for the rest.
pub fn severity_for(level: Level) -> u8 {
    if level == Level::NOTICE {
        5
    } else if level >= Level::ERROR {
        3
    } else if level <= Level::WARN {
        4
    } else if level <= Level::INFO {
        6
    } else {
        7
    }
}

fn quoted(value: &Value) -> String {
    format!("{:?}", value.to_string())
}

fn default_hostname() -> String {
    hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().into_owned())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "-".to_string())
}

fn default_app_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
#[path = "encoder_test.rs"]
mod encoder_test;
