//! Grammar-specific field extraction for reassembled frames.
//!
//! All parsers work on byte offsets into the raw frame and return `None` on
//! any failed expectation; the caller downgrades the whole frame to
//! [`SyslogMessage::Undecoded`]. Partial progress (including partially parsed
//! structured data) is discarded, never surfaced.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use crate::message::{
    Rfc3164Message, Rfc5424Message, SdElement, SdParam, SyslogMessage, UndecodedMessage,
};

/// PRI is at most `23 * 8 + 7`; larger values are malformed.
const PRI_MAX: u32 = 191;

/// Fixed width of the RFC 3164 `Mmm dd hh:mm:ss` stamp.
const STAMP_LEN: usize = 15;

/// Decode one reassembled frame, falling back to `Undecoded` on any
/// grammar mismatch. `off` is the offset of the expected `<` of the PRI
/// field (non-zero for octet-framed input, whose raw bytes keep the
/// length header).
pub(crate) fn decode_frame(raw: Vec<u8>, off: usize) -> SyslogMessage {
    match try_decode(&raw, off) {
        Some(decoded) => decoded.attach(raw),
        None => SyslogMessage::Undecoded(UndecodedMessage::new(raw)),
    }
}

/// Parsed fields awaiting their raw bytes.
enum Decoded {
    Rfc3164 {
        facility: u8,
        severity: u8,
        timestamp: NaiveDateTime,
        hostname: String,
        tag: String,
        content: String,
    },
    Rfc5424 {
        facility: u8,
        severity: u8,
        timestamp: DateTime<FixedOffset>,
        hostname: String,
        app_name: String,
        proc_id: String,
        msg_id: String,
        structured_data: Vec<SdElement>,
        message: String,
    },
}

impl Decoded {
    fn attach(self, raw: Vec<u8>) -> SyslogMessage {
        match self {
            Self::Rfc3164 {
                facility,
                severity,
                timestamp,
                hostname,
                tag,
                content,
            } => SyslogMessage::Rfc3164(Rfc3164Message {
                raw,
                facility,
                severity,
                timestamp,
                hostname,
                tag,
                content,
            }),
            Self::Rfc5424 {
                facility,
                severity,
                timestamp,
                hostname,
                app_name,
                proc_id,
                msg_id,
                structured_data,
                message,
            } => SyslogMessage::Rfc5424(Rfc5424Message {
                raw,
                facility,
                severity,
                version: 1,
                timestamp,
                hostname,
                app_name,
                proc_id,
                msg_id,
                structured_data,
                message,
            }),
        }
    }
}

fn try_decode(raw: &[u8], off: usize) -> Option<Decoded> {
    let off = expect_byte(raw, off, b'<')?;
    let (off, facility, severity) = pri(raw, off)?;
    let off = expect_byte(raw, off, b'>')?;
    // Grammar detection: a month initial selects RFC 3164, the version
    // byte `1` selects RFC 5424.
    match *raw.get(off)? {
        b'J' | b'F' | b'M' | b'A' | b'S' | b'O' | b'N' | b'D' => {
            rfc3164(raw, off, facility, severity)
        }
        b'1' => rfc5424(raw, off, facility, severity),
        _ => None,
    }
}

fn expect_byte(raw: &[u8], off: usize, expected: u8) -> Option<usize> {
    (raw.get(off) == Some(&expected)).then_some(off + 1)
}

/// Parse the digits of the PRI field. Returns the offset of the closing
/// `>` plus facility and severity.
fn pri(raw: &[u8], off: usize) -> Option<(usize, u8, u8)> {
    let mut end = off;
    let mut value: u32 = 0;
    while let Some(b) = raw.get(end) {
        if !b.is_ascii_digit() {
            break;
        }
        value = value * 10 + u32::from(b - b'0');
        if value > PRI_MAX {
            return None;
        }
        end += 1;
    }
    if end == off || end >= raw.len() {
        return None;
    }
    Some((end, (value >> 3) as u8, (value & 0x7) as u8))
}

/// Read a token terminated by space or newline. The terminator is not
/// consumed; running to the end of the frame yields the remainder.
fn token(raw: &[u8], off: usize) -> Option<(usize, String)> {
    if off >= raw.len() {
        return None;
    }
    let mut end = off;
    while end < raw.len() && raw[end] != b' ' && raw[end] != b'\n' {
        end += 1;
    }
    Some((end, lossy(&raw[off..end])))
}

/// Read the remainder of the frame up to (and consuming) the trailing
/// newline, or to the end of the frame for octet-framed input.
fn trailer(raw: &[u8], off: usize) -> (usize, String) {
    let rest = raw.get(off..).unwrap_or_default();
    match rest.iter().position(|&b| b == b'\n') {
        Some(pos) => (off + pos + 1, lossy(&rest[..pos])),
        None => (raw.len(), lossy(rest)),
    }
}

fn rfc3164(raw: &[u8], off: usize, facility: u8, severity: u8) -> Option<Decoded> {
    let (off, timestamp) = stamp(raw, off)?;
    let off = expect_byte(raw, off, b' ')?;
    let (off, hostname) = token(raw, off)?;
    let off = expect_byte(raw, off, b' ')?;
    let (off, tag) = token(raw, off)?;
    let off = expect_byte(raw, off, b' ')?;
    let (_, content) = trailer(raw, off);
    Some(Decoded::Rfc3164 {
        facility,
        severity,
        timestamp,
        hostname,
        tag,
        content,
    })
}

/// Parse the fixed-width `Mmm dd hh:mm:ss` stamp. The day of month is
/// space-padded; the missing year parses as 0.
fn stamp(raw: &[u8], off: usize) -> Option<(usize, NaiveDateTime)> {
    let end = off + STAMP_LEN;
    let bytes = raw.get(off..end)?;
    let month = month_number(&bytes[..3])?;
    if bytes[3] != b' ' || bytes[6] != b' ' {
        return None;
    }
    let day = padded_day(&bytes[4..6])?;
    let time = clock(&bytes[7..15])?;
    let date = NaiveDate::from_ymd_opt(0, month, day)?;
    Some((end, NaiveDateTime::new(date, time)))
}

const MONTHS: [&[u8; 3]; 12] = [
    b"Jan", b"Feb", b"Mar", b"Apr", b"May", b"Jun", b"Jul", b"Aug", b"Sep", b"Oct", b"Nov",
    b"Dec",
];

fn month_number(bytes: &[u8]) -> Option<u32> {
    MONTHS
        .iter()
        .position(|month| month.as_slice() == bytes)
        .map(|index| index as u32 + 1)
}

fn padded_day(bytes: &[u8]) -> Option<u32> {
    let tens = match bytes[0] {
        b' ' => 0,
        b @ b'0'..=b'9' => u32::from(b - b'0'),
        _ => return None,
    };
    if !bytes[1].is_ascii_digit() {
        return None;
    }
    Some(tens * 10 + u32::from(bytes[1] - b'0'))
}

fn clock(bytes: &[u8]) -> Option<NaiveTime> {
    if bytes[2] != b':' || bytes[5] != b':' {
        return None;
    }
    let hour = two_digits(&bytes[0..2])?;
    let minute = two_digits(&bytes[3..5])?;
    let second = two_digits(&bytes[6..8])?;
    NaiveTime::from_hms_opt(hour, minute, second)
}

fn two_digits(bytes: &[u8]) -> Option<u32> {
    if !bytes[0].is_ascii_digit() || !bytes[1].is_ascii_digit() {
        return None;
    }
    Some(u32::from(bytes[0] - b'0') * 10 + u32::from(bytes[1] - b'0'))
}

fn rfc5424(raw: &[u8], off: usize, facility: u8, severity: u8) -> Option<Decoded> {
    let off = expect_byte(raw, off, b'1')?;
    let off = expect_byte(raw, off, b' ')?;
    let (off, timestamp_text) = token(raw, off)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_text).ok()?;
    let off = expect_byte(raw, off, b' ')?;
    let (off, hostname) = token(raw, off)?;
    let off = expect_byte(raw, off, b' ')?;
    let (off, app_name) = token(raw, off)?;
    let off = expect_byte(raw, off, b' ')?;
    let (off, proc_id) = token(raw, off)?;
    let off = expect_byte(raw, off, b' ')?;
    let (off, msg_id) = token(raw, off)?;
    let off = expect_byte(raw, off, b' ')?;
    let (off, structured_data) = structured_data(raw, off)?;
    // The SP separating SD from MSG is absent when the message body is
    // empty and the frame ends at the SD field.
    let off = match raw.get(off) {
        Some(b' ') => off + 1,
        _ => off,
    };
    let (_, message) = trailer(raw, off);
    Some(Decoded::Rfc5424 {
        facility,
        severity,
        timestamp,
        hostname,
        app_name,
        proc_id,
        msg_id,
        structured_data,
        message,
    })
}

/// Parse the structured-data field: the literal `-`, or one or more
/// bracketed elements.
fn structured_data(raw: &[u8], off: usize) -> Option<(usize, Vec<SdElement>)> {
    if raw.get(off)? == &b'-' {
        return Some((off + 1, Vec::new()));
    }
    let mut elements = Vec::new();
    let mut off = off;
    loop {
        let (next, element) = sd_element(raw, off)?;
        elements.push(element);
        off = next;
        if raw.get(off) != Some(&b'[') {
            break;
        }
    }
    Some((off, elements))
}

fn sd_element(raw: &[u8], off: usize) -> Option<(usize, SdElement)> {
    let mut pos = expect_byte(raw, off, b'[')?;
    let id_start = pos;
    while pos < raw.len() && !matches!(raw[pos], b' ' | b']' | b'\n') {
        pos += 1;
    }
    if pos >= raw.len() {
        return None;
    }
    let id = lossy(&raw[id_start..pos]);
    let mut params = Vec::new();
    loop {
        match *raw.get(pos)? {
            b']' => {
                pos += 1;
                break;
            }
            b' ' => {
                let (next, param) = sd_param(raw, pos + 1)?;
                params.push(param);
                pos = next;
            }
            _ => return None,
        }
    }
    Some((pos, SdElement { id, params }))
}

fn sd_param(raw: &[u8], off: usize) -> Option<(usize, SdParam)> {
    let mut pos = off;
    while pos < raw.len() && raw[pos] != b'=' {
        pos += 1;
    }
    if pos >= raw.len() || pos == off {
        return None;
    }
    let key = lossy(&raw[off..pos]);
    let pos = expect_byte(raw, pos, b'=')?;
    let pos = expect_byte(raw, pos, b'"')?;
    let (pos, value) = sd_value(raw, pos)?;
    let pos = expect_byte(raw, pos, b'"')?;
    Some((pos, SdParam { key, value }))
}

/// Read a parameter value up to the closing quote, unescaping `\"` and
/// `\\` (a backslash escapes whatever byte follows it).
fn sd_value(raw: &[u8], off: usize) -> Option<(usize, String)> {
    let mut value = Vec::new();
    let mut escaped = false;
    let mut pos = off;
    loop {
        let b = *raw.get(pos)?;
        if escaped {
            escaped = false;
            value.push(b);
        } else {
            match b {
                b'"' => return Some((pos, lossy(&value))),
                b'\\' => escaped = true,
                _ => value.push(b),
            }
        }
        pos += 1;
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod parse_test;
