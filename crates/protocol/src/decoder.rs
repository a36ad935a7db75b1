//! Streaming syslog decoder.
//!
//! Reconstructs discrete messages from an unbounded byte stream. Framing is
//! detected per message: a leading `<` selects implicit (newline-delimited)
//! framing, a leading digit selects RFC 6587 octet framing, and anything
//! else enters a resynchronization scan. Grammar mismatches degrade to
//! [`SyslogMessage::Undecoded`]; the decoder itself never fails.
//!
//! One decoder instance serves one connection or datagram socket. It is fed
//! incrementally and resets itself after each emitted message; the drive
//! loop stops as soon as an iteration makes no state progress, which is the
//! "more input needed" signal.

use bytes::{Buf, BytesMut};

use crate::message::{SyslogMessage, UndecodedMessage};
use crate::parse;

/// Upper bound for a declared octet count and for the resynchronization
/// discard buffer. Anything larger is forcibly emitted as undecoded so
/// adversarial input cannot grow memory without bound.
pub const DECODE_LIMIT: usize = 0x7fff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Framing,
    ImplicitFraming,
    ImplicitFramingMessage,
    OctetFramingHeader,
    OctetFraming,
    OctetFramingMessage,
    Unknown,
    UnknownMessage,
}

/// Streaming decoder for syslog messages.
///
/// Not safe for concurrent use; exactly one reader owns a decoder at a time.
#[derive(Debug)]
pub struct SyslogDecoder {
    /// Accumulation buffer of bytes not yet claimed by a frame.
    buffer: BytesMut,
    state: DecoderState,
    /// The frame being assembled, owned until emitted or discarded.
    decoding: Vec<u8>,
    /// Declared byte count while octet framing.
    octets: usize,
    /// Bytes still needed to complete the octet frame; persists across
    /// partial network reads.
    octets_remaining: usize,
}

impl Default for SyslogDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SyslogDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            state: DecoderState::Framing,
            decoding: Vec::new(),
            octets: 0,
            octets_remaining: 0,
        }
    }

    /// Add raw bytes to the decode buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet consumed by a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Revert to the initial state, discarding buffered partial data.
    ///
    /// Only needed for hard resynchronization, e.g. after a transport-level
    /// reset; normal operation resets internally after each message.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.decoding.clear();
        self.restart();
    }

    /// Decode every message fully extractable from the buffered bytes.
    ///
    /// Restartable: leftover bytes stay buffered and a later call continues
    /// from them. Returns an empty vector when no complete message is
    /// available yet.
    pub fn decode(&mut self) -> Vec<SyslogMessage> {
        let mut messages = Vec::new();
        while let Some(message) = self.decode_message() {
            messages.push(message);
        }
        messages
    }

    /// Decode a single message, or `None` when more input is needed.
    pub fn decode_message(&mut self) -> Option<SyslogMessage> {
        loop {
            let before = self.state;
            match self.state {
                DecoderState::Framing => self.select_framing(),
                DecoderState::ImplicitFraming => self.take_line(),
                DecoderState::ImplicitFramingMessage => return Some(self.emit_frame(0)),
                DecoderState::OctetFramingHeader => self.take_octet_header(),
                DecoderState::OctetFraming => self.take_octets(),
                DecoderState::OctetFramingMessage => return Some(self.emit_octet_frame()),
                DecoderState::Unknown => self.scan_unknown(),
                DecoderState::UnknownMessage => return Some(self.emit_unknown()),
            }
            if self.state == before {
                return None;
            }
        }
    }

    /// Peek the next byte without consuming it and pick the framing.
    fn select_framing(&mut self) {
        let Some(&next) = self.buffer.first() else {
            return;
        };
        self.decoding = Vec::new();
        self.octets = 0;
        self.octets_remaining = 0;
        self.state = match next {
            b'<' => DecoderState::ImplicitFraming,
            b'1'..=b'9' => DecoderState::OctetFramingHeader,
            _ => DecoderState::Unknown,
        };
    }

    /// Accumulate up to and including the next newline. Without a buffered
    /// newline the partial bytes move into the frame and decoding suspends.
    fn take_line(&mut self) {
        match self.buffer.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                self.decoding.extend_from_slice(&self.buffer[..=pos]);
                self.buffer.advance(pos + 1);
                self.state = DecoderState::ImplicitFramingMessage;
            }
            None => {
                self.decoding.extend_from_slice(&self.buffer);
                self.buffer.clear();
            }
        }
    }

    /// Accumulate decimal digits up to a single space; the value is the
    /// exact message byte length. Non-digits or a length beyond
    /// [`DECODE_LIMIT`] force resynchronization.
    fn take_octet_header(&mut self) {
        while let Some(&b) = self.buffer.first() {
            self.buffer.advance(1);
            self.decoding.push(b);
            match b {
                b' ' => {
                    self.octets_remaining = self.octets;
                    self.state = DecoderState::OctetFraming;
                    return;
                }
                b'0'..=b'9' => {
                    self.octets = self.octets * 10 + usize::from(b - b'0');
                }
                _ => {
                    self.state = DecoderState::Unknown;
                    return;
                }
            }
            if self.octets > DECODE_LIMIT {
                self.state = DecoderState::Unknown;
                return;
            }
        }
    }

    /// Consume exactly the declared number of payload bytes.
    fn take_octets(&mut self) {
        let take = self.octets_remaining.min(self.buffer.len());
        self.decoding.extend_from_slice(&self.buffer[..take]);
        self.buffer.advance(take);
        self.octets_remaining -= take;
        if self.octets_remaining == 0 {
            self.state = DecoderState::OctetFramingMessage;
        }
    }

    /// Scan forward for a plausible frame start, accumulating everything
    /// else into the discard buffer. `<` and a non-zero digit are left
    /// unconsumed for framing detection to re-examine.
    fn scan_unknown(&mut self) {
        while let Some(&b) = self.buffer.first() {
            if matches!(b, b'<' | b'1'..=b'9') {
                self.state = DecoderState::Framing;
                return;
            }
            self.buffer.advance(1);
            self.decoding.push(b);
            if self.decoding.len() > DECODE_LIMIT {
                self.state = DecoderState::UnknownMessage;
                return;
            }
        }
    }

    fn emit_frame(&mut self, off: usize) -> SyslogMessage {
        let raw = std::mem::take(&mut self.decoding);
        self.restart();
        parse::decode_frame(raw, off)
    }

    fn emit_octet_frame(&mut self) -> SyslogMessage {
        // The frame keeps its length header; the grammar starts after it.
        let off = self.decoding.len().saturating_sub(self.octets);
        if off < 2 {
            return self.emit_unknown();
        }
        self.emit_frame(off)
    }

    fn emit_unknown(&mut self) -> SyslogMessage {
        let raw = std::mem::take(&mut self.decoding);
        self.restart();
        SyslogMessage::Undecoded(UndecodedMessage::new(raw))
    }

    fn restart(&mut self) {
        self.state = DecoderState::Framing;
        self.octets = 0;
        self.octets_remaining = 0;
    }
}

#[cfg(test)]
#[path = "decoder_test.rs"]
mod decoder_test;
