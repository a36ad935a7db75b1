//! Reusable encode buffer and its pool.
//!
//! A [`MessageBuffer`] keeps a reserved prefix in front of the payload so
//! the octet-framing length header can be written without shifting the
//! serialized bytes. It also tracks the group path for attribute key
//! prefixes and supports a conditional append: text staged with
//! [`MessageBuffer::append_conditional`] only reaches the buffer if
//! something else is appended after it, which is how the RFC 5424
//! structured-data block commits or rolls back.
//!
//! [`BufferPool`] reuses buffers across records to keep the encode path
//! allocation-free in the steady state.

use bytes::{BufMut, Bytes, BytesMut};
use crossbeam::queue::ArrayQueue;

use crate::error::EncodeError;

/// Room reserved in front of the payload for the octet-framing header
/// (decimal length plus one space).
const PREFIX_RESERVE: usize = 16;

/// Initial capacity of a fresh buffer, prefix included.
const BUFFER_CAPACITY: usize = 1024 + PREFIX_RESERVE;

/// Buffers kept alive by the pool.
const POOL_SIZE: usize = 16;

/// Scratch buffer for building one framed message.
#[derive(Debug)]
pub struct MessageBuffer {
    buf: BytesMut,
    groups: GroupStack,
    conditional: Option<&'static str>,
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuffer {
    pub fn new() -> Self {
        let mut buf = BytesMut::with_capacity(BUFFER_CAPACITY);
        buf.resize(PREFIX_RESERVE, 0);
        Self {
            buf,
            groups: GroupStack::default(),
            conditional: None,
        }
    }

    /// Append a string, committing any staged conditional text first.
    pub fn append_str(&mut self, s: &str) {
        if !s.is_empty() {
            self.commit_conditional();
            self.buf.extend_from_slice(s.as_bytes());
        }
    }

    /// Append raw bytes, committing any staged conditional text first.
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        if !bytes.is_empty() {
            self.commit_conditional();
            self.buf.extend_from_slice(bytes);
        }
    }

    /// Append a single character, committing any staged conditional text
    /// first.
    pub fn append_char(&mut self, c: char) {
        self.commit_conditional();
        let mut encoded = [0u8; 4];
        self.buf
            .extend_from_slice(c.encode_utf8(&mut encoded).as_bytes());
    }

    /// Append the current dot-joined group path (empty outside any group).
    pub fn append_group_path(&mut self) {
        self.commit_conditional();
        if let Some(path) = self.groups.paths.last() {
            self.buf.extend_from_slice(path.as_bytes());
        }
    }

    /// Stage text that is only written if a later append occurs.
    pub fn append_conditional(&mut self, s: &'static str) {
        self.conditional = Some(s);
    }

    /// Close a staged conditional: appends `committed` if the staged text
    /// made it into the buffer, otherwise drops the staged text and
    /// appends `rolled_back`. Returns whether the conditional committed.
    pub fn complete_conditional(&mut self, committed: &str, rolled_back: &str) -> bool {
        let fired = self.conditional.is_none();
        if fired {
            self.append_str(committed);
        } else {
            self.conditional = None;
            self.append_str(rolled_back);
        }
        fired
    }

    fn commit_conditional(&mut self) {
        if let Some(staged) = self.conditional.take() {
            self.buf.extend_from_slice(staged.as_bytes());
        }
    }

    /// Enter a named group; subsequent [`Self::append_group_path`] calls
    /// include it.
    pub fn push_group(&mut self, name: &str) {
        self.groups.push(name);
    }

    /// Leave the innermost group.
    pub fn pop_group(&mut self) {
        self.groups.pop();
    }

    /// The serialized payload, without framing.
    pub fn payload(&self) -> &[u8] {
        &self.buf[PREFIX_RESERVE..]
    }

    /// Produce the framed wire bytes: implicit framing appends a trailing
    /// newline; octet framing prepends the exact payload byte count and a
    /// space, written into the reserved prefix.
    pub fn framed(&mut self, implicit: bool) -> Result<Bytes, EncodeError> {
        if implicit {
            self.buf.put_u8(b'\n');
            return Ok(Bytes::copy_from_slice(&self.buf[PREFIX_RESERVE..]));
        }
        let size = self.buf.len() - PREFIX_RESERVE;
        let header = size.to_string();
        if header.len() + 1 > PREFIX_RESERVE {
            return Err(EncodeError::MessageTooLarge { size });
        }
        let start = PREFIX_RESERVE - header.len() - 1;
        self.buf[start..PREFIX_RESERVE - 1].copy_from_slice(header.as_bytes());
        self.buf[PREFIX_RESERVE - 1] = b' ';
        Ok(Bytes::copy_from_slice(&self.buf[start..]))
    }

    /// Clear the payload and state for reuse.
    pub fn reset(&mut self) {
        self.buf.truncate(PREFIX_RESERVE);
        self.groups.clear();
        self.conditional = None;
    }
}

/// Stack of entered groups with their cached dot-joined paths.
#[derive(Debug, Default)]
struct GroupStack {
    paths: Vec<String>,
}

impl GroupStack {
    fn push(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        let path = match self.paths.last() {
            Some(parent) => format!("{parent}{name}."),
            None => format!("{name}."),
        };
        self.paths.push(path);
    }

    fn pop(&mut self) {
        self.paths.pop();
    }

    fn clear(&mut self) {
        self.paths.clear();
    }
}

/// Lock-free pool of reusable [`MessageBuffer`]s.
///
/// Pre-allocates at construction; when the pool is empty a fresh buffer is
/// allocated, and buffers returned to a full pool are dropped.
#[derive(Debug)]
pub struct BufferPool {
    queue: ArrayQueue<MessageBuffer>,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(POOL_SIZE)
    }
}

impl BufferPool {
    pub fn new(pool_size: usize) -> Self {
        let queue = ArrayQueue::new(pool_size.max(1));
        for _ in 0..queue.capacity() {
            let _ = queue.push(MessageBuffer::new());
        }
        Self { queue }
    }

    /// Get a buffer, allocating if the pool is empty.
    pub fn get(&self) -> MessageBuffer {
        self.queue.pop().unwrap_or_default()
    }

    /// Return a buffer to the pool; dropped if the pool is full.
    pub fn put(&self, mut buffer: MessageBuffer) {
        buffer.reset();
        let _ = self.queue.push(buffer);
    }

    /// Buffers currently available.
    pub fn available(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod buffer_test;
