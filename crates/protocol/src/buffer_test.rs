//! Tests for the encode buffer and pool

use super::*;

#[test]
fn test_append_and_payload() {
    let mut buffer = MessageBuffer::new();
    buffer.append_str("<34>");
    buffer.append_char('x');
    buffer.append_bytes(b"yz");
    assert_eq!(buffer.payload(), b"<34>xyz");
}

#[test]
fn test_framed_implicit_appends_newline() {
    let mut buffer = MessageBuffer::new();
    buffer.append_str("hello");
    let framed = buffer.framed(true).unwrap();
    assert_eq!(&framed[..], b"hello\n");
}

#[test]
fn test_framed_octet_prefixes_exact_length() {
    let mut buffer = MessageBuffer::new();
    buffer.append_str("hello world");
    let framed = buffer.framed(false).unwrap();
    assert_eq!(&framed[..], b"11 hello world");
}

#[test]
fn test_framed_octet_counts_serialized_bytes() {
    let mut buffer = MessageBuffer::new();
    let payload = "x".repeat(4321);
    buffer.append_str(&payload);
    let framed = buffer.framed(false).unwrap();
    let space = framed.iter().position(|&b| b == b' ').unwrap();
    let declared: usize = std::str::from_utf8(&framed[..space])
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(declared, payload.len());
    assert_eq!(framed.len() - space - 1, declared);
}

#[test]
fn test_conditional_rolls_back_when_nothing_follows() {
    let mut buffer = MessageBuffer::new();
    buffer.append_str("head");
    buffer.append_conditional(" [Attrs@1");
    let fired = buffer.complete_conditional("] ", " - ");
    assert!(!fired);
    assert_eq!(buffer.payload(), b"head - ");
}

#[test]
fn test_conditional_commits_when_appended_after() {
    let mut buffer = MessageBuffer::new();
    buffer.append_str("head");
    buffer.append_conditional(" [Attrs@1");
    buffer.append_str(" k=\"v\"");
    let fired = buffer.complete_conditional("] ", " - ");
    assert!(fired);
    assert_eq!(buffer.payload(), b"head [Attrs@1 k=\"v\"] ");
}

#[test]
fn test_empty_appends_do_not_commit_conditional() {
    let mut buffer = MessageBuffer::new();
    buffer.append_conditional(" [Attrs@1");
    buffer.append_str("");
    buffer.append_bytes(b"");
    assert!(!buffer.complete_conditional("] ", " - "));
    assert_eq!(buffer.payload(), b" - ");
}

#[test]
fn test_group_path_nesting() {
    let mut buffer = MessageBuffer::new();
    buffer.append_group_path();
    assert_eq!(buffer.payload(), b"");

    buffer.push_group("outer");
    buffer.append_group_path();
    buffer.push_group("inner");
    buffer.append_group_path();
    buffer.pop_group();
    buffer.append_group_path();
    assert_eq!(buffer.payload(), b"outer.outer.inner.outer.");
}

#[test]
fn test_empty_group_name_is_ignored() {
    let mut buffer = MessageBuffer::new();
    buffer.push_group("");
    buffer.append_group_path();
    assert_eq!(buffer.payload(), b"");
}

#[test]
fn test_reset_clears_state() {
    let mut buffer = MessageBuffer::new();
    buffer.append_str("data");
    buffer.push_group("g");
    buffer.append_conditional("staged");
    buffer.reset();

    assert_eq!(buffer.payload(), b"");
    buffer.append_group_path();
    assert_eq!(buffer.payload(), b"");
    // The staged conditional was dropped with the rest of the state
    buffer.append_conditional("staged again");
    assert!(!buffer.complete_conditional("yes", "no"));
    assert_eq!(buffer.payload(), b"no");
}

#[test]
fn test_pool_reuses_buffers() {
    let pool = BufferPool::new(2);
    assert_eq!(pool.available(), 2);

    let mut buffer = pool.get();
    assert_eq!(pool.available(), 1);
    buffer.append_str("scratch");
    pool.put(buffer);
    assert_eq!(pool.available(), 2);

    // Returned buffers come back clean
    let buffer = pool.get();
    assert_eq!(buffer.payload(), b"");
    pool.put(buffer);
}

#[test]
fn test_pool_allocates_when_empty() {
    let pool = BufferPool::new(1);
    let first = pool.get();
    let second = pool.get();
    assert_eq!(pool.available(), 0);

    // Returning both: one refills the pool, the other is dropped
    pool.put(first);
    pool.put(second);
    assert_eq!(pool.available(), 1);
}
