//! Tests for the syslog encoder

use chrono::{Local, TimeZone};

use super::*;
use crate::decoder::SyslogDecoder;
use crate::message::SyslogMessage;
use crate::record::Record;

fn test_config(format: SyslogFormat) -> SyslogEncoderConfig {
    SyslogEncoderConfig {
        format,
        facility: 16,
        app_name: Some("su".into()),
        hostname: Some("mymachine".into()),
    }
}

fn test_record() -> Record {
    let time = Local.with_ymd_and_hms(2003, 10, 11, 22, 14, 15).unwrap();
    Record::new(Level::NOTICE, "'su root' failed for lonvick").with_timestamp(time)
}

fn decode_one(frame: &[u8]) -> SyslogMessage {
    let mut decoder = SyslogDecoder::new();
    decoder.feed(frame);
    let mut messages = decoder.decode();
    assert_eq!(messages.len(), 1, "expected exactly one message");
    messages.remove(0)
}

#[test]
fn test_severity_thresholds() {
    // Ordered thresholds: notice first, then the error/warn/info cascade
    assert_eq!(severity_for(Level::NOTICE), 5);
    assert_eq!(severity_for(Level::ERROR), 3);
    assert_eq!(severity_for(Level(10)), 3);
    assert_eq!(severity_for(Level::WARN), 4);
    assert_eq!(severity_for(Level::INFO), 4);
    assert_eq!(severity_for(Level::DEBUG), 4);
    // Levels strictly between warn and error fall through to debug
    assert_eq!(severity_for(Level(5)), 7);
}

#[test]
fn test_format_from_config() {
    assert_eq!(SyslogFormat::from_config(""), SyslogFormat::Rfc5424Octet);
    assert_eq!(SyslogFormat::from_config("rfc3164"), SyslogFormat::Rfc3164);
    assert_eq!(
        SyslogFormat::from_config("rfc3164+framing"),
        SyslogFormat::Rfc3164Octet
    );
    assert_eq!(SyslogFormat::from_config("rfc5424"), SyslogFormat::Rfc5424);
    assert_eq!(
        SyslogFormat::from_config("rfc5424+framing"),
        SyslogFormat::Rfc5424Octet
    );
    // Unrecognized values warn and fall back to the default
    assert_eq!(SyslogFormat::from_config("cef"), SyslogFormat::Rfc5424Octet);
}

#[test]
fn test_out_of_range_facility_uses_default() {
    let encoder = SyslogEncoder::new(SyslogEncoderConfig {
        facility: 99,
        ..test_config(SyslogFormat::Rfc3164)
    });
    assert_eq!(encoder.facility(), DEFAULT_FACILITY);

    let encoder = SyslogEncoder::new(SyslogEncoderConfig {
        facility: 23,
        ..test_config(SyslogFormat::Rfc3164)
    });
    assert_eq!(encoder.facility(), 23);
}

#[test]
fn test_rfc3164_wire_format() {
    let encoder = SyslogEncoder::new(test_config(SyslogFormat::Rfc3164));
    let frame = encoder.encode(&test_record()).unwrap();
    let expected = format!(
        "<133>Oct 11 22:14:15 mymachine su[{}]: 'su root' failed for lonvick\n",
        std::process::id()
    );
    assert_eq!(&frame[..], expected.as_bytes());
}

#[test]
fn test_rfc3164_octet_framing() {
    let encoder = SyslogEncoder::new(test_config(SyslogFormat::Rfc3164Octet));
    let frame = encoder.encode(&test_record()).unwrap();

    let space = frame.iter().position(|&b| b == b' ').unwrap();
    let declared: usize = std::str::from_utf8(&frame[..space])
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(frame.len() - space - 1, declared, "exact octet count");
    assert!(!frame.ends_with(b"\n"), "octet frames carry no newline");
}

#[test]
fn test_rfc5424_nil_structured_data_without_attrs() {
    let encoder = SyslogEncoder::new(test_config(SyslogFormat::Rfc5424));
    let frame = encoder.encode(&test_record()).unwrap();
    let text = std::str::from_utf8(&frame).unwrap();
    assert!(text.starts_with("<133>1 2003-10-11T22:14:15"));
    assert!(text.contains(" - 'su root' failed for lonvick\n"));
    assert!(!text.contains("[Attrs@1"));
}

#[test]
fn test_rfc5424_structured_data_with_attrs() {
    let encoder = SyslogEncoder::new(test_config(SyslogFormat::Rfc5424));
    let record = test_record()
        .with_attr(Attr::string("user", "lonvick"))
        .with_attr(Attr::int("tty", 8));
    let frame = encoder.encode(&record).unwrap();
    let text = std::str::from_utf8(&frame).unwrap();
    assert!(text.contains("[Attrs@1 user=\"lonvick\" tty=\"8\"] 'su root'"));
}

#[test]
fn test_rfc3164_attrs_render_as_tags() {
    let encoder = SyslogEncoder::new(test_config(SyslogFormat::Rfc3164));
    let record = test_record().with_attr(Attr::string("user", "lonvick"));
    let frame = encoder.encode(&record).unwrap();
    let text = std::str::from_utf8(&frame).unwrap();
    assert!(text.ends_with("'su root' failed for lonvick user=\"lonvick\"\n"));
}

#[test]
fn test_group_attrs_flatten_to_dotted_keys() {
    let encoder = SyslogEncoder::new(test_config(SyslogFormat::Rfc3164));
    let record = test_record().with_attr(Attr::group(
        "session",
        vec![
            Attr::string("user", "lonvick"),
            Attr::group("tty", vec![Attr::int("line", 8)]),
        ],
    ));
    let frame = encoder.encode(&record).unwrap();
    let text = std::str::from_utf8(&frame).unwrap();
    assert!(text.contains(" session.user=\"lonvick\""));
    assert!(text.contains(" session.tty.line=\"8\""));
}

#[test]
fn test_reserved_key_becomes_msg_id() {
    let encoder = SyslogEncoder::new(test_config(SyslogFormat::Rfc5424));
    let record = test_record().with_attr(Attr::string(SYSLOG_MSGID_KEY, "ID47"));
    let frame = encoder.encode(&record).unwrap();
    let text = std::str::from_utf8(&frame).unwrap();
    // Routed to the MSGID field, never duplicated as structured data
    assert!(text.contains(" ID47 "));
    assert!(!text.contains("[Attrs@1"));
    assert!(!text.contains("syslog=\"ID47\""));
}

#[test]
fn test_msg_id_defaults_to_nil() {
    let encoder = SyslogEncoder::new(test_config(SyslogFormat::Rfc5424));
    let frame = encoder.encode(&test_record()).unwrap();
    let SyslogMessage::Rfc5424(message) = decode_one(&frame) else {
        panic!("expected RFC 5424 message");
    };
    assert_eq!(message.msg_id, "-");
}

#[test]
fn test_with_attrs_prerenders_and_captures_msg_id() {
    let encoder = SyslogEncoder::new(test_config(SyslogFormat::Rfc5424));
    let derived = encoder.with_attrs(&[
        Attr::string(SYSLOG_MSGID_KEY, "ID47"),
        Attr::string("env", "prod"),
    ]);

    let frame = derived.encode(&test_record()).unwrap();
    let text = std::str::from_utf8(&frame).unwrap();
    assert!(text.contains(" ID47 "));
    assert!(text.contains("[Attrs@1 env=\"prod\"] "));

    // The base encoder is untouched
    let frame = encoder.encode(&test_record()).unwrap();
    let text = std::str::from_utf8(&frame).unwrap();
    assert!(!text.contains("env"));
    assert!(text.contains(" - "));
}

#[test]
fn test_with_group_prefixes_subsequent_attrs() {
    let encoder = SyslogEncoder::new(test_config(SyslogFormat::Rfc3164)).with_group("generate");
    let record = test_record().with_attr(Attr::int("count", 100));
    let frame = encoder.encode(&record).unwrap();
    let text = std::str::from_utf8(&frame).unwrap();
    assert!(text.contains(" generate.count=\"100\""));
}

#[test]
fn test_with_group_applies_to_with_attrs() {
    let encoder = SyslogEncoder::new(test_config(SyslogFormat::Rfc3164))
        .with_group("test")
        .with_attrs(&[Attr::string("name", "SyslogHandler")]);
    let frame = encoder.encode(&test_record()).unwrap();
    let text = std::str::from_utf8(&frame).unwrap();
    assert!(text.contains(" test.name=\"SyslogHandler\""));
}

#[test]
fn test_round_trip_rfc3164() {
    for format in [SyslogFormat::Rfc3164, SyslogFormat::Rfc3164Octet] {
        let encoder = SyslogEncoder::new(test_config(format));
        let frame = encoder.encode(&test_record()).unwrap();

        let SyslogMessage::Rfc3164(message) = decode_one(&frame) else {
            panic!("expected RFC 3164 message for {format:?}");
        };
        assert_eq!(message.facility, 16);
        assert_eq!(message.severity, 5);
        assert_eq!(message.hostname, "mymachine");
        assert_eq!(message.tag, format!("su[{}]:", std::process::id()));
        assert_eq!(message.content, "'su root' failed for lonvick");
    }
}

#[test]
fn test_round_trip_rfc5424() {
    let time = Local.with_ymd_and_hms(2003, 10, 11, 22, 14, 15).unwrap();
    for format in [SyslogFormat::Rfc5424, SyslogFormat::Rfc5424Octet] {
        let encoder = SyslogEncoder::new(test_config(format));
        let record = Record::new(Level::ERROR, "boom")
            .with_timestamp(time)
            .with_attr(Attr::string(SYSLOG_MSGID_KEY, "ID47"))
            .with_attr(Attr::string("user", "lonvick"));
        let frame = encoder.encode(&record).unwrap();

        let SyslogMessage::Rfc5424(message) = decode_one(&frame) else {
            panic!("expected RFC 5424 message for {format:?}");
        };
        assert_eq!(message.facility, 16);
        assert_eq!(message.severity, 3);
        assert_eq!(message.version, 1);
        assert_eq!(message.timestamp, time.fixed_offset());
        assert_eq!(message.hostname, "mymachine");
        assert_eq!(message.app_name, "su");
        assert_eq!(message.proc_id, std::process::id().to_string());
        assert_eq!(message.msg_id, "ID47");
        assert_eq!(message.structured_data.len(), 1);
        assert_eq!(message.structured_data[0].id, "Attrs@1");
        assert_eq!(message.structured_data[0].params.len(), 1);
        assert_eq!(message.structured_data[0].params[0].key, "user");
        assert_eq!(message.structured_data[0].params[0].value, "lonvick");
        assert_eq!(message.message, "boom");
    }
}

#[test]
fn test_round_trip_escaped_param_values() {
    let encoder = SyslogEncoder::new(test_config(SyslogFormat::Rfc5424Octet));
    let record = test_record().with_attr(Attr::string("quote", "a \"quoted\" \\ value"));
    let frame = encoder.encode(&record).unwrap();

    let SyslogMessage::Rfc5424(message) = decode_one(&frame) else {
        panic!("expected RFC 5424 message");
    };
    assert_eq!(
        message.structured_data[0].params[0].value,
        "a \"quoted\" \\ value"
    );
}

#[test]
fn test_encode_without_timestamp_uses_now() {
    let encoder = SyslogEncoder::new(test_config(SyslogFormat::Rfc5424));
    let before = Local::now().timestamp();
    let frame = encoder.encode(&Record::new(Level::INFO, "tick")).unwrap();
    let after = Local::now().timestamp();

    let SyslogMessage::Rfc5424(message) = decode_one(&frame) else {
        panic!("expected RFC 5424 message");
    };
    let encoded = message.timestamp.timestamp();
    assert!(encoded >= before && encoded <= after);
}

#[test]
fn test_encoder_is_reusable() {
    let encoder = SyslogEncoder::new(test_config(SyslogFormat::Rfc5424Octet));
    let first = encoder.encode(&test_record()).unwrap();
    let second = encoder.encode(&test_record()).unwrap();
    assert_eq!(first, second);
}
