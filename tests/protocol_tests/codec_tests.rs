//! Codec Tests
//!
//! Tests for command encoding and reply decoding.

use kvlink::protocol::{
    bulk_reply, decode_bulk, decode_multi_bulk, decode_reply, decode_status, encode_inline,
    encode_multi_bulk, error_reply, frame_len, multi_bulk_reply, null_bulk_reply, status_reply,
    Command, Reply,
};
use kvlink::KvError;

// =============================================================================
// Command Encoding Tests
// =============================================================================

#[test]
fn test_encode_inline_ping() {
    assert_eq!(encode_inline("PING"), b"PING\r\n");
}

#[test]
fn test_encode_multi_bulk_get() {
    let encoded = encode_multi_bulk("GET", &[b"key"]);
    assert_eq!(encoded, b"*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n");
}

#[test]
fn test_encode_multi_bulk_counts_bytes_not_chars() {
    // "é" is two bytes in UTF-8
    let encoded = encode_multi_bulk("SET", &["k", "é"]);
    assert_eq!(encoded, "*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$2\r\né\r\n".as_bytes());
}

#[test]
fn test_encode_multi_bulk_value_with_whitespace_and_terminators() {
    let encoded = encode_multi_bulk("SET", &[&b"my key"[..], b"line1\r\nline2"]);
    assert_eq!(
        encoded,
        b"*3\r\n$3\r\nSET\r\n$6\r\nmy key\r\n$12\r\nline1\r\nline2\r\n"
    );
}

#[test]
fn test_mset_argument_count_doubles_pairs() {
    let cmd = Command::MSet {
        pairs: vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), b"2".to_vec()),
        ],
    };
    let encoded = cmd.encode();
    assert!(encoded.starts_with(b"*5\r\n$4\r\nMSET\r\n"));
    assert_eq!(
        encoded,
        b"*5\r\n$4\r\nMSET\r\n$1\r\na\r\n$1\r\n1\r\n$1\r\nb\r\n$1\r\n2\r\n"
    );
}

#[test]
fn test_mget_argument_count_is_keys_plus_one() {
    let cmd = Command::MGet {
        keys: vec![b"x".to_vec(), b"y".to_vec(), b"z".to_vec()],
    };
    assert!(cmd.encode().starts_with(b"*4\r\n$4\r\nMGET\r\n"));
}

#[test]
fn test_keys_command_encoding() {
    let cmd = Command::Keys {
        pattern: b"user.*".to_vec(),
    };
    assert_eq!(cmd.name(), "KEYS");
    assert_eq!(cmd.encode(), b"*2\r\n$4\r\nKEYS\r\n$6\r\nuser.*\r\n");
}

// =============================================================================
// Bulk Decoding Tests
// =============================================================================

#[test]
fn test_decode_bulk_roundtrip_awkward_values() {
    let values: Vec<Vec<u8>> = vec![
        b"hello".to_vec(),
        b"with spaces inside".to_vec(),
        b"line1\r\nline2\r\n".to_vec(),
        b"$3\r\nfake".to_vec(),
        vec![0x00, 0xFF, 0x0D, 0x0A, 0x80],
        Vec::new(),
    ];

    for value in values {
        let decoded = decode_bulk(&bulk_reply(&value)).unwrap();
        assert_eq!(decoded, Some(value));
    }
}

#[test]
fn test_decode_bulk_absent_vs_empty() {
    let absent = decode_bulk(b"$-1\r\n").unwrap();
    let empty = decode_bulk(b"$0\r\n\r\n").unwrap();

    assert_eq!(absent, None);
    assert_eq!(empty, Some(Vec::new()));
    assert_ne!(absent, empty);
    assert_eq!(decode_bulk(&null_bulk_reply()).unwrap(), None);
}

#[test]
fn test_decode_bulk_empty_input_is_absent() {
    assert_eq!(decode_bulk(b"").unwrap(), None);
}

#[test]
fn test_decode_bulk_discards_bytes_past_count() {
    assert_eq!(decode_bulk(b"$3\r\nabcdef").unwrap(), Some(b"abc".to_vec()));
    assert_eq!(decode_bulk(b"$3\r\nabc").unwrap(), Some(b"abc".to_vec()));
}

#[test]
fn test_decode_bulk_missing_prefix() {
    let err = decode_bulk(b"+OK\r\n").unwrap_err();
    assert!(matches!(err, KvError::Protocol(_)));
}

#[test]
fn test_decode_bulk_non_numeric_count() {
    let err = decode_bulk(b"$abc\r\nxyz\r\n").unwrap_err();
    assert!(matches!(err, KvError::Protocol(_)));
}

#[test]
fn test_decode_bulk_insufficient_body() {
    let err = decode_bulk(b"$10\r\nshort\r\n").unwrap_err();
    assert!(matches!(err, KvError::Protocol(_)));
}

#[test]
fn test_decode_bulk_error_reply_is_command_failure() {
    match decode_bulk(b"-WRONGTYPE Operation against a key\r\n") {
        Err(KvError::CommandFailed(msg)) => assert_eq!(msg, "WRONGTYPE Operation against a key"),
        other => panic!("Expected CommandFailed, got {:?}", other),
    }
}

// =============================================================================
// Multi-Bulk Decoding Tests
// =============================================================================

#[test]
fn test_decode_multi_bulk_empty() {
    assert!(decode_multi_bulk(b"*0\r\n").unwrap().is_empty());
    assert!(decode_multi_bulk(b"*-1\r\n").unwrap().is_empty());
    assert!(decode_multi_bulk(b"").unwrap().is_empty());
}

#[test]
fn test_decode_multi_bulk_ordered() {
    let items = decode_multi_bulk(b"*2\r\n$1\r\na\r\n$1\r\nb\r\n").unwrap();
    assert_eq!(items, vec![Some(b"a".to_vec()), Some(b"b".to_vec())]);
}

#[test]
fn test_decode_multi_bulk_skips_headers_keeps_values() {
    // A value that looks like a header must still come through as a value
    let reply = multi_bulk_reply(&[Some("$5"), Some("x")]);
    let items = decode_multi_bulk(&reply).unwrap();
    assert_eq!(items, vec![Some(b"$5".to_vec()), Some(b"x".to_vec())]);
}

#[test]
fn test_decode_multi_bulk_null_elements() {
    let items = decode_multi_bulk(b"*3\r\n$1\r\n1\r\n$-1\r\n$1\r\n3\r\n").unwrap();
    assert_eq!(items, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);
}

#[test]
fn test_decode_multi_bulk_values_with_terminators() {
    let reply = multi_bulk_reply(&[Some(&b"a\r\nb"[..]), Some(&b""[..]), None]);
    let items = decode_multi_bulk(&reply).unwrap();
    assert_eq!(items, vec![Some(b"a\r\nb".to_vec()), Some(Vec::new()), None]);
}

#[test]
fn test_decode_multi_bulk_truncated() {
    let err = decode_multi_bulk(b"*2\r\n$1\r\na\r\n").unwrap_err();
    assert!(matches!(err, KvError::Protocol(_)));
}

#[test]
fn test_decode_multi_bulk_wrong_type() {
    let err = decode_multi_bulk(b"$1\r\na\r\n").unwrap_err();
    assert!(matches!(err, KvError::Protocol(_)));

    let err = decode_multi_bulk(b"-ERR nope\r\n").unwrap_err();
    assert!(matches!(err, KvError::CommandFailed(_)));
}

// =============================================================================
// Status Decoding Tests
// =============================================================================

#[test]
fn test_decode_status_success() {
    assert_eq!(decode_status(b"+OK\r\n").unwrap(), "OK");
    assert_eq!(decode_status(b"+PONG\r\n").unwrap(), "PONG");
    assert_eq!(decode_status(&status_reply("PONG")).unwrap(), "PONG");
}

#[test]
fn test_decode_status_other_text_fails() {
    match decode_status(b"+ERR\r\n") {
        Err(KvError::CommandFailed(text)) => assert_eq!(text, "ERR"),
        other => panic!("Expected CommandFailed, got {:?}", other),
    }
    match decode_status(b"+QUEUED\r\n") {
        Err(KvError::CommandFailed(text)) => assert_eq!(text, "QUEUED"),
        other => panic!("Expected CommandFailed, got {:?}", other),
    }
}

#[test]
fn test_decode_status_error_reply() {
    let err = decode_status(&error_reply("ERR syntax error")).unwrap_err();
    assert!(matches!(err, KvError::CommandFailed(ref m) if m == "ERR syntax error"));
}

#[test]
fn test_decode_status_wrong_shape() {
    assert!(matches!(decode_status(b"$2\r\nOK\r\n"), Err(KvError::Protocol(_))));
    assert!(matches!(decode_status(b""), Err(KvError::Protocol(_))));
}

// =============================================================================
// Tagged Reply Tests
// =============================================================================

#[test]
fn test_decode_reply_dispatch() {
    assert_eq!(
        decode_reply(b"+OK\r\n").unwrap(),
        Reply::Status("OK".to_string())
    );
    assert_eq!(decode_reply(b"$-1\r\n").unwrap(), Reply::Bulk(None));
    assert_eq!(
        decode_reply(b"*1\r\n$1\r\nk\r\n").unwrap(),
        Reply::MultiBulk(vec![Some(b"k".to_vec())])
    );
    assert!(matches!(decode_reply(b"-ERR\r\n"), Err(KvError::CommandFailed(_))));
    assert!(matches!(decode_reply(b"?\r\n"), Err(KvError::Protocol(_))));
}

#[test]
fn test_reply_shape_mismatch() {
    let reply = Reply::Status("OK".to_string());
    assert_eq!(reply.kind(), "status");
    assert!(matches!(reply.into_bulk(), Err(KvError::Protocol(_))));

    let reply = Reply::Bulk(Some(b"v".to_vec()));
    assert_eq!(reply.clone().into_bulk().unwrap(), Some(b"v".to_vec()));
    assert!(matches!(reply.into_multi_bulk(), Err(KvError::Protocol(_))));
}

// =============================================================================
// Frame Detection Tests
// =============================================================================

#[test]
fn test_frame_len_every_prefix_is_incomplete() {
    let reply = multi_bulk_reply(&[Some("alpha"), None, Some("line\r\nbreak")]);
    for cut in 0..reply.len() {
        assert_eq!(frame_len(&reply[..cut]).unwrap(), None, "prefix of {} bytes", cut);
    }
    assert_eq!(frame_len(&reply).unwrap(), Some(reply.len()));
}

#[test]
fn test_frame_len_simple_shapes() {
    assert_eq!(frame_len(b"+PONG\r\n").unwrap(), Some(7));
    assert_eq!(frame_len(b"-ERR x\r\n").unwrap(), Some(8));
    assert_eq!(frame_len(b"$-1\r\n").unwrap(), Some(5));
    assert_eq!(frame_len(b"*0\r\n").unwrap(), Some(4));
}
