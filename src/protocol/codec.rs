//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Decoding contract
//! - Empty input decodes to "absent" (bulk) or an empty list (multi-bulk).
//! - A negative length prefix is the defined encoding of "absent".
//! - Anything else that does not match the expected shape is
//!   `KvError::Protocol`; `-<message>` replies are `KvError::CommandFailed`.

use crate::error::{KvError, Result};
use super::Reply;

/// Line terminator
pub const CRLF: &[u8; 2] = b"\r\n";

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode an argument-free command as `<COMMAND>\r\n`
pub fn encode_inline(command: &str) -> Vec<u8> {
    let mut message = Vec::with_capacity(command.len() + CRLF.len());
    message.extend_from_slice(command.as_bytes());
    message.extend_from_slice(CRLF);
    message
}

/// Encode a command and its arguments as a multi-bulk array
///
/// Format: `*<1 + args>\r\n` then `$<len>\r\n<bytes>\r\n` per element,
/// starting with the command name.
pub fn encode_multi_bulk<A: AsRef<[u8]>>(name: &str, args: &[A]) -> Vec<u8> {
    let payload_len: usize = args.iter().map(|a| a.as_ref().len() + 16).sum();
    let mut message = Vec::with_capacity(16 + name.len() + payload_len);

    push_header(&mut message, b'*', 1 + args.len() as i64);
    push_bulk(&mut message, name.as_bytes());
    for arg in args {
        push_bulk(&mut message, arg.as_ref());
    }

    message
}

// =============================================================================
// Reply Encoding
// =============================================================================

/// `+<text>\r\n`
pub fn status_reply(text: &str) -> Vec<u8> {
    let mut message = Vec::with_capacity(text.len() + 3);
    message.push(b'+');
    message.extend_from_slice(text.as_bytes());
    message.extend_from_slice(CRLF);
    message
}

/// `-<message>\r\n`
pub fn error_reply(text: &str) -> Vec<u8> {
    let mut message = Vec::with_capacity(text.len() + 3);
    message.push(b'-');
    message.extend_from_slice(text.as_bytes());
    message.extend_from_slice(CRLF);
    message
}

/// `$<len>\r\n<body>\r\n`
pub fn bulk_reply(body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(body.len() + 16);
    push_bulk(&mut message, body);
    message
}

/// `$-1\r\n`
pub fn null_bulk_reply() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

/// `*<count>\r\n` followed by one bulk (or null bulk) segment per item
pub fn multi_bulk_reply<V: AsRef<[u8]>>(items: &[Option<V>]) -> Vec<u8> {
    let mut message = Vec::new();
    push_header(&mut message, b'*', items.len() as i64);
    for item in items {
        match item {
            Some(body) => push_bulk(&mut message, body.as_ref()),
            None => message.extend_from_slice(b"$-1\r\n"),
        }
    }
    message
}

fn push_header(out: &mut Vec<u8>, prefix: u8, len: i64) {
    out.push(prefix);
    out.extend_from_slice(len.to_string().as_bytes());
    out.extend_from_slice(CRLF);
}

fn push_bulk(out: &mut Vec<u8>, body: &[u8]) {
    push_header(out, b'$', body.len() as i64);
    out.extend_from_slice(body);
    out.extend_from_slice(CRLF);
}

// =============================================================================
// Reply Decoding
// =============================================================================

/// Decode a bulk reply
///
/// Returns `None` for a negative length (key not found) and for empty input.
/// Only the first `len` bytes after the header are kept; the trailing
/// terminator is not required.
pub fn decode_bulk(raw: &[u8]) -> Result<Option<Vec<u8>>> {
    let Some(&first) = raw.first() else {
        return Ok(None);
    };
    match first {
        b'$' => {}
        b'-' => return Err(KvError::CommandFailed(line_text(&raw[1..]))),
        other => return Err(unexpected("bulk", other)),
    }

    let (header, body_start) =
        split_line(raw, 1).ok_or_else(|| KvError::protocol("bulk header: missing terminator"))?;
    let len = parse_len(header)?;
    if len < 0 {
        return Ok(None);
    }

    let len = len as usize;
    let available = raw.len() - body_start;
    if available < len {
        return Err(KvError::protocol(format!(
            "bulk body truncated: expected {} bytes, got {}",
            len, available
        )));
    }

    Ok(Some(raw[body_start..body_start + len].to_vec()))
}

/// Decode a multi-bulk reply
///
/// Each element is read as its `$<len>` header followed by exactly `len`
/// bytes, so element bodies may contain line terminators. Null elements
/// (`$-1`) become `None`. A count of zero or less is an empty list.
pub fn decode_multi_bulk(raw: &[u8]) -> Result<Vec<Option<Vec<u8>>>> {
    let Some(&first) = raw.first() else {
        return Ok(Vec::new());
    };
    match first {
        b'*' => {}
        b'-' => return Err(KvError::CommandFailed(line_text(&raw[1..]))),
        other => return Err(unexpected("multi-bulk", other)),
    }

    let (header, mut pos) = split_line(raw, 1)
        .ok_or_else(|| KvError::protocol("multi-bulk header: missing terminator"))?;
    let count = parse_len(header)?;
    if count <= 0 {
        return Ok(Vec::new());
    }

    let mut items = Vec::with_capacity(count.min(1024) as usize);
    for idx in 0..count {
        let (item, next) = decode_element(raw, pos).map_err(|e| match e {
            KvError::Protocol(msg) => {
                KvError::Protocol(format!("multi-bulk element {} of {}: {}", idx, count, msg))
            }
            other => other,
        })?;
        items.push(item);
        pos = next;
    }

    Ok(items)
}

/// Decode one element of a multi-bulk reply starting at `pos`
fn decode_element(raw: &[u8], pos: usize) -> Result<(Option<Vec<u8>>, usize)> {
    let Some(&kind) = raw.get(pos) else {
        return Err(KvError::protocol("missing element"));
    };
    let (line, next) =
        split_line(raw, pos + 1).ok_or_else(|| KvError::protocol("missing terminator"))?;

    match kind {
        b'$' => {
            let len = parse_len(line)?;
            if len < 0 {
                return Ok((None, next));
            }
            let end = next + len as usize;
            if raw.len() < end + CRLF.len() {
                return Err(KvError::protocol(format!(
                    "body truncated: expected {} bytes, got {}",
                    len,
                    raw.len().saturating_sub(next)
                )));
            }
            if &raw[end..end + CRLF.len()] != CRLF {
                return Err(KvError::protocol("body not followed by terminator"));
            }
            Ok((Some(raw[next..end].to_vec()), end + CRLF.len()))
        }
        // Some stores answer list elements with inline values
        b'+' | b':' => Ok((Some(line.to_vec()), next)),
        other => Err(unexpected("bulk element", other)),
    }
}

/// Decode a status reply
///
/// Succeeds only for the exact texts `OK` and `PONG`; any other status (or an
/// error reply) is a `CommandFailed`.
pub fn decode_status(raw: &[u8]) -> Result<String> {
    let Some(&first) = raw.first() else {
        return Err(KvError::protocol("empty reply"));
    };
    match first {
        b'+' => {
            let text = line_text(&raw[1..]);
            match text.as_str() {
                "OK" | "PONG" => Ok(text),
                _ => Err(KvError::CommandFailed(text)),
            }
        }
        b'-' => Err(KvError::CommandFailed(line_text(&raw[1..]))),
        other => Err(unexpected("status", other)),
    }
}

/// Decode any supported reply into its tagged form
pub fn decode_reply(raw: &[u8]) -> Result<Reply> {
    match raw.first() {
        None => Err(KvError::protocol("empty reply")),
        Some(b'+') => Ok(Reply::Status(line_text(&raw[1..]))),
        Some(b'-') => Err(KvError::CommandFailed(line_text(&raw[1..]))),
        Some(b'$') => decode_bulk(raw).map(Reply::Bulk),
        Some(b'*') => decode_multi_bulk(raw).map(Reply::MultiBulk),
        Some(&other) => Err(unexpected("reply", other)),
    }
}

// =============================================================================
// Frame Detection
// =============================================================================

/// Length of the first complete reply frame in `buf`
///
/// Returns `Ok(None)` while more bytes are needed and an error for bytes that
/// can never form a valid frame.
pub fn frame_len(buf: &[u8]) -> Result<Option<usize>> {
    scan_frame(buf, 0)
}

fn scan_frame(buf: &[u8], pos: usize) -> Result<Option<usize>> {
    let Some(&kind) = buf.get(pos) else {
        return Ok(None);
    };
    let Some((line, next)) = split_line(buf, pos + 1) else {
        return Ok(None);
    };

    match kind {
        b'*' => {
            let count = parse_len(line)?;
            let mut pos = next;
            for _ in 0..count.max(0) {
                match scan_element(buf, pos)? {
                    Some(end) => pos = end,
                    None => return Ok(None),
                }
            }
            Ok(Some(pos))
        }
        _ => scan_element(buf, pos),
    }
}

/// End offset of one non-aggregate value starting at `pos`
///
/// Multi-bulk elements are flat, so a `*` here is rejected.
fn scan_element(buf: &[u8], pos: usize) -> Result<Option<usize>> {
    let Some(&kind) = buf.get(pos) else {
        return Ok(None);
    };
    let Some((line, next)) = split_line(buf, pos + 1) else {
        return Ok(None);
    };

    match kind {
        b'+' | b'-' | b':' => Ok(Some(next)),
        b'$' => {
            let len = parse_len(line)?;
            if len < 0 {
                return Ok(Some(next));
            }
            let end = next + len as usize;
            if buf.len() < end + CRLF.len() {
                return Ok(None);
            }
            if &buf[end..end + CRLF.len()] != CRLF {
                return Err(KvError::protocol("bulk body not followed by terminator"));
            }
            Ok(Some(end + CRLF.len()))
        }
        b'*' => Err(KvError::protocol("nested multi-bulk replies are not supported")),
        other => Err(unexpected("reply", other)),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Split off the line starting at `from`, returning it and the offset just
/// past its terminator
fn split_line(buf: &[u8], from: usize) -> Option<(&[u8], usize)> {
    let rest = buf.get(from..)?;
    let idx = rest.windows(CRLF.len()).position(|w| w == CRLF)?;
    Some((&rest[..idx], from + idx + CRLF.len()))
}

/// Text of a single-line reply; a missing terminator is tolerated
fn line_text(rest: &[u8]) -> String {
    let line = match rest.windows(CRLF.len()).position(|w| w == CRLF) {
        Some(idx) => &rest[..idx],
        None => rest,
    };
    String::from_utf8_lossy(line).into_owned()
}

fn parse_len(data: &[u8]) -> Result<i64> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            KvError::protocol(format!(
                "invalid length prefix: {:?}",
                String::from_utf8_lossy(data)
            ))
        })
}

fn unexpected(expected: &str, byte: u8) -> KvError {
    KvError::protocol(format!(
        "expected {} reply, got type byte {:?}",
        expected, byte as char
    ))
}
