//! Entry points consumed by the reader: header/binary-mark sniffing,
//! `startxref` location, the xref-plus-trailer combinator, and indirect
//! object parsing. Lexical primitives live in `lexer`; the object grammar in
//! `objects`; cross-reference section/stream parsing in `xref`.

pub mod lexer;
mod objects;
mod xref;

use std::collections::HashSet;

use crate::error::Result;
use crate::object::{Object, ObjectId};
use crate::reader::Reader;

pub use lexer::ParserInput;

pub use objects::object;
pub use xref::{repair_by_scanning, xref_and_trailer};

/// Parse the `%PDF-M.N` header, returning `"M.N"`. `None` if the first
/// bytes don't match.
pub fn header(input: ParserInput) -> Option<String> {
    let buf: &[u8] = input.fragment();
    if !buf.starts_with(b"%PDF-") {
        return None;
    }
    let rest = &buf[5..];
    let end = rest.iter().position(|&b| b == b'\n' || b == b'\r').unwrap_or(rest.len());
    let line = std::str::from_utf8(&rest[..end]).ok()?.trim();
    let (major, minor) = line.split_once('.')?;
    if major.chars().all(|c| c.is_ascii_digit()) && minor.chars().all(|c| c.is_ascii_digit()) && !major.is_empty() && !minor.is_empty() {
        Some(format!("{major}.{minor}"))
    } else {
        None
    }
}

/// Recognize the conventional 4-byte high-bit "binary marker" comment some
/// producers place on the line after the header.
pub fn binary_mark(input: ParserInput) -> Option<Vec<u8>> {
    let buf: &[u8] = input.fragment();
    if buf.first() != Some(&b'%') {
        return None;
    }
    let rest = &buf[1..];
    let end = rest.iter().position(|&b| b == b'\n' || b == b'\r').unwrap_or(rest.len());
    let line = &rest[..end];
    if line.len() >= 4 { Some(line[..4].to_vec()) } else { None }
}

/// Parse the numeric byte offset following a `startxref` keyword.
pub fn xref_start(input: ParserInput) -> Option<i64> {
    let buf: &[u8] = input.fragment();
    let pos = lexer::find_keyword(buf, 0, b"startxref")?;
    let (pos, _) = lexer::skip_whitespace_and_comments(buf, pos + b"startxref".len());
    let (token, _) = lexer::read_numeric(buf, pos)?;
    match token {
        lexer::NumericToken::Integer(i) => Some(i),
        _ => None,
    }
}

/// Parse one indirect object (`N G obj ... endobj`) at `offset` in `buf`,
/// confirming against `expected_id` when given (relaxed mode tolerates a
/// mismatch; strict mode rejects it).
pub fn indirect_object(
    input: ParserInput, offset: usize, expected_id: Option<ObjectId>, reader: &Reader, already_seen: &mut HashSet<ObjectId>,
) -> Result<(ObjectId, Object)> {
    objects::indirect_object(input, offset, expected_id, reader, already_seen)
}

