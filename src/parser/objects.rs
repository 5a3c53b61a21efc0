//! The recursive object grammar: arrays, dictionaries, names, strings,
//! numbers (with reference lookahead), booleans, null, and stream bodies.

use std::collections::HashSet;

use log::warn;

use super::lexer::{self, NumericToken};
use super::ParserInput;
use crate::config::ValidationMode;
use crate::error::{Error, ParseError, Result};
use crate::object::{unescape_name, Dictionary, Object, ObjectId, StringFormat};
use crate::reader::Reader;

/// Parse one object starting at `buf[pos]`. Returns the object and the
/// index just past it. `reader` is consulted only when a stream's `Length`
/// is itself an indirect reference.
pub fn object(buf: &[u8], pos: usize, reader: &Reader, already_seen: &mut HashSet<ObjectId>) -> Result<(Object, usize)> {
    let (pos, _) = lexer::skip_whitespace_and_comments(buf, pos);
    if pos >= buf.len() {
        return Err(ParseError::UnterminatedArray.into());
    }

    match buf[pos] {
        b'/' => parse_name(buf, pos),
        b'(' => parse_literal_string(buf, pos),
        b'<' if buf.get(pos + 1) == Some(&b'<') => parse_dictionary_or_stream(buf, pos, reader, already_seen),
        b'<' => parse_hex_string(buf, pos),
        b'[' => parse_array(buf, pos, reader, already_seen),
        b't' if buf[pos..].starts_with(b"true") => Ok((Object::Boolean(true), pos + 4)),
        b'f' if buf[pos..].starts_with(b"false") => Ok((Object::Boolean(false), pos + 5)),
        b'n' if buf[pos..].starts_with(b"null") => Ok((Object::Null, pos + 4)),
        b'+' | b'-' | b'.' | b'0'..=b'9' => parse_numeric_or_reference(buf, pos),
        _ => Err(ParseError::InvalidIndirectObjectHeader.into()),
    }
}

fn parse_name(buf: &[u8], pos: usize) -> Result<(Object, usize)> {
    let start = pos + 1;
    let mut end = start;
    while end < buf.len() && lexer::is_regular(buf[end]) {
        end += 1;
    }
    let canon = unescape_name(&buf[start..end]).map_err(|_| ParseError::InvalidNameEscape)?;
    Ok((Object::Name(canon), end))
}

fn parse_literal_string(buf: &[u8], pos: usize) -> Result<(Object, usize)> {
    let end = lexer::scan_balanced_parens(buf, pos).ok_or(ParseError::UnbalancedParens)?;
    let raw = &buf[pos + 1..end - 1];
    let unescaped = unescape_literal_string(raw);
    Ok((Object::String(unescaped, StringFormat::Literal), end))
}

fn unescape_literal_string(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] != b'\\' {
            out.push(raw[i]);
            i += 1;
            continue;
        }
        i += 1;
        if i >= raw.len() {
            break;
        }
        match raw[i] {
            b'n' => {
                out.push(b'\n');
                i += 1;
            }
            b'r' => {
                out.push(b'\r');
                i += 1;
            }
            b't' => {
                out.push(b'\t');
                i += 1;
            }
            b'b' => {
                out.push(0x08);
                i += 1;
            }
            b'f' => {
                out.push(0x0C);
                i += 1;
            }
            b'(' | b')' | b'\\' => {
                out.push(raw[i]);
                i += 1;
            }
            b'\n' => {
                i += 1; // line-continuation escape
            }
            b'\r' => {
                i += 1;
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'0'..=b'7' => {
                let mut value = 0u32;
                let mut n = 0;
                while n < 3 && i < raw.len() && (b'0'..=b'7').contains(&raw[i]) {
                    value = value * 8 + (raw[i] - b'0') as u32;
                    i += 1;
                    n += 1;
                }
                out.push(value as u8);
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    out
}

fn parse_hex_string(buf: &[u8], pos: usize) -> Result<(Object, usize)> {
    let end = buf[pos..].iter().position(|&b| b == b'>').map(|p| pos + p).ok_or(ParseError::InvalidHexString)?;
    let digits = lexer::normalize_hex_string(&buf[pos + 1..end]).ok_or(ParseError::InvalidHexString)?;
    Ok((Object::String(lexer::hex_digits_to_bytes(&digits), StringFormat::Hexadecimal), end + 1))
}

fn parse_array(buf: &[u8], pos: usize, reader: &Reader, already_seen: &mut HashSet<ObjectId>) -> Result<(Object, usize)> {
    let mut items = Vec::new();
    let mut pos = pos + 1;
    loop {
        reader.document.cancellation.check()?;
        let (next, _) = lexer::skip_whitespace_and_comments(buf, pos);
        pos = next;
        if pos >= buf.len() {
            return Err(ParseError::UnterminatedArray.into());
        }
        if buf[pos] == b']' {
            pos += 1;
            break;
        }
        let (item, after) = object(buf, pos, reader, already_seen)?;
        items.push(item);
        pos = after;
    }
    Ok((Object::Array(items), pos))
}

fn parse_dictionary_or_stream(
    buf: &[u8], pos: usize, reader: &Reader, already_seen: &mut HashSet<ObjectId>,
) -> Result<(Object, usize)> {
    let (dict, after_dict) = parse_dictionary(buf, pos, reader, already_seen)?;
    let (next, _) = lexer::skip_whitespace_and_comments(buf, after_dict);
    if buf[next..].starts_with(b"stream") {
        parse_stream_body(buf, next, dict, reader)
    } else {
        Ok((Object::Dictionary(dict), after_dict))
    }
}

fn parse_dictionary(buf: &[u8], pos: usize, reader: &Reader, already_seen: &mut HashSet<ObjectId>) -> Result<(Dictionary, usize)> {
    let mut dict = Dictionary::new();
    let mut pos = pos + 2; // skip "<<"
    let strict = reader.document.config.validation_mode == ValidationMode::Strict;

    loop {
        reader.document.cancellation.check()?;
        let (next, _) = lexer::skip_whitespace_and_comments(buf, pos);
        pos = next;
        if buf[pos..].starts_with(b">>") {
            pos += 2;
            break;
        }
        if buf.get(pos) != Some(&b'/') {
            return Err(ParseError::NonNameDictionaryKey.into());
        }
        let (key_obj, after_key) = parse_name(buf, pos)?;
        let key = match key_obj {
            Object::Name(n) => n,
            _ => unreachable!(),
        };

        let (value_start, report) = lexer::skip_whitespace_and_comments(buf, after_key);
        // A value omitted before end-of-line (malformed) is tolerated in
        // relaxed mode by treating the entry as absent.
        if value_start < buf.len() && (buf[value_start] == b'/' || buf[value_start] == b'>') && report.crossed_eol && !strict {
            pos = value_start;
            continue;
        }

        let (value, after_value) = object(buf, value_start, reader, already_seen)?;
        pos = after_value;

        if dict.has(&key) {
            if strict {
                return Err(ParseError::DuplicateDictionaryKey.into());
            }
            // Relaxed: last definition wins, matching PDF's "later wins" rule elsewhere.
        }
        dict.set(key, value);
    }
    Ok((dict, pos))
}

fn parse_stream_body(buf: &[u8], stream_kw: usize, dict: Dictionary, reader: &Reader) -> Result<(Object, usize)> {
    let mut pos = stream_kw + b"stream".len();
    // Exactly CRLF or LF must follow per spec; a lone CR is tolerated.
    match (buf.get(pos), buf.get(pos + 1)) {
        (Some(b'\r'), Some(b'\n')) => pos += 2,
        (Some(b'\n'), _) => pos += 1,
        (Some(b'\r'), _) => pos += 1,
        _ => return Err(ParseError::InvalidStreamEol.into()),
    }
    let start = pos;

    let declared_length = dict.get(b"Length").ok().and_then(|obj| match obj {
        Object::Integer(i) => Some(*i),
        Object::Reference(id) => {
            let mut seen = HashSet::new();
            reader.get_object(*id, &mut seen).ok().and_then(|o| o.as_i64().ok())
        }
        _ => None,
    });

    let end = match declared_length {
        Some(len) if len >= 0 && start + len as usize <= buf.len() => {
            let candidate_end = start + len as usize;
            let (after_ws, _) = lexer::skip_whitespace_and_comments(buf, candidate_end);
            if buf[after_ws..].starts_with(b"endstream") {
                candidate_end
            } else {
                scan_for_endstream(buf, start)?
            }
        }
        _ => scan_for_endstream(buf, start)?,
    };

    let content = buf[start..end].to_vec();
    let (after_content, _) = lexer::skip_whitespace_and_comments(buf, end);
    let endstream_pos = lexer::find_keyword(buf, after_content, b"endstream").ok_or(ParseError::MissingEndstream)?;
    let after_endstream = endstream_pos + b"endstream".len();

    let mut stream = crate::object::Stream::new(dict, Vec::new());
    stream.content = content;
    stream.start_position = Some(start);
    Ok((Object::Stream(stream), after_endstream))
}

fn scan_for_endstream(buf: &[u8], start: usize) -> Result<usize> {
    let pos = lexer::find_keyword(buf, start, b"endstream").ok_or(ParseError::MissingEndstream)?;
    let mut end = pos;
    if end > start && buf[end - 1] == b'\n' {
        end -= 1;
    }
    if end > start && buf[end - 1] == b'\r' {
        end -= 1;
    }
    Ok(end)
}

/// A numeric lexeme may be the start of `N G R` (an indirect reference) or
/// `N G` with no trailing `R` (two plain integers); disambiguate with
/// lookahead, matching the boundary cases every PDF parser must special-case.
fn parse_numeric_or_reference(buf: &[u8], pos: usize) -> Result<(Object, usize)> {
    let (first, after_first) = lexer::read_numeric(buf, pos).ok_or(ParseError::InvalidIndirectObjectHeader)?;

    let (Some(n), true) = (as_u32(&first), matches!(first, NumericToken::Integer(_))) else {
        return Ok((numeric_to_object(first)?, after_first));
    };

    let (after_ws1, _) = lexer::skip_whitespace_and_comments(buf, after_first);
    let Some((second, after_second)) = lexer::read_numeric(buf, after_ws1) else {
        return Ok((numeric_to_object(first)?, after_first));
    };
    let Some(g) = as_u32(&second).filter(|_| matches!(second, NumericToken::Integer(_))) else {
        return Ok((numeric_to_object(first)?, after_first));
    };

    let (after_ws2, _) = lexer::skip_whitespace_and_comments(buf, after_second);
    if buf.get(after_ws2) == Some(&b'R') && buf.get(after_ws2 + 1).map_or(true, |&b| lexer::is_whitespace(b) || lexer::is_delimiter(b)) {
        return Ok((Object::Reference((n, g as u16)), after_ws2 + 1));
    }

    Ok((numeric_to_object(first)?, after_first))
}

fn as_u32(token: &NumericToken) -> Option<u32> {
    match token {
        NumericToken::Integer(i) if *i >= 0 => Some(*i as u32),
        _ => None,
    }
}

fn numeric_to_object(token: NumericToken) -> Result<Object> {
    match token {
        NumericToken::Integer(i) => Ok(Object::Integer(i)),
        NumericToken::Real(f) => Ok(Object::Real(f)),
        NumericToken::Overflow => Err(ParseError::NumericOverflow.into()),
    }
}

/// Parse `N G obj ... endobj` at `offset`, returning the object id found in
/// the buffer (which may differ from `expected_id` under a repair scan) and
/// the parsed object.
pub fn indirect_object(
    input: ParserInput, offset: usize, expected_id: Option<ObjectId>, reader: &Reader, already_seen: &mut HashSet<ObjectId>,
) -> Result<(ObjectId, Object)> {
    let buf: &[u8] = input.fragment();
    if offset > buf.len() {
        return Err(Error::InvalidOffset(offset));
    }
    let (pos, _) = lexer::skip_whitespace_and_comments(buf, offset);

    let (num_token, after_num) = lexer::read_numeric(buf, pos).ok_or(ParseError::InvalidIndirectObjectHeader)?;
    let num = match num_token {
        NumericToken::Integer(i) if i >= 0 => i as u32,
        _ => return Err(ParseError::InvalidIndirectObjectHeader.into()),
    };
    let (ws1, _) = lexer::skip_whitespace_and_comments(buf, after_num);
    let (gen_token, after_gen) = lexer::read_numeric(buf, ws1).ok_or(ParseError::InvalidIndirectObjectHeader)?;
    let gen = match gen_token {
        NumericToken::Integer(i) if i >= 0 => i as u16,
        _ => return Err(ParseError::InvalidIndirectObjectHeader.into()),
    };
    let (ws2, _) = lexer::skip_whitespace_and_comments(buf, after_gen);
    if !buf[ws2..].starts_with(b"obj") {
        return Err(ParseError::InvalidIndirectObjectHeader.into());
    }
    let id: ObjectId = (num, gen);

    if let Some(expected) = expected_id {
        let strict = reader.document.config.validation_mode == ValidationMode::Strict;
        if id != expected && strict {
            return Err(ParseError::InvalidIndirectReference { n: id.0, g: id.1 }.into());
        }
    }

    let body_start = ws2 + 3;
    let (value, after_value) = object(buf, body_start, reader, already_seen)?;
    let (after_ws, _) = lexer::skip_whitespace_and_comments(buf, after_value);
    let found_endobj = lexer::find_keyword(buf, after_ws.saturating_sub(1).max(after_value), b"endobj").is_some();
    if !found_endobj {
        let strict = reader.document.config.validation_mode == ValidationMode::Strict;
        if strict {
            return Err(ParseError::MissingEndobj.into());
        }
        warn!("missing 'endobj' after object {} {}", id.0, id.1);
    }
    Ok((id, value))
}
