//! `ObjStm` pack/unpack: a stream whose decompressed content is a header of
//! `(object number, byte offset)` pairs followed by the concatenated object
//! bodies, letting many small objects share one compressed container.
//!
//! Objects inside a stream can never themselves be streams or carry an
//! indirect `Length` (ISO 32000-1 7.5.7), so unpacking needs none of the
//! reader context the top-level object grammar does; it gets its own small
//! recursive-descent parser built on the same lexical primitives.

use crate::error::{ParseError, Result};
use crate::object::{unescape_name, Dictionary, Object, ObjectMap, StringFormat};
use crate::parser::lexer::{self, NumericToken};

pub struct ObjectStream {
    pub objects: ObjectMap,
}

impl ObjectStream {
    pub fn new(stream: &mut crate::object::Stream) -> Result<Self> {
        let n = stream.dict.get(b"N").and_then(Object::as_i64)? as usize;
        let first = stream.dict.get(b"First").and_then(Object::as_i64)? as usize;
        let content = stream.decode_content()?.to_vec();

        let mut header_pos = 0usize;
        let mut pairs = Vec::with_capacity(n);
        for _ in 0..n {
            let (num_tok, after_num) = lexer::read_numeric(&content, header_pos).ok_or(ParseError::InvalidXref)?;
            let num = match num_tok {
                NumericToken::Integer(i) if i >= 0 => i as u32,
                _ => return Err(ParseError::InvalidXref.into()),
            };
            let (ws, _) = lexer::skip_whitespace_and_comments(&content, after_num);
            let (off_tok, after_off) = lexer::read_numeric(&content, ws).ok_or(ParseError::InvalidXref)?;
            let offset = match off_tok {
                NumericToken::Integer(i) if i >= 0 => i as usize,
                _ => return Err(ParseError::InvalidXref.into()),
            };
            pairs.push((num, offset));
            let (next, _) = lexer::skip_whitespace_and_comments(&content, after_off);
            header_pos = next;
        }

        let mut objects = ObjectMap::new();
        for (i, &(num, rel_offset)) in pairs.iter().enumerate() {
            let start = first + rel_offset;
            if start > content.len() {
                continue;
            }
            let end = pairs.get(i + 1).map(|&(_, next)| first + next).unwrap_or(content.len()).min(content.len());
            if start > end {
                continue;
            }
            let (value, _) = parse_value(&content, start)?;
            objects.insert((num, 0), value);
        }

        Ok(ObjectStream { objects })
    }
}

fn parse_value(buf: &[u8], pos: usize) -> Result<(Object, usize)> {
    let (pos, _) = lexer::skip_whitespace_and_comments(buf, pos);
    if pos >= buf.len() {
        return Err(ParseError::UnterminatedArray.into());
    }
    match buf[pos] {
        b'/' => parse_name(buf, pos),
        b'(' => parse_literal_string(buf, pos),
        b'<' if buf.get(pos + 1) == Some(&b'<') => parse_dictionary(buf, pos),
        b'<' => parse_hex_string(buf, pos),
        b'[' => parse_array(buf, pos),
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
    Ok((Object::String(buf[pos + 1..end - 1].to_vec(), StringFormat::Literal), end))
}

fn parse_hex_string(buf: &[u8], pos: usize) -> Result<(Object, usize)> {
    let end = buf[pos..].iter().position(|&b| b == b'>').map(|p| pos + p).ok_or(ParseError::InvalidHexString)?;
    let digits = lexer::normalize_hex_string(&buf[pos + 1..end]).ok_or(ParseError::InvalidHexString)?;
    Ok((Object::String(lexer::hex_digits_to_bytes(&digits), StringFormat::Hexadecimal), end + 1))
}

fn parse_array(buf: &[u8], pos: usize) -> Result<(Object, usize)> {
    let mut items = Vec::new();
    let mut pos = pos + 1;
    loop {
        let (next, _) = lexer::skip_whitespace_and_comments(buf, pos);
        pos = next;
        if pos >= buf.len() {
            return Err(ParseError::UnterminatedArray.into());
        }
        if buf[pos] == b']' {
            pos += 1;
            break;
        }
        let (item, after) = parse_value(buf, pos)?;
        items.push(item);
        pos = after;
    }
    Ok((Object::Array(items), pos))
}

fn parse_dictionary(buf: &[u8], pos: usize) -> Result<(Object, usize)> {
    let mut dict = Dictionary::new();
    let mut pos = pos + 2;
    loop {
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
        let (value_start, _) = lexer::skip_whitespace_and_comments(buf, after_key);
        let (value, after_value) = parse_value(buf, value_start)?;
        dict.set(key, value);
        pos = after_value;
    }
    Ok((Object::Dictionary(dict), pos))
}

fn parse_numeric_or_reference(buf: &[u8], pos: usize) -> Result<(Object, usize)> {
    let (first, after_first) = lexer::read_numeric(buf, pos).ok_or(ParseError::InvalidIndirectObjectHeader)?;
    let n = match first {
        NumericToken::Integer(i) if i >= 0 => i as u32,
        _ => return Ok((numeric_to_object(first)?, after_first)),
    };

    let (after_ws1, _) = lexer::skip_whitespace_and_comments(buf, after_first);
    let Some((second, after_second)) = lexer::read_numeric(buf, after_ws1) else {
        return Ok((numeric_to_object(first)?, after_first));
    };
    let g = match second {
        NumericToken::Integer(i) if i >= 0 => i as u16,
        _ => return Ok((numeric_to_object(first)?, after_first)),
    };

    let (after_ws2, _) = lexer::skip_whitespace_and_comments(buf, after_second);
    if buf.get(after_ws2) == Some(&b'R') && buf.get(after_ws2 + 1).map_or(true, |&b| lexer::is_whitespace(b) || lexer::is_delimiter(b)) {
        return Ok((Object::Reference((n, g)), after_ws2 + 1));
    }
    Ok((numeric_to_object(first)?, after_first))
}

fn numeric_to_object(token: NumericToken) -> Result<Object> {
    match token {
        NumericToken::Integer(i) => Ok(Object::Integer(i)),
        NumericToken::Real(f) => Ok(Object::Real(f)),
        NumericToken::Overflow => Err(ParseError::NumericOverflow.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{dictionary, Stream};

    #[test]
    fn unpacks_two_simple_objects() {
        let header = b"1 0 3 4 ";
        let mut payload = header.to_vec();
        payload.extend_from_slice(b"/Foo");
        payload.extend_from_slice(b"(baz)");

        let dict = dictionary! {
            b"N" => 2i64,
            b"First" => header.len() as i64,
        };
        let mut stream = Stream::new(dict, Vec::new());
        stream.set_content(payload);

        let unpacked = ObjectStream::new(&mut stream).unwrap();
        assert_eq!(unpacked.objects.get(&(1, 0)), Some(&Object::Name(b"Foo".to_vec())));
        assert!(matches!(unpacked.objects.get(&(3, 0)), Some(Object::String(s, _)) if s == b"baz"));
    }

    #[test]
    fn resolves_references_inside_compressed_dictionaries() {
        let header = b"5 0 ";
        let mut payload = header.to_vec();
        payload.extend_from_slice(b"<< /Parent 9 0 R >>");

        let dict = dictionary! {
            b"N" => 1i64,
            b"First" => header.len() as i64,
        };
        let mut stream = Stream::new(dict, Vec::new());
        stream.set_content(payload);

        let unpacked = ObjectStream::new(&mut stream).unwrap();
        let obj = unpacked.objects.get(&(5, 0)).unwrap();
        assert_eq!(obj.as_dict().unwrap().get(b"Parent").unwrap(), &Object::Reference((9, 0)));
    }
}
