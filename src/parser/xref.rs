//! Cross-reference section parsing: classical fixed-width tables and
//! cross-reference streams, plus the hybrid `XRefStm` case is handled by the
//! caller (it re-enters this module at a second offset).

use std::collections::HashSet;

use super::lexer::{self, NumericToken};
use super::ParserInput;
use crate::error::{ParseError, Result, XrefError};
use crate::object::{Dictionary, Object};
use crate::reader::Reader;
use crate::xref::{decode_stream_entry, Xref, XrefEntry, XrefStreamWidths};

/// Parse either a classical `xref` section followed by `trailer ...`, or (if
/// `xref` isn't found at the start) an xref stream object, returning the
/// merged table and trailer dictionary either way.
pub fn xref_and_trailer(input: ParserInput, reader: &Reader) -> Result<(Xref, Dictionary)> {
    let buf: &[u8] = input.fragment();
    let (pos, _) = lexer::skip_whitespace_and_comments(buf, 0);

    if buf[pos..].starts_with(b"xref") {
        parse_classical_section(buf, pos + 4, reader)
    } else {
        parse_xref_stream(input, reader)
    }
}

fn parse_classical_section(buf: &[u8], mut pos: usize, reader: &Reader) -> Result<(Xref, Dictionary)> {
    let mut xref = Xref::new(0);

    loop {
        let (next, _) = lexer::skip_whitespace_and_comments(buf, pos);
        pos = next;
        if buf[pos..].starts_with(b"trailer") {
            pos += "trailer".len();
            break;
        }
        let Some((NumericToken::Integer(start), after_start)) = lexer::read_numeric(buf, pos) else {
            return Err(XrefError::RepairFailed.into());
        };
        let (ws, _) = lexer::skip_whitespace_and_comments(buf, after_start);
        let Some((NumericToken::Integer(count), after_count)) = lexer::read_numeric(buf, ws) else {
            return Err(XrefError::RepairFailed.into());
        };
        let (mut entry_pos, _) = lexer::skip_whitespace_and_comments(buf, after_count);

        for i in 0..count {
            if entry_pos + 20 > buf.len() {
                return Err(XrefError::RepairFailed.into());
            }
            let row = &buf[entry_pos..entry_pos + 20];
            let object_number = (start + i) as u32;
            if let Some(entry) = parse_classical_row(row) {
                xref.entries.entry(object_number).or_insert(entry);
            }
            entry_pos += 20;
        }
        pos = entry_pos;
    }

    let (trailer_start, _) = lexer::skip_whitespace_and_comments(buf, pos);
    if !buf[trailer_start..].starts_with(b"<<") {
        return Err(XrefError::MissingSize.into());
    }
    let mut already_seen = HashSet::new();
    let (dict_obj, _) = super::objects::object(buf, trailer_start, reader, &mut already_seen)?;
    let dict = dict_obj.as_dict()?.clone();

    xref.size = dict.get(b"Size").and_then(Object::as_i64).map_err(|_| XrefError::MissingSize)? as u32;
    Ok((xref, dict))
}

fn parse_classical_row(row: &[u8]) -> Option<XrefEntry> {
    let offset: u32 = std::str::from_utf8(&row[0..10]).ok()?.parse().ok()?;
    let generation: u16 = std::str::from_utf8(&row[11..16]).ok()?.parse().ok()?;
    match row[17] {
        b'n' => Some(XrefEntry::Normal { offset, generation }),
        b'f' => Some(XrefEntry::Free { next: offset, generation }),
        _ => None,
    }
}

/// Rebuild an xref table and trailer by scanning the whole buffer for
/// `N G obj` headers, ignoring whatever the linked xref chain said. Used as
/// the last resort when `xref_and_trailer` (and any `Prev` it points at)
/// fails to parse.
pub fn repair_by_scanning(buf: &[u8], reader: &Reader) -> Result<(Xref, Dictionary)> {
    let mut found: std::collections::BTreeMap<u32, XrefEntry> = std::collections::BTreeMap::new();
    let mut pos = 0usize;
    while pos < buf.len() {
        if buf[pos].is_ascii_digit() {
            if let Some(entry) = scan_object_header_at(buf, pos) {
                let (object_number, generation, header_end) = entry;
                // Later occurrences (later incremental-update revisions) win.
                found.insert(object_number, XrefEntry::Normal { offset: pos as u32, generation });
                pos = header_end;
                continue;
            }
        }
        pos += 1;
    }

    if found.is_empty() {
        return Err(XrefError::RepairFailed.into());
    }

    let max_id = *found.keys().max().unwrap();
    let trailer = find_trailer_by_scanning(buf, reader, &found).unwrap_or_else(|| {
        let mut dict = Dictionary::new();
        dict.set(b"Size", Object::Integer(max_id as i64 + 1));
        dict
    });

    let mut xref = Xref::new(max_id + 1);
    xref.entries = found;
    Ok((xref, trailer))
}

/// Attempt to read `<digits> <digits> obj` starting at `pos`, validating that
/// the following non-whitespace byte could actually start a PDF object
/// (guards against the pattern matching inside a string or comment). Returns
/// `(object_number, generation, position just past "obj")`.
fn scan_object_header_at(buf: &[u8], pos: usize) -> Option<(u32, u16, usize)> {
    let (NumericToken::Integer(num), after_num) = lexer::read_numeric(buf, pos)? else { return None };
    if num < 0 {
        return None;
    }
    let (ws1, _) = lexer::skip_whitespace_and_comments(buf, after_num);
    let (NumericToken::Integer(gen), after_gen) = lexer::read_numeric(buf, ws1)? else { return None };
    if gen < 0 {
        return None;
    }
    let (ws2, _) = lexer::skip_whitespace_and_comments(buf, after_gen);
    if !buf[ws2..].starts_with(b"obj") {
        return None;
    }
    let after_obj = ws2 + 3;
    match buf.get(after_obj) {
        None => {}
        Some(&b) if lexer::is_whitespace(b) || lexer::is_delimiter(b) => {}
        _ => return None,
    }
    let (validation_pos, _) = lexer::skip_whitespace_and_comments(buf, after_obj);
    match buf.get(validation_pos) {
        None => {}
        Some(&b) if matches!(b, b'<' | b'[' | b'(' | b'/' | b't' | b'f' | b'n') || b.is_ascii_digit() || b == b'-' || b == b'+' => {}
        _ => return None,
    }
    Some((num as u32, gen as u16, after_obj))
}

/// Find the trailer dictionary by locating the last `trailer` keyword in the
/// file (the most recent revision's), falling back to a minimal trailer
/// built around whichever scanned object carries `/Type /Catalog`.
fn find_trailer_by_scanning(buf: &[u8], reader: &Reader, found: &std::collections::BTreeMap<u32, XrefEntry>) -> Option<Dictionary> {
    let mut last_trailer = None;
    let mut search_from = 0;
    while let Some(p) = lexer::find_keyword(buf, search_from, b"trailer") {
        last_trailer = Some(p);
        search_from = p + "trailer".len();
    }

    if let Some(trailer_pos) = last_trailer {
        let (dict_start, _) = lexer::skip_whitespace_and_comments(buf, trailer_pos + "trailer".len());
        let mut already_seen = HashSet::new();
        if let Ok((dict_obj, _)) = super::objects::object(buf, dict_start, reader, &mut already_seen) {
            if let Ok(dict) = dict_obj.as_dict() {
                return Some(dict.clone());
            }
        }
    }

    let max_id = *found.keys().max()?;
    for (&object_number, entry) in found.iter() {
        let XrefEntry::Normal { offset, generation } = *entry else { continue };
        let mut already_seen = HashSet::new();
        let Ok((_, obj)) = super::objects::indirect_object(
            ParserInput::new_extra(buf, ""),
            offset as usize,
            Some((object_number, generation)),
            reader,
            &mut already_seen,
        ) else {
            continue;
        };
        if let Ok(dict) = obj.as_dict() {
            if dict.has_type(b"Catalog") {
                let mut trailer = Dictionary::new();
                trailer.set(b"Root", Object::Reference((object_number, generation)));
                trailer.set(b"Size", Object::Integer(max_id as i64 + 1));
                return Some(trailer);
            }
        }
    }
    None
}

fn parse_xref_stream(input: ParserInput, reader: &Reader) -> Result<(Xref, Dictionary)> {
    let buf: &[u8] = input.fragment();
    let mut already_seen = HashSet::new();
    let (_, obj) = super::objects::indirect_object(input.clone(), 0, None, reader, &mut already_seen)
        .or_else(|_| {
            let (pos, _) = lexer::skip_whitespace_and_comments(buf, 0);
            super::objects::object(buf, pos, reader, &mut already_seen).map(|(o, _)| ((0, 0), o))
        })?;
    let stream = obj.as_stream()?;
    let dict = stream.dict.clone();

    let w = dict.get(b"W").map_err(|_| ParseError::InvalidXref)?.as_array()?.iter().map(|o| o.as_i64()).collect::<Result<Vec<_>>>()?;
    let widths = XrefStreamWidths::from_array(&w)?;
    let size = dict.get(b"Size").and_then(Object::as_i64).map_err(|_| XrefError::MissingSize)? as u32;

    let index: Vec<(u32, u32)> = match dict.get(b"Index") {
        Ok(Object::Array(arr)) => arr
            .chunks(2)
            .filter_map(|pair| match pair {
                [a, b] => Some((a.as_i64().ok()? as u32, b.as_i64().ok()? as u32)),
                _ => None,
            })
            .collect(),
        _ => vec![(0, size)],
    };

    let content = stream.decompressed_content()?;
    let mut xref = Xref::new(size);
    let entry_width = widths.entry_width();
    let mut offset = 0usize;
    for (start, count) in index {
        for i in 0..count {
            if offset + entry_width > content.len() {
                break;
            }
            let entry = decode_stream_entry(&content[offset..offset + entry_width], &widths);
            xref.entries.entry(start + i).or_insert(entry);
            offset += entry_width;
        }
    }

    Ok((xref, dict))
}
