//! Byte-level serialization of the object model: the inverse of
//! `parser::objects`. Produces the same concrete syntax the parser accepts
//! (not necessarily byte-identical to what was read).

use crate::config::Eol;
use crate::object::{escape_name, Dictionary, Object, StringFormat};

pub fn write_object(out: &mut Vec<u8>, obj: &Object, eol: Eol) {
    match obj {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => {
            let mut buf = itoa::Buffer::new();
            out.extend_from_slice(buf.format(*i).as_bytes());
        }
        Object::Real(f) => out.extend_from_slice(format_real(*f).as_bytes()),
        Object::Name(name) => {
            out.push(b'/');
            out.extend_from_slice(&escape_name(name));
        }
        Object::String(bytes, format) => write_string(out, bytes, *format),
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object(out, item, eol);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => write_dictionary(out, dict, eol),
        Object::Stream(stream) => {
            write_dictionary(out, &stream.dict, eol);
            out.extend_from_slice(eol.as_bytes());
            out.extend_from_slice(b"stream");
            out.extend_from_slice(eol.as_bytes());
            out.extend_from_slice(&stream.content);
            if stream.content.last() != Some(&b'\n') && stream.content.last() != Some(&b'\r') {
                out.extend_from_slice(eol.as_bytes());
            }
            out.extend_from_slice(b"endstream");
        }
        Object::Reference((num, gen)) => {
            out.extend_from_slice(format!("{num} {gen} R").as_bytes());
        }
    }
}

fn write_dictionary(out: &mut Vec<u8>, dict: &Dictionary, eol: Eol) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        out.push(b'/');
        out.extend_from_slice(&escape_name(key));
        out.push(b' ');
        write_object(out, value, eol);
    }
    out.extend_from_slice(b">>");
}

fn write_string(out: &mut Vec<u8>, bytes: &[u8], format: StringFormat) {
    match format {
        StringFormat::Literal => {
            out.push(b'(');
            for &b in bytes {
                match b {
                    b'(' | b')' | b'\\' => {
                        out.push(b'\\');
                        out.push(b);
                    }
                    b'\n' => out.extend_from_slice(b"\\n"),
                    b'\r' => out.extend_from_slice(b"\\r"),
                    _ => out.push(b),
                }
            }
            out.push(b')');
        }
        StringFormat::Hexadecimal => {
            out.push(b'<');
            for &b in bytes {
                out.extend_from_slice(format!("{b:02X}").as_bytes());
            }
            out.push(b'>');
        }
    }
}

fn format_real(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.0}")
    } else {
        let s = format!("{f:.6}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

pub fn write_indirect_object(out: &mut Vec<u8>, num: u32, gen: u16, obj: &Object, eol: Eol) {
    out.extend_from_slice(format!("{num} {gen} obj").as_bytes());
    out.extend_from_slice(eol.as_bytes());
    write_object(out, obj, eol);
    out.extend_from_slice(eol.as_bytes());
    out.extend_from_slice(b"endobj");
    out.extend_from_slice(eol.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;

    #[test]
    fn writes_name_with_escape() {
        let mut out = Vec::new();
        write_object(&mut out, &Object::Name(b"A B".to_vec()), Eol::CrLf);
        assert_eq!(out, b"/A#20B");
    }

    #[test]
    fn writes_literal_string_escaping_parens() {
        let mut out = Vec::new();
        write_object(&mut out, &Object::string_literal(b"a(b)c".to_vec()), Eol::CrLf);
        assert_eq!(out, b"(a\\(b\\)c)");
    }

    #[test]
    fn writes_dictionary_in_insertion_order() {
        let dict = dictionary! { b"Type" => "Catalog", b"Count" => Object::Integer(3) };
        let mut out = Vec::new();
        write_object(&mut out, &Object::Dictionary(dict), Eol::CrLf);
        assert_eq!(out, b"<</Type /Catalog/Count 3>>");
    }
}
