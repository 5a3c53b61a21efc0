//! Low-level tokenization: whitespace/comment skipping, the
//! balanced-parenthesis string scan, keyword detection that is aware of
//! string-literal and comment spans, and hex-string normalization.

use nom_locate::LocatedSpan;

pub type ParserInput<'a> = LocatedSpan<&'a [u8], &'static str>;

pub fn input<'a>(buf: &'a [u8], ctx: &'static str) -> ParserInput<'a> {
    LocatedSpan::new_extra(buf, ctx)
}

pub fn is_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

pub fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

pub fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Report from a relaxed-mode whitespace/comment skip: whether a line
/// terminator was crossed — needed to recover dictionary values
/// omitted before EOL).
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipReport {
    pub crossed_eol: bool,
}

/// Skip a run of whitespace and `%`-comments starting at `buf[pos..]`,
/// returning the new position and (for relaxed mode) whether an EOL was seen.
pub fn skip_whitespace_and_comments(buf: &[u8], mut pos: usize) -> (usize, SkipReport) {
    let mut report = SkipReport::default();
    loop {
        while pos < buf.len() && is_whitespace(buf[pos]) {
            if buf[pos] == b'\n' || buf[pos] == b'\r' {
                report.crossed_eol = true;
            }
            pos += 1;
        }
        if pos < buf.len() && buf[pos] == b'%' {
            while pos < buf.len() && buf[pos] != b'\n' && buf[pos] != b'\r' {
                pos += 1;
            }
            continue;
        }
        break;
    }
    (pos, report)
}

/// Scan a balanced-parenthesis string literal starting just after the
/// opening `(` at `buf[pos]`. Returns the index one past the matching `)`,
/// or `None` if the parens never balance. Handles `\`-escapes and ignores
/// `%` (PDF string literals have no comment syntax, but nested `(`/`)` are
/// tracked so an unescaped `%` inside one never confuses an *enclosing*
/// scan that is looking for `endobj`/`stream`).
pub fn scan_balanced_parens(buf: &[u8], start: usize) -> Option<usize> {
    debug_assert_eq!(buf.get(start), Some(&b'('));
    let mut depth = 1i32;
    let mut i = start + 1;
    let mut escaped = false;
    while i < buf.len() {
        let b = buf[i];
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b'(' {
            depth += 1;
        } else if b == b')' {
            depth -= 1;
            if depth == 0 {
                return Some(i + 1);
            }
        }
        i += 1;
    }
    None
}

/// Returns `true` if `buf[pos..]` starts with `keyword` immediately followed
/// by whitespace, a delimiter, or end of buffer.
fn keyword_at(buf: &[u8], pos: usize, keyword: &[u8]) -> bool {
    if pos + keyword.len() > buf.len() || &buf[pos..pos + keyword.len()] != keyword {
        return false;
    }
    match buf.get(pos + keyword.len()) {
        None => true,
        Some(&b) => is_whitespace(b) || is_delimiter(b),
    }
}

/// Find the earliest occurrence of `keyword` at or after `from`, skipping
/// over string-literal spans (so an unbalanced paren or the keyword's bytes
/// appearing *inside* a string never match) and `%`-comment spans.
///
/// This backs both the `stream`/`endobj` keyword search in the object parser
/// and the `N G obj` repair scan in the cross-reference engine.
pub fn find_keyword(buf: &[u8], from: usize, keyword: &[u8]) -> Option<usize> {
    let mut pos = from;
    while pos < buf.len() {
        match buf[pos] {
            b'%' => {
                while pos < buf.len() && buf[pos] != b'\n' && buf[pos] != b'\r' {
                    pos += 1;
                }
            }
            b'(' => {
                pos = scan_balanced_parens(buf, pos).unwrap_or(buf.len());
            }
            _ => {
                if keyword_at(buf, pos, keyword) {
                    return Some(pos);
                }
                pos += 1;
            }
        }
    }
    None
}

/// Normalize a hex string's interior bytes: drop whitespace, uppercase,
/// right-pad an odd-length result with `0`. Returns `None` on a non-hex byte.
pub fn normalize_hex_string(raw: &[u8]) -> Option<Vec<u8>> {
    let mut digits = Vec::with_capacity(raw.len());
    for &b in raw {
        if is_whitespace(b) {
            continue;
        }
        if !b.is_ascii_hexdigit() {
            return None;
        }
        digits.push(b.to_ascii_uppercase());
    }
    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }
    Some(digits)
}

/// Decode a normalized (even-length, uppercase hex) digit run into bytes.
pub fn hex_digits_to_bytes(digits: &[u8]) -> Vec<u8> {
    digits
        .chunks_exact(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16).unwrap_or(0);
            let lo = (pair[1] as char).to_digit(16).unwrap_or(0);
            ((hi << 4) | lo) as u8
        })
        .collect()
}

/// A single numeric lexeme as lexed, before Integer/Real disambiguation.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericToken {
    Integer(i64),
    Real(f64),
    /// Literal could not fit in the target type; soft error, value is 0.
    Overflow,
}

/// Read one numeric lexeme starting at `buf[pos]`. Returns the token and the
/// index just past it.
///
/// The lexeme is the greedy run of `[0-9+.-]` bytes. A well-formed run (at most one leading
/// sign, at most one `.`) parses the ordinary way, with a permitted
/// leading-zero chain stripped first. A run with an embedded extra sign —
/// a producer bug, e.g. `-0.00+5` — is recovered the way lenient real-world
/// parsers do: digits are concatenated (the decimal point is dropped) and
/// the sign is the parity of every `-` encountered, so `-0.00+5` recovers as
/// the integer `-5` rather than aborting the whole object.
pub fn read_numeric(buf: &[u8], pos: usize) -> Option<(NumericToken, usize)> {
    let start = pos;
    let mut i = pos;
    if i < buf.len() && (buf[i] == b'+' || buf[i] == b'-') {
        i += 1;
    }
    while i < buf.len() && (buf[i].is_ascii_digit() || buf[i] == b'.' || buf[i] == b'+' || buf[i] == b'-') {
        i += 1;
    }
    if i == start {
        return None;
    }
    let raw = &buf[start..i];
    if !raw.iter().any(u8::is_ascii_digit) {
        return None;
    }

    let interior_sign = raw[1..].iter().any(|&b| b == b'+' || b == b'-');
    let dot_count = raw.iter().filter(|&&b| b == b'.').count();

    if !interior_sign && dot_count <= 1 {
        let text = std::str::from_utf8(raw).ok()?;
        let is_real = dot_count == 1;
        let token = if is_real {
            match normalize_numeric_text(text).parse::<f64>() {
                Ok(v) => NumericToken::Real(v),
                Err(_) => NumericToken::Overflow,
            }
        } else {
            match normalize_numeric_text(text).parse::<i64>() {
                Ok(v) => NumericToken::Integer(v),
                Err(_) => NumericToken::Overflow,
            }
        };
        return Some((token, i));
    }

    // Malformed multi-sign lexeme: collapse to a single signed integer.
    let negative = raw.iter().filter(|&&b| b == b'-').count() % 2 == 1;
    let digits: String = raw.iter().filter(|b| b.is_ascii_digit()).map(|&b| b as char).collect();
    let magnitude = digits.trim_start_matches('0');
    let magnitude = if magnitude.is_empty() { "0" } else { magnitude };
    let text = if negative { format!("-{magnitude}") } else { magnitude.to_string() };
    let token = match text.parse::<i64>() {
        Ok(v) => NumericToken::Integer(v),
        Err(_) => NumericToken::Overflow,
    };
    Some((token, i))
}

/// Strip a permitted leading-zero chain (`0`, `00`, `0.00…`) so `strconv`
/// (here, `str::parse`) never chokes on a multi-digit zero run; preserves an
/// explicit sign.
fn normalize_numeric_text(raw: &str) -> String {
    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => ("", &raw[1..]),
        Some(b'-') => ("-", &raw[1..]),
        _ => ("", raw),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };
    let trimmed_int = int_part.trim_start_matches('0');
    let int_part = if trimmed_int.is_empty() { "0" } else { trimmed_int };
    match frac_part {
        Some(f) => format!("{sign}{int_part}.{}", if f.is_empty() { "0" } else { f }),
        None => format!("{sign}{int_part}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_strict_collapses_comment_and_whitespace() {
        let buf = b"   % a comment\n  42";
        let (pos, _) = skip_whitespace_and_comments(buf, 0);
        assert_eq!(&buf[pos..], b"42");
    }

    #[test]
    fn relaxed_skip_reports_eol_crossing() {
        let (_, report) = skip_whitespace_and_comments(b"  \n  x", 0);
        assert!(report.crossed_eol);
        let (_, report) = skip_whitespace_and_comments(b"   x", 0);
        assert!(!report.crossed_eol);
    }

    #[test]
    fn balanced_parens_allows_nesting_and_escapes() {
        let buf = b"(a (b\\) c) d)rest";
        let end = scan_balanced_parens(buf, 0).unwrap();
        assert_eq!(&buf[..end], b"(a (b\\) c) d)");
    }

    #[test]
    fn unbalanced_parens_fail() {
        let buf = b"(unterminated";
        assert_eq!(scan_balanced_parens(buf, 0), None);
    }

    #[test]
    fn find_keyword_skips_string_and_comment_spans() {
        let buf = b"(endobj inside a string) % endobj in a comment\nendobj";
        let pos = find_keyword(buf, 0, b"endobj").unwrap();
        assert_eq!(&buf[pos..], b"endobj");
    }

    #[test]
    fn find_keyword_requires_boundary() {
        let buf = b"endobjective endobj";
        let pos = find_keyword(buf, 0, b"endobj").unwrap();
        assert_eq!(&buf[pos..], b"endobj");
    }

    #[test]
    fn hex_normalization_pads_and_uppercases() {
        assert_eq!(normalize_hex_string(b"abc").unwrap(), b"ABC0");
        assert_eq!(normalize_hex_string(b"A B C").unwrap(), b"ABC0");
        assert_eq!(normalize_hex_string(b"ZZ"), None);
    }

    #[test]
    fn numeric_collapses_malformed_multi_sign_lexeme() {
        let (tok, end) = read_numeric(b"-0.00+5", 0).unwrap();
        assert_eq!(tok, NumericToken::Integer(-5));
        assert_eq!(end, b"-0.00+5".len());
    }

    #[test]
    fn numeric_handles_sign_and_leading_zeros() {
        let (tok, end) = read_numeric(b"+5", 0).unwrap();
        assert_eq!(tok, NumericToken::Integer(5));
        assert_eq!(end, 2);
        let (tok, _) = read_numeric(b"00042", 0).unwrap();
        assert_eq!(tok, NumericToken::Integer(42));
        let (tok, _) = read_numeric(b"3.14", 0).unwrap();
        assert_eq!(tok, NumericToken::Real(3.14));
    }

    #[test]
    fn numeric_overflow_is_soft_error() {
        let huge = "99999999999999999999999999999999";
        let (tok, _) = read_numeric(huge.as_bytes(), 0).unwrap();
        assert_eq!(tok, NumericToken::Overflow);
    }
}
