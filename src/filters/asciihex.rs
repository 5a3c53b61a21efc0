use crate::error::{Error, Result};
use crate::parser::lexer::{hex_digits_to_bytes, normalize_hex_string};

/// Decode an ASCII hex stream, terminated by `>` (tolerated if absent).
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let end = data.iter().position(|&b| b == b'>').unwrap_or(data.len());
    let digits = normalize_hex_string(&data[..end]).ok_or_else(|| Error::InvalidStream("asciihex: non-hex byte".into()))?;
    Ok(hex_digits_to_bytes(&digits))
}

pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2 + 1);
    for &b in data {
        out.extend_from_slice(format!("{b:02X}").as_bytes());
    }
    out.push(b'>');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asciihex_roundtrips() {
        let data = b"Hello";
        assert_eq!(decode(&encode(data)).unwrap(), data);
    }

    #[test]
    fn asciihex_pads_odd_length() {
        assert_eq!(decode(b"4E>").unwrap(), vec![0x4E]);
        assert_eq!(decode(b"4").unwrap(), vec![0x40]);
    }
}
