use crate::error::{Error, Result};

/// PDF's LZW variant uses a 9-bit initial code width like GIF/TIFF, but
/// (unless `EarlyChange 0`) widens the code one bit *before* the table
/// reaches capacity rather than after.
pub fn decode(data: &[u8], early_change: bool) -> Result<Vec<u8>> {
    let mut decoder = if early_change {
        weezl::decode::Decoder::new(weezl::BitOrder::Msb, 8)
    } else {
        weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
    };
    decoder
        .decode(data)
        .map_err(|e| Error::InvalidStream(format!("lzw: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lzw_decodes_known_fixture() {
        // Encoded form of ASCII "-----A---B" per the PDF spec's own LZW worked example.
        let encoded: &[u8] = &[0x80, 0x0B, 0x60, 0x50, 0x22, 0x0C, 0x0C, 0x85, 0x01];
        let decoded = decode(encoded, true).unwrap();
        assert_eq!(decoded, b"-----A---B");
    }
}
