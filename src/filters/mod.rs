//! Stream filter pipeline: decode/encode a stream's `Filter`/`DecodeParms`
//! chain. `Filter` and `DecodeParms` may each be a single value or a
//! parallel array describing several filters applied in sequence.

mod ascii85;
mod asciihex;
mod ccitt;
pub(crate) mod flate;
mod lzw;
mod passthrough;
mod predictor;
mod runlength;

use crate::error::{Error, Result, UnsupportedFeature};
use crate::object::{Dictionary, Object};

fn filter_names(dict: &Dictionary) -> Result<Vec<Vec<u8>>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(n)) => Ok(vec![n.clone()]),
        Ok(Object::Array(arr)) => arr.iter().map(|o| o.as_name().map(|n| n.to_vec())).collect(),
        Ok(_) => Err(Error::InvalidStream("Filter entry is neither a Name nor an Array".into())),
        Err(_) => Ok(Vec::new()),
    }
}

fn decode_parms(dict: &Dictionary, count: usize) -> Result<Vec<Option<Dictionary>>> {
    match dict.get(b"DecodeParms").or_else(|_| dict.get(b"DP")) {
        Ok(Object::Dictionary(d)) => Ok(vec![Some(d.clone())]),
        Ok(Object::Array(arr)) => Ok(arr
            .iter()
            .map(|o| match o {
                Object::Dictionary(d) => Some(d.clone()),
                _ => None,
            })
            .collect()),
        Ok(Object::Null) | Err(_) => Ok(vec![None; count]),
        Ok(_) => Err(Error::InvalidStream("DecodeParms entry has an unexpected type".into())),
    }
}

/// Run every filter in `Filter` over `raw`, applying the matching
/// `DecodeParms` entry (or none) to each stage. A producer encodes the array
/// left-to-right (the first entry wraps the raw bytes first, the last is
/// outermost), so decoding undoes it right-to-left.
pub fn decode(dict: &Dictionary, raw: &[u8]) -> Result<Vec<u8>> {
    let names = filter_names(dict)?;
    if names.is_empty() {
        return Ok(raw.to_vec());
    }
    let mut parms = decode_parms(dict, names.len())?;
    if parms.len() < names.len() {
        parms.resize(names.len(), None);
    }

    let mut data = raw.to_vec();
    for (name, parm) in names.iter().zip(parms.iter()).rev() {
        data = decode_one(name, parm.as_ref(), &data)?;
    }
    Ok(data)
}

/// Encode `data` through the single filter named `name`, applying `parm` if
/// given. Used by the writer to (re-)compress freshly authored streams.
pub fn encode(name: &[u8], parm: Option<&Dictionary>, data: &[u8]) -> Result<Vec<u8>> {
    match name {
        b"FlateDecode" | b"Fl" => {
            let compressed = flate::encode(data);
            predictor::encode(parm, &compressed).or(Ok(compressed))
        }
        b"ASCII85Decode" | b"A85" => Ok(ascii85::encode(data)),
        b"ASCIIHexDecode" | b"AHx" => Ok(asciihex::encode(data)),
        b"RunLengthDecode" | b"RL" => Ok(runlength::encode(data)),
        _ => Err(UnsupportedFeature::Filter(String::from_utf8_lossy(name).into_owned()).into()),
    }
}

fn decode_one(name: &[u8], parm: Option<&Dictionary>, data: &[u8]) -> Result<Vec<u8>> {
    match name {
        b"FlateDecode" | b"Fl" => {
            let decompressed = flate::decode(data)?;
            predictor::decode(parm, decompressed)
        }
        b"LZWDecode" | b"LZW" => {
            let early_change = parm
                .and_then(|p| p.get(b"EarlyChange").ok())
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(1);
            let decompressed = lzw::decode(data, early_change != 0)?;
            predictor::decode(parm, decompressed)
        }
        b"ASCII85Decode" | b"A85" => ascii85::decode(data),
        b"ASCIIHexDecode" | b"AHx" => asciihex::decode(data),
        b"RunLengthDecode" | b"RL" => runlength::decode(data),
        b"CCITTFaxDecode" | b"CCF" => ccitt::decode(data, parm),
        b"DCTDecode" | b"DCT" | b"JBIG2Decode" | b"JPXDecode" => Ok(passthrough::decode(data)),
        b"Crypt" => Ok(data.to_vec()),
        other => Err(UnsupportedFeature::Filter(String::from_utf8_lossy(other).into_owned()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;

    #[test]
    fn empty_filter_list_is_passthrough() {
        let dict = Dictionary::new();
        assert_eq!(decode(&dict, b"raw bytes").unwrap(), b"raw bytes");
    }

    #[test]
    fn chained_filters_apply_in_order() {
        // Producer order: Flate compresses the raw bytes first, then
        // ASCII85 wraps the compressed bytes, so decode must undo ASCII85
        // first and Flate last, the reverse of the `Filter` array.
        let ascii85 = ascii85::encode(&flate::encode(b"round trip me"));
        let dict = dictionary! {
            b"Filter" => Object::Array(vec![Object::Name(b"FlateDecode".to_vec()), Object::Name(b"ASCII85Decode".to_vec())]),
        };
        let out = decode(&dict, &ascii85).unwrap();
        assert_eq!(out, b"round trip me");
    }

    #[test]
    fn unknown_filter_is_unsupported_feature() {
        let dict = dictionary! { b"Filter" => Object::Name(b"Nonsense".to_vec()) };
        let err = decode(&dict, b"x").unwrap_err();
        assert!(matches!(err, Error::Unsupported(UnsupportedFeature::Filter(_))));
    }
}
