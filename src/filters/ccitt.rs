use crate::error::{Error, Result};
use crate::object::Dictionary;

/// CCITT Group 3/4 fax decoding for `CCITTFaxDecode` streams, driven by the
/// same `DecodeParms` keys the format defines (`K`, `Columns`, `Rows`,
/// `BlackIs1`, `EncodedByteAlign`).
pub fn decode(data: &[u8], parm: Option<&Dictionary>) -> Result<Vec<u8>> {
    let columns = int_param(parm, b"Columns", 1728)?;
    let rows = int_param(parm, b"Rows", 0)?;
    let k = int_param(parm, b"K", 0)?;
    let black_is_1 = bool_param(parm, b"BlackIs1", false)?;
    let byte_align = bool_param(parm, b"EncodedByteAlign", false)?;

    let mode = if k < 0 {
        fax::Mode::G4
    } else if k == 0 {
        fax::Mode::G3_1D
    } else {
        fax::Mode::G3_2D
    };

    let decoded = fax::decode(data, columns as usize, if rows > 0 { Some(rows as usize) } else { None }, mode, byte_align)
        .map_err(|e| Error::InvalidStream(format!("ccitt: {e}")))?;

    if black_is_1 {
        Ok(decoded)
    } else {
        Ok(decoded.into_iter().map(|b| !b).collect())
    }
}

fn int_param(parm: Option<&Dictionary>, key: &[u8], default: i64) -> Result<i64> {
    match parm.and_then(|p| p.get(key).ok()) {
        Some(obj) => obj.as_i64(),
        None => Ok(default),
    }
}

fn bool_param(parm: Option<&Dictionary>, key: &[u8], default: bool) -> Result<bool> {
    match parm.and_then(|p| p.get(key).ok()) {
        Some(obj) => obj.as_bool(),
        None => Ok(default),
    }
}
