use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes256};
use cbc::{Decryptor, Encryptor};

use crate::error::{Error, Result};

const IV_LEN: usize = 16;

/// Decrypt an AES-CBC stream where the first 16 bytes are the IV, as laid
/// out by every AESV2/AESV3 crypt filter.
pub fn decrypt_cbc(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < IV_LEN {
        return Err(Error::Decryption("aes: ciphertext shorter than one IV".into()));
    }
    let (iv, ciphertext) = data.split_at(IV_LEN);
    if ciphertext.is_empty() {
        return Ok(Vec::new());
    }
    let mut buf = ciphertext.to_vec();
    let plaintext = match key.len() {
        16 => Decryptor::<Aes128>::new(key.into(), iv.into())
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .map_err(|e| Error::Decryption(format!("aes: {e}")))?,
        32 => Decryptor::<Aes256>::new(key.into(), iv.into())
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .map_err(|e| Error::Decryption(format!("aes: {e}")))?,
        other => return Err(Error::Decryption(format!("aes: unsupported key length {other} bytes"))),
    };
    Ok(plaintext.to_vec())
}

/// Encrypt with a freshly generated random IV, prepended to the ciphertext.
pub fn encrypt_cbc(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let iv: [u8; IV_LEN] = rand::random();
    let mut buf = vec![0u8; data.len() + IV_LEN];
    buf[..data.len()].copy_from_slice(data);

    let ciphertext = match key.len() {
        16 => Encryptor::<Aes128>::new(key.into(), (&iv).into())
            .encrypt_padded_mut::<Pkcs7>(&mut buf, data.len())
            .map_err(|e| Error::Decryption(format!("aes: {e}")))?
            .to_vec(),
        32 => Encryptor::<Aes256>::new(key.into(), (&iv).into())
            .encrypt_padded_mut::<Pkcs7>(&mut buf, data.len())
            .map_err(|e| Error::Decryption(format!("aes: {e}")))?
            .to_vec(),
        other => return Err(Error::Decryption(format!("aes: unsupported key length {other} bytes"))),
    };

    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

use aes::cipher::block_padding::NoPadding;

/// AES-256 CBC with a zero IV and no padding: the R6 key-unwrap step used to
/// recover the file key from `UE`/`OE` (ISO 32000-2 Algorithm 2.A/8).
pub fn decrypt_cbc_zero_iv_no_padding(key: &[u8; 32], data: &[u8]) -> Vec<u8> {
    let iv = [0u8; IV_LEN];
    let mut buf = data.to_vec();
    Decryptor::<Aes256>::new(key.into(), (&iv).into())
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .expect("fixed-size, block-aligned buffer with no padding cannot fail to decrypt")
        .to_vec()
}

/// AES-128 CBC, no padding, used for the repeated-hash step of the revision
/// 6 hardened password hash (ISO 32000-2 Algorithm 2.B).
pub fn encrypt_cbc_no_padding_with_key_prefix(key: &[u8], iv: &[u8], data: &[u8]) -> Vec<u8> {
    let mut buf = data.to_vec();
    let out_len = buf.len();
    Encryptor::<Aes128>::new(key.into(), iv.into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, out_len)
        .expect("block-aligned K1 buffer with no padding cannot fail to encrypt")
        .to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes128_cbc_roundtrips() {
        let key = [0u8; 16];
        let data = b"hello, encrypted world!";
        let ciphertext = encrypt_cbc(&key, data).unwrap();
        assert_eq!(decrypt_cbc(&key, &ciphertext).unwrap(), data);
    }

    #[test]
    fn aes256_cbc_roundtrips() {
        let key = [7u8; 32];
        let data = b"a bit longer plaintext to cross one block boundary";
        let ciphertext = encrypt_cbc(&key, data).unwrap();
        assert_eq!(decrypt_cbc(&key, &ciphertext).unwrap(), data);
    }
}
