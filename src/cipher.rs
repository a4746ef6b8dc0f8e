//! Credential cipher.
//!
//! AES-256 in counter mode where the whole 16-byte IV is the initial counter
//! block, read as a big-endian 128-bit integer and incremented (wrapping) once
//! per block. This is not the usual nonce/counter split: ciphertexts are shared
//! with an external producer that derives its counter this way, so the layout
//! must stay bit-exact.
//!
//! Key and IV are text. They must be at least 32 and 16 characters long and are
//! truncated (never padded) to exactly that length before use.

use aes::cipher::{KeyIvInit, StreamCipher};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::errors::LinkError;

/// Key length in characters (and bytes) after truncation.
pub const KEY_LEN: usize = 32;
/// IV length in characters (and bytes) after truncation.
pub const IV_LEN: usize = 16;

/// AES-256-CTR with a big-endian 128-bit counter spanning the whole block.
type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

/// Encrypt `plaintext` and return the base64 ciphertext.
pub fn encrypt(plaintext: &str, key: &str, iv: &str) -> Result<String, LinkError> {
    let mut cipher = keystream(key, iv)?;
    let mut buf = plaintext.as_bytes().to_vec();
    cipher.apply_keystream(&mut buf);
    Ok(STANDARD.encode(buf))
}

/// Decrypt a base64 ciphertext produced by [`encrypt`] (or the external producer).
pub fn decrypt(ciphertext: &str, key: &str, iv: &str) -> Result<String, LinkError> {
    // Key/IV are checked first so a bad key is not reported as a bad payload.
    let mut cipher = keystream(key, iv)?;
    let mut buf = STANDARD.decode(ciphertext.trim()).map_err(|e| {
        LinkError::invalid_parameter("ciphertext", format!("could not decode the encrypted text: {e}"))
    })?;
    cipher.apply_keystream(&mut buf);

    String::from_utf8(buf).map_err(|_| {
        LinkError::invalid_parameter("ciphertext", "decrypted bytes are not valid UTF-8 (wrong key or IV?)")
    })
}

fn keystream(key: &str, iv: &str) -> Result<Aes256Ctr, LinkError> {
    let cipher_key = truncated_bytes(key, KEY_LEN, "key")?;
    let cipher_iv = truncated_bytes(iv, IV_LEN, "initialisation vector")?;
    Ok(Aes256Ctr::new(cipher_key.as_slice().into(), cipher_iv.as_slice().into()))
}

/// First `len` characters of `value` as bytes; shorter values are rejected and
/// multi-byte characters inside the window are refused (the result must be `len` bytes).
fn truncated_bytes(value: &str, len: usize, name: &'static str) -> Result<Vec<u8>, LinkError> {
    let count = value.chars().count();
    if count < len {
        return Err(LinkError::invalid_parameter(
            name,
            format!("must be at least {len} characters long ({count})"),
        ));
    }
    let truncated: String = value.chars().take(len).collect();
    if truncated.len() != len {
        return Err(LinkError::invalid_parameter(
            name,
            format!("the first {len} characters must be single-byte (ASCII)"),
        ));
    }
    Ok(truncated.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "iliketoflylittleaeroplaneswithorwithoutengines";

    #[test]
    fn counter_starts_at_whole_iv() {
        // One block of zeros encrypts to AES(key, iv): the IV is the counter block itself.
        use aes::cipher::{BlockEncrypt, KeyInit};
        let iv = "poy8R^Sj#)4LAvvR";
        let zeros = "\0".repeat(16);
        let ct = STANDARD.decode(encrypt(&zeros, KEY, iv).unwrap()).unwrap();

        let block_cipher = aes::Aes256::new(KEY.as_bytes()[..KEY_LEN].into());
        let mut block = aes::Block::clone_from_slice(iv.as_bytes());
        block_cipher.encrypt_block(&mut block);
        assert_eq!(ct.as_slice(), block.as_slice());
    }

    #[test]
    fn second_block_uses_iv_plus_one() {
        use aes::cipher::{BlockEncrypt, KeyInit};
        let iv = "\u{7f}".repeat(16);
        let zeros = "\0".repeat(32);
        let ct = STANDARD.decode(encrypt(&zeros, KEY, &iv).unwrap()).unwrap();

        let block_cipher = aes::Aes256::new(KEY.as_bytes()[..KEY_LEN].into());
        let mut first = aes::Block::clone_from_slice(iv.as_bytes());
        block_cipher.encrypt_block(&mut first);
        let next = (u128::from_be_bytes([0x7f; 16]).wrapping_add(1)).to_be_bytes();
        let mut second = aes::Block::clone_from_slice(&next);
        block_cipher.encrypt_block(&mut second);

        assert_eq!(&ct[..16], first.as_slice());
        assert_eq!(&ct[16..], second.as_slice());
    }

    #[test]
    fn multibyte_key_window_rejected() {
        let key = format!("é{}", "k".repeat(40));
        let err = encrypt("x", &key, "0123456789abcdef").unwrap_err();
        assert!(matches!(err, LinkError::InvalidParameter { name: "key", .. }));
    }

    #[test]
    fn empty_plaintext_is_empty_ciphertext() {
        let ct = encrypt("", KEY, "0123456789abcdef").unwrap();
        assert_eq!(ct, "");
        assert_eq!(decrypt(&ct, KEY, "0123456789abcdef").unwrap(), "");
    }
}
