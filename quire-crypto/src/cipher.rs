//! ChaCha20-Poly1305 sealing of key material and publication resources.
//!
//! A sealed blob is laid out as `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
//! Documents embed blobs as standard base64.

use crate::error::{CryptoError, CryptoResult};
use crate::key::SecretKey;
use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};

/// Nonce length in bytes.
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag length in bytes.
pub const TAG_SIZE: usize = 16;

/// A sealed blob split into nonce and tagged ciphertext.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext followed by the tag.
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    /// Length of the serialized blob.
    pub fn len(&self) -> usize {
        self.nonce.len() + self.ciphertext.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        [self.nonce.as_slice(), self.ciphertext.as_slice()].concat()
    }

    /// Parses a serialized blob. Anything shorter than a nonce plus a tag
    /// cannot have been produced by [`encrypt`].
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption(format!(
                "sealed blob is {} bytes, need at least {}",
                bytes.len(),
                NONCE_SIZE + TAG_SIZE
            )));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);
        let mut fixed = [0u8; NONCE_SIZE];
        fixed.copy_from_slice(nonce);
        Ok(Self {
            nonce: fixed,
            ciphertext: ciphertext.to_vec(),
        })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidEncoding(format!("sealed blob is not base64: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

/// Seals `plaintext` under `key` with a fresh random nonce.
pub fn encrypt(key: &SecretKey, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    let aead = ChaCha20Poly1305::new(key.as_bytes().into());
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = aead
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    let mut fixed = [0u8; NONCE_SIZE];
    fixed.copy_from_slice(&nonce);
    Ok(EncryptedData {
        nonce: fixed,
        ciphertext,
    })
}

/// Opens a sealed blob.
///
/// Fails with [`CryptoError::Decryption`] on a wrong key or tampered data.
pub fn decrypt(key: &SecretKey, sealed: &EncryptedData) -> CryptoResult<Vec<u8>> {
    let aead = ChaCha20Poly1305::new(key.as_bytes().into());
    aead.decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map_err(|_| CryptoError::Decryption("wrong key or tampered data".to_string()))
}
