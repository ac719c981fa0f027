//! Publication content decryption.

use crate::error::LicenseResult;
use quire_crypto::{decrypt, ContentKey, EncryptedData};

/// Decrypts publication resources with the license's content key.
pub trait ContentCipher: Send + Sync {
    fn decrypt(&self, key: &ContentKey, data: &[u8]) -> LicenseResult<Vec<u8>>;
}

/// ChaCha20-Poly1305 over `nonce || ciphertext || tag` blobs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChaChaCipher;

impl ContentCipher for ChaChaCipher {
    fn decrypt(&self, key: &ContentKey, data: &[u8]) -> LicenseResult<Vec<u8>> {
        let sealed = EncryptedData::from_bytes(data)?;
        Ok(decrypt(key.secret(), &sealed)?)
    }
}
