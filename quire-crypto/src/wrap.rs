//! User-key verification and content-key wrapping.
//!
//! A license carries two values sealed with the user key:
//! - the key check: the license identifier, used to tell whether a candidate
//!   passphrase is the right one without touching the publication;
//! - the wrapped content key.

use crate::cipher::{decrypt, encrypt, EncryptedData};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{ContentKey, SecretKey, UserKey};

/// Seals the license identifier with the user key (license issuance).
pub fn seal_key_check(user_key: &UserKey, license_id: &str) -> CryptoResult<String> {
    Ok(encrypt(user_key.secret(), license_id.as_bytes())?.to_base64())
}

/// Returns whether `user_key` opens the key check for `license_id`.
///
/// A wrong key yields `Ok(false)`; a malformed key check is an error.
pub fn verify_key_check(
    user_key: &UserKey,
    key_check: &str,
    license_id: &str,
) -> CryptoResult<bool> {
    let sealed = EncryptedData::from_base64(key_check)?;
    match decrypt(user_key.secret(), &sealed) {
        Ok(plaintext) => Ok(plaintext == license_id.as_bytes()),
        Err(CryptoError::Decryption(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Wraps a content key with the user key (license issuance).
pub fn wrap_content_key(user_key: &UserKey, content_key: &ContentKey) -> CryptoResult<String> {
    Ok(encrypt(user_key.secret(), content_key.secret().as_bytes())?.to_base64())
}

/// Unwraps the content key carried by a license.
pub fn unwrap_content_key(user_key: &UserKey, encrypted_value: &str) -> CryptoResult<ContentKey> {
    let sealed = EncryptedData::from_base64(encrypted_value)?;
    let bytes = decrypt(user_key.secret(), &sealed)?;
    let key = SecretKey::from_slice(&bytes)?;
    Ok(ContentKey::from_bytes(*key.as_bytes()))
}
