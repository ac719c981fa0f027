//! Cryptography for Quire licenses.
//!
//! - Passphrase hashing into user keys (SHA-256, Argon2id)
//! - Key check verification and content-key unwrapping
//! - ChaCha20-Poly1305 authenticated encryption of publication resources
//!
//! All key types zeroize their memory on drop and redact themselves in
//! `Debug` output.

mod cipher;
mod error;
mod key;
mod wrap;

pub use cipher::{decrypt, encrypt, EncryptedData, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    derive_key, generate_random_key, hash_passphrase, ContentKey, KdfParams, Salt, SecretKey,
    UserKey, KEY_SIZE, MAX_MEMORY_COST, MAX_PARALLELISM, MAX_TIME_COST, SALT_SIZE,
};
pub use wrap::{seal_key_check, unwrap_content_key, verify_key_check, wrap_content_key};
