//! Key types and passphrase derivation.
//!
//! A passphrase is hashed into a [`UserKey`] (SHA-256 or Argon2id depending
//! on the license). The user key unwraps the [`ContentKey`] that protects the
//! publication resources.

use crate::error::{CryptoError, CryptoResult};
use argon2::{Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine};
use quire_types::KeyDerivation;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of symmetric keys in bytes (256 bits for ChaCha20).
pub const KEY_SIZE: usize = 32;

/// Size of salt in bytes.
pub const SALT_SIZE: usize = 16;

/// Largest accepted Argon2id memory cost, in KiB (256 MiB).
pub const MAX_MEMORY_COST: u32 = 256 * 1024;

/// Largest accepted Argon2id time cost.
pub const MAX_TIME_COST: u32 = 16;

/// Largest accepted Argon2id parallelism.
pub const MAX_PARALLELISM: u32 = 8;

/// Raw symmetric key material with automatic zeroization on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; KEY_SIZE],
}

impl SecretKey {
    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates a key from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self { bytes })
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Key derived from the user passphrase ("hashed passphrase").
///
/// Its hex form is what gets cached and what authentication providers may
/// hand back instead of the clear passphrase.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct UserKey(SecretKey);

impl UserKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(SecretKey::from_bytes(bytes))
    }

    /// Parses a hashed passphrase in lowercase or uppercase hex.
    pub fn from_hex(hex_str: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| CryptoError::InvalidEncoding(format!("invalid hex: {e}")))?;
        Ok(Self(SecretKey::from_slice(&bytes)?))
    }

    /// Returns the hashed passphrase as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Returns the underlying key.
    pub fn secret(&self) -> &SecretKey {
        &self.0
    }
}

/// Key protecting the publication resources.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ContentKey(SecretKey);

impl ContentKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(SecretKey::from_bytes(bytes))
    }

    /// Generates a random content key (license issuance and tests).
    pub fn generate() -> Self {
        Self(generate_random_key())
    }

    /// Returns the underlying key.
    pub fn secret(&self) -> &SecretKey {
        &self.0
    }
}

/// Salt for key derivation.
#[derive(Clone, Debug)]
pub struct Salt {
    bytes: [u8; SALT_SIZE],
}

impl Salt {
    /// Generates a random salt.
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a salt from raw bytes.
    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self { bytes }
    }

    /// Decodes a base64 salt as carried in license documents.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::InvalidEncoding(format!("invalid salt base64: {e}")))?;
        let bytes: [u8; SALT_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidEncoding(format!("salt must be {SALT_SIZE} bytes")))?;
        Ok(Self { bytes })
    }

    /// Returns the salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.bytes
    }
}

/// Argon2id cost parameters.
#[derive(Clone, Debug)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Time cost (iterations).
    pub time_cost: u32,
    /// Parallelism factor.
    pub parallelism: u32,
}

impl KdfParams {
    /// Rejects costs above [`MAX_MEMORY_COST`], [`MAX_TIME_COST`] or
    /// [`MAX_PARALLELISM`]. Licenses carry these values, so they are untrusted.
    pub fn check_bounds(&self) -> CryptoResult<()> {
        if self.memory_cost > MAX_MEMORY_COST {
            return Err(CryptoError::KeyDerivation(format!(
                "memory cost {} KiB exceeds {MAX_MEMORY_COST} KiB",
                self.memory_cost
            )));
        }
        if self.time_cost > MAX_TIME_COST {
            return Err(CryptoError::KeyDerivation(format!(
                "time cost {} exceeds {MAX_TIME_COST}",
                self.time_cost
            )));
        }
        if self.parallelism > MAX_PARALLELISM {
            return Err(CryptoError::KeyDerivation(format!(
                "parallelism {} exceeds {MAX_PARALLELISM}",
                self.parallelism
            )));
        }
        Ok(())
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        // OWASP recommendations for Argon2id (2023)
        Self {
            memory_cost: 19 * 1024, // 19 MiB
            time_cost: 2,
            parallelism: 1,
        }
    }
}

/// Derives a key from a password using Argon2id.
pub fn derive_key(password: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<SecretKey> {
    params.check_bounds()?;
    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key_bytes = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut key_bytes)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(SecretKey::from_bytes(key_bytes))
}

/// Hashes a clear passphrase into a user key following the license's
/// derivation descriptor.
pub fn hash_passphrase(passphrase: &str, derivation: &KeyDerivation) -> CryptoResult<UserKey> {
    match derivation {
        KeyDerivation::Sha256 => {
            let digest = Sha256::digest(passphrase.as_bytes());
            let mut bytes = [0u8; KEY_SIZE];
            bytes.copy_from_slice(&digest);
            Ok(UserKey::from_bytes(bytes))
        }
        KeyDerivation::Argon2id {
            salt,
            memory_cost,
            time_cost,
            parallelism,
        } => {
            let salt = Salt::from_base64(salt)?;
            let params = KdfParams {
                memory_cost: *memory_cost,
                time_cost: *time_cost,
                parallelism: *parallelism,
            };
            derive_key(passphrase, &salt, &params).map(UserKey)
        }
    }
}

/// Generates a random symmetric key.
pub fn generate_random_key() -> SecretKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    SecretKey::from_bytes(bytes)
}
