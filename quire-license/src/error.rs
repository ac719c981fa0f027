//! Error types for the license engine.

use crate::rights::Right;
use chrono::{DateTime, Utc};
use quire_crypto::CryptoError;
use quire_storage::StorageError;
use quire_types::Status;
use thiserror::Error;

/// License engine errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The authentication provider declined to supply a passphrase.
    #[error("authentication cancelled")]
    AuthenticationCancelled,

    /// The supplied passphrase does not open this license.
    #[error("invalid passphrase")]
    InvalidPassphrase,

    /// The license is in a terminal state.
    #[error("license is not usable (status: {0})")]
    LicenseUnusable(Status),

    /// Not enough allowance left for the requested consumption.
    #[error("{right} right exceeded: requested {requested}, {remaining} left")]
    RightsExceeded {
        /// Which right.
        right: Right,
        /// Amount requested.
        requested: u32,
        /// Amount still available.
        remaining: u32,
    },

    /// Network error talking to the status authority. Retryable.
    #[error("network error: {0}")]
    Network(String),

    /// The device could not be registered with the status authority.
    #[error("device registration failed: {0}")]
    RegistrationFailed(String),

    /// Requested loan end date is beyond what the authority allows.
    #[error("renewal date {requested:?} out of range (maximum: {max:?})")]
    RenewalDateOutOfRange {
        /// Requested end date.
        requested: Option<DateTime<Utc>>,
        /// Maximum end date published by the authority.
        max: Option<DateTime<Utc>>,
    },

    /// The authority refused the renewal.
    #[error("renewal failed: {0}")]
    RenewFailed(String),

    /// The authority refused the return.
    #[error("return failed: {0}")]
    ReturnFailed(String),

    /// A required link is absent from the license or status document.
    #[error("missing link: {0}")]
    MissingLink(String),

    /// Persistent state could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Key or content decryption failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A document or link could not be interpreted.
    #[error("invalid document: {0}")]
    Document(#[from] quire_types::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LicenseError {
    /// Returns true if the caller may retry the operation as-is.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RegistrationFailed(_))
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
