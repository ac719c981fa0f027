//! Core type definitions for Quire.
//!
//! This crate defines the immutable documents the license engine works on:
//! - License and device identifiers
//! - License documents (encryption descriptor, rights, user)
//! - Status documents (lifecycle state, remote action links)
//! - Links and URI template expansion
//!
//! Documents are deserialized as-is. Signature and integrity checks are the
//! responsibility of whoever hands the documents to the engine.

mod ids;
mod license;
mod link;
mod status;

pub use ids::{DeviceId, LicenseId};
pub use license::{
    rel as license_rel, ContentKeyInfo, Encryption, KeyDerivation, License, Rights, User,
    UserKeyInfo,
};
pub use link::{find_link, find_links, Link};
pub use status::{
    rel as status_rel, PotentialRights, Status, StatusDocument, StatusEvent, Updated,
};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid URI template: {0}")]
    InvalidTemplate(String),
}
