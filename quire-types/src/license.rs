//! License document model.
//!
//! A license grants rights on one protected publication and carries the
//! material needed to recover its content key from a user passphrase.
//! Instances are immutable once loaded.

use crate::ids::LicenseId;
use crate::link::{find_link, find_links, Link};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Link relations found in license documents.
pub mod rel {
    /// Page helping the user remember the passphrase.
    pub const HINT: &str = "hint";
    /// Support resources (website, email, phone).
    pub const SUPPORT: &str = "support";
    /// The license status document.
    pub const STATUS: &str = "status";
    /// The protected publication.
    pub const PUBLICATION: &str = "publication";
    /// The latest version of this license.
    pub const SELF: &str = "self";
}

/// An immutable license document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    /// License identifier.
    pub id: LicenseId,
    /// URI of the license provider.
    pub provider: String,
    /// When the license was issued.
    pub issued: DateTime<Utc>,
    /// When the license was last updated, if ever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    /// Encryption descriptor.
    pub encryption: Encryption,
    /// Links to related resources.
    #[serde(default)]
    pub links: Vec<Link>,
    /// Usage rights.
    #[serde(default)]
    pub rights: Rights,
    /// Information about the license owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl License {
    /// Parses a license document from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a license.
    pub fn from_json(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Returns the first link with the given relation.
    #[must_use]
    pub fn link(&self, rel: &str) -> Option<&Link> {
        find_link(&self.links, rel)
    }

    /// Returns all links with the given relation.
    #[must_use]
    pub fn links(&self, rel: &str) -> Vec<&Link> {
        find_links(&self.links, rel)
    }
}

/// How the publication is encrypted and how to unlock its content key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encryption {
    /// Encryption profile URI.
    pub profile: String,
    /// The content key, wrapped with the user key.
    pub content_key: ContentKeyInfo,
    /// Describes how the user key is derived and checked.
    pub user_key: UserKeyInfo,
}

/// Wrapped content key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentKeyInfo {
    /// Base64 of the content key encrypted with the user key.
    pub encrypted_value: String,
}

/// User key metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserKeyInfo {
    /// Hint shown to the user when asking for the passphrase.
    pub text_hint: String,
    /// Base64 of the license id encrypted with the user key.
    pub key_check: String,
    /// How a passphrase is turned into the user key.
    #[serde(default)]
    pub derivation: KeyDerivation,
}

/// Passphrase hashing algorithm and its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum KeyDerivation {
    /// Plain SHA-256 of the passphrase.
    #[default]
    Sha256,
    /// Argon2id with explicit cost parameters.
    Argon2id {
        /// Base64 salt.
        salt: String,
        /// Memory cost in KiB.
        memory_cost: u32,
        /// Iterations.
        time_cost: u32,
        /// Lanes.
        parallelism: u32,
    },
}

/// Consumption rights granted by the license.
///
/// `None` means the right is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rights {
    /// Maximum number of pages that may be printed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print: Option<u32>,
    /// Maximum number of characters that may be copied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<u32>,
    /// Start of the usage period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    /// End of the usage period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

/// The license owner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    /// Provider-scoped user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
