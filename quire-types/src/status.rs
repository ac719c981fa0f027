//! License status document model.

use crate::link::{find_link, Link};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Link relations found in status documents.
pub mod rel {
    /// Device registration endpoint.
    pub const REGISTER: &str = "register";
    /// Loan renewal endpoint.
    pub const RENEW: &str = "renew";
    /// Publication return endpoint.
    pub const RETURN: &str = "return";
    /// Latest license document.
    pub const LICENSE: &str = "license";
}

/// Lifecycle state of a license as known by the status authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Issued, not yet used by any device.
    Ready,
    /// In use by at least one device.
    Active,
    /// Revoked by the provider.
    Revoked,
    /// Returned by the user.
    Returned,
    /// Cancelled before first use.
    Cancelled,
    /// Past its end date.
    Expired,
}

impl Status {
    /// Returns true if the license may be used in this state.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Ready | Self::Active)
    }

    /// Returns true if no further transition is possible from this state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !self.is_usable()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Revoked => "revoked",
            Self::Returned => "returned",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Snapshot of the remote status of a license.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDocument {
    /// License identifier this status refers to.
    pub id: String,
    /// Current lifecycle state.
    pub status: Status,
    /// Human-readable message from the authority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Last update times.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<Updated>,
    /// Available remote actions.
    #[serde(default)]
    pub links: Vec<Link>,
    /// The furthest end date a loan may be renewed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_rights: Option<PotentialRights>,
    /// History of registration, renewal and return events.
    #[serde(default)]
    pub events: Vec<StatusEvent>,
}

impl StatusDocument {
    /// Parses a status document from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a status document.
    pub fn from_json(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Returns the first link with the given relation.
    #[must_use]
    pub fn link(&self, rel: &str) -> Option<&Link> {
        find_link(&self.links, rel)
    }

    /// Returns the potential rights end date, if the authority published one.
    #[must_use]
    pub fn potential_rights_end(&self) -> Option<DateTime<Utc>> {
        self.potential_rights.as_ref().and_then(|p| p.end)
    }

    /// Returns a copy of this document in the given state.
    #[must_use]
    pub fn with_status(&self, status: Status) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// Update timestamps of the license and of the status itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Updated {
    /// When the license document last changed.
    pub license: DateTime<Utc>,
    /// When this status last changed.
    pub status: DateTime<Utc>,
}

/// Rights the user could obtain through renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotentialRights {
    /// Maximum loan end date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

/// One entry in the status event history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Event kind (`register`, `renew`, `return`, `revoke`, `cancel`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Name of the device that caused the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Identifier of the device that caused the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// When the event happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}
