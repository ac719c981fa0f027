//! Local device identity.
//!
//! The status authority tracks which devices use a license. The engine only
//! needs an opaque `(id, name)` pair; the id is generated once and persisted
//! so it stays stable across restarts.

use crate::error::LicenseResult;
use crate::keys;
use quire_storage::KeyValueStore;
use quire_types::DeviceId;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Identity of this device as presented to the status authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Stable device identifier.
    pub id: DeviceId,
    /// Human-readable device name.
    pub name: String,
}

impl DeviceIdentity {
    /// Creates an identity from a platform-supplied pair.
    pub fn new(id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Loads the persisted device id, generating and persisting one on first
    /// use.
    pub fn load_or_create(store: &dyn KeyValueStore, name: Option<String>) -> LicenseResult<Self> {
        let id = match store.get(keys::DEVICE_ID)? {
            Some(raw) => raw.parse::<DeviceId>()?,
            None => {
                let id = DeviceId::generate();
                store.set(keys::DEVICE_ID, id.as_str())?;
                info!("Generated device id {}", id);
                id
            }
        };
        Ok(Self {
            id,
            name: name.unwrap_or_else(default_device_name),
        })
    }

    /// Query parameters identifying this device (`id`, `name`).
    #[must_use]
    pub fn query_params(&self) -> Vec<(&str, &str)> {
        vec![("id", self.id.as_str()), ("name", self.name.as_str())]
    }
}

/// The machine hostname, or a generic name if it cannot be read.
#[must_use]
pub fn default_device_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "Quire Reader".to_string())
}
