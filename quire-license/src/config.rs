//! Engine configuration.

use crate::error::LicenseResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for [`crate::LcpService`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LcpConfig {
    /// Whether the authentication provider may prompt the user.
    pub allow_user_interaction: bool,
    /// Timeout applied to every request to the status authority.
    pub http_timeout_secs: u64,
    /// User agent sent to the status authority.
    pub user_agent: String,
    /// Device name sent on registration. Defaults to the hostname.
    pub device_name: Option<String>,
    /// Location of the license state database.
    pub store_path: Option<PathBuf>,
}

impl Default for LcpConfig {
    fn default() -> Self {
        Self {
            allow_user_interaction: true,
            http_timeout_secs: 30,
            user_agent: format!("Quire/{}", env!("CARGO_PKG_VERSION")),
            device_name: None,
            store_path: None,
        }
    }
}

impl LcpConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> LicenseResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the configured store path or the platform default.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(default_store_path)
    }
}

/// `<data dir>/quire/quire.db`, falling back to the temp dir on platforms
/// without a data directory.
#[must_use]
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("quire")
        .join("quire.db")
}
