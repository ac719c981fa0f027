//! Device registration with the status authority.
//!
//! A device registers once per license. The outcome is remembered under
//! [`keys::device_registered`]; later calls short-circuit without touching
//! the network. Registration is serialized so concurrent callers never
//! issue duplicate requests.

use crate::device::DeviceIdentity;
use crate::error::LicenseResult;
use crate::keys;
use crate::network::{HttpClient, HttpRequest};
use quire_storage::KeyValueStore;
use quire_types::{Link, LicenseId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const REGISTERED: &str = "true";

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The device was already registered; no request was sent.
    AlreadyRegistered,
    /// The authority accepted the registration. Carries the response body.
    Registered(Vec<u8>),
    /// Registration did not happen. The flag is left unset.
    Failed(String),
}

impl RegistrationOutcome {
    pub fn is_registered(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Registers the local device for licenses.
pub struct DeviceRegistrar {
    device: DeviceIdentity,
    http: Arc<dyn HttpClient>,
    store: Arc<dyn KeyValueStore>,
    lock: Mutex<()>,
}

impl DeviceRegistrar {
    pub fn new(device: DeviceIdentity, http: Arc<dyn HttpClient>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            device,
            http,
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    /// Whether the device is recorded as registered for `license`.
    pub fn is_registered(&self, license: &LicenseId) -> LicenseResult<bool> {
        let key = keys::device_registered(license, &self.device.id);
        Ok(self.store.get(&key)?.as_deref() == Some(REGISTERED))
    }

    /// Registers the device for `license` through `link`, the status
    /// document's register link.
    pub async fn register(&self, license: &LicenseId, link: Option<&Link>) -> RegistrationOutcome {
        let _guard = self.lock.lock().await;

        match self.is_registered(license) {
            Ok(true) => {
                debug!("Device {} already registered for {}", self.device.id, license);
                return RegistrationOutcome::AlreadyRegistered;
            }
            Ok(false) => {}
            Err(e) => return RegistrationOutcome::Failed(format!("failed to read registration: {e}")),
        }

        let Some(link) = link else {
            return RegistrationOutcome::Failed("no register link".to_string());
        };
        let params = self.device.query_params();
        let url = match link.url(&params) {
            Ok(url) => url,
            Err(e) => return RegistrationOutcome::Failed(e.to_string()),
        };

        let response = match self.http.fetch(HttpRequest::post(url).with_params(&params)).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Device registration for {} failed: {}", license, e);
                return RegistrationOutcome::Failed(e.to_string());
            }
        };

        let outcome = match response.status {
            status if (200..300).contains(&status) => RegistrationOutcome::Registered(response.body),
            409 => RegistrationOutcome::AlreadyRegistered,
            status => {
                warn!("Device registration for {} rejected with HTTP {}", license, status);
                return RegistrationOutcome::Failed(format!("HTTP {status}"));
            }
        };

        // The authority holds the registration now; if the flag cannot be
        // written the next attempt re-registers, which it tolerates.
        let key = keys::device_registered(license, &self.device.id);
        if let Err(e) = self.store.set(&key, REGISTERED) {
            warn!("Failed to persist registration of {}: {}", license, e);
        }
        info!("Device {} registered for license {}", self.device.id, license);
        outcome
    }
}
