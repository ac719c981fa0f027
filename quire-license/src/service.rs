//! Entry point opening licenses.

use crate::auth::{Authenticating, PassphraseAuthenticator};
use crate::cipher::{ChaChaCipher, ContentCipher};
use crate::config::LcpConfig;
use crate::device::DeviceIdentity;
use crate::error::LicenseResult;
use crate::network::HttpClient;
use crate::registration::DeviceRegistrar;
use crate::rights::{RightsLedger, SharedConsumption};
use crate::session::LicenseSession;
use crate::status::StatusReconciler;
use quire_storage::KeyValueStore;
use quire_types::{License, LicenseId, StatusDocument};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Opens licenses against shared storage and collaborators.
///
/// Sessions opened on the same license share one rights lock, so their
/// consumptions add up against a single bound.
pub struct LcpService {
    config: LcpConfig,
    device: DeviceIdentity,
    store: Arc<dyn KeyValueStore>,
    http: Arc<dyn HttpClient>,
    authenticator: PassphraseAuthenticator,
    cipher: Arc<dyn ContentCipher>,
    rights: Mutex<HashMap<LicenseId, SharedConsumption>>,
}

impl LcpService {
    /// Creates a service. The device identity is loaded from `store`, or
    /// generated on first use.
    pub fn new(
        config: LcpConfig,
        store: Arc<dyn KeyValueStore>,
        http: Arc<dyn HttpClient>,
        authentication: Arc<dyn Authenticating>,
    ) -> LicenseResult<Self> {
        let device = DeviceIdentity::load_or_create(store.as_ref(), config.device_name.clone())?;
        let authenticator = PassphraseAuthenticator::new(
            store.clone(),
            authentication,
            config.allow_user_interaction,
        );
        Ok(Self {
            config,
            device,
            store,
            http,
            authenticator,
            cipher: Arc::new(ChaChaCipher),
            rights: Mutex::new(HashMap::new()),
        })
    }

    /// Creates a service persisting to [`LcpConfig::store_path`] and talking
    /// to the status authority over HTTPS.
    #[cfg(feature = "online")]
    pub fn online(config: LcpConfig, authentication: Arc<dyn Authenticating>) -> LicenseResult<Self> {
        let store = quire_storage::SqliteStore::open(config.store_path())?;
        let http = crate::network::ReqwestClient::new(&config)?;
        Self::new(config, Arc::new(store), Arc::new(http), authentication)
    }

    /// Overrides the device identity.
    #[must_use]
    pub fn with_device(mut self, device: DeviceIdentity) -> Self {
        self.device = device;
        self
    }

    /// Overrides the content cipher.
    #[must_use]
    pub fn with_cipher(mut self, cipher: Arc<dyn ContentCipher>) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn config(&self) -> &LcpConfig {
        &self.config
    }

    pub fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    fn shared_rights(&self, license: &LicenseId) -> SharedConsumption {
        self.rights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(license.clone())
            .or_default()
            .clone()
    }

    /// Opens `license`, resolving its passphrase.
    ///
    /// Fails with [`crate::LicenseError::AuthenticationCancelled`] when the
    /// authentication provider cancels.
    pub async fn open(
        &self,
        license: License,
        status: Option<StatusDocument>,
    ) -> LicenseResult<LicenseSession> {
        info!("Opening license {}", license.id);
        if let Some(status) = &status {
            if status.id != license.id.as_str() {
                warn!(
                    "Status document {} does not match license {}",
                    status.id, license.id
                );
            }
        }

        let content_key = self.authenticator.resolve(&license).await?;

        let ledger =
            RightsLedger::load_shared(&license, self.store.clone(), self.shared_rights(&license.id))?;
        let registrar = DeviceRegistrar::new(self.device.clone(), self.http.clone(), self.store.clone());
        let reconciler = StatusReconciler::new(self.http.clone(), status);

        Ok(LicenseSession::new(
            license,
            content_key,
            ledger,
            registrar,
            reconciler,
            self.cipher.clone(),
        ))
    }
}
