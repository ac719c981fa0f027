//! License rights and status lifecycle engine for Quire.
//!
//! Opening a protected publication goes through this crate:
//! - Passphrase resolution and content-key unwrapping
//! - Print and copy allowances, persisted per license
//! - One-time device registration with the status authority
//! - Loan renewal and early return
//!
//! # Design Principles
//!
//! - **No success before durability**: a consumed right or a registration is
//!   reported only after it has been persisted
//! - **Terminal means terminal**: revoked, returned, cancelled and expired
//!   licenses reject every operation before any side effect
//! - **Collaborators at the seams**: passphrase prompts, URL presentation,
//!   HTTP and storage are traits supplied by the host application
//!
//! # Usage
//!
//! ```ignore
//! let service = LcpService::new(LcpConfig::default(), store, http, prompt)?;
//! let session = service.open(license, Some(status)).await?;
//! if session.can_print() {
//!     session.print(3)?;
//! }
//! ```

mod auth;
mod cipher;
mod config;
mod device;
mod error;
pub mod keys;
pub mod network;
mod registration;
mod rights;
mod service;
mod session;
mod status;

pub use auth::{
    AuthenticatedLicense, Authenticating, AuthenticationReason, AuthenticationRequest,
    PassphraseAuthenticator,
};
pub use cipher::{ChaChaCipher, ContentCipher};
pub use config::{default_store_path, LcpConfig};
pub use device::{default_device_name, DeviceIdentity};
pub use error::{LicenseError, LicenseResult};
pub use network::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use registration::{DeviceRegistrar, RegistrationOutcome};
pub use rights::{char_count, Right, RightsConsumption, RightsLedger, SharedConsumption};
pub use service::LcpService;
pub use session::LicenseSession;
pub use status::{StatusReconciler, UrlPresenter};

#[cfg(feature = "online")]
pub use network::ReqwestClient;
