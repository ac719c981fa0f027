//! An opened license.

use crate::cipher::ContentCipher;
use crate::error::{LicenseError, LicenseResult};
use crate::registration::{DeviceRegistrar, RegistrationOutcome};
use crate::rights::{char_count, Right, RightsConsumption, RightsLedger};
use crate::status::{StatusReconciler, UrlPresenter};
use chrono::{DateTime, Utc};
use quire_crypto::ContentKey;
use quire_types::{status_rel, License, Status, StatusDocument};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A license whose content key has been resolved.
///
/// Combines the rights ledger, the device registrar and the status
/// reconciler behind the operations a reading system needs. Every operation
/// first checks that the license is usable; terminal licenses are rejected
/// before any side effect.
pub struct LicenseSession {
    license: License,
    content_key: ContentKey,
    ledger: RightsLedger,
    registrar: DeviceRegistrar,
    reconciler: StatusReconciler,
    cipher: Arc<dyn ContentCipher>,
}

impl fmt::Debug for LicenseSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseSession")
            .field("license", &self.license.id)
            .field("status", &self.reconciler.status())
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl LicenseSession {
    pub(crate) fn new(
        license: License,
        content_key: ContentKey,
        ledger: RightsLedger,
        registrar: DeviceRegistrar,
        reconciler: StatusReconciler,
        cipher: Arc<dyn ContentCipher>,
    ) -> Self {
        Self {
            license,
            content_key,
            ledger,
            registrar,
            reconciler,
            cipher,
        }
    }

    pub fn license(&self) -> &License {
        &self.license
    }

    /// Current status document.
    pub fn status_document(&self) -> Option<StatusDocument> {
        self.reconciler.document()
    }

    /// Current status; `None` when the license has no status document.
    pub fn status(&self) -> Option<Status> {
        self.reconciler.status()
    }

    pub fn is_usable(&self) -> bool {
        self.reconciler.is_usable()
    }

    pub fn consumption(&self) -> RightsConsumption {
        self.ledger.consumption()
    }

    // ── Content ──────────────────────────────────────────────────

    /// Decrypts a publication resource.
    pub fn decrypt(&self, data: &[u8]) -> LicenseResult<Vec<u8>> {
        self.reconciler.check_usable()?;
        self.cipher.decrypt(&self.content_key, data)
    }

    // ── Rights ───────────────────────────────────────────────────

    pub fn can_print(&self) -> bool {
        self.is_usable() && self.ledger.remaining_pages() != Some(0)
    }

    pub fn can_copy(&self) -> bool {
        self.is_usable() && self.ledger.remaining_characters() != Some(0)
    }

    /// Pages left to print; `None` means unbounded.
    pub fn pages_to_print_left(&self) -> Option<u32> {
        self.ledger.remaining_pages()
    }

    /// Characters left to copy; `None` means unbounded.
    pub fn characters_to_copy_left(&self) -> Option<u32> {
        self.ledger.remaining_characters()
    }

    /// Records the printing of `pages` pages.
    pub fn print(&self, pages: u32) -> LicenseResult<()> {
        self.reconciler.check_usable()?;
        if self.ledger.consume_print(pages)? {
            Ok(())
        } else {
            Err(self.exceeded(Right::Print, pages))
        }
    }

    /// Records the copy of `text`.
    pub fn copy(&self, text: &str) -> LicenseResult<()> {
        self.reconciler.check_usable()?;
        if self.ledger.consume_copy(text)? {
            Ok(())
        } else {
            Err(self.exceeded(Right::Copy, char_count(text)))
        }
    }

    fn exceeded(&self, right: Right, requested: u32) -> LicenseError {
        LicenseError::RightsExceeded {
            right,
            requested,
            remaining: self.ledger.remaining(right).unwrap_or(u32::MAX),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    pub fn max_renew_date(&self) -> Option<DateTime<Utc>> {
        self.reconciler.max_renew_date()
    }

    pub fn can_renew_loan(&self) -> bool {
        self.reconciler.can_renew_loan()
    }

    pub fn can_return_publication(&self) -> bool {
        self.reconciler.can_return_publication()
    }

    /// Registers this device for the license. Idempotent.
    pub async fn register_device(&self) -> RegistrationOutcome {
        let link = self.reconciler.action_link(status_rel::REGISTER);
        self.registrar.register(&self.license.id, link.as_ref()).await
    }

    /// Registers before a status action when the authority offers a
    /// register link; without one, the action proceeds unregistered.
    async fn ensure_registered(&self) -> LicenseResult<()> {
        if self.reconciler.action_link(status_rel::REGISTER).is_none() {
            debug!("No register link for {}, skipping registration", self.license.id);
            return Ok(());
        }
        match self.register_device().await {
            RegistrationOutcome::Failed(reason) => Err(LicenseError::RegistrationFailed(reason)),
            RegistrationOutcome::AlreadyRegistered | RegistrationOutcome::Registered(_) => Ok(()),
        }
    }

    /// Extends the loan, optionally up to `end`.
    pub async fn renew_loan(
        &self,
        end: Option<DateTime<Utc>>,
        presenter: &dyn UrlPresenter,
    ) -> LicenseResult<()> {
        self.reconciler.check_renew(end)?;
        self.ensure_registered().await?;
        self.reconciler
            .renew_loan(&self.license, self.registrar.device(), end, presenter)
            .await
    }

    /// Returns the publication. The license is unusable afterwards.
    pub async fn return_publication(&self) -> LicenseResult<()> {
        self.reconciler.check_return()?;
        self.ensure_registered().await?;
        self.reconciler
            .return_publication(self.registrar.device())
            .await
    }
}
