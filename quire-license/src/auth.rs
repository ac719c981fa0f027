//! Passphrase resolution.
//!
//! A license's content key is wrapped with a user key derived from the
//! user's passphrase. [`PassphraseAuthenticator`] finds that passphrase by
//! trying, in order:
//!
//! 1. the passphrase last verified by this authenticator;
//! 2. the hashed passphrase persisted for the license;
//! 3. hashed passphrases that opened other licenses of the same user;
//! 4. the [`Authenticating`] provider, asked repeatedly until it supplies a
//!    valid passphrase or cancels.
//!
//! Nothing is persisted until a candidate has been verified against the
//! license's key check.

use crate::error::{LicenseError, LicenseResult};
use crate::keys;
use async_trait::async_trait;
use quire_crypto::{hash_passphrase, unwrap_content_key, verify_key_check, ContentKey, UserKey};
use quire_storage::{load_json, save_json, KeyValueStore};
use quire_types::{license_rel, KeyDerivation, License, Link, User};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Why the provider is being asked for a passphrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthenticationReason {
    /// No stored passphrase was available for this license.
    PassphraseNotFound,
    /// The stored or previously supplied passphrase did not open the license.
    InvalidPassphrase,
}

/// Read-only view of a license handed to the authentication provider.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedLicense<'a> {
    document: &'a License,
}

impl<'a> AuthenticatedLicense<'a> {
    pub fn new(document: &'a License) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &'a License {
        self.document
    }

    /// Passphrase hint chosen by the provider.
    pub fn hint(&self) -> &'a str {
        &self.document.encryption.user_key.text_hint
    }

    /// Page where the user can recover a forgotten passphrase.
    pub fn hint_link(&self) -> Option<&'a Link> {
        self.document.link(license_rel::HINT)
    }

    pub fn support_links(&self) -> Vec<&'a Link> {
        self.document.links(license_rel::SUPPORT)
    }

    pub fn provider(&self) -> &'a str {
        &self.document.provider
    }

    pub fn user(&self) -> Option<&'a User> {
        self.document.user.as_ref()
    }
}

/// A request for the user's passphrase.
#[derive(Debug, Clone)]
pub struct AuthenticationRequest<'a> {
    pub license: AuthenticatedLicense<'a>,
    pub reason: AuthenticationReason,
    /// Whether the provider may prompt the user.
    pub allow_user_interaction: bool,
    /// 1 for the first request of a resolution, incremented on each retry.
    pub attempt: u32,
}

/// Supplies passphrases, typically by prompting the user.
#[async_trait]
pub trait Authenticating: Send + Sync {
    /// Returns a clear or hex-hashed passphrase, or `None` to cancel.
    async fn retrieve_passphrase(&self, request: &AuthenticationRequest<'_>) -> Option<String>;
}

/// Resolves the content key of licenses by finding their passphrase.
pub struct PassphraseAuthenticator {
    store: Arc<dyn KeyValueStore>,
    authentication: Arc<dyn Authenticating>,
    allow_user_interaction: bool,
    session: Mutex<Option<UserKey>>,
}

impl PassphraseAuthenticator {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        authentication: Arc<dyn Authenticating>,
        allow_user_interaction: bool,
    ) -> Self {
        Self {
            store,
            authentication,
            allow_user_interaction,
            session: Mutex::new(None),
        }
    }

    /// Resolves the content key of `license`.
    ///
    /// Fails with [`LicenseError::AuthenticationCancelled`] when the provider
    /// cancels, in which case nothing was persisted.
    pub async fn resolve(&self, license: &License) -> LicenseResult<ContentKey> {
        let candidates = self.stored_candidates(license)?;
        for candidate in &candidates {
            if let Some(content_key) = open(license, candidate)? {
                debug!("Opened license {} with a stored passphrase", license.id);
                self.remember(license, candidate);
                return Ok(content_key);
            }
        }

        let mut reason = if candidates.is_empty() {
            AuthenticationReason::PassphraseNotFound
        } else {
            AuthenticationReason::InvalidPassphrase
        };
        let mut attempt = 1;

        loop {
            let request = AuthenticationRequest {
                license: AuthenticatedLicense::new(license),
                reason,
                allow_user_interaction: self.allow_user_interaction,
                attempt,
            };
            debug!(
                "Requesting passphrase for license {} ({:?}, attempt {})",
                license.id, reason, attempt
            );

            let Some(passphrase) = self.authentication.retrieve_passphrase(&request).await else {
                info!("Passphrase request cancelled for license {}", license.id);
                return Err(LicenseError::AuthenticationCancelled);
            };

            match self.check_passphrase(license, &passphrase) {
                Ok(content_key) => return Ok(content_key),
                Err(LicenseError::InvalidPassphrase) => {
                    warn!("Invalid passphrase for license {}", license.id);
                    reason = AuthenticationReason::InvalidPassphrase;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Verifies `passphrase` against `license` and persists it on success.
    ///
    /// The passphrase may be given in clear or already hashed (hex).
    pub fn check_passphrase(&self, license: &License, passphrase: &str) -> LicenseResult<ContentKey> {
        let derivation = &license.encryption.user_key.derivation;
        for user_key in candidate_keys(passphrase, derivation)? {
            if let Some(content_key) = open(license, &user_key)? {
                info!("Passphrase verified for license {}", license.id);
                self.remember(license, &user_key);
                return Ok(content_key);
            }
        }
        Err(LicenseError::InvalidPassphrase)
    }

    fn stored_candidates(&self, license: &License) -> LicenseResult<Vec<UserKey>> {
        let mut hashes = Vec::new();
        if let Some(key) = self.session.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            hashes.push(key.to_hex());
        }
        if let Some(hash) = self.store.get(&keys::passphrase(&license.id))? {
            hashes.push(hash);
        }
        if let Some(user_id) = user_id(license) {
            let known: Vec<String> =
                load_json(self.store.as_ref(), &keys::user_passphrases(user_id))?.unwrap_or_default();
            hashes.extend(known);
        }

        let mut candidates: Vec<UserKey> = Vec::with_capacity(hashes.len());
        let mut seen: Vec<String> = Vec::with_capacity(hashes.len());
        for hash in hashes {
            if seen.contains(&hash) {
                continue;
            }
            match UserKey::from_hex(&hash) {
                Ok(key) => candidates.push(key),
                Err(e) => warn!("Ignoring malformed stored passphrase: {}", e),
            }
            seen.push(hash);
        }
        Ok(candidates)
    }

    /// Caches and persists a verified user key. Persistence is best effort:
    /// the key has already been verified, so a failed write only means the
    /// user may be asked again next time.
    fn remember(&self, license: &License, user_key: &UserKey) {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(user_key.clone());

        let hash = user_key.to_hex();
        if let Err(e) = self.store.set(&keys::passphrase(&license.id), &hash) {
            warn!("Failed to persist passphrase of license {}: {}", license.id, e);
        }

        let Some(user_id) = user_id(license) else {
            return;
        };
        let key = keys::user_passphrases(user_id);
        let result = load_json::<Vec<String>>(self.store.as_ref(), &key).and_then(|known| {
            let mut known = known.unwrap_or_default();
            if known.contains(&hash) {
                return Ok(());
            }
            known.push(hash);
            save_json(self.store.as_ref(), &key, &known)
        });
        if let Err(e) = result {
            warn!("Failed to persist passphrase of user {}: {}", user_id, e);
        }
    }
}

fn user_id(license: &License) -> Option<&str> {
    license
        .user
        .as_ref()
        .and_then(|u| u.id.as_deref())
        .filter(|id| !id.is_empty())
}

/// A supplied passphrase may already be a hex hash; try it both ways.
fn candidate_keys(passphrase: &str, derivation: &KeyDerivation) -> LicenseResult<Vec<UserKey>> {
    let mut keys = Vec::with_capacity(2);
    if let Ok(hashed) = UserKey::from_hex(passphrase) {
        keys.push(hashed);
    }
    keys.push(hash_passphrase(passphrase, derivation)?);
    Ok(keys)
}

/// Returns the content key if `user_key` opens `license`.
fn open(license: &License, user_key: &UserKey) -> LicenseResult<Option<ContentKey>> {
    let user_key_info = &license.encryption.user_key;
    if !verify_key_check(user_key, &user_key_info.key_check, license.id.as_str())? {
        return Ok(None);
    }
    let content_key = unwrap_content_key(user_key, &license.encryption.content_key.encrypted_value)?;
    Ok(Some(content_key))
}
