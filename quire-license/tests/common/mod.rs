//! Shared test helpers for license engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use quire_crypto::{encrypt, hash_passphrase, seal_key_check, wrap_content_key, ContentKey};
use quire_license::network::mock::MockHttpClient;
use quire_license::{
    Authenticating, AuthenticationReason, AuthenticationRequest, DeviceIdentity, LcpConfig,
    LcpService, UrlPresenter,
};
use quire_storage::{KeyValueStore, MemoryStore, StorageError, StorageResult};
use quire_types::{
    ContentKeyInfo, DeviceId, Encryption, KeyDerivation, License, LicenseId, Link, PotentialRights,
    Rights, Status, StatusDocument, User, UserKeyInfo,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

pub const PASSPHRASE: &str = "correct horse battery staple";
pub const LICENSE_ID: &str = "lic-1";
pub const LSD: &str = "https://lsd.test/licenses";

pub fn issued() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// End of the loan as published in test status documents.
pub fn max_renew_date() -> DateTime<Utc> {
    issued() + Duration::days(60)
}

// ── Licenses ─────────────────────────────────────────────────────

/// Builds a license whose content key is wrapped with `passphrase`.
pub struct LicenseBuilder {
    id: String,
    passphrase: String,
    rights: Rights,
    user_id: Option<String>,
    content_key: ContentKey,
}

impl LicenseBuilder {
    pub fn new() -> Self {
        Self {
            id: LICENSE_ID.to_string(),
            passphrase: PASSPHRASE.to_string(),
            rights: Rights::default(),
            user_id: None,
            content_key: ContentKey::generate(),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn passphrase(mut self, passphrase: &str) -> Self {
        self.passphrase = passphrase.to_string();
        self
    }

    pub fn print(mut self, pages: u32) -> Self {
        self.rights.print = Some(pages);
        self
    }

    pub fn copy(mut self, chars: u32) -> Self {
        self.rights.copy = Some(chars);
        self
    }

    pub fn user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn content_key(mut self, key: ContentKey) -> Self {
        self.content_key = key;
        self
    }

    pub fn build(self) -> License {
        let derivation = KeyDerivation::Sha256;
        let user_key = hash_passphrase(&self.passphrase, &derivation).unwrap();
        License {
            id: LicenseId::new(self.id.clone()).unwrap(),
            provider: "https://provider.test".to_string(),
            issued: issued(),
            updated: None,
            encryption: Encryption {
                profile: "http://readium.org/lcp/basic-profile".to_string(),
                content_key: ContentKeyInfo {
                    encrypted_value: wrap_content_key(&user_key, &self.content_key).unwrap(),
                },
                user_key: UserKeyInfo {
                    text_hint: "The usual one".to_string(),
                    key_check: seal_key_check(&user_key, &self.id).unwrap(),
                    derivation,
                },
            },
            links: vec![
                Link::new("hint", "https://provider.test/hint"),
                Link::new("status", format!("{LSD}/{}/status", self.id))
                    .with_media_type("application/vnd.readium.license.status.v1.0+json"),
            ],
            rights: self.rights,
            user: self.user_id.map(|id| User {
                id: Some(id),
                email: None,
                name: None,
            }),
        }
    }
}

/// Hex hash of `passphrase` as persisted by the engine.
pub fn hashed(passphrase: &str) -> String {
    hash_passphrase(passphrase, &KeyDerivation::Sha256)
        .unwrap()
        .to_hex()
}

/// Encrypts `plaintext` the way publication resources are stored.
pub fn encrypt_resource(key: &ContentKey, plaintext: &[u8]) -> Vec<u8> {
    encrypt(key.secret(), plaintext).unwrap().to_bytes()
}

// ── Status documents ─────────────────────────────────────────────

pub fn register_url(id: &str) -> String {
    format!("{LSD}/{id}/register")
}

pub fn renew_url(id: &str) -> String {
    format!("{LSD}/{id}/renew")
}

pub fn return_url(id: &str) -> String {
    format!("{LSD}/{id}/return")
}

pub fn status_url(id: &str) -> String {
    format!("{LSD}/{id}/status")
}

/// Status document with register, renew and return links.
pub fn status_document(id: &str, status: Status) -> StatusDocument {
    StatusDocument {
        id: id.to_string(),
        status,
        message: None,
        updated: None,
        links: vec![
            Link::new("register", format!("{}{{?id,name}}", register_url(id))).templated(),
            Link::new("renew", format!("{}{{?end,id,name}}", renew_url(id))).templated(),
            Link::new("return", format!("{}{{?id,name}}", return_url(id))).templated(),
            Link::new("license", format!("https://provider.test/licenses/{id}")),
        ],
        potential_rights: Some(PotentialRights {
            end: Some(max_renew_date()),
        }),
        events: Vec::new(),
    }
}

/// Status document whose renew link is a web page.
pub fn html_renew_status(id: &str) -> StatusDocument {
    let mut document = status_document(id, Status::Active);
    document.links.retain(|l| !l.has_rel("renew"));
    document.links.push(
        Link::new("renew", format!("https://provider.test/renew/{id}"))
            .with_media_type("text/html"),
    );
    document
}

pub fn status_json(document: &StatusDocument) -> Vec<u8> {
    serde_json::to_vec(document).unwrap()
}

// ── Collaborators ────────────────────────────────────────────────

/// Answers passphrase requests from a script and records them.
#[derive(Default)]
pub struct ScriptedAuthenticator {
    answers: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<(AuthenticationReason, u32, bool)>>,
}

impl ScriptedAuthenticator {
    /// Answers with `answers` in order, then cancels.
    pub fn new(answers: &[Option<&str>]) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.iter().map(|a| a.map(str::to_string)).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn always(passphrase: &str) -> Arc<Self> {
        Self::new(&[Some(passphrase)])
    }

    pub fn cancelling() -> Arc<Self> {
        Self::new(&[])
    }

    /// `(reason, attempt, allow_user_interaction)` of every request.
    pub fn requests(&self) -> Vec<(AuthenticationReason, u32, bool)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn reasons(&self) -> Vec<AuthenticationReason> {
        self.requests().into_iter().map(|(r, _, _)| r).collect()
    }
}

#[async_trait]
impl Authenticating for ScriptedAuthenticator {
    async fn retrieve_passphrase(&self, request: &AuthenticationRequest<'_>) -> Option<String> {
        self.requests.lock().unwrap().push((
            request.reason,
            request.attempt,
            request.allow_user_interaction,
        ));
        self.answers.lock().unwrap().pop_front().flatten()
    }
}

/// Never answers.
pub struct PendingAuthenticator;

#[async_trait]
impl Authenticating for PendingAuthenticator {
    async fn retrieve_passphrase(&self, _request: &AuthenticationRequest<'_>) -> Option<String> {
        std::future::pending().await
    }
}

/// Records presented URLs.
#[derive(Default)]
pub struct RecordingPresenter {
    urls: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UrlPresenter for RecordingPresenter {
    async fn present(&self, url: &str) {
        self.urls.lock().unwrap().push(url.to_string());
    }
}

// ── Storage ──────────────────────────────────────────────────────

/// In-memory store whose writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    reject_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected(key.to_string()));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.inner.remove(key)
    }
}

// ── Service ──────────────────────────────────────────────────────

pub fn test_device() -> DeviceIdentity {
    DeviceIdentity::new(DeviceId::new("device-1").unwrap(), "Test Reader")
}

pub struct Harness {
    pub service: LcpService,
    pub store: Arc<FlakyStore>,
    pub http: Arc<MockHttpClient>,
}

pub fn harness(authentication: Arc<dyn Authenticating>) -> Harness {
    harness_with_store(FlakyStore::new(), authentication)
}

/// Installs a test log subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn harness_with_store(store: Arc<FlakyStore>, authentication: Arc<dyn Authenticating>) -> Harness {
    init_tracing();
    let http = Arc::new(MockHttpClient::new());
    let service = LcpService::new(LcpConfig::default(), store.clone(), http.clone(), authentication)
        .unwrap()
        .with_device(test_device());
    Harness {
        service,
        store,
        http,
    }
}
