mod common;

use common::{register_url, status_document, test_device, FlakyStore, LICENSE_ID};
use quire_license::network::mock::MockHttpClient;
use quire_license::{keys, DeviceRegistrar, HttpMethod, RegistrationOutcome};
use quire_storage::KeyValueStore;
use quire_types::{status_rel, LicenseId, Link, Status};
use std::sync::Arc;

struct Fixture {
    registrar: Arc<DeviceRegistrar>,
    http: Arc<MockHttpClient>,
    store: Arc<FlakyStore>,
    license: LicenseId,
    link: Link,
}

fn fixture() -> Fixture {
    let http = Arc::new(MockHttpClient::new());
    let store = FlakyStore::new();
    let registrar = Arc::new(DeviceRegistrar::new(test_device(), http.clone(), store.clone()));
    let link = status_document(LICENSE_ID, Status::Ready)
        .link(status_rel::REGISTER)
        .cloned()
        .unwrap();
    Fixture {
        registrar,
        http,
        store,
        license: LicenseId::new(LICENSE_ID).unwrap(),
        link,
    }
}

fn flag(f: &Fixture) -> Option<String> {
    f.store
        .get(&keys::device_registered(&f.license, &test_device().id))
        .unwrap()
}

#[tokio::test]
async fn successful_registration_sets_flag() {
    let f = fixture();
    f.http
        .respond(HttpMethod::Post, register_url(LICENSE_ID), 200, b"{\"ok\":true}".to_vec());

    let outcome = f.registrar.register(&f.license, Some(&f.link)).await;

    assert_eq!(outcome, RegistrationOutcome::Registered(b"{\"ok\":true}".to_vec()));
    assert_eq!(flag(&f).as_deref(), Some("true"));
    assert!(f.registrar.is_registered(&f.license).unwrap());
}

#[tokio::test]
async fn registration_sends_device_identity() {
    let f = fixture();
    f.http.respond(HttpMethod::Post, register_url(LICENSE_ID), 200, Vec::new());

    f.registrar.register(&f.license, Some(&f.link)).await;

    let requests = f.http.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(
        request.url,
        format!("{}?id=device-1&name=Test%20Reader", register_url(LICENSE_ID))
    );
    assert_eq!(request.param("id"), Some("device-1"));
    assert_eq!(request.param("name"), Some("Test Reader"));
}

#[tokio::test]
async fn second_registration_skips_network() {
    let f = fixture();
    f.http.respond(HttpMethod::Post, register_url(LICENSE_ID), 200, Vec::new());

    f.registrar.register(&f.license, Some(&f.link)).await;
    let outcome = f.registrar.register(&f.license, Some(&f.link)).await;

    assert_eq!(outcome, RegistrationOutcome::AlreadyRegistered);
    assert_eq!(f.http.request_count(), 1);
}

#[tokio::test]
async fn conflict_means_already_registered() {
    let f = fixture();
    f.http.respond(HttpMethod::Post, register_url(LICENSE_ID), 409, Vec::new());

    let outcome = f.registrar.register(&f.license, Some(&f.link)).await;

    assert_eq!(outcome, RegistrationOutcome::AlreadyRegistered);
    assert_eq!(flag(&f).as_deref(), Some("true"));
}

#[tokio::test]
async fn rejected_registration_leaves_flag_unset() {
    let f = fixture();
    f.http.respond(HttpMethod::Post, register_url(LICENSE_ID), 500, Vec::new());

    let outcome = f.registrar.register(&f.license, Some(&f.link)).await;

    assert_eq!(outcome, RegistrationOutcome::Failed("HTTP 500".to_string()));
    assert!(!outcome.is_registered());
    assert_eq!(flag(&f), None);
}

#[tokio::test]
async fn transport_failure_leaves_flag_unset() {
    let f = fixture();
    f.http.fail(HttpMethod::Post, register_url(LICENSE_ID), "connection reset");

    let outcome = f.registrar.register(&f.license, Some(&f.link)).await;

    assert!(matches!(outcome, RegistrationOutcome::Failed(reason) if reason.contains("connection reset")));
    assert_eq!(flag(&f), None);
}

#[tokio::test]
async fn missing_link_fails_without_network() {
    let f = fixture();

    let outcome = f.registrar.register(&f.license, None).await;

    assert!(matches!(outcome, RegistrationOutcome::Failed(_)));
    assert_eq!(f.http.request_count(), 0);
}

#[tokio::test]
async fn failed_flag_write_still_reports_registration() {
    let f = fixture();
    f.http.respond(HttpMethod::Post, register_url(LICENSE_ID), 201, Vec::new());
    f.store.reject_writes(true);

    let outcome = f.registrar.register(&f.license, Some(&f.link)).await;

    assert!(outcome.is_registered());
    assert_eq!(flag(&f), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_send_one_request() {
    let f = fixture();
    f.http.respond(HttpMethod::Post, register_url(LICENSE_ID), 200, Vec::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registrar = f.registrar.clone();
            let license = f.license.clone();
            let link = f.link.clone();
            tokio::spawn(async move { registrar.register(&license, Some(&link)).await })
        })
        .collect();

    let mut registered = 0;
    for handle in handles {
        match handle.await.unwrap() {
            RegistrationOutcome::Registered(_) => registered += 1,
            RegistrationOutcome::AlreadyRegistered => {}
            RegistrationOutcome::Failed(reason) => panic!("registration failed: {reason}"),
        }
    }

    assert_eq!(registered, 1);
    assert_eq!(f.http.request_count(), 1);
}
