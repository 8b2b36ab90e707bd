// Integration tests for `Session` using wiremock.
#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bigip_api::{
    Error, PackageOperation, RetryPolicy, Session, WireExchange, WireHook,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        backoff_factor: Duration::ZERO,
        ..RetryPolicy::default()
    }
}

async fn setup() -> (MockServer, Session) {
    let server = MockServer::start().await;
    let session = Session::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        fast_retry(),
    );
    (server, session)
}

fn stats(self_link: &str, field: &str, description: &str) -> serde_json::Value {
    let mut nested = serde_json::Map::new();
    nested.insert(field.to_owned(), json!({ "description": description }));
    let mut entries = serde_json::Map::new();
    entries.insert(
        self_link.to_owned(),
        json!({ "nestedStats": { "entries": nested } }),
    );
    json!({ "entries": entries })
}

#[derive(Default)]
struct Recorder(Mutex<Vec<(String, u16, u32)>>);

impl WireHook for Recorder {
    fn record(&self, exchange: &WireExchange<'_>) {
        self.0
            .lock()
            .unwrap()
            .push((exchange.method.to_string(), exchange.status, exchange.attempt));
    }
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_attaches_token_header() {
    let (server, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/mgmt/shared/authn/login"))
        .and(body_json(json!({
            "username": "admin",
            "password": "secret",
            "loginProviderName": "tmos"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "username": "admin",
            "token": { "token": "TOKEN123", "timeout": 1200 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/mgmt/tm/sys/version"))
        .and(header("X-F5-Auth-Token", "TOKEN123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stats(
            "https://localhost/mgmt/tm/sys/version/0",
            "Version",
            "13.1.1.4",
        )))
        .expect(1)
        .mount(&server)
        .await;

    session
        .login("admin", &SecretString::from("secret"), "tmos")
        .await
        .unwrap();
    assert_eq!(session.token().unwrap().expose_secret(), "TOKEN123");
    assert_eq!(session.system_version().await.unwrap(), "13.1.1.4");
}

#[tokio::test]
async fn test_login_rejected_is_authentication_error() {
    let (server, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/mgmt/shared/authn/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad creds"))
        .mount(&server)
        .await;

    let err = session
        .login("admin", &SecretString::from("wrong"), "tmos")
        .await
        .unwrap_err();
    assert!(err.is_auth_failure(), "expected auth failure, got {err:?}");
    assert!(session.token().is_none());
}

#[tokio::test]
async fn test_basic_auth_header() {
    let (server, mut session) = setup().await;
    session.use_basic_auth("admin", SecretString::from("admin"));

    Mock::given(method("GET"))
        .and(path("/mgmt/tm/cm/failover-status"))
        .and(header("authorization", "Basic YWRtaW46YWRtaW4="))
        .respond_with(ResponseTemplate::new(200).set_body_json(stats(
            "https://localhost/mgmt/tm/cm/failover-status/0",
            "status",
            "ACTIVE",
        )))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(session.failover_status().await.unwrap(), "ACTIVE");
    assert!(session.token().is_none());
}

#[tokio::test]
async fn test_extend_and_revoke_token() {
    let (server, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/mgmt/shared/authn/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "token": { "token": "T1" } })),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/mgmt/shared/authz/tokens/T1"))
        .and(body_json(json!({ "timeout": 3600 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "timeout": 3600 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/mgmt/shared/authz/tokens/T1"))
        .and(header("X-F5-Auth-Token", "T1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    session
        .login("admin", &SecretString::from("secret"), "tmos")
        .await
        .unwrap();
    session.extend_token(3600).await.unwrap();

    assert!(session.revoke_token().await.unwrap());
    assert!(session.token().is_none());
    // Second revoke has nothing to do.
    assert!(!session.revoke_token().await.unwrap());
}

// ── Retry layer ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_retries_transient_status_then_succeeds() {
    let (server, session) = setup().await;

    Mock::given(method("GET"))
        .and(path("/mgmt/tm/cm/sync-status"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mgmt/tm/cm/sync-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stats(
            "https://localhost/mgmt/tm/cm/sync-status/0",
            "status",
            "In Sync",
        )))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(session.sync_status().await.unwrap(), "In Sync");
}

#[tokio::test]
async fn test_retry_budget_exhausted() {
    let (server, session) = setup().await;

    Mock::given(method("GET"))
        .and(path("/mgmt/tm/cm/sync-status"))
        .respond_with(ResponseTemplate::new(502))
        .expect(4)
        .mount(&server)
        .await;

    let err = session.sync_status().await.unwrap_err();
    assert!(err.is_transient());
    match err {
        Error::RetriesExhausted {
            attempts, status, ..
        } => {
            assert_eq!(attempts, 4);
            assert_eq!(status, 502);
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_post_is_not_retried() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/mgmt/tm/cm"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(1)
        .mount(&server)
        .await;

    let err = session
        .run_config_sync("config-sync to-group dg")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_not_found_fails_fast() {
    let (server, session) = setup().await;

    Mock::given(method("GET"))
        .and(path("/mgmt/shared/appsvcs/info"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not installed"))
        .expect(1)
        .mount(&server)
        .await;

    let err = session
        .get::<serde_json::Value>("/mgmt/shared/appsvcs/info")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    match err {
        Error::Http { body, .. } => assert_eq!(body, "not installed"),
        other => panic!("expected Http, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wire_hook_sees_every_attempt() {
    let (server, session) = setup().await;
    let recorder = Arc::new(Recorder::default());
    let session = session.with_wire_hook(recorder.clone());

    Mock::given(method("GET"))
        .and(path("/mgmt/tm/sys/version"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mgmt/tm/sys/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stats(
            "https://localhost/mgmt/tm/sys/version/0",
            "Version",
            "15.1.0",
        )))
        .mount(&server)
        .await;

    assert_eq!(session.system_version().await.unwrap(), "15.1.0");

    let seen = recorder.0.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![("GET".to_owned(), 500, 0), ("GET".to_owned(), 200, 1)]
    );
}

// ── Cluster management ──────────────────────────────────────────────

#[tokio::test]
async fn test_run_config_sync_body() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/mgmt/tm/cm"))
        .and(body_json(json!({
            "command": "run",
            "utilCmdArgs": "config-sync to-group sync-failover-group"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "kind": "tm:cm:runstate" })))
        .expect(1)
        .mount(&server)
        .await;

    session
        .run_config_sync("config-sync to-group sync-failover-group")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_sync_status_without_status_entry() {
    let (server, session) = setup().await;

    Mock::given(method("GET"))
        .and(path("/mgmt/tm/cm/sync-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "entries": {} })))
        .mount(&server)
        .await;

    let err = session.sync_status().await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedResponse(_)));
}

// ── Utilities ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_unix_ls_and_rm() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/mgmt/tm/util/unix-ls"))
        .and(body_json(json!({
            "command": "run",
            "utilCmdArgs": "/var/config/rest/downloads/pkg.rpm"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "commandResult": "/bin/ls: cannot access /var/config/rest/downloads/pkg.rpm: No such file or directory\n"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mgmt/tm/util/unix-rm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "command": "run" })))
        .expect(1)
        .mount(&server)
        .await;

    let listing = session
        .unix_ls("/var/config/rest/downloads/pkg.rpm")
        .await
        .unwrap();
    assert!(listing.contains("No such file or directory"));
    session
        .unix_rm("/var/config/rest/downloads/pkg.rpm")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unix_ls_without_command_result() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/mgmt/tm/util/unix-ls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "command": "run" })))
        .mount(&server)
        .await;

    let err = session.unix_ls("/tmp").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unexpected response: Error while executing the command."
    );
}

#[tokio::test]
async fn test_upload_sets_content_range() {
    let (server, session) = setup().await;
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("pkg.rpm");
    std::fs::write(&local, b"hello").unwrap();

    Mock::given(method("POST"))
        .and(path("/mgmt/shared/file-transfer/uploads/pkg.rpm"))
        .and(header("content-range", "0-4/5"))
        .and(header("content-type", "application/octet-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "remainingByteCount": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let uploaded = session.upload_file(&local, None).await.unwrap();
    assert_eq!(uploaded.name, "pkg.rpm");
    assert_eq!(uploaded.remote_path, "/var/config/rest/downloads/pkg.rpm");
    assert_eq!(uploaded.size, 5);
    assert_eq!(uploaded.chunks, 1);
}

#[tokio::test]
async fn test_upload_empty_file_sends_nothing() {
    let (server, session) = setup().await;
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("empty.rpm");
    std::fs::write(&local, b"").unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let uploaded = session
        .upload_file(&local, Some("renamed.rpm"))
        .await
        .unwrap();
    assert_eq!(uploaded.name, "renamed.rpm");
    assert_eq!(uploaded.chunks, 0);
}

// ── Package tasks ───────────────────────────────────────────────────

#[tokio::test]
async fn test_package_task_roundtrip() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/mgmt/shared/iapp/package-management-tasks"))
        .and(body_json(json!({ "operation": "UNINSTALL", "packageName": "f5-appsvcs-3.20.0-3.noarch" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "task-1", "status": "CREATED", "operation": "UNINSTALL"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mgmt/shared/iapp/package-management-tasks/task-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "task-1", "status": "FAILED", "errorMessage": "package not installed"
        })))
        .mount(&server)
        .await;

    let created = session
        .create_package_task(&PackageOperation::Uninstall {
            package_name: "f5-appsvcs-3.20.0-3.noarch".into(),
        })
        .await
        .unwrap();
    assert_eq!(created.id, "task-1");
    assert_eq!(created.status, "CREATED");

    let task = session.package_task("task-1").await.unwrap();
    assert_eq!(task.status, "FAILED");
    assert_eq!(task.error_message.as_deref(), Some("package not installed"));
}

#[tokio::test]
async fn test_revoking_expired_token_does_not_log_in_again() {
    let (server, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/mgmt/shared/authn/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "token": { "token": "T1" } })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/mgmt/shared/authz/tokens/T1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    session
        .login("admin", &SecretString::from("secret"), "tmos")
        .await
        .unwrap();

    let err = session.revoke_token().await.unwrap_err();
    assert!(err.is_auth_failure());
    assert!(session.token().is_none());
}
