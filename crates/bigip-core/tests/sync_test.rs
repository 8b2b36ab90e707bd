// Integration tests for the config-sync engine using wiremock.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bigip_core::{
    ConfigSyncRequest, CoreError, PollPolicy, RetryPolicy, Session, SyncDirection, SyncOutcome,
    SyncStatus, config_sync,
};

const SYNC_STATUS: &str = "/mgmt/tm/cm/sync-status";
const CM: &str = "/mgmt/tm/cm";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Session) {
    let server = MockServer::start().await;
    let session = Session::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        RetryPolicy::disabled(),
    );
    (server, session)
}

fn status_body(status: &str) -> Value {
    json!({
        "kind": "tm:cm:sync-status:sync-statusstats",
        "entries": {
            "https://localhost/mgmt/tm/cm/sync-status/0": {
                "nestedStats": {
                    "entries": {
                        "color": { "description": "green" },
                        "status": { "description": status }
                    }
                }
            }
        }
    })
}

/// Mount `(status, times)` pairs served in order; the last repeats.
async fn mount_statuses(server: &MockServer, statuses: &[(&str, u64)]) {
    let last = statuses.len().saturating_sub(1);
    for (i, (status, times)) in statuses.iter().enumerate() {
        let mock = Mock::given(method("GET"))
            .and(path(SYNC_STATUS))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body(status)));
        if i < last {
            mock.up_to_n_times(*times).mount(server).await;
        } else {
            mock.mount(server).await;
        }
    }
}

async fn mount_trigger(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path(CM))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "kind": "tm:cm:runstate" })))
        .expect(expected)
        .mount(server)
        .await;
}

async fn status_reads(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == SYNC_STATUS)
        .count()
}

fn request(retries: u32) -> ConfigSyncRequest {
    ConfigSyncRequest {
        poll: PollPolicy::config_sync()
            .with_delay(Duration::ZERO)
            .with_retries(retries),
        ..ConfigSyncRequest::new("sync-failover-group")
    }
}

// ── Already consistent ──────────────────────────────────────────────

#[tokio::test]
async fn test_in_sync_triggers_nothing_twice() {
    let (server, session) = setup().await;
    mount_statuses(&server, &[("In Sync", 1)]).await;
    mount_trigger(&server, 0).await;

    let cancel = CancellationToken::new();
    for _ in 0..2 {
        let outcome = config_sync(&session, &request(3), &cancel).await.unwrap();
        assert_eq!(outcome, SyncOutcome::AlreadyConsistent(SyncStatus::InSync));
        assert!(!outcome.changed());
    }
    assert_eq!(status_reads(&server).await, 2);
}

#[tokio::test]
async fn test_standalone_is_consistent() {
    let (server, session) = setup().await;
    mount_statuses(&server, &[("Standalone", 1)]).await;
    mount_trigger(&server, 0).await;

    let outcome = config_sync(&session, &request(3), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, SyncOutcome::AlreadyConsistent(SyncStatus::Standalone));
}

// ── Converging ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_converges_through_pending_states() {
    let (server, session) = setup().await;
    // Entry read plus the first poll see "Changes Pending".
    mount_statuses(
        &server,
        &[
            ("Changes Pending", 2),
            ("Not All Devices Synced", 1),
            ("In Sync", 1),
        ],
    )
    .await;
    Mock::given(method("POST"))
        .and(path(CM))
        .and(body_json(json!({
            "command": "run",
            "utilCmdArgs": "config-sync to-group sync-failover-group"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = config_sync(&session, &request(3), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, SyncOutcome::Converged(SyncStatus::InSync));
    assert!(outcome.changed());
    assert_eq!(status_reads(&server).await, 4);
}

#[tokio::test]
async fn test_direction_and_force_flag_in_trigger() {
    let (server, session) = setup().await;
    mount_statuses(&server, &[("Awaiting Initial Sync", 1), ("In Sync", 1)]).await;
    Mock::given(method("POST"))
        .and(path(CM))
        .and(body_json(json!({
            "command": "run",
            "utilCmdArgs": "config-sync from-group dg1 force-full-load-push"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let req = ConfigSyncRequest {
        device_group: "dg1".into(),
        direction: SyncDirection::FromGroup,
        force_full_load_push: true,
        ..request(5)
    };
    let outcome = config_sync(&session, &req, &CancellationToken::new())
        .await
        .unwrap();
    assert!(outcome.changed());
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_disconnected_fails_without_further_polls() {
    let (server, session) = setup().await;
    mount_statuses(&server, &[("Changes Pending", 1), ("Disconnected", 1)]).await;
    mount_trigger(&server, 1).await;

    let err = config_sync(&session, &request(10), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "The configuration synchronization has failed (Disconnected)."
    );
    assert!(matches!(err, CoreError::ConvergenceFailed { .. }));
    // Entry read plus exactly one poll.
    assert_eq!(status_reads(&server).await, 2);
}

#[tokio::test]
async fn test_unrecognized_status_is_failure() {
    let (server, session) = setup().await;
    mount_statuses(&server, &[("Changes Pending", 1), ("Sync Failure", 1)]).await;
    mount_trigger(&server, 1).await;

    let err = config_sync(&session, &request(10), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "The configuration synchronization has failed (Sync Failure)."
    );
}

#[tokio::test]
async fn test_exhaustion_names_last_state() {
    let (server, session) = setup().await;
    mount_statuses(&server, &[("Changes Pending", 1), ("Syncing", 1)]).await;
    mount_trigger(&server, 1).await;

    let err = config_sync(&session, &request(4), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "The configuration synchronization has reached maximum retries (Syncing)."
    );
    assert_eq!(status_reads(&server).await, 5);
}

#[tokio::test]
async fn test_invalid_group_sends_nothing() {
    let (server, session) = setup().await;

    let err = config_sync(
        &session,
        &ConfigSyncRequest::new("two words"),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CoreError::Validation { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_zero_budget_sends_nothing() {
    let (server, session) = setup().await;
    mount_statuses(&server, &[("Changes Pending", 1)]).await;
    mount_trigger(&server, 0).await;

    let err = config_sync(&session, &request(0), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Poll retries must be at least 1.");
    assert!(server.received_requests().await.unwrap().is_empty());
}
