//! Inventory loading against real TOML files on disk.
#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use bigip_config::{AuthMode, ConfigError, device_to_config, load_config_from};
use bigip_core::{AuthCredentials, TlsVerification};

// ── Helpers ─────────────────────────────────────────────────────────

fn setup(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

const INVENTORY: &str = r#"
[defaults]
timeout = 10
workers = 2
auth = "basic"

[devices.lb1]
host = "10.1.1.245"
username = "admin"
password = "admin"
groups = ["prod"]

[devices.lb2]
host = "lb2.example.net"
port = 8443
username = "deployer"
password = "hunter2"
auth = "token"
token_timeout = 3600
validate_certs = true
groups = ["prod", "east"]
"#;

// ── Loading ─────────────────────────────────────────────────────────

#[test]
fn test_loads_defaults_and_devices() {
    let (_dir, path) = setup(INVENTORY);
    let config = load_config_from(&path).unwrap();

    assert_eq!(config.defaults.timeout, 10);
    assert_eq!(config.defaults.workers, 2);
    assert_eq!(config.defaults.port, 443);
    assert_eq!(config.defaults.auth, AuthMode::Basic);
    assert_eq!(
        config.devices.keys().cloned().collect::<Vec<_>>(),
        ["lb1", "lb2"]
    );
    assert_eq!(config.devices["lb2"].groups, ["prod", "east"]);
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert!(config.devices.is_empty());
    assert_eq!(config.defaults.workers, 4);
    assert_eq!(config.defaults.login_provider, "tmos");
}

#[test]
fn test_entries_translate_to_device_configs() {
    let (_dir, path) = setup(INVENTORY);
    let config = load_config_from(&path).unwrap();

    let lb1 = device_to_config("lb1", &config.devices["lb1"], &config.defaults).unwrap();
    assert_eq!(lb1.base_url().unwrap().as_str(), "https://10.1.1.245/");
    assert_eq!(lb1.timeout.as_secs(), 10);
    assert!(matches!(lb1.auth, AuthCredentials::Basic { .. }));

    let lb2 = device_to_config("lb2", &config.devices["lb2"], &config.defaults).unwrap();
    assert_eq!(
        lb2.base_url().unwrap().as_str(),
        "https://lb2.example.net:8443/"
    );
    assert_eq!(lb2.tls, TlsVerification::SystemDefaults);
    assert!(matches!(
        lb2.auth,
        AuthCredentials::Token {
            token_timeout: Some(3600),
            ..
        }
    ));
}

// ── Validation ──────────────────────────────────────────────────────

#[test]
fn test_empty_host_names_the_field() {
    let (_dir, path) = setup(
        r#"
[devices.broken]
host = "  "
"#,
    );
    let err = load_config_from(&path).unwrap_err();

    match err {
        ConfigError::Validation { field, .. } => assert_eq!(field, "devices.broken.host"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_zero_workers_rejected() {
    let (_dir, path) = setup("[defaults]\nworkers = 0\n");
    let err = load_config_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "defaults.workers"));
}

#[test]
fn test_unknown_auth_mode_is_load_error() {
    let (_dir, path) = setup(
        r#"
[devices.lb1]
host = "10.1.1.245"
auth = "kerberos"
"#,
    );
    let err = load_config_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Figment(_)));
}

#[test]
fn test_device_without_credentials() {
    let (_dir, path) = setup(
        r#"
[devices.lb1]
host = "10.1.1.245"
username = "admin"
"#,
    );
    let config = load_config_from(&path).unwrap();
    let result = device_to_config("lb1", &config.devices["lb1"], &config.defaults);

    // Only reachable when no shared password is exported in the test env.
    if std::env::var_os(bigip_config::PASSWORD_ENV).is_none() {
        assert!(matches!(result, Err(ConfigError::NoCredentials { .. })));
    }
}
