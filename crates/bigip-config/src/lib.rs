//! Device inventory for BIG-IP tools.
//!
//! TOML inventory (`[defaults]` plus `[devices.<name>]`), credential
//! resolution (env + keyring + plaintext), device selection by name or
//! group, and translation to `bigip_core::DeviceConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use bigip_core::{AuthCredentials, DeviceConfig, TlsVerification};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "BIGIP_CONFIG";

/// Fallback password for every device when no per-device source is set.
pub const PASSWORD_ENV: &str = "BIGIP_PASSWORD";

/// Fallback username for devices without one.
pub const USERNAME_ENV: &str = "BIGIP_USERNAME";

const KEYRING_SERVICE: &str = "bigip";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for device '{device}'")]
    NoCredentials { device: String },

    #[error("device '{name}' is not in the inventory (available: {available})")]
    UnknownDevice { name: String, available: String },

    #[error("group '{name}' has no devices")]
    UnknownGroup { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level inventory.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Values every device inherits unless it overrides them.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named devices, in name order.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceEntry>,
}

/// Authentication scheme for a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Static `Authorization: Basic` header.
    Basic,
    /// Login exchange, token revoked on close.
    #[default]
    Token,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub validate_certs: bool,

    #[serde(default)]
    pub auth: AuthMode,

    #[serde(default = "default_login_provider")]
    pub login_provider: String,

    /// Requested token lifetime in seconds.
    pub token_timeout: Option<u32>,

    /// Devices processed concurrently by fleet commands.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Dump HTTP exchanges at trace level.
    #[serde(default)]
    pub debug: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            port: default_port(),
            timeout: default_timeout(),
            validate_certs: false,
            auth: AuthMode::default(),
            login_provider: default_login_provider(),
            token_timeout: None,
            workers: default_workers(),
            debug: false,
        }
    }
}

fn default_port() -> u16 {
    443
}
fn default_timeout() -> u64 {
    5
}
fn default_login_provider() -> String {
    "tmos".into()
}
fn default_workers() -> usize {
    4
}

/// One device in the inventory. Unset fields fall back to `[defaults]`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeviceEntry {
    /// Hostname, IP address, or full management URL.
    pub host: String,

    pub port: Option<u16>,

    pub username: Option<String>,

    /// Password (plaintext; prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    pub auth: Option<AuthMode>,

    pub login_provider: Option<String>,

    pub token_timeout: Option<u32>,

    pub validate_certs: Option<bool>,

    /// Path to a custom CA certificate (PEM).
    pub ca_cert: Option<PathBuf>,

    pub timeout: Option<u64>,

    /// Group memberships, for `--group` selection.
    #[serde(default)]
    pub groups: Vec<String>,

    pub debug: Option<bool>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `BIGIP_CONFIG`, then platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "bigip", "bigip").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("bigip");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the inventory from `path` merged with `BIGIP_`-prefixed env vars.
///
/// Nested keys use a double underscore: `BIGIP_DEFAULTS__WORKERS=8`.
/// A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BIGIP_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load the inventory from the canonical path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.workers == 0 {
            return Err(ConfigError::Validation {
                field: "defaults.workers".into(),
                reason: "must be at least 1".into(),
            });
        }
        for (name, entry) in &self.devices {
            if entry.host.trim().is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("devices.{name}.host"),
                    reason: "must not be empty".into(),
                });
            }
            if entry.port == Some(0) {
                return Err(ConfigError::Validation {
                    field: format!("devices.{name}.port"),
                    reason: "must be between 1 and 65535".into(),
                });
            }
            if entry.timeout == Some(0) {
                return Err(ConfigError::Validation {
                    field: format!("devices.{name}.timeout"),
                    reason: "must be at least 1 second".into(),
                });
            }
        }
        Ok(())
    }

    /// Pick devices by name and by group membership.
    ///
    /// With neither names nor groups every device is selected. Results keep
    /// inventory order and never repeat a device.
    pub fn select(
        &self,
        names: &[String],
        groups: &[String],
    ) -> Result<Vec<(&str, &DeviceEntry)>, ConfigError> {
        if names.is_empty() && groups.is_empty() {
            return Ok(self
                .devices
                .iter()
                .map(|(name, entry)| (name.as_str(), entry))
                .collect());
        }

        for name in names {
            if !self.devices.contains_key(name) {
                return Err(ConfigError::UnknownDevice {
                    name: name.clone(),
                    available: self.device_names(),
                });
            }
        }
        for group in groups {
            if !self.devices.values().any(|e| e.groups.contains(group)) {
                return Err(ConfigError::UnknownGroup {
                    name: group.clone(),
                });
            }
        }

        Ok(self
            .devices
            .iter()
            .filter(|(name, entry)| {
                names.contains(*name) || entry.groups.iter().any(|g| groups.contains(g))
            })
            .map(|(name, entry)| (name.as_str(), entry))
            .collect())
    }

    fn device_names(&self) -> String {
        if self.devices.is_empty() {
            return "none".into();
        }
        self.devices.keys().cloned().collect::<Vec<_>>().join(", ")
    }

    /// TOML rendering with every plaintext password masked.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        for entry in shown.devices.values_mut() {
            if entry.password.is_some() {
                entry.password = Some("********".into());
            }
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a device's username: entry, then `BIGIP_USERNAME`.
pub fn resolve_username(entry: &DeviceEntry, device: &str) -> Result<String, ConfigError> {
    entry
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            device: device.into(),
        })
}

/// Resolve a device's password from the credential chain.
pub fn resolve_password(entry: &DeviceEntry, device: &str) -> Result<SecretString, ConfigError> {
    // 1. Device's password_env -> env var lookup
    if let Some(val) = entry
        .password_env
        .as_ref()
        .and_then(|env_name| std::env::var(env_name).ok())
    {
        return Ok(SecretString::from(val));
    }

    // 2. Shared env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 3. System keyring
    if let Some(pw) = keyring::Entry::new(KEYRING_SERVICE, &format!("{device}/password"))
        .ok()
        .and_then(|e| e.get_password().ok())
    {
        return Ok(SecretString::from(pw));
    }

    // 4. Plaintext in config
    if let Some(ref pw) = entry.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        device: device.into(),
    })
}

/// Build `AuthCredentials` for a device from its entry and the defaults.
pub fn resolve_auth(
    entry: &DeviceEntry,
    device: &str,
    defaults: &Defaults,
) -> Result<AuthCredentials, ConfigError> {
    let username = resolve_username(entry, device)?;
    let password = resolve_password(entry, device)?;

    Ok(match entry.auth.unwrap_or(defaults.auth) {
        AuthMode::Basic => AuthCredentials::Basic { username, password },
        AuthMode::Token => AuthCredentials::Token {
            username,
            password,
            login_provider: entry
                .login_provider
                .clone()
                .unwrap_or_else(|| defaults.login_provider.clone()),
            token_timeout: entry.token_timeout.or(defaults.token_timeout),
        },
    })
}

/// Build a `DeviceConfig` from an inventory entry, no CLI overrides.
pub fn device_to_config(
    name: &str,
    entry: &DeviceEntry,
    defaults: &Defaults,
) -> Result<DeviceConfig, ConfigError> {
    let auth = resolve_auth(entry, name, defaults)?;

    let validate = entry.validate_certs.unwrap_or(defaults.validate_certs);
    let tls = match (validate, &entry.ca_cert) {
        (false, _) => TlsVerification::DangerAcceptInvalid,
        (true, Some(ca_path)) => TlsVerification::CustomCa(ca_path.clone()),
        (true, None) => TlsVerification::SystemDefaults,
    };

    let mut config = DeviceConfig::new(name, entry.host.clone(), auth);
    config.port = entry.port.unwrap_or(defaults.port);
    config.tls = tls;
    config.timeout = Duration::from_secs(entry.timeout.unwrap_or(defaults.timeout));
    config.debug_wire = entry.debug.unwrap_or(defaults.debug);
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(host: &str, groups: &[&str]) -> DeviceEntry {
        DeviceEntry {
            host: host.into(),
            username: Some("admin".into()),
            password: Some("secret".into()),
            groups: groups.iter().map(|g| (*g).to_owned()).collect(),
            ..DeviceEntry::default()
        }
    }

    fn inventory() -> Config {
        let mut config = Config::default();
        config
            .devices
            .insert("lb1".into(), entry("10.0.0.1", &["prod"]));
        config
            .devices
            .insert("lb2".into(), entry("10.0.0.2", &["prod", "east"]));
        config.devices.insert("lab".into(), entry("10.9.9.9", &[]));
        config
    }

    fn names(selected: &[(&str, &DeviceEntry)]) -> Vec<String> {
        selected.iter().map(|(n, _)| (*n).to_owned()).collect()
    }

    #[test]
    fn select_everything_by_default() {
        let config = inventory();
        let selected = config.select(&[], &[]).unwrap();
        assert_eq!(names(&selected), ["lab", "lb1", "lb2"]);
    }

    #[test]
    fn select_unions_names_and_groups_without_duplicates() {
        let config = inventory();
        let selected = config
            .select(&["lab".into(), "lb2".into()], &["east".into()])
            .unwrap();
        assert_eq!(names(&selected), ["lab", "lb2"]);
    }

    #[test]
    fn select_rejects_unknown_names_and_groups() {
        let config = inventory();
        let err = config.select(&["nope".into()], &[]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownDevice { ref available, .. } if available == "lab, lb1, lb2"
        ));

        let err = config.select(&[], &["west".into()]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownGroup { .. }));
    }

    #[test]
    fn device_inherits_defaults() {
        let defaults = Defaults {
            token_timeout: Some(1200),
            ..Defaults::default()
        };
        let config = device_to_config("lb1", &entry("10.0.0.1", &[]), &defaults).unwrap();

        assert_eq!(config.port, 443);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
        assert!(!config.debug_wire);
        match config.auth {
            AuthCredentials::Token {
                login_provider,
                token_timeout,
                ..
            } => {
                assert_eq!(login_provider, "tmos");
                assert_eq!(token_timeout, Some(1200));
            }
            AuthCredentials::Basic { .. } => panic!("expected token auth"),
        }
    }

    #[test]
    fn device_overrides_win() {
        let device = DeviceEntry {
            port: Some(8443),
            auth: Some(AuthMode::Basic),
            validate_certs: Some(true),
            ca_cert: Some("/etc/ssl/bigip.pem".into()),
            timeout: Some(30),
            debug: Some(true),
            ..entry("10.0.0.1", &[])
        };
        let config = device_to_config("lb1", &device, &Defaults::default()).unwrap();

        assert_eq!(config.port, 8443);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(
            config.tls,
            TlsVerification::CustomCa("/etc/ssl/bigip.pem".into())
        );
        assert!(config.debug_wire);
        assert!(matches!(config.auth, AuthCredentials::Basic { .. }));
    }

    #[test]
    fn redacted_toml_masks_passwords() {
        let rendered = inventory().to_redacted_toml().unwrap();
        assert!(rendered.contains("********"));
        assert!(!rendered.contains("secret"));
    }
}
