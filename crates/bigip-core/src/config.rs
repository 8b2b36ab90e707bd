// ── Runtime device configuration ──
//
// These types describe *how* to reach one BIG-IP. They carry credentials
// and transport tuning but never touch disk; the CLI builds a
// `DeviceConfig` from its inventory and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use bigip_api::RetryPolicy;
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// How to authenticate with a device.
#[derive(Debug, Clone)]
pub enum AuthCredentials {
    /// Static basic-auth header on every request.
    Basic {
        username: String,
        password: SecretString,
    },
    /// Login exchange for an `X-F5-Auth-Token`, revoked on close.
    Token {
        username: String,
        password: SecretString,
        /// Login provider name (`tmos` for local accounts).
        login_provider: String,
        /// Requested token lifetime in seconds; the device default when `None`.
        token_timeout: Option<u32>,
    },
}

impl AuthCredentials {
    pub fn username(&self) -> &str {
        match self {
            Self::Basic { username, .. } | Self::Token { username, .. } => username,
        }
    }
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Default: management ports ship self-signed certs.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for connecting to a single device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Inventory name, used in logs and reports.
    pub name: String,
    /// Hostname, IP, or a full base URL.
    pub host: String,
    pub port: u16,
    pub auth: AuthCredentials,
    pub tls: TlsVerification,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Transparent HTTP retry policy.
    pub retry: RetryPolicy,
    /// Dump every request/response through the tracing wire hook.
    pub debug_wire: bool,
}

impl DeviceConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>, auth: AuthCredentials) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: 443,
            auth,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            debug_wire: false,
        }
    }

    /// `https://{host}:{port}`, bracketing bare IPv6 literals. A host
    /// given as a full URL is used as-is, taking `port` only when the URL
    /// has none.
    pub fn base_url(&self) -> Result<Url, CoreError> {
        let invalid = |e: &dyn std::fmt::Display| CoreError::Config {
            message: format!("invalid device address {}:{}: {e}", self.host, self.port),
        };

        if self.host.contains("://") {
            let mut url = Url::parse(&self.host).map_err(|e| invalid(&e))?;
            if url.port().is_none() {
                url.set_port(Some(self.port))
                    .map_err(|()| invalid(&"URL cannot carry a port"))?;
            }
            return Ok(url);
        }

        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        Url::parse(&format!("https://{host}:{}", self.port)).map_err(|e| invalid(&e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn basic() -> AuthCredentials {
        AuthCredentials::Basic {
            username: "admin".into(),
            password: SecretString::from("admin"),
        }
    }

    #[test]
    fn base_url_uses_port() {
        let mut cfg = DeviceConfig::new("bigip1", "10.1.1.245", basic());
        cfg.port = 8443;
        assert_eq!(cfg.base_url().unwrap().as_str(), "https://10.1.1.245:8443/");
    }

    #[test]
    fn base_url_accepts_full_url() {
        let cfg = DeviceConfig::new("lab", "http://127.0.0.1:8080", basic());
        assert_eq!(cfg.base_url().unwrap().as_str(), "http://127.0.0.1:8080/");

        let mut cfg = DeviceConfig::new("lab", "https://bigip.example.net", basic());
        cfg.port = 8443;
        assert_eq!(cfg.base_url().unwrap().as_str(), "https://bigip.example.net:8443/");
    }

    #[test]
    fn base_url_brackets_ipv6() {
        let cfg = DeviceConfig::new("v6", "2001:db8::1", basic());
        assert_eq!(cfg.base_url().unwrap().as_str(), "https://[2001:db8::1]/");
    }
}
