// Shared transport configuration for building reqwest::Client instances.
//
// Every session to a device gets its TLS mode, default timeout and the
// transparent HTTP retry policy from this module. The policy is a plain
// value handed to the session constructor; there is no global default.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::{Method, StatusCode};

const USER_AGENT: &str = concat!("bigip/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (BIG-IP management ports ship self-signed).
    DangerAcceptInvalid,
}

/// Transparent retry policy for transient HTTP failures.
///
/// This layer retries individual requests; it knows nothing about
/// task or sync polling, which sit on top of it and poll business state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Base of the exponential backoff: `factor * 2^retry`.
    pub backoff_factor: Duration,
    /// Upper bound for a single backoff sleep.
    pub max_backoff: Duration,
    /// Statuses that trigger a retry.
    pub statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_secs(1),
            max_backoff: Duration::from_secs(120),
            statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Sleep before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry);
        self.backoff_factor
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Whether a response with `status` to `method` should be retried.
    ///
    /// Only idempotent methods are retried on status: re-sending a POST
    /// could submit a declaration twice.
    pub fn retries_status(&self, method: &Method, status: StatusCode) -> bool {
        is_idempotent(method) && self.statuses.contains(&status.as_u16())
    }

    /// Whether a transport error for `method` should be retried.
    ///
    /// Connect failures never reached the device and are safe for every
    /// method; read timeouts are only retried for idempotent methods.
    pub fn retries_error(&self, method: &Method, err: &reqwest::Error) -> bool {
        err.is_connect() || (err.is_timeout() && is_idempotent(method))
    }
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS | Method::TRACE
    )
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path).map_err(|e| {
                    crate::error::Error::Tls(format!("failed to read CA cert: {e}"))
                })?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| crate::error::Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| crate::error::Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}
