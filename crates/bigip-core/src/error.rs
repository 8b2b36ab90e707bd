// ── Core error types ──
//
// Deployment-level failures surfaced to callers. Transport details are
// folded into connection/protocol variants by `From<bigip_api::Error>`;
// convergence failures keep the device-supplied detail untouched.

use serde_json::Value;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Transport errors ─────────────────────────────────────────────
    #[error("Cannot connect to device at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Protocol errors ──────────────────────────────────────────────
    /// Non-success status outside the retryable set. Not retried.
    #[error("HTTP {status} for url: {url}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    // ── Validation errors ────────────────────────────────────────────
    /// Detected before any request is sent.
    #[error("{message}")]
    Validation { message: String },

    // ── Convergence errors ───────────────────────────────────────────
    /// The immediate response to a submission lacked the accepted marker.
    #[error("{message}")]
    SubmissionRejected { message: String, response: Value },

    /// A polled operation reached a recognized failure state. `reason`
    /// is the device-supplied message, or the structured detail rendered
    /// as JSON when the device returned one.
    #[error("{reason}")]
    ConvergenceFailed {
        reason: String,
        detail: Option<Value>,
    },

    /// The poll budget ran out while still in a non-terminal state.
    #[error("The {operation} has reached maximum retries ({last_state}).")]
    RetriesExhausted {
        operation: String,
        last_state: String,
    },

    #[error("The {operation} was cancelled")]
    Cancelled { operation: String },

    #[error("Operation not supported: {operation} (requires {required})")]
    Unsupported { operation: String, required: String },

    // ── Input errors ─────────────────────────────────────────────────
    #[error("Declaration error: {message}")]
    Declaration { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Structured device detail attached to a failure, if any.
    pub fn detail(&self) -> Option<&Value> {
        match self {
            Self::ConvergenceFailed { detail, .. } => detail.as_ref(),
            Self::SubmissionRejected { response, .. } => Some(response),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<bigip_api::Error> for CoreError {
    fn from(err: bigip_api::Error) -> Self {
        match err {
            bigip_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            bigip_api::Error::Transport(ref e) => {
                let url = e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string);
                if e.is_timeout() {
                    CoreError::Timeout { url }
                } else {
                    CoreError::ConnectionFailed {
                        url,
                        reason: e.to_string(),
                    }
                }
            }
            bigip_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            bigip_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            bigip_api::Error::RetriesExhausted {
                attempts,
                status,
                url,
            } => CoreError::ConnectionFailed {
                url,
                reason: format!("HTTP {status} persisted after {attempts} attempts"),
            },
            bigip_api::Error::Http { status, url, body } => CoreError::Http { status, url, body },
            bigip_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            bigip_api::Error::UnexpectedResponse(message) => CoreError::Internal(message),
            bigip_api::Error::Io(e) => CoreError::Io(e),
        }
    }
}
