use thiserror::Error;

/// Top-level error type for the `bigip-api` crate.
///
/// Covers every failure mode of the raw REST surface: authentication,
/// transport, HTTP status, and response decoding. `bigip-core` maps these
/// into its deployment-level taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed or the device rejected the credentials (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration error (unreadable CA bundle, client build failure).
    #[error("TLS error: {0}")]
    Tls(String),

    /// A retryable status kept coming back until the retry budget ran out.
    #[error("Maximum retries exceeded ({attempts} attempts) for url: {url} (last status {status})")]
    RetriesExhausted { attempts: u32, status: u16, url: String },

    // ── HTTP ────────────────────────────────────────────────────────
    /// Non-success HTTP status outside the retryable set.
    #[error("HTTP {status} for url: {url}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The response parsed but lacks the field the caller needs.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Local I/O failure (file uploads).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if this error indicates the token was rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::RetriesExhausted { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Http { status: 404, .. } => true,
            _ => false,
        }
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Http { status, .. } | Self::RetriesExhausted { status, .. } => Some(*status),
            Self::Authentication { .. } => Some(401),
            _ => None,
        }
    }
}
