//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help
//! text and a stable process exit code.

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use bigip_config::ConfigError;
use bigip_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const DEPLOYMENT: i32 = 9;
    pub const PARTIAL: i32 = 10;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(bigip::connection_failed),
        help(
            "Check that the management interface is reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to {url} timed out")]
    #[diagnostic(
        code(bigip::timeout),
        help("Increase the timeout with --timeout or check device responsiveness.")
    )]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    #[diagnostic(code(bigip::http))]
    Http {
        status: u16,
        url: String,
        #[help]
        body: Option<String>,
    },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(bigip::auth_failed),
        help(
            "{message}\n\
             Verify the username and password for this device."
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for device '{device}'")]
    #[diagnostic(
        code(bigip::no_credentials),
        help(
            "Set password_env or password in the inventory, export BIGIP_PASSWORD,\n\
             or store one in the system keyring under service 'bigip', user '{device}/password'."
        )
    )]
    NoCredentials { device: String },

    // ── Deployment ───────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(bigip::deployment_failed))]
    DeploymentFailed {
        message: String,
        #[help]
        detail: Option<String>,
    },

    #[error("Operation not supported: {operation}")]
    #[diagnostic(code(bigip::unsupported), help("This operation requires {required}."))]
    Unsupported { operation: String, required: String },

    #[error("{operation} was cancelled")]
    #[diagnostic(code(bigip::cancelled))]
    Cancelled { operation: String },

    #[error("{failed} of {total} devices failed")]
    #[diagnostic(
        code(bigip::partial_failure),
        help("See the per-device report above.")
    )]
    PartialFailure { failed: usize, total: usize },

    // ── Validation ───────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(bigip::validation))]
    Validation { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No devices selected")]
    #[diagnostic(
        code(bigip::no_devices),
        help(
            "Add devices to the inventory at {path}\n\
             or pick them with --device / --group."
        )
    )]
    NoDevices { path: String },

    #[error(transparent)]
    #[diagnostic(code(bigip::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(bigip::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Http { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::DeploymentFailed { .. } | Self::Unsupported { .. } => exit_code::DEPLOYMENT,
            Self::PartialFailure { .. } => exit_code::PARTIAL,
            Self::Validation { .. } | Self::NoDevices { .. } | Self::Config(_) => exit_code::USAGE,
            Self::Cancelled { .. } | Self::Io(_) | Self::Internal(_) => exit_code::GENERAL,
        }
    }
}

fn render_detail(detail: Option<&Value>) -> Option<String> {
    detail.and_then(|v| serde_json::to_string_pretty(v).ok())
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let detail = render_detail(err.detail());
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout { url } => Self::Timeout { url },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Http { status, url, body } => Self::Http {
                status,
                url,
                body: (!body.trim().is_empty()).then_some(body),
            },
            CoreError::Validation { message }
            | CoreError::Declaration { message }
            | CoreError::Config { message } => Self::Validation { message },
            CoreError::SubmissionRejected { message, .. } => {
                Self::DeploymentFailed { message, detail }
            }
            CoreError::ConvergenceFailed { reason, .. } => Self::DeploymentFailed {
                message: reason,
                detail,
            },
            err @ CoreError::RetriesExhausted { .. } => Self::DeploymentFailed {
                message: err.to_string(),
                detail: None,
            },
            CoreError::Cancelled { operation } => Self::Cancelled { operation },
            CoreError::Unsupported {
                operation,
                required,
            } => Self::Unsupported {
                operation,
                required,
            },
            CoreError::Io(e) => Self::Io(e),
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { device } => Self::NoCredentials { device },
            other => Self::Config(other),
        }
    }
}
