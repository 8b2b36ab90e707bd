// ── Device context ──
//
// Owns the one authenticated session to a BIG-IP. The session is opened
// lazily on first use and kept behind a mutex, so operations against the
// same device run strictly one after another. `disconnect` revokes the
// token best-effort.

use std::path::Path;
use std::sync::Arc;

use bigip_api::authn::{DEFAULT_LOGIN_PROVIDER, MAX_TOKEN_TIMEOUT_SECS};
use bigip_api::{Session, TlsMode, TracingWireHook, TransportConfig, UploadedFile};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{AuthCredentials, DeviceConfig, TlsVerification};
use crate::deploy::{DeployOutcome, DeploymentRequest, deploy};
use crate::error::CoreError;
use crate::package::{PackageOutcome, PackageRequest, manage_package};
use crate::sync::{ConfigSyncRequest, SyncOutcome, SyncStatus, config_sync, read_sync_status};

/// One managed BIG-IP.
pub struct Device {
    config: DeviceConfig,
    session: Mutex<Option<Session>>,
    cancel: CancellationToken,
}

impl Device {
    /// Create a device context. Does NOT connect; the session is opened
    /// by [`connect`](Self::connect) or the first operation.
    pub fn new(config: DeviceConfig) -> Self {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Create a device context whose poll loops abort when `cancel` fires.
    pub fn with_cancellation(config: DeviceConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            session: Mutex::new(None),
            cancel,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The token that aborts this device's poll loops.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    // ── Session lifecycle ────────────────────────────────────────

    /// Open the session now instead of on first use.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.session().await.map(drop)
    }

    /// Revoke the token (if any) and drop the session. Safe to call when
    /// never connected or when using basic auth.
    pub async fn disconnect(&self) {
        let Some(mut session) = self.session.lock().await.take() else {
            return;
        };
        match session.revoke_token().await {
            Ok(true) => debug!(device = %self.config.name, "token revoked"),
            Ok(false) => {}
            Err(e) => warn!(device = %self.config.name, error = %e, "token revocation failed (non-fatal)"),
        }
        debug!(device = %self.config.name, "disconnected");
    }

    async fn session(&self) -> Result<MappedMutexGuard<'_, Session>, CoreError> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(open_session(&self.config).await?);
        }
        MutexGuard::try_map(guard, Option::as_mut)
            .map_err(|_| CoreError::Internal("device session missing after open".into()))
    }

    // ── Operations ───────────────────────────────────────────────

    pub async fn deploy(&self, request: &DeploymentRequest) -> Result<DeployOutcome, CoreError> {
        let session = self.session().await?;
        deploy(&session, request, &self.cancel).await
    }

    pub async fn config_sync(&self, request: &ConfigSyncRequest) -> Result<SyncOutcome, CoreError> {
        let session = self.session().await?;
        config_sync(&session, request, &self.cancel).await
    }

    pub async fn manage_package(
        &self,
        request: &PackageRequest,
    ) -> Result<PackageOutcome, CoreError> {
        let session = self.session().await?;
        manage_package(&session, request, &self.cancel).await
    }

    pub async fn sync_status(&self) -> Result<SyncStatus, CoreError> {
        let session = self.session().await?;
        read_sync_status(&session).await
    }

    pub async fn failover_status(&self) -> Result<String, CoreError> {
        let session = self.session().await?;
        Ok(session.failover_status().await?)
    }

    pub async fn system_version(&self) -> Result<String, CoreError> {
        let session = self.session().await?;
        Ok(session.system_version().await?)
    }

    pub async fn upload_file(
        &self,
        local: &Path,
        dest_name: Option<&str>,
    ) -> Result<UploadedFile, CoreError> {
        let session = self.session().await?;
        Ok(session.upload_file(local, dest_name).await?)
    }

    pub async fn unix_ls(&self, path: &str) -> Result<String, CoreError> {
        let session = self.session().await?;
        Ok(session.unix_ls(path).await?)
    }

    pub async fn unix_rm(&self, path: &str) -> Result<(), CoreError> {
        let session = self.session().await?;
        Ok(session.unix_rm(path).await?)
    }
}

/// Build the transport, authenticate, and apply the token lifetime.
async fn open_session(config: &DeviceConfig) -> Result<Session, CoreError> {
    if let AuthCredentials::Token {
        token_timeout: Some(secs),
        ..
    } = &config.auth
    {
        check_token_timeout(*secs)?;
    }

    let transport = build_transport(config);
    let base_url = config.base_url()?;
    let mut session = Session::new(base_url, &transport)?;
    if config.debug_wire {
        session = session.with_wire_hook(Arc::new(TracingWireHook));
    }

    match &config.auth {
        AuthCredentials::Basic { username, password } => {
            session.use_basic_auth(username, password.clone());
        }
        AuthCredentials::Token {
            username,
            password,
            login_provider,
            token_timeout,
        } => {
            let provider = if login_provider.is_empty() {
                DEFAULT_LOGIN_PROVIDER
            } else {
                login_provider
            };
            session.login(username, password, provider).await?;
            if let Some(secs) = token_timeout {
                session.extend_token(*secs).await?;
            }
        }
    }

    info!(
        device = %config.name,
        host = %config.host,
        user = config.auth.username(),
        "connected"
    );
    Ok(session)
}

fn check_token_timeout(secs: u32) -> Result<(), CoreError> {
    if secs == 0 || secs >= MAX_TOKEN_TIMEOUT_SECS {
        return Err(CoreError::validation(format!(
            "Token timeout {secs} is not valid (expected 1..{MAX_TOKEN_TIMEOUT_SECS} seconds)."
        )));
    }
    Ok(())
}

fn build_transport(config: &DeviceConfig) -> TransportConfig {
    let tls = match &config.tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    };
    TransportConfig {
        tls,
        timeout: config.timeout,
        retry: config.retry.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_timeout_range() {
        assert!(check_token_timeout(0).is_err());
        assert!(check_token_timeout(1).is_ok());
        assert!(check_token_timeout(35_999).is_ok());
        assert!(check_token_timeout(36_000).is_err());
    }
}
