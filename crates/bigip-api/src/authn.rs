// Token authentication
//
// Login exchange against the shared authn service, optional token
// lifetime extension, and revocation on close. Basic auth skips all of
// this and sends the credentials with every request instead.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::error::Error;
use crate::models::LoginResponse;
use crate::session::{LoginCredentials, Payload, Session, SessionAuth, check_status, decode};

pub const LOGIN_PATH: &str = "/mgmt/shared/authn/login";
pub const TOKENS_PATH: &str = "/mgmt/shared/authz/tokens";

/// Default login provider for local device accounts.
pub const DEFAULT_LOGIN_PROVIDER: &str = "tmos";

/// Token lifetimes must be strictly below this many seconds.
pub const MAX_TOKEN_TIMEOUT_SECS: u32 = 36_000;

impl Session {
    /// Send static basic-auth credentials with every request.
    pub fn use_basic_auth(&mut self, username: &str, password: SecretString) {
        debug!(username, "using basic authentication");
        self.auth = Some(SessionAuth::Basic {
            username: username.to_owned(),
            password,
        });
    }

    /// Exchange username/password for a token.
    ///
    /// `POST /mgmt/shared/authn/login` with
    /// `{username, password, loginProviderName}`. On success the token is
    /// attached to every subsequent request as `X-F5-Auth-Token`, and the
    /// credentials are kept so an expired token can be replaced mid-poll.
    pub async fn login(
        &mut self,
        username: &str,
        password: &SecretString,
        login_provider: &str,
    ) -> Result<(), Error> {
        // Never keep a stale token around a failed login.
        self.auth = None;

        let login = LoginCredentials {
            username: username.to_owned(),
            password: password.clone(),
            provider: login_provider.to_owned(),
            token_timeout: None,
        };
        let token = self.exchange_login(&login).await?;
        self.auth = Some(SessionAuth::token(token, Some(login)));

        debug!("login successful");
        Ok(())
    }

    /// Run the login exchange without touching the session's auth state.
    pub(crate) async fn exchange_login(
        &self,
        login: &LoginCredentials,
    ) -> Result<SecretString, Error> {
        let url = self.url(LOGIN_PATH)?;
        debug!("logging in at {}", url);

        let body = json!({
            "username": login.username,
            "password": login.password.expose_secret(),
            "loginProviderName": login.provider,
        });

        let (status, text) = self
            .transmit(&Method::POST, &url, &Payload::json(&body)?, false)
            .await?;
        if status.is_client_error() || status.is_server_error() {
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {}): {text}", status.as_u16()),
            });
        }

        let resp: LoginResponse = decode(&text)?;
        Ok(SecretString::from(resp.token.token))
    }

    /// Request a non-default lifetime for the current token.
    ///
    /// `PATCH /mgmt/shared/authz/tokens/{token}` with `{timeout}`. The
    /// lifetime is requested again for any token issued by a later re-login.
    pub async fn extend_token(&mut self, timeout_secs: u32) -> Result<(), Error> {
        self.apply_token_timeout(timeout_secs).await?;
        if let Some(SessionAuth::Token {
            login: Some(login), ..
        }) = &mut self.auth
        {
            login.token_timeout = Some(timeout_secs);
        }
        Ok(())
    }

    /// Send the lifetime PATCH for the token currently attached. Bypasses
    /// the re-login path in [`Session::send`].
    pub(crate) async fn apply_token_timeout(&self, timeout_secs: u32) -> Result<(), Error> {
        let token = self.token().ok_or_else(|| Error::Authentication {
            message: "no token to extend: session is not token-authenticated".into(),
        })?;

        let url = self.url(&format!("{TOKENS_PATH}/{}", token.expose_secret()))?;
        debug!(timeout_secs, "extending token lifetime");

        let payload = Payload::json(&json!({ "timeout": timeout_secs }))?;
        let (status, body) = self.transmit(&Method::PATCH, &url, &payload, true).await?;
        check_status(status, &url, body).map(drop)
    }

    /// Revoke the current token.
    ///
    /// `DELETE /mgmt/shared/authz/tokens/{token}`. Returns `Ok(false)` when
    /// the session holds no token (basic auth or never logged in). The token
    /// is dropped from the session even if the DELETE fails. An expired
    /// token is not replaced just to be revoked.
    pub async fn revoke_token(&mut self) -> Result<bool, Error> {
        let Some(token) = self.token() else {
            return Ok(false);
        };

        let url = self.url(&format!("{TOKENS_PATH}/{}", token.expose_secret()))?;
        debug!("revoking token");

        let result = self
            .transmit(&Method::DELETE, &url, &Payload::Empty, true)
            .await
            .and_then(|(status, body)| check_status(status, &url, body));
        self.auth = None;
        result.map(|_| true)
    }
}
