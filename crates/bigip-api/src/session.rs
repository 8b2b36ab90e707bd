// Authenticated HTTP session to one BIG-IP
//
// Wraps `reqwest::Client` with base-URL joining, auth header injection,
// the transparent status/connect retry loop, fail-fast status checking
// and the optional wire hook. Endpoint families (authn, cm, sys, util,
// file transfer, iapp) are inherent methods in sibling modules so this
// file stays focused on transport mechanics.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use bytes::Bytes;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::transport::{RetryPolicy, TransportConfig};
use crate::wire::{WireExchange, WireHook};

/// Header carrying the token issued by the login exchange.
pub const AUTH_TOKEN_HEADER: &str = "X-F5-Auth-Token";

/// Credentials attached to every request of a session.
pub(crate) enum SessionAuth {
    Basic {
        username: String,
        password: SecretString,
    },
    Token {
        /// Swapped in place when an expired token is replaced.
        token: ArcSwap<SecretString>,
        /// Present when the token came from [`Session::login`].
        login: Option<LoginCredentials>,
    },
}

impl SessionAuth {
    pub(crate) fn token(token: SecretString, login: Option<LoginCredentials>) -> Self {
        Self::Token {
            token: ArcSwap::from_pointee(token),
            login,
        }
    }
}

/// What a token session needs to log in again after a 401.
pub(crate) struct LoginCredentials {
    pub(crate) username: String,
    pub(crate) password: SecretString,
    pub(crate) provider: String,
    pub(crate) token_timeout: Option<u32>,
}

/// Request body variants understood by [`Session::send`].
pub(crate) enum Payload {
    Empty,
    Json(Bytes),
    Octets { data: Bytes, content_range: String },
}

impl Payload {
    pub(crate) fn json(body: &(impl Serialize + ?Sized)) -> Result<Self, Error> {
        serde_json::to_vec(body)
            .map(|encoded| Self::Json(Bytes::from(encoded)))
            .map_err(|e| Error::Deserialization {
                message: format!("failed to encode request body: {e}"),
                body: String::new(),
            })
    }

    fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Empty => None,
            Self::Json(data) | Self::Octets { data, .. } => Some(data),
        }
    }
}

/// One authenticated connection to a device's management API.
///
/// A session is owned by exactly one device context. Auth state changes
/// (`login`, `revoke_token`) take `&mut self`, so concurrent use has to be
/// serialized by the owner.
pub struct Session {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
    pub(crate) auth: Option<SessionAuth>,
    hook: Option<Arc<dyn WireHook>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let auth = match self.auth {
            None => "none",
            Some(SessionAuth::Basic { .. }) => "basic",
            Some(SessionAuth::Token { .. }) => "token",
        };
        f.debug_struct("Session")
            .field("base_url", &self.base_url.as_str())
            .field("retry", &self.retry)
            .field("auth", &auth)
            .field("wire_hook", &self.hook.is_some())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create an unauthenticated session from a `TransportConfig`.
    ///
    /// `base_url` is the management root, e.g. `https://10.1.1.245:443`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, transport.retry.clone()))
    }

    /// Create a session with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, retry: RetryPolicy) -> Self {
        Self {
            http,
            base_url,
            retry,
            auth: None,
            hook: None,
        }
    }

    /// Attach a wire diagnostic hook.
    pub fn with_wire_hook(mut self, hook: Arc<dyn WireHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// The management base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The bearer token currently attached to requests, if any.
    pub fn token(&self) -> Option<Arc<SecretString>> {
        match &self.auth {
            Some(SessionAuth::Token { token, .. }) => Some(token.load_full()),
            _ => None,
        }
    }

    /// Join a management path (may carry a query string) onto the base URL.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    /// `GET {base}{path}` and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        self.get_url(url).await
    }

    /// `GET` an absolute URL with this session's auth and policy.
    pub async fn get_url<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        let body = self.send(Method::GET, url, &Payload::Empty).await?;
        decode(&body)
    }

    /// `POST {base}{path}` with a JSON body.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + ?Sized + Sync),
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        let body = self.send(Method::POST, url, &Payload::json(body)?).await?;
        decode(&body)
    }

    /// `PATCH {base}{path}` with a JSON body.
    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + ?Sized + Sync),
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        let body = self.send(Method::PATCH, url, &Payload::json(body)?).await?;
        decode(&body)
    }

    /// `DELETE {base}{path}`.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        let body = self.send(Method::DELETE, url, &Payload::Empty).await?;
        decode(&body)
    }

    // ── Transport mechanics ──────────────────────────────────────────

    fn build(
        &self,
        method: Method,
        url: Url,
        payload: &Payload,
        authenticated: bool,
    ) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, url);

        if authenticated {
            builder = match &self.auth {
                Some(SessionAuth::Basic { username, password }) => {
                    builder.basic_auth(username, Some(password.expose_secret()))
                }
                Some(SessionAuth::Token { token, .. }) => {
                    builder.header(AUTH_TOKEN_HEADER, token.load().expose_secret())
                }
                None => builder,
            };
        }

        match payload {
            Payload::Empty => builder,
            Payload::Json(data) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(data.clone()),
            Payload::Octets {
                data,
                content_range,
            } => builder
                .header(CONTENT_TYPE, "application/octet-stream")
                .header(CONTENT_RANGE, content_range.as_str())
                .body(data.clone()),
        }
    }

    /// Send a request through the retry loop and return the raw body.
    ///
    /// Retryable statuses and transport errors are retried with exponential
    /// backoff up to the policy budget. Any 4xx/5xx that survives the loop
    /// fails fast. A 401 on a session that logged in with credentials logs
    /// in again and replays the request once.
    pub(crate) async fn send(
        &self,
        method: Method,
        url: Url,
        payload: &Payload,
    ) -> Result<String, Error> {
        let (status, body) = self.transmit(&method, &url, payload, true).await?;

        if let (
            StatusCode::UNAUTHORIZED,
            Some(SessionAuth::Token {
                token,
                login: Some(login),
            }),
        ) = (status, &self.auth)
        {
            warn!(%url, "token rejected, logging in again");
            let fresh = self.exchange_login(login).await?;
            token.store(Arc::new(fresh));
            if let Some(secs) = login.token_timeout {
                self.apply_token_timeout(secs).await?;
            }
            let (status, body) = self.transmit(&method, &url, payload, true).await?;
            return check_status(status, &url, body);
        }

        check_status(status, &url, body)
    }

    /// The retry loop. Returns the final status and body without judging
    /// the status, except for retryable statuses that ran out of budget.
    pub(crate) async fn transmit(
        &self,
        method: &Method,
        url: &Url,
        payload: &Payload,
        authenticated: bool,
    ) -> Result<(StatusCode, String), Error> {
        debug!("{method} {url}");

        let mut attempt: u32 = 0;
        loop {
            let request = self.build(method.clone(), url.clone(), payload, authenticated);

            let resp = match request.send().await {
                Ok(resp) => resp,
                Err(e)
                    if attempt < self.retry.max_retries
                        && self.retry.retries_error(method, &e) =>
                {
                    let delay = self.retry.backoff(attempt);
                    warn!(error = %e, attempt, ?delay, "transport error, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(Error::Transport(e)),
            };

            let status = resp.status();
            let retryable = self.retry.retries_status(method, status);
            let body = resp.text().await?;
            self.observe(method, url, attempt, status, payload, &body);

            if retryable {
                if attempt < self.retry.max_retries {
                    let delay = self.retry.backoff(attempt);
                    debug!(%status, attempt, ?delay, "retryable status, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                if attempt > 0 {
                    return Err(Error::RetriesExhausted {
                        attempts: attempt + 1,
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
            }

            return Ok((status, body));
        }
    }

    fn observe(
        &self,
        method: &Method,
        url: &Url,
        attempt: u32,
        status: StatusCode,
        payload: &Payload,
        body: &str,
    ) {
        if let Some(hook) = &self.hook {
            hook.record(&WireExchange {
                method,
                url: url.as_str(),
                attempt,
                status: status.as_u16(),
                request_body: payload.as_bytes(),
                response_body: body,
            });
        }
    }
}

pub(crate) fn check_status(status: StatusCode, url: &Url, body: String) -> Result<String, Error> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: format!("token expired or invalid credentials (HTTP 401) for url: {url}"),
        });
    }

    if status.is_client_error() || status.is_server_error() {
        return Err(Error::Http {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        });
    }

    Ok(body)
}

/// Decode a JSON body; an empty body decodes as `null`.
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    let text = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(text).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })
}
