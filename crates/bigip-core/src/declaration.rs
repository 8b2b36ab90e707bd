// ── Declaration sources ──
//
// A declaration comes from exactly one place. Loading turns any source
// into an inline JSON value once, before any device is contacted.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationSource {
    Inline(Value),
    FromPath(PathBuf),
    FromUrl(Url),
}

impl DeclarationSource {
    /// Resolve the source to a JSON value.
    ///
    /// Remote declarations are fetched with a plain client: device
    /// credentials are never sent to a third-party URL.
    pub async fn load(&self, timeout: Duration) -> Result<Value, CoreError> {
        match self {
            Self::Inline(value) => Ok(value.clone()),
            Self::FromPath(path) => {
                debug!(path = %path.display(), "reading declaration file");
                let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                    CoreError::Declaration {
                        message: format!("cannot read {}: {e}", path.display()),
                    }
                })?;
                serde_json::from_str(&text).map_err(|e| CoreError::Declaration {
                    message: format!("{} is not valid JSON: {e}", path.display()),
                })
            }
            Self::FromUrl(url) => {
                debug!(%url, "fetching declaration");
                let client = reqwest::Client::builder()
                    .timeout(timeout)
                    .build()
                    .map_err(|e| CoreError::Internal(format!("failed to build HTTP client: {e}")))?;
                let resp = client
                    .get(url.clone())
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map_err(|e| CoreError::Declaration {
                        message: format!("cannot fetch {url}: {e}"),
                    })?;
                resp.json().await.map_err(|e| CoreError::Declaration {
                    message: format!("{url} did not return valid JSON: {e}"),
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn loads_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simple_01.json");
        std::fs::write(&path, r#"{"class": "AS3", "action": "deploy"}"#).unwrap();

        let value = DeclarationSource::FromPath(path)
            .load(Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(value, json!({ "class": "AS3", "action": "deploy" }));
    }

    #[tokio::test]
    async fn invalid_json_is_a_declaration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = DeclarationSource::FromPath(path)
            .load(Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Declaration { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_a_declaration_error() {
        let err = DeclarationSource::FromPath("/nonexistent/decl.json".into())
            .load(Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Declaration error: cannot read"));
    }
}
