// ── Declaration dispatcher ──
//
// Sends one declaration request and classifies the immediate response.
// Business failures are never retried here; the transparent HTTP retry
// in the session is the only retry below the convergence engines.

use bigip_api::Session;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::service::{AtcMethod, AtcService};

/// A submission the device accepted and is still working on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncOperation {
    pub service: AtcService,
    pub id: String,
}

impl AsyncOperation {
    /// `{task endpoint}/{id}`.
    pub fn task_path(&self) -> Result<String, CoreError> {
        let task = self.service.descriptor().task.ok_or_else(|| {
            CoreError::Internal(format!("{} has no task endpoint", self.service))
        })?;
        Ok(format!("{task}/{}", self.id))
    }
}

/// Immediate classification of a dispatched request.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Final body: reads, and services that apply synchronously.
    Synchronous(Value),
    /// Accepted for background processing; poll the task.
    Accepted(AsyncOperation),
}

/// Send `method` to `endpoint` (path plus negotiated query) and classify
/// the response.
///
/// `payload` is required for `POST` and ignored otherwise.
pub async fn dispatch(
    session: &Session,
    service: AtcService,
    method: AtcMethod,
    endpoint: &str,
    payload: Option<&Value>,
) -> Result<DispatchOutcome, CoreError> {
    service.check_method(method)?;
    debug!(%service, %method, endpoint, "dispatching declaration");

    let body: Value = match method {
        AtcMethod::Get => {
            let body = session.get(endpoint).await?;
            return Ok(DispatchOutcome::Synchronous(body));
        }
        AtcMethod::Post => {
            let payload = payload.ok_or_else(|| {
                CoreError::validation("A declaration is required for POST.")
            })?;
            session.post(endpoint, payload).await?
        }
        AtcMethod::Delete => session.delete(endpoint).await?,
    };

    match service.accepted(&body)? {
        Some(id) => {
            info!(%service, task_id = %id, "declaration accepted");
            Ok(DispatchOutcome::Accepted(AsyncOperation { service, id }))
        }
        None => {
            info!(%service, "declaration applied synchronously");
            Ok(DispatchOutcome::Synchronous(body))
        }
    }
}
