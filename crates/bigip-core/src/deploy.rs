// ── Deployment entry point ──
//
// Resolve declaration and service, validate the method, negotiate
// capabilities against the advertised service version, dispatch, and
// poll to convergence when the service works asynchronously.

use std::time::Duration;

use bigip_api::Session;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::capability::{As3Modifiers, CapabilitySet};
use crate::declaration::DeclarationSource;
use crate::dispatch::{DispatchOutcome, dispatch};
use crate::error::CoreError;
use crate::poll::PollPolicy;
use crate::service::{AtcMethod, AtcService};
use crate::task::{TaskOutcome, await_task};
use crate::version::Version;

/// One ATC request against a device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRequest {
    pub source: Option<DeclarationSource>,
    /// Inferred from the declaration's `class` when `None`.
    pub service: Option<AtcService>,
    pub method: AtcMethod,
    pub modifiers: As3Modifiers,
    pub poll: PollPolicy,
    /// Validate and negotiate, but send nothing.
    pub dry_run: bool,
}

impl Default for DeploymentRequest {
    fn default() -> Self {
        Self {
            source: None,
            service: None,
            method: AtcMethod::Get,
            modifiers: As3Modifiers::default(),
            poll: PollPolicy::deployment(),
            dry_run: false,
        }
    }
}

impl DeploymentRequest {
    /// Load a path or URL source once and replace it with the inline
    /// value, so fan-out across devices reads it a single time.
    pub async fn resolve_source(&mut self, timeout: Duration) -> Result<(), CoreError> {
        if let Some(
            source @ (DeclarationSource::FromPath(_) | DeclarationSource::FromUrl(_)),
        ) = &self.source
        {
            let value = source.load(timeout).await?;
            self.source = Some(DeclarationSource::Inline(value));
        }
        Ok(())
    }

    /// Resolve the target service and check the method against it.
    /// Sends nothing.
    pub fn validate(&self, declaration: Option<&Value>) -> Result<AtcService, CoreError> {
        let service = match (self.service, declaration) {
            (Some(service), _) => service,
            (None, Some(decl)) => AtcService::from_declaration(decl)?,
            (None, None) => return Err(CoreError::validation("ATC service '' is not valid.")),
        };
        service.check_method(self.method)?;
        if self.method == AtcMethod::Post && declaration.is_none() {
            return Err(CoreError::validation("A declaration is required for POST."));
        }
        self.modifiers.validate()?;
        if self.method != AtcMethod::Get && service.is_async() {
            self.poll.check_budget()?;
        }
        Ok(service)
    }

    /// The declaration when it is already held in memory.
    pub fn inline_declaration(&self) -> Option<&Value> {
        match &self.source {
            Some(DeclarationSource::Inline(value)) => Some(value),
            _ => None,
        }
    }
}

const DECLARATION_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEPLOYED: &str = "ATC declaration successfully deployed.";
pub const UNCHANGED: &str = "ATC declaration successfully submitted, but no change required.";

/// How a deployment ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeployOutcome {
    /// A `GET` returned the current declaration.
    Retrieved { service: AtcService, body: Value },
    /// The task reached `success`.
    Deployed { service: AtcService, body: Value },
    /// The task reported `no change`.
    Unchanged { service: AtcService, body: Value },
    /// A synchronous service applied the declaration.
    Applied { service: AtcService, body: Value },
    DryRun {
        service: AtcService,
        method: AtcMethod,
        endpoint: String,
        capabilities: CapabilitySet,
    },
}

impl DeployOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Deployed { .. } | Self::Applied { .. })
    }

    pub fn message(&self) -> String {
        match self {
            Self::Deployed { .. } | Self::Applied { .. } => DEPLOYED.into(),
            Self::Unchanged { .. } => UNCHANGED.into(),
            Self::Retrieved { service, .. } => format!("Retrieved the {service} declaration."),
            Self::DryRun {
                method, endpoint, ..
            } => format!("Dry run: would send {method} {endpoint}"),
        }
    }

    /// The device's response body, where there is one.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Retrieved { body, .. }
            | Self::Deployed { body, .. }
            | Self::Unchanged { body, .. }
            | Self::Applied { body, .. } => Some(body),
            Self::DryRun { .. } => None,
        }
    }
}

/// Run one deployment request to completion over `session`.
pub async fn deploy(
    session: &Session,
    request: &DeploymentRequest,
    cancel: &CancellationToken,
) -> Result<DeployOutcome, CoreError> {
    let declaration = match &request.source {
        Some(source) => Some(source.load(DECLARATION_FETCH_TIMEOUT).await?),
        None => None,
    };

    let service = request.validate(declaration.as_ref())?;
    let method = request.method;

    let descriptor = service.descriptor();
    let info: Value = session.get(descriptor.info).await?;
    let version: Version = service
        .info_version(&info)
        .ok_or_else(|| CoreError::Internal(format!("{service} info carries no version")))?
        .parse()?;
    debug!(%service, %version, "service available");

    let capabilities = CapabilitySet::negotiate(service, &version, method, &request.modifiers);
    let endpoint = capabilities.effective_endpoint(descriptor.configure, &request.modifiers);

    if request.dry_run {
        info!(%service, %method, %endpoint, "dry run, nothing sent");
        return Ok(DeployOutcome::DryRun {
            service,
            method,
            endpoint,
            capabilities,
        });
    }

    let outcome = match dispatch(session, service, method, &endpoint, declaration.as_ref()).await? {
        DispatchOutcome::Synchronous(body) if method == AtcMethod::Get => {
            DeployOutcome::Retrieved { service, body }
        }
        DispatchOutcome::Synchronous(body) => DeployOutcome::Applied { service, body },
        DispatchOutcome::Accepted(operation) => {
            match await_task(session, &operation, &request.poll, cancel).await? {
                TaskOutcome::Success(body) => DeployOutcome::Deployed { service, body },
                TaskOutcome::NoChange(body) => DeployOutcome::Unchanged { service, body },
            }
        }
    };

    info!(%service, changed = outcome.changed(), "{}", outcome.message());
    Ok(outcome)
}
