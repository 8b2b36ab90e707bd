//! Deploy command handler.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use bigip_core::{
    As3Modifiers, AtcMethod, AtcService, DeclarationSource, DeploymentRequest, PollPolicy,
    run_fleet,
};

use crate::cli::{DeployArgs, GlobalOpts};
use crate::config::Fleet;
use crate::error::CliError;

/// Upper bound for reading a `--url` declaration.
const SOURCE_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn handle(
    args: DeployArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let mut request = build_request(args)?;

    // Read the declaration once, then reject bad input before any device
    // is contacted.
    request.resolve_source(SOURCE_TIMEOUT).await?;
    let service = request.validate(request.inline_declaration())?;
    tracing::debug!(%service, method = %request.method, "deployment validated");

    let fleet = Fleet::resolve(global, cancel)?;
    let request = Arc::new(request);
    let reports = run_fleet(fleet.devices, fleet.workers, |device| {
        let request = Arc::clone(&request);
        async move { device.deploy(&request).await }
    })
    .await;

    super::finish(reports, global)
}

fn build_request(args: DeployArgs) -> Result<DeploymentRequest, CliError> {
    let source = match (args.declaration, args.file, args.url) {
        (Some(text), _, _) => {
            let value = serde_json::from_str(&text).map_err(|e| CliError::Validation {
                message: format!("--declaration is not valid JSON: {e}"),
            })?;
            Some(DeclarationSource::Inline(value))
        }
        (None, Some(path), _) => Some(DeclarationSource::FromPath(path)),
        (None, None, Some(url)) => {
            let url = url.parse().map_err(|e| CliError::Validation {
                message: format!("--url '{url}' is not a valid URL: {e}"),
            })?;
            Some(DeclarationSource::FromUrl(url))
        }
        (None, None, None) => None,
    };

    let service = args
        .service
        .as_deref()
        .map(str::parse::<AtcService>)
        .transpose()?;
    let method: AtcMethod = args.method.parse()?;

    Ok(DeploymentRequest {
        source,
        service,
        method,
        modifiers: As3Modifiers {
            tenant: args.tenant,
            show: Some(args.show),
            show_hash: args.show_hash,
        },
        poll: super::poll_policy(PollPolicy::deployment(), &args.poll),
        dry_run: args.dry_run,
    })
}
