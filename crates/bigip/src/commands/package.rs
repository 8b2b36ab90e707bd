//! LX package command handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use bigip_core::{PackageRequest, PackageState, PollPolicy, run_fleet};

use crate::cli::{GlobalOpts, PackageArgs, PackageCommand};
use crate::config::Fleet;
use crate::error::CliError;

pub async fn handle(
    args: PackageArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let request = match args.command {
        PackageCommand::Install {
            package,
            retain_package_file,
            poll,
        } => {
            if !package.is_file() {
                return Err(CliError::Validation {
                    message: format!("Package '{}' is not a readable file.", package.display()),
                });
            }
            PackageRequest {
                retain_package_file,
                poll: super::poll_policy(PollPolicy::package(), &poll),
                ..PackageRequest::new(package, PackageState::Present)
            }
        }
        PackageCommand::Uninstall { package, poll } => PackageRequest {
            poll: super::poll_policy(PollPolicy::package(), &poll),
            ..PackageRequest::new(package, PackageState::Absent)
        },
    };

    let fleet = Fleet::resolve(global, cancel)?;
    let request = Arc::new(request);
    let reports = run_fleet(fleet.devices, fleet.workers, |device| {
        let request = Arc::clone(&request);
        async move { device.manage_package(&request).await }
    })
    .await;

    super::finish(reports, global)
}
