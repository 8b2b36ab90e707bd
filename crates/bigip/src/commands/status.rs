//! Status command handlers.

use tokio_util::sync::CancellationToken;

use bigip_core::run_fleet;

use crate::cli::{GlobalOpts, StatusArgs, StatusCommand};
use crate::config::Fleet;
use crate::error::CliError;

pub async fn handle(
    args: StatusArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let fleet = Fleet::resolve(global, cancel)?;

    match args.command {
        StatusCommand::Sync => {
            let reports = run_fleet(fleet.devices, fleet.workers, |device| async move {
                device.sync_status().await
            })
            .await;
            super::finish(reports, global)
        }
        StatusCommand::Failover => {
            let reports = run_fleet(fleet.devices, fleet.workers, |device| async move {
                device.failover_status().await
            })
            .await;
            super::finish(reports, global)
        }
        StatusCommand::Version => {
            let reports = run_fleet(fleet.devices, fleet.workers, |device| async move {
                device.system_version().await
            })
            .await;
            super::finish(reports, global)
        }
    }
}
