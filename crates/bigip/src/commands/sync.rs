//! Config-sync command handler.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use bigip_core::{ConfigSyncRequest, PollPolicy, SyncDirection, run_fleet};

use crate::cli::{GlobalOpts, SyncArgs};
use crate::config::Fleet;
use crate::error::CliError;

pub async fn handle(
    args: SyncArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let direction: SyncDirection = args.direction.parse()?;
    let request = Arc::new(ConfigSyncRequest {
        direction,
        force_full_load_push: args.force_full_load_push,
        poll: super::poll_policy(PollPolicy::config_sync(), &args.poll),
        ..ConfigSyncRequest::new(args.device_group)
    });

    let fleet = Fleet::resolve(global, cancel)?;
    let reports = run_fleet(fleet.devices, fleet.workers, |device| {
        let request = Arc::clone(&request);
        async move { device.config_sync(&request).await }
    })
    .await;

    super::finish(reports, global)
}
