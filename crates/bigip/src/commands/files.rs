//! File command handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use bigip_core::run_fleet;

use crate::cli::{FilesArgs, FilesCommand, GlobalOpts};
use crate::config::Fleet;
use crate::error::CliError;

pub async fn handle(
    args: FilesArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match args.command {
        FilesCommand::Upload { path, name } => {
            let fleet = Fleet::resolve(global, cancel)?;
            let path = Arc::new(path);
            let name = Arc::new(name);
            let reports = run_fleet(fleet.devices, fleet.workers, |device| {
                let path = Arc::clone(&path);
                let name = Arc::clone(&name);
                async move { device.upload_file(&path, name.as_deref()).await }
            })
            .await;
            super::finish(reports, global)
        }
        FilesCommand::Ls { path } => {
            let fleet = Fleet::resolve(global, cancel)?;
            let path = Arc::new(path);
            let reports = run_fleet(fleet.devices, fleet.workers, |device| {
                let path = Arc::clone(&path);
                async move { device.unix_ls(&path).await.map(|out| out.trim_end().to_owned()) }
            })
            .await;
            super::finish(reports, global)
        }
        FilesCommand::Rm { path } => {
            let fleet = Fleet::resolve(global, cancel)?;
            let path = Arc::new(path);
            let reports = run_fleet(fleet.devices, fleet.workers, |device| {
                let path = Arc::clone(&path);
                async move { device.unix_rm(&path).await }
            })
            .await;
            super::finish(reports, global)
        }
    }
}
