// Cluster management endpoints
//
// Sync/failover status reads and the config-sync trigger. The status
// strings are returned as-is; interpreting them is the caller's job.

use tracing::debug;

use crate::error::Error;
use crate::models::{RunCommand, StatsResponse};
use crate::session::Session;

pub const CM_PATH: &str = "/mgmt/tm/cm";
pub const SYNC_STATUS_PATH: &str = "/mgmt/tm/cm/sync-status";
pub const FAILOVER_STATUS_PATH: &str = "/mgmt/tm/cm/failover-status";

impl Session {
    /// Read the device's config-sync status description
    /// (`In Sync`, `Changes Pending`, `Standalone`, ...).
    ///
    /// `GET /mgmt/tm/cm/sync-status`
    pub async fn sync_status(&self) -> Result<String, Error> {
        debug!("fetching sync status");
        let stats: StatsResponse = self.get(SYNC_STATUS_PATH).await?;
        stats
            .description("status")
            .map(str::to_owned)
            .ok_or_else(|| Error::UnexpectedResponse("sync-status carries no status entry".into()))
    }

    /// Read the device's failover status (`ACTIVE`, `STANDBY`, ...).
    ///
    /// `GET /mgmt/tm/cm/failover-status`
    pub async fn failover_status(&self) -> Result<String, Error> {
        debug!("fetching failover status");
        let stats: StatsResponse = self.get(FAILOVER_STATUS_PATH).await?;
        stats.description("status").map(str::to_owned).ok_or_else(|| {
            Error::UnexpectedResponse("failover-status carries no status entry".into())
        })
    }

    /// Fire a `config-sync` command. The response is not a convergence
    /// signal; poll [`sync_status`](Self::sync_status) afterwards.
    ///
    /// `POST /mgmt/tm/cm` with `{"command": "run", "utilCmdArgs": "config-sync ..."}`
    pub async fn run_config_sync(&self, util_cmd_args: &str) -> Result<(), Error> {
        debug!(util_cmd_args, "triggering config-sync");
        let _: serde_json::Value = self.post(CM_PATH, &RunCommand::new(util_cmd_args)).await?;
        Ok(())
    }
}
