// ── Cluster sync convergence engine ──
//
// Reads the device-group sync status, triggers a config-sync when the
// device is out of sync, and polls until the group converges.

use std::fmt;
use std::str::FromStr;

use bigip_api::Session;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::poll::{PollPolicy, Step, poll_until};

/// Cluster sync status as reported by `tm/cm/sync-status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    InSync,
    Standalone,
    ChangesPending,
    AwaitingInitialSync,
    NotAllDevicesSynced,
    Syncing,
    Disconnected,
    Other(String),
}

impl SyncStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InSync => "In Sync",
            Self::Standalone => "Standalone",
            Self::ChangesPending => "Changes Pending",
            Self::AwaitingInitialSync => "Awaiting Initial Sync",
            Self::NotAllDevicesSynced => "Not All Devices Synced",
            Self::Syncing => "Syncing",
            Self::Disconnected => "Disconnected",
            Self::Other(s) => s,
        }
    }

    /// Nothing to sync.
    pub fn is_consistent(&self) -> bool {
        matches!(self, Self::InSync | Self::Standalone)
    }

    /// Still converging after a trigger.
    pub fn is_converging(&self) -> bool {
        matches!(
            self,
            Self::ChangesPending | Self::AwaitingInitialSync | Self::NotAllDevicesSynced | Self::Syncing
        )
    }
}

impl From<&str> for SyncStatus {
    fn from(s: &str) -> Self {
        match s {
            "In Sync" => Self::InSync,
            "Standalone" => Self::Standalone,
            "Changes Pending" => Self::ChangesPending,
            "Awaiting Initial Sync" => Self::AwaitingInitialSync,
            "Not All Devices Synced" => Self::NotAllDevicesSynced,
            "Syncing" => Self::Syncing,
            "Disconnected" => Self::Disconnected,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SyncStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Config-sync propagation direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncDirection {
    /// Push the local configuration to the rest of the group.
    #[default]
    ToGroup,
    /// Pull the newest configuration in the group onto this device.
    FromGroup,
}

impl SyncDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToGroup => "to-group",
            Self::FromGroup => "from-group",
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncDirection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "to-group" => Ok(Self::ToGroup),
            "from-group" => Ok(Self::FromGroup),
            _ => Err(CoreError::validation(format!("Direction '{s}' is not valid."))),
        }
    }
}

/// A config-sync action against one device group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSyncRequest {
    pub device_group: String,
    pub direction: SyncDirection,
    /// Make every peer pull the full configuration from this device.
    pub force_full_load_push: bool,
    pub poll: PollPolicy,
}

impl ConfigSyncRequest {
    pub fn new(device_group: impl Into<String>) -> Self {
        Self {
            device_group: device_group.into(),
            direction: SyncDirection::default(),
            force_full_load_push: false,
            poll: PollPolicy::config_sync(),
        }
    }

    /// `config-sync {direction} {group}[ force-full-load-push]`
    pub fn util_cmd_args(&self) -> String {
        let mut args = format!("config-sync {} {}", self.direction, self.device_group);
        if self.force_full_load_push {
            args.push_str(" force-full-load-push");
        }
        args
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.device_group.is_empty() || self.device_group.contains(char::is_whitespace) {
            return Err(CoreError::validation(format!(
                "Device group '{}' is not valid.",
                self.device_group
            )));
        }
        self.poll.check_budget()
    }
}

/// How a config-sync call ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Already `In Sync` or `Standalone`; nothing was triggered.
    AlreadyConsistent(SyncStatus),
    /// A sync was triggered and the group reached `In Sync`.
    Converged(SyncStatus),
}

impl SyncOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Converged(_))
    }

    pub fn status(&self) -> &SyncStatus {
        match self {
            Self::AlreadyConsistent(s) | Self::Converged(s) => s,
        }
    }
}

/// Read the current sync status.
pub async fn read_sync_status(session: &Session) -> Result<SyncStatus, CoreError> {
    let raw = session.sync_status().await?;
    Ok(SyncStatus::from(raw.as_str()))
}

/// Bring the device group to `In Sync`.
///
/// Issues no trigger when the device is already consistent. Otherwise
/// fires one config-sync and polls status `request.poll.retries` times,
/// pausing before every read.
pub async fn config_sync(
    session: &Session,
    request: &ConfigSyncRequest,
    cancel: &CancellationToken,
) -> Result<SyncOutcome, CoreError> {
    request.validate()?;

    let status = read_sync_status(session).await?;
    if status.is_consistent() {
        debug!(%status, "sync not required");
        return Ok(SyncOutcome::AlreadyConsistent(status));
    }

    let args = request.util_cmd_args();
    info!(%status, %args, "triggering config-sync");
    session.run_config_sync(&args).await?;

    let converged = poll_until(
        &request.poll,
        cancel,
        "configuration synchronization",
        move || async move {
            let status = read_sync_status(session).await?;
            if status == SyncStatus::InSync {
                Ok(Step::Done(status))
            } else if status.is_converging() {
                Ok(Step::Pending(status.to_string()))
            } else {
                Err(CoreError::ConvergenceFailed {
                    reason: format!("The configuration synchronization has failed ({status})."),
                    detail: Some(Value::String(status.to_string())),
                })
            }
        },
    )
    .await?;

    info!(status = %converged, "config-sync converged");
    Ok(SyncOutcome::Converged(converged))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_vocabulary() {
        assert!(SyncStatus::from("In Sync").is_consistent());
        assert!(SyncStatus::from("Standalone").is_consistent());
        assert!(SyncStatus::from("Syncing").is_converging());
        assert!(!SyncStatus::from("Disconnected").is_converging());

        let other = SyncStatus::from("Sync Failure");
        assert_eq!(other, SyncStatus::Other("Sync Failure".into()));
        assert!(!other.is_converging());
        assert_eq!(other.to_string(), "Sync Failure");
    }

    #[test]
    fn direction_parsing() {
        assert_eq!("from-group".parse::<SyncDirection>().unwrap(), SyncDirection::FromGroup);
        let err = "sideways".parse::<SyncDirection>().unwrap_err();
        assert_eq!(err.to_string(), "Direction 'sideways' is not valid.");
    }

    #[test]
    fn util_cmd_args_shape() {
        let mut req = ConfigSyncRequest::new("sync-failover-group");
        assert_eq!(req.util_cmd_args(), "config-sync to-group sync-failover-group");

        req.direction = SyncDirection::FromGroup;
        req.force_full_load_push = true;
        assert_eq!(
            req.util_cmd_args(),
            "config-sync from-group sync-failover-group force-full-load-push"
        );
    }

    #[test]
    fn device_group_is_validated() {
        assert!(ConfigSyncRequest::new("").validate().is_err());
        assert!(ConfigSyncRequest::new("dg; rm").validate().is_err());
        assert!(ConfigSyncRequest::new("dg-1").validate().is_ok());
    }
}
