// ── LX package engine ──
//
// Installs or removes an iApps LX RPM: version gate, upload when the
// file is missing on the device, package-management task, poll, cleanup.

use std::path::{Path, PathBuf};

use bigip_api::file_transfer::REMOTE_DIRECTORY;
use bigip_api::{PackageOperation, Session};
use serde::Serialize;
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::poll::{PollPolicy, Step, poll_until};
use crate::version::{Threshold, Version};

const MIN_SYSTEM_VERSION: Threshold = (12, 0, 0);

/// Desired package state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PackageState {
    #[default]
    Present,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    /// Local RPM path. Only the file name matters for `Absent`.
    pub package: PathBuf,
    pub state: PackageState,
    /// Keep the uploaded RPM on the device after installing.
    pub retain_package_file: bool,
    pub poll: PollPolicy,
}

impl PackageRequest {
    pub fn new(package: impl Into<PathBuf>, state: PackageState) -> Self {
        Self {
            package: package.into(),
            state,
            retain_package_file: false,
            poll: PollPolicy::package(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PackageOutcome {
    Installed { package: String, uploaded: bool },
    Uninstalled { package: String },
}

impl PackageOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Installed { .. } => "The LX package was successfully installed.",
            Self::Uninstalled { .. } => "The LX package was successfully uninstalled.",
        }
    }
}

fn file_name(path: &Path) -> Result<&str, CoreError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CoreError::validation(format!("Package '{}' is not valid.", path.display())))
}

/// Drive one install or uninstall to completion.
pub async fn manage_package(
    session: &Session,
    request: &PackageRequest,
    cancel: &CancellationToken,
) -> Result<PackageOutcome, CoreError> {
    let file = file_name(&request.package)?;
    request.poll.check_budget()?;

    let raw = session.system_version().await?;
    let version: Version = raw.parse()?;
    if !version.at_least(MIN_SYSTEM_VERSION) {
        return Err(CoreError::Unsupported {
            operation: format!("LX package management on BIG-IP {raw}"),
            required: "BIG-IP 12.0.0 or later".into(),
        });
    }

    let remote_path = format!("{REMOTE_DIRECTORY}/{file}");
    let mut uploaded = false;

    let operation = match request.state {
        PackageState::Present => {
            let listing = session.unix_ls(&remote_path).await?;
            if listing.contains("No such file or directory") {
                debug!(file, "package not on device, uploading");
                session.upload_file(&request.package, Some(file)).await?;
                uploaded = true;
            }
            PackageOperation::Install {
                package_file_path: remote_path.clone(),
            }
        }
        PackageState::Absent => {
            let name = Path::new(file)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(file);
            PackageOperation::Uninstall {
                package_name: name.to_owned(),
            }
        }
    };

    let task = session.create_package_task(&operation).await?;
    info!(task_id = %task.id, state = %request.state, "package task created");

    let id = task.id;
    poll_until(&request.poll, cancel, "task", move || {
        let id = id.clone();
        async move {
            let task = session.package_task(&id).await?;
            match task.status.as_str() {
                "CREATED" | "STARTED" => Ok(Step::Pending(task.status)),
                "FINISHED" => Ok(Step::Done(())),
                "FAILED" => Err(CoreError::ConvergenceFailed {
                    reason: task
                        .error_message
                        .unwrap_or_else(|| crate::service::TASK_FAILED.into()),
                    detail: None,
                }),
                _ => Err(CoreError::ConvergenceFailed {
                    reason: crate::service::TASK_FAILED.into(),
                    detail: None,
                }),
            }
        }
    })
    .await?;

    match request.state {
        PackageState::Present => {
            if !request.retain_package_file {
                if let Err(e) = session.unix_rm(&remote_path).await {
                    warn!(error = %e, path = %remote_path, "package file cleanup failed (non-fatal)");
                }
            }
            Ok(PackageOutcome::Installed {
                package: file.to_owned(),
                uploaded,
            })
        }
        PackageState::Absent => Ok(PackageOutcome::Uninstalled {
            package: file.to_owned(),
        }),
    }
}
