// ── Fleet runner ──
//
// Runs one operation per device with bounded concurrency and collects a
// report per device. A failing device never stops the others.

use std::future::Future;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{debug, warn};

use crate::deploy::DeployOutcome;
use crate::device::Device;
use crate::error::CoreError;
use crate::package::PackageOutcome;
use crate::sync::{SyncOutcome, SyncStatus};

/// Per-device result summary.
pub trait Outcome {
    /// Whether the device's state was modified.
    fn changed(&self) -> bool;
    /// One-line human summary.
    fn summary(&self) -> String;
}

impl Outcome for DeployOutcome {
    fn changed(&self) -> bool {
        DeployOutcome::changed(self)
    }

    fn summary(&self) -> String {
        self.message()
    }
}

impl Outcome for SyncOutcome {
    fn changed(&self) -> bool {
        SyncOutcome::changed(self)
    }

    fn summary(&self) -> String {
        self.status().to_string()
    }
}

impl Outcome for PackageOutcome {
    fn changed(&self) -> bool {
        true
    }

    fn summary(&self) -> String {
        self.message().into()
    }
}

impl Outcome for SyncStatus {
    fn changed(&self) -> bool {
        false
    }

    fn summary(&self) -> String {
        self.to_string()
    }
}

impl Outcome for String {
    fn changed(&self) -> bool {
        false
    }

    fn summary(&self) -> String {
        self.clone()
    }
}

impl Outcome for bigip_api::UploadedFile {
    fn changed(&self) -> bool {
        self.chunks > 0
    }

    fn summary(&self) -> String {
        format!("Uploaded {} ({} bytes)", self.remote_path, self.size)
    }
}

impl Outcome for () {
    fn changed(&self) -> bool {
        true
    }

    fn summary(&self) -> String {
        "done".into()
    }
}

/// The result of one operation on one device.
#[derive(Debug)]
pub struct DeviceReport<T> {
    pub device: String,
    pub result: Result<T, CoreError>,
}

impl<T: Outcome> DeviceReport<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn changed(&self) -> bool {
        self.result.as_ref().is_ok_and(Outcome::changed)
    }
}

/// Run `op` on every device, at most `workers` at a time, then close
/// each device's session. Reports come back in input order.
pub async fn run_fleet<T, F, Fut>(
    devices: Vec<Arc<Device>>,
    workers: usize,
    op: F,
) -> Vec<DeviceReport<T>>
where
    F: Fn(Arc<Device>) -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let op = &op;
    let mut reports: Vec<(usize, DeviceReport<T>)> = stream::iter(devices.into_iter().enumerate())
        .map(|(idx, device)| async move {
            let name = device.name().to_owned();
            debug!(device = %name, "starting");
            let result = op(Arc::clone(&device)).await;
            if let Err(e) = &result {
                warn!(device = %name, error = %e, "device operation failed");
            }
            device.disconnect().await;
            (idx, DeviceReport { device: name, result })
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    reports.sort_by_key(|(idx, _)| *idx);
    reports.into_iter().map(|(_, report)| report).collect()
}
