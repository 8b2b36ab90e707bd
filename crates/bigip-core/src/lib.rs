// bigip-core: Deployment and convergence engines between bigip-api and the CLI.

pub mod capability;
pub mod config;
pub mod declaration;
pub mod deploy;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod fleet;
pub mod package;
pub mod poll;
pub mod service;
pub mod sync;
pub mod task;
pub mod version;

// ── Primary re-exports ──────────────────────────────────────────────
pub use capability::{As3Modifiers, CapabilitySet, ShowMode};
pub use config::{AuthCredentials, DeviceConfig, TlsVerification};
pub use declaration::DeclarationSource;
pub use deploy::{DeployOutcome, DeploymentRequest, deploy};
pub use device::Device;
pub use dispatch::{AsyncOperation, DispatchOutcome, dispatch};
pub use error::CoreError;
pub use fleet::{DeviceReport, Outcome, run_fleet};
pub use package::{PackageOutcome, PackageRequest, PackageState, manage_package};
pub use poll::PollPolicy;
pub use service::{AtcMethod, AtcService, ServiceDescriptor, TaskState};
pub use sync::{
    ConfigSyncRequest, SyncDirection, SyncOutcome, SyncStatus, config_sync, read_sync_status,
};
pub use task::{TaskOutcome, await_task};
pub use version::Version;

// Transport types callers need to build a `DeviceConfig`.
pub use bigip_api::{RetryPolicy, Session, UploadedFile};
