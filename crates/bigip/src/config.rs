//! CLI configuration: thin wrapper around `bigip_config`.
//!
//! Adds `GlobalOpts` overrides (--config, --insecure, --timeout, --workers)
//! and turns the selected inventory entries into `Device` contexts.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use bigip_core::{Device, DeviceConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use bigip_config::{Config, DeviceEntry, config_path};

/// The inventory file in effect: `--config`, then the default location.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the inventory the flags point at.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let cfg = match &global.config {
        Some(path) => bigip_config::load_config_from(path)?,
        None => bigip_config::load_config()?,
    };
    Ok(cfg)
}

/// Devices picked by --device / --group, ready to connect.
pub struct Fleet {
    pub devices: Vec<Arc<Device>>,
    pub workers: usize,
}

impl Fleet {
    pub fn resolve(global: &GlobalOpts, cancel: &CancellationToken) -> Result<Self, CliError> {
        let cfg = load(global)?;
        let selected = cfg.select(&global.devices, &global.groups)?;
        if selected.is_empty() {
            return Err(CliError::NoDevices {
                path: config_file(global).display().to_string(),
            });
        }

        let devices = selected
            .into_iter()
            .map(|(name, entry)| {
                let config = resolve_device(name, entry, &cfg, global)?;
                Ok(Arc::new(Device::with_cancellation(config, cancel.clone())))
            })
            .collect::<Result<Vec<_>, CliError>>()?;

        Ok(Self {
            devices,
            workers: global.workers.unwrap_or(cfg.defaults.workers).max(1),
        })
    }
}

/// Translate an inventory entry + global flags into a `DeviceConfig`.
///
/// CLI flag overrides take priority over inventory values.
fn resolve_device(
    name: &str,
    entry: &DeviceEntry,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<DeviceConfig, CliError> {
    let mut config = bigip_config::device_to_config(name, entry, &cfg.defaults)?;

    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}
