//! Inventory listing. Reads the config only; never contacts a device.

use serde::Serialize;
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct DeviceSummary {
    name: String,
    host: String,
    port: u16,
    auth: String,
    groups: Vec<String>,
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "Auth")]
    auth: String,
    #[tabled(rename = "Groups")]
    groups: String,
}

impl From<&DeviceSummary> for DeviceRow {
    fn from(d: &DeviceSummary) -> Self {
        Self {
            name: d.name.clone(),
            host: d.host.clone(),
            port: d.port,
            auth: d.auth.clone(),
            groups: d.groups.join(", "),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let summaries: Vec<DeviceSummary> = cfg
        .select(&global.devices, &global.groups)?
        .into_iter()
        .map(|(name, entry)| DeviceSummary {
            name: name.to_owned(),
            host: entry.host.clone(),
            port: entry.port.unwrap_or(cfg.defaults.port),
            auth: format!("{:?}", entry.auth.unwrap_or(cfg.defaults.auth)).to_lowercase(),
            groups: entry.groups.clone(),
        })
        .collect();

    let out = output::render_list(
        global.output,
        &summaries,
        |d| DeviceRow::from(d),
        |d| d.name.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
