//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders per-device reports in the format selected by `--output`. Table
//! uses `tabled`, structured formats use serde, plain emits one line per
//! device.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;
use tabled::{Table, Tabled, settings::Style};

use bigip_core::{DeviceReport, Outcome};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Report view ──────────────────────────────────────────────────────

/// Serializable shape of one device's result.
#[derive(Debug, Serialize)]
pub struct ReportView {
    pub device: String,
    pub ok: bool,
    pub changed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ReportView {
    pub fn from_report<T: Outcome + Serialize>(report: &DeviceReport<T>) -> Self {
        match &report.result {
            Ok(outcome) => Self {
                device: report.device.clone(),
                ok: true,
                changed: outcome.changed(),
                message: outcome.summary(),
                result: serde_json::to_value(outcome).ok(),
                detail: None,
            },
            Err(e) => Self {
                device: report.device.clone(),
                ok: false,
                changed: false,
                message: e.to_string(),
                result: None,
                detail: e.detail().cloned(),
            },
        }
    }

    fn status(&self) -> &'static str {
        match (self.ok, self.changed) {
            (false, _) => "failed",
            (true, true) => "changed",
            (true, false) => "ok",
        }
    }
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

fn paint(status: &str, color: bool) -> String {
    if !color {
        return status.to_owned();
    }
    match status {
        "failed" => status.red().to_string(),
        "changed" => status.yellow().to_string(),
        _ => status.green().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> String
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&line_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render per-device reports.
pub fn render_reports(format: OutputFormat, color: bool, views: &[ReportView]) -> String {
    render_list(
        format,
        views,
        |v| ReportRow {
            device: v.device.clone(),
            status: paint(v.status(), color),
            message: v.message.clone(),
        },
        |v| format!("{}\t{}\t{}", v.device, v.status(), v.message),
    )
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
}

fn render_yaml<T: Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: serialization failed: {e}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bigip_core::{CoreError, SyncOutcome, SyncStatus};
    use serde_json::json;

    use super::*;

    fn views() -> Vec<ReportView> {
        let ok = DeviceReport {
            device: "lb1".into(),
            result: Ok(SyncOutcome::Converged(SyncStatus::InSync)),
        };
        let failed: DeviceReport<SyncOutcome> = DeviceReport {
            device: "lb2".into(),
            result: Err(CoreError::ConvergenceFailed {
                reason: "The configuration synchronization has failed (Disconnected).".into(),
                detail: None,
            }),
        };
        vec![ReportView::from_report(&ok), ReportView::from_report(&failed)]
    }

    #[test]
    fn plain_output_is_one_line_per_device() {
        let out = render_reports(OutputFormat::Plain, false, &views());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("lb1\tchanged\t"));
        assert_eq!(
            lines[1],
            "lb2\tfailed\tThe configuration synchronization has failed (Disconnected)."
        );
    }

    #[test]
    fn json_output_carries_outcome() {
        let out = render_reports(OutputFormat::JsonCompact, false, &views());
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["result"], json!({ "outcome": "converged", "status": "In Sync" }));
        assert_eq!(parsed[1]["ok"], json!(false));
        assert!(parsed[1].get("result").is_none());
    }

    #[test]
    fn table_output_has_headers() {
        let out = render_reports(OutputFormat::Table, false, &views());
        assert!(out.contains("Device"));
        assert!(out.contains("changed"));
    }
}
