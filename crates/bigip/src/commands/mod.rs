//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod deploy;
pub mod devices;
pub mod files;
pub mod package;
pub mod status;
pub mod sync;

use serde::Serialize;

use bigip_core::{DeviceReport, Outcome, PollPolicy};

use crate::cli::{GlobalOpts, PollArgs};
use crate::error::CliError;
use crate::output::{self, ReportView};

/// Apply `--delay` / `--retries` on top of an engine's default pacing.
pub fn poll_policy(base: PollPolicy, args: &PollArgs) -> PollPolicy {
    let policy = match args.delay {
        Some(delay) => base.with_delay(delay),
        None => base,
    };
    match args.retries {
        Some(retries) => policy.with_retries(retries),
        None => policy,
    }
}

/// Render the per-device reports, then turn failures into the exit error.
///
/// A single failing device surfaces its own error; with several devices
/// any failure becomes a partial-failure error.
pub fn finish<T: Outcome + Serialize>(
    reports: Vec<DeviceReport<T>>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let views: Vec<ReportView> = reports.iter().map(ReportView::from_report).collect();
    let color = output::should_color(global.color);
    output::print_output(
        &output::render_reports(global.output, color, &views),
        global.quiet,
    );

    let total = reports.len();
    let mut errors: Vec<_> = reports.into_iter().filter_map(|r| r.result.err()).collect();
    match errors.len() {
        0 => Ok(()),
        1 if total == 1 => Err(errors.remove(0).into()),
        failed => Err(CliError::PartialFailure { failed, total }),
    }
}
