//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_file(global).display().to_string(), false);
            Ok(())
        }
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            output::print_output(&cfg.to_redacted_toml()?, global.quiet);
            Ok(())
        }
    }
}
