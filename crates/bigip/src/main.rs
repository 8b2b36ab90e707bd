mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose, cli.global.log_json);

    // Ctrl-C cancels poll loops; sessions still close normally.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    if let Err(err) = run(cli, &cancel).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity > 2);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli, cancel: &CancellationToken) -> Result<(), CliError> {
    let global = &cli.global;
    match cli.command {
        // Inventory-only commands never connect
        Command::Config(ref args) => commands::config_cmd::handle(args, global),
        Command::Devices => commands::devices::handle(global),

        Command::Completions(ref args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "bigip", &mut std::io::stdout());
            Ok(())
        }

        Command::Deploy(args) => commands::deploy::handle(args, global, cancel).await,
        Command::Sync(args) => commands::sync::handle(args, global, cancel).await,
        Command::Status(args) => commands::status::handle(args, global, cancel).await,
        Command::Package(args) => commands::package::handle(args, global, cancel).await,
        Command::Files(args) => commands::files::handle(args, global, cancel).await,
    }
}
