//! `shears`: batch image and file operations from the command line.
//!
//! Results are printed as JSON on stdout; a short summary and any failure
//! reasons go to stderr. The exit code is non-zero when any item failed.

mod cli;
mod commands;
mod output;

use crate::cli::Cli;
use clap::Parser;
use shears_config::Config;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> miette::Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).map_err(fatal)?;
    init_tracing(cli.verbose, config.log.as_deref());
    tracing::debug!(command = ?cli.command, "Starting");
    commands::run(cli.command, commands::engine(config.engine)).await
}

/// Log the full error tree, then hand the top-level message to `miette`.
pub(crate) fn fatal<E>(err: exn::Exn<E>) -> miette::Report
where
    E: std::error::Error + Send + Sync + 'static,
{
    tracing::debug!(error = ?err, "Fatal error");
    miette::miette!("{}", *err)
}

fn init_tracing(verbose: u8, configured: Option<&str>) {
    let fallback = match verbose {
        0 => configured.unwrap_or("warn"),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
