//! XDCC downloader entry point.

mod args;
mod get;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<ExitCode> {
    // Structured logging goes to stderr; stdout belongs to the formatters.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = args::Cli::parse();

    let rt = tokio::runtime::Runtime::new()?;
    match cli.command {
        args::Command::Get(get_args) => rt.block_on(get::run(get_args)),
    }
}
