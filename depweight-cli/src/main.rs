use anyhow::Result;
use clap::Parser;
use depweight_core::DepweightConfig;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let config = DepweightConfig::from_env();

    init_tracing(args.verbose || config.verbose)?;

    match args.command {
        Command::Weights(args) => commands::weights::run(args, &config).await,
        Command::Validate(args) => commands::validate::run(args),
        Command::Config(args) => commands::config::run(args, &config),
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default = if verbose { "depweight_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
