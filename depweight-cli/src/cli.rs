use crate::commands;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "depweight",
    about = "split credit across an open-source dependency tree",
    version,
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the weight of every package reachable from the given ones
    Weights(commands::weights::WeightsArgs),
    /// Check package names against npm naming rules
    Validate(commands::validate::ValidateArgs),
    /// Show the resolved configuration
    Config(commands::config::ConfigArgs),
}
