//! bauplan: filter construction-schedule exports and merge them with
//! crossing-partner registers into a weekly coordination report.

mod cli;
mod config;
mod excel;
mod extract;
mod pipeline;
mod table;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands, commands};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = config::Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Lean(args) => commands::lean::handle(args, &config),
        Commands::Crossings(args) => commands::crossings::handle(args, &config),
        Commands::Merge(args) => commands::merge::handle(args, &config),
        Commands::Run(args) => commands::run::handle(args, &config),
    }
}
