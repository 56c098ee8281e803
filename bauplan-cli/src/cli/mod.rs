//! Command-line interface

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bauplan",
    about = "Filter construction-schedule exports and merge them with crossing-partner registers",
    version
)]
pub struct Cli {
    /// Path to a TOML rules file overriding the built-in filter rules
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Filter schedule exports into one combined table
    Lean(commands::lean::LeanArgs),
    /// Filter the crossing-partner register and derive the partner summary
    Crossings(commands::crossings::CrossingsArgs),
    /// Merge previously exported stage outputs into the final report
    Merge(commands::merge::MergeArgs),
    /// Run the full pipeline, with interactive prompts on a terminal
    Run(commands::run::RunArgs),
}
