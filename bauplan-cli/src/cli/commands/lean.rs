//! `bauplan lean` — stage 1 on its own

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::Config;
use crate::excel;
use crate::pipeline::{WeekWindow, lean};

#[derive(Args)]
pub struct LeanArgs {
    /// Schedule exports, processed in the given order
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Keep rows with KW Start at or below this week (1-52)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=52))]
    pub cutoff: Option<u32>,

    /// Also require KW Start at or above this week (1-52)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=52))]
    pub floor: Option<u32>,

    /// Output workbook
    #[arg(short, long, default_value = "combined_filtered_data.xlsx")]
    pub output: PathBuf,
}

pub fn handle(args: LeanArgs, config: &Config) -> Result<()> {
    let window = WeekWindow {
        cutoff: args.cutoff.unwrap_or(config.lean.week_cutoff),
        floor: args.floor.or(config.lean.week_floor),
    };

    let output = lean::combine(&args.files, &config.lean, window)?;
    excel::write_table(&output.combined, &args.output, "Lean Export")?;

    super::print_counts("Rows per source file", &output.source_counts);
    println!();
    println!(
        "{} {} rows written to {}",
        "✓".green(),
        output.combined.len(),
        args.output.display()
    );
    Ok(())
}
