//! `bauplan crossings` — stage 2 on its own

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::Config;
use crate::excel;
use crate::pipeline::crossings;

#[derive(Args)]
pub struct CrossingsArgs {
    /// Crossing-partner register workbook
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Worksheet holding the register
    #[arg(long)]
    pub sheet: Option<String>,

    /// Clearance-status column
    #[arg(long)]
    pub column: Option<String>,

    /// Output workbook for the filtered register
    #[arg(short, long, default_value = "kreuzungspartner_filtered.xlsx")]
    pub output: PathBuf,

    /// Output workbook for the per-partner summary
    #[arg(long, default_value = "kreuzungspartner_summary.xlsx")]
    pub summary_output: PathBuf,
}

pub fn handle(args: CrossingsArgs, config: &Config) -> Result<()> {
    let sheet = args.sheet.as_deref().unwrap_or(&config.crossings.sheet);
    let column = args
        .column
        .as_deref()
        .unwrap_or(&config.crossings.clearance_column);

    let output = crossings::filter_crossings(&args.file, &config.crossings, sheet, column)?;

    excel::write_table(&output.filtered, &args.output, "Kreuzungspartner")?;
    excel::write_table(&output.summary, &args.summary_output, "Zusammenfassung")?;

    super::print_table("Distinct areas per crossing partner", &output.summary);
    println!();
    println!(
        "{} {} rows written to {}, summary to {}",
        "✓".green(),
        output.filtered.len(),
        args.output.display(),
        args.summary_output.display()
    );
    Ok(())
}
