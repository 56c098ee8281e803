//! `bauplan merge` — stage 3 over previously exported stage outputs
//!
//! Reads the workbooks the `lean` and `crossings` subcommands wrote.
//! When either is missing the merge declines with a warning instead of
//! failing, since the fix is to run the upstream stage first.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::Config;
use crate::excel;
use crate::pipeline::merge;

#[derive(Args)]
pub struct MergeArgs {
    /// Combined schedule export from `bauplan lean`
    #[arg(long, default_value = "combined_filtered_data.xlsx")]
    pub combined: PathBuf,

    /// Filtered register from `bauplan crossings`
    #[arg(long, default_value = "kreuzungspartner_filtered.xlsx")]
    pub crossings: PathBuf,

    /// Keep only these crossing partners (repeatable; default: all)
    #[arg(long = "partner", value_name = "NAME")]
    pub partners: Vec<String>,

    /// Output workbook
    #[arg(short, long, default_value = "merged_report.xlsx")]
    pub output: PathBuf,
}

pub fn handle(args: MergeArgs, config: &Config) -> Result<()> {
    for (path, stage) in [(&args.combined, "lean"), (&args.crossings, "crossings")] {
        if !path.exists() {
            println!(
                "{} {} not found; run `bauplan {}` first. Merge not executed.",
                "!".yellow(),
                path.display(),
                stage
            );
            return Ok(());
        }
    }

    let combined = excel::read_sheet(&args.combined, None)?;
    let crossings = excel::read_sheet(&args.crossings, None)?;

    let selected: Option<HashSet<String>> = if args.partners.is_empty() {
        None
    } else {
        Some(args.partners.iter().cloned().collect())
    };

    let report = merge::merge_report(&combined, &crossings, config, selected.as_ref())?;
    excel::write_table(&report, &args.output, "Bericht")?;

    println!(
        "{} {} rows written to {}",
        "✓".green(),
        report.len(),
        args.output.display()
    );
    Ok(())
}
