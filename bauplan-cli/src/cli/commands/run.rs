//! `bauplan run` — the full pipeline in one session
//!
//! On a terminal the week bounds, sheet and column names are prompted
//! with the configured defaults, and the partner narrowing is an
//! interactive multi-select. Off a terminal every prompt falls back to
//! its default, so the command also works in scripts.

use std::collections::HashSet;
use std::io::stdin;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use dialoguer::{Confirm, Input, MultiSelect};
use is_terminal::IsTerminal;

use crate::config::Config;
use crate::excel;
use crate::pipeline::{Session, WeekWindow, merge};

#[derive(Args)]
pub struct RunArgs {
    /// Schedule exports, processed in the given order
    #[arg(required = true, value_name = "FILE")]
    pub lean_files: Vec<PathBuf>,

    /// Crossing-partner register workbook
    #[arg(long, value_name = "FILE")]
    pub crossings: PathBuf,

    /// Keep rows with KW Start at or below this week (1-52)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=52))]
    pub cutoff: Option<u32>,

    /// Also require KW Start at or above this week (1-52)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=52))]
    pub floor: Option<u32>,

    /// Worksheet holding the register
    #[arg(long)]
    pub sheet: Option<String>,

    /// Clearance-status column
    #[arg(long)]
    pub column: Option<String>,

    /// Skip the partner multi-select and keep all partners
    #[arg(long)]
    pub all_partners: bool,

    /// Directory the exports are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}

pub fn handle(args: RunArgs, config: &Config) -> Result<()> {
    let interactive = stdin().is_terminal();

    let cutoff = match args.cutoff {
        Some(cutoff) => cutoff,
        None if interactive => prompt_week("KW cutoff", config.lean.week_cutoff)?,
        None => config.lean.week_cutoff,
    };
    let floor = args.floor.or(config.lean.week_floor);
    let window = WeekWindow { cutoff, floor };

    let sheet = match args.sheet {
        Some(sheet) => sheet,
        None if interactive => prompt_text("Register sheet name", &config.crossings.sheet)?,
        None => config.crossings.sheet.clone(),
    };
    let column = match args.column {
        Some(column) => column,
        None if interactive => {
            prompt_text("Clearance column name", &config.crossings.clearance_column)?
        }
        None => config.crossings.clearance_column.clone(),
    };

    let mut session = Session::new();

    // Stage 1
    let lean = session.lean(config, &args.lean_files, window)?;
    super::print_counts("Rows per source file", &lean.source_counts);
    let combined_path = args.out_dir.join("combined_filtered_data.xlsx");
    excel::write_table(&lean.combined, &combined_path, "Lean Export")?;
    println!(
        "{} stage 1: {} rows, written to {}",
        "✓".green(),
        lean.combined.len(),
        combined_path.display()
    );

    // Stage 2
    let crossings = session.crossings(config, &args.crossings, &sheet, &column)?;
    super::print_table("Distinct areas per crossing partner", &crossings.summary);
    let filtered_path = args.out_dir.join("kreuzungspartner_filtered.xlsx");
    let summary_path = args.out_dir.join("kreuzungspartner_summary.xlsx");
    excel::write_table(&crossings.filtered, &filtered_path, "Kreuzungspartner")?;
    excel::write_table(&crossings.summary, &summary_path, "Zusammenfassung")?;
    println!(
        "{} stage 2: {} rows, written to {}",
        "✓".green(),
        crossings.filtered.len(),
        filtered_path.display()
    );

    // Stage 3, repeatable with a fresh partner selection
    let names = merge::partner_names(&crossings.filtered, config);
    let report_path = args.out_dir.join("merged_report.xlsx");
    loop {
        let selected = if args.all_partners || !interactive || names.is_empty() {
            None
        } else {
            Some(prompt_partners(&names)?)
        };

        match session.merge(config, selected.as_ref()) {
            Ok(report) => {
                excel::write_table(&report, &report_path, "Bericht")?;
                println!(
                    "{} stage 3: {} rows, written to {}",
                    "✓".green(),
                    report.len(),
                    report_path.display()
                );
            }
            // Upstream gaps are a warning, not an abort
            Err(e) => {
                println!("{} merge not executed: {}", "!".yellow(), e);
                return Ok(());
            }
        }

        let again = interactive
            && !args.all_partners
            && !names.is_empty()
            && Confirm::new()
                .with_prompt("Export again with a different partner selection?")
                .default(false)
                .interact()?;
        if !again {
            break;
        }
    }

    Ok(())
}

fn prompt_week(prompt: &str, default: u32) -> Result<u32> {
    let week = Input::<u32>::new()
        .with_prompt(format!("{} (1-52)", prompt))
        .default(default)
        .validate_with(|value: &u32| {
            if (1..=52).contains(value) {
                Ok(())
            } else {
                Err("week must be between 1 and 52")
            }
        })
        .interact_text()
        .context("Week prompt aborted")?;
    Ok(week)
}

fn prompt_text(prompt: &str, default: &str) -> Result<String> {
    let text = Input::<String>::new()
        .with_prompt(prompt)
        .default(default.to_string())
        .interact_text()
        .context("Text prompt aborted")?;
    Ok(text)
}

fn prompt_partners(names: &[String]) -> Result<HashSet<String>> {
    let defaults = vec![true; names.len()];
    let picked = MultiSelect::new()
        .with_prompt("Kreuzungspartner (space toggles, enter confirms)")
        .items(names)
        .defaults(&defaults)
        .interact()
        .context("Partner selection aborted")?;
    Ok(picked.into_iter().map(|i| names[i].clone()).collect())
}
