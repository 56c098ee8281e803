//! Subcommand handlers

pub mod crossings;
pub mod lean;
pub mod merge;
pub mod run;

use colored::Colorize;

use crate::table::Table;

/// Print labelled counts as an aligned two-column terminal table
pub(crate) fn print_counts(title: &str, counts: &[(String, usize)]) {
    if counts.is_empty() {
        return;
    }
    println!();
    println!("{}", title.bold());
    let width = counts.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, count) in counts {
        println!("  {:<width$}  {}", label.cyan(), count, width = width);
    }
}

/// Print a small table (the partner summary) to the terminal
pub(crate) fn print_table(title: &str, table: &Table) {
    if table.is_empty() {
        return;
    }
    println!();
    println!("{}", title.bold());
    for row in table.rows() {
        let cells: Vec<String> = row.iter().map(|v| v.to_text()).collect();
        println!("  {}", cells.join("  "));
    }
}
