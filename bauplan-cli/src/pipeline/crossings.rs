//! Stage 2: crossing-partner filtering
//!
//! The crossing register lists third-party infrastructure crossing the
//! route. Rows qualify when the clearance column says the crossing is
//! still open ("nein"), unless the planning team has struck the cell
//! out to mark the row obsolete. Struck rows lose even when their text
//! matches.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::CrossingRules;
use crate::excel;
use crate::table::Table;
use crate::table::ops::{self, ColumnPolicy};

/// Filtered register plus the per-partner distinct-code summary
#[derive(Debug, Clone)]
pub struct CrossingsOutput {
    pub filtered: Table,
    pub summary: Table,
}

/// Filter the register workbook and derive the partner summary
pub fn filter_crossings(
    path: &Path,
    rules: &CrossingRules,
    sheet: &str,
    clearance_column: &str,
) -> Result<CrossingsOutput> {
    let table = excel::read_sheet(path, Some(sheet))
        .with_context(|| format!("Failed to read crossing register {}", path.display()))?;

    // Formatting pass is skipped entirely when the clearance column is
    // absent; nothing gets excluded by strikethrough then.
    let struck = match table.column_index(clearance_column) {
        Some(column_index) => excel::struck_rows(path, sheet, column_index)?,
        None => {
            log::warn!(
                "Column '{}' not found in sheet '{}', skipping strikethrough exclusion",
                clearance_column,
                sheet
            );
            BTreeSet::new()
        }
    };
    if !struck.is_empty() {
        log::info!("{} rows struck out in '{}'", struck.len(), sheet);
    }

    let filtered = filter_table(&table, rules, clearance_column, &struck);

    // A user-supplied clearance column takes the configured one's slot
    // in the output schema.
    let mut columns = rules.columns.clone();
    if !columns.iter().any(|c| c == clearance_column) {
        match columns.iter_mut().find(|c| **c == rules.clearance_column) {
            Some(slot) => *slot = clearance_column.to_string(),
            None => columns.push(clearance_column.to_string()),
        }
    }
    let projected = ops::project(
        &filtered,
        &columns,
        &ColumnPolicy::Lenient {
            sentinel: rules.sentinel.clone(),
        },
    )?;

    let summary = ops::distinct_count_by(
        &projected,
        &rules.partner_column,
        &rules.code_column,
        &rules.summary_column,
    )?;

    Ok(CrossingsOutput {
        filtered: projected,
        summary,
    })
}

/// Text filter plus strikethrough exclusion.
///
/// `struck` holds 1-based sheet row numbers; data row i sits at sheet
/// row i plus the configured header offset.
pub fn filter_table(
    table: &Table,
    rules: &CrossingRules,
    clearance_column: &str,
    struck: &BTreeSet<u32>,
) -> Table {
    let clearance_idx = table.column_index(clearance_column);
    let term = rules.match_term.to_lowercase();

    table.filtered(|i, row| {
        let Some(idx) = clearance_idx else {
            return false;
        };
        if row[idx].is_null() || !row[idx].to_text().to_lowercase().contains(&term) {
            return false;
        }
        let sheet_row = i as u32 + rules.header_row_offset;
        !struck.contains(&sheet_row)
    })
}
