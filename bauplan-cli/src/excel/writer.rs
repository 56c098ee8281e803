//! Write [`Table`]s to Excel format

use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::table::{Table, Value};

/// Write a table to an Excel file with a single worksheet
pub fn write_table(table: &Table, path: &Path, sheet_name: &str) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    write_header(worksheet, table)?;
    for (row_idx, row) in table.rows().iter().enumerate() {
        let row_num = (row_idx + 1) as u32;
        for (col_idx, value) in row.iter().enumerate() {
            write_value(worksheet, row_num, col_idx as u16, value)?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save Excel file: {}", path.display()))?;

    log::debug!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

fn write_header(ws: &mut Worksheet, table: &Table) -> Result<()> {
    for (col, name) in table.columns().iter().enumerate() {
        ws.write_string(0, col as u16, name)?;
    }
    Ok(())
}

fn write_value(ws: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<()> {
    match value {
        Value::Null => {}
        Value::String(s) => {
            ws.write_string(row, col, s)?;
        }
        Value::Int(i) => {
            ws.write_number(row, col, *i as f64)?;
        }
        Value::Float(f) => {
            ws.write_number(row, col, *f)?;
        }
        Value::Bool(b) => {
            ws.write_boolean(row, col, *b)?;
        }
        Value::Date(d) => {
            ws.write_string(row, col, &d.format("%Y-%m-%d").to_string())?;
        }
    }
    Ok(())
}
