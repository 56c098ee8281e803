//! Read worksheets into [`Table`]s

use std::path::Path;

use anyhow::{Context, Result, bail};
use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::NaiveDate;

use crate::table::{Table, Value};

/// Read one worksheet as a table; the first row supplies column names.
///
/// With `sheet` unset the workbook's first sheet is read.
pub fn read_sheet(path: &Path, sheet: Option<&str>) -> Result<Table> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .with_context(|| format!("Excel file has no sheets: {}", path.display()))?
            .clone(),
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read sheet '{}' in {}", sheet_name, path.display()))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        bail!("Sheet '{}' in {} is empty", sheet_name, path.display());
    };

    let columns: Vec<String> = header.iter().map(|c| c.to_string().trim().to_string()).collect();
    let width = columns.len();

    let mut table = Table::new(columns);
    for row in rows {
        // Calamine trims trailing empty cells per row; pad back to the
        // header width so every row has full arity.
        let mut cells: Vec<Value> = row.iter().map(cell_value).collect();
        cells.resize(width, Value::Null);
        cells.truncate(width);
        table.push_row(cells)?;
    }

    log::debug!(
        "Read {} rows from sheet '{}' in {}",
        table.len(),
        sheet_name,
        path.display()
    );
    Ok(table)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => {
            if s.trim().is_empty() {
                Value::Null
            } else {
                Value::String(s.clone())
            }
        }
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => {
            // Whole-number floats come back from Excel for plain integers
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                Value::Int(*f as i64)
            } else {
                Value::Float(*f)
            }
        }
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => Value::Date(ndt.date()),
            None => Value::Null,
        },
        Data::DateTimeIso(s) => match parse_iso_date(s) {
            Some(date) => Value::Date(date),
            None => Value::String(s.clone()),
        },
        Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) => Value::Null,
    }
}

fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let date_part = text.split('T').next().unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::tempdir;

    #[test]
    fn reads_header_and_typed_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.xlsx");

        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.write_string(0, 0, "Id").unwrap();
        ws.write_string(0, 1, "Prozessname").unwrap();
        ws.write_number(1, 0, 7.0).unwrap();
        ws.write_string(1, 1, "HDD-123-45 Fertigstellung").unwrap();
        ws.write_number(2, 0, 8.5).unwrap();
        workbook.save(&path).unwrap();

        let table = read_sheet(&path, None).unwrap();
        assert_eq!(table.columns(), ["Id", "Prozessname"]);
        assert_eq!(table.value(0, "Id"), Some(&Value::Int(7)));
        assert_eq!(
            table.value(0, "Prozessname"),
            Some(&Value::String("HDD-123-45 Fertigstellung".into()))
        );
        assert_eq!(table.value(1, "Id"), Some(&Value::Float(8.5)));
        // trailing empty cell padded back to header width
        assert_eq!(table.value(1, "Prozessname"), Some(&Value::Null));
    }

    #[test]
    fn reads_named_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.xlsx");

        let mut workbook = Workbook::new();
        workbook.add_worksheet().set_name("Erste").unwrap();
        let ws = workbook.add_worksheet();
        ws.set_name("Kreuzungen").unwrap();
        ws.write_string(0, 0, "ID").unwrap();
        ws.write_number(1, 0, 1.0).unwrap();
        workbook.save(&path).unwrap();

        let table = read_sheet(&path, Some("Kreuzungen")).unwrap();
        assert_eq!(table.columns(), ["ID"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn missing_sheet_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.xlsx");

        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.write_string(0, 0, "ID").unwrap();
        workbook.save(&path).unwrap();

        assert!(read_sheet(&path, Some("Fehlt")).is_err());
    }
}
