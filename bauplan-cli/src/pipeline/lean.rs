//! Stage 1: lean-export filtering
//!
//! Each schedule export is filtered down to the finishing activities of
//! the target year and week window, tagged with its source file, and
//! the area code is extracted from the process name. The per-file
//! results are concatenated in input order.

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate};

use crate::config::LeanRules;
use crate::excel;
use crate::extract::extract_code;
use crate::table::ops::{self, ColumnPolicy};
use crate::table::{Table, Value};

/// Combined filtered table plus the per-source row counts
#[derive(Debug, Clone)]
pub struct LeanOutput {
    pub combined: Table,
    /// Row counts per source label, most frequent first
    pub source_counts: Vec<(String, usize)>,
}

/// Week window applied to KW Start, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekWindow {
    pub cutoff: u32,
    pub floor: Option<u32>,
}

impl WeekWindow {
    pub fn contains(&self, week: i64) -> bool {
        week <= self.cutoff as i64 && self.floor.is_none_or(|f| week >= f as i64)
    }
}

/// Filter every export and concatenate the results in input order
pub fn combine(paths: &[impl AsRef<Path>], rules: &LeanRules, window: WeekWindow) -> Result<LeanOutput> {
    if paths.is_empty() {
        bail!("No schedule exports given");
    }

    let mut filtered = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let label = source_label(path);
        let table = filter_file(path, rules, window)
            .with_context(|| format!("Failed to process {}", path.display()))?;
        log::info!("{}: {} rows kept", path.display(), table.len());
        filtered.push((label, table));
    }

    let combined = ops::concat(&filtered)?;
    let source_counts = ops::value_counts(&combined, &rules.source_column)?;
    Ok(LeanOutput {
        combined,
        source_counts,
    })
}

/// Filter a single export down to the fixed output schema
pub fn filter_file(path: &Path, rules: &LeanRules, window: WeekWindow) -> Result<Table> {
    let table = excel::read_sheet(path, None)?;
    filter_table(&table, &source_label(path), rules, window)
}

/// The filter chain proper, separated from file I/O
pub fn filter_table(
    table: &Table,
    source_label: &str,
    rules: &LeanRules,
    window: WeekWindow,
) -> Result<Table> {
    for required in [
        &rules.date_column,
        &rules.week_start_column,
        &rules.trade_column,
        &rules.process_column,
    ] {
        if table.column_index(required).is_none() {
            bail!("Missing required column '{}'", required);
        }
    }

    let date_idx = table.column_index(&rules.date_column).unwrap();
    let week_idx = table.column_index(&rules.week_start_column).unwrap();
    let trade_idx = table.column_index(&rules.trade_column).unwrap();
    let process_idx = table.column_index(&rules.process_column).unwrap();

    let survivors = table.filtered(|_, row| {
        // Unparseable dates count as missing and never match the year
        let Some(date) = coerce_date(&row[date_idx]) else {
            return false;
        };
        if date.year() != rules.target_year {
            return false;
        }

        let Some(week) = row[week_idx].as_int() else {
            return false;
        };
        if !window.contains(week) {
            return false;
        }

        if row[trade_idx].is_null()
            || !contains_any(&row[trade_idx].to_text(), &rules.trade_keywords)
        {
            return false;
        }

        if row[process_idx].is_null() {
            return false;
        }
        let process = row[process_idx].to_text();
        contains_any(&process, &rules.include_terms) && !contains_any(&process, &rules.exclude_terms)
    });

    // Derived columns: source tag and extracted area code
    let mut columns = survivors.columns().to_vec();
    columns.push(rules.source_column.clone());
    columns.push(rules.code_column.clone());

    let mut tagged = Table::new(columns);
    for row in survivors.rows() {
        let code = match extract_code(&row[process_idx].to_text()) {
            Some(code) => Value::String(code),
            None => Value::Null,
        };
        let mut cells = row.clone();
        cells.push(Value::String(source_label.to_string()));
        cells.push(code);
        tagged.push_row(cells)?;
    }

    ops::project(&tagged, &rules.columns, &ColumnPolicy::Strict)
}

/// Source tag: the file name with its extension stripped
pub fn source_label(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn coerce_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date_text(s.trim()),
        other => other.as_date(),
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d.%m.%Y", "%Y-%m-%d %H:%M:%S", "%d.%m.%Y %H:%M"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    log::debug!("Unparseable date '{}', treating as missing", text);
    None
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    needles
        .iter()
        .any(|needle| haystack.contains(&needle.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LeanRules;

    fn window(cutoff: u32) -> WeekWindow {
        WeekWindow {
            cutoff,
            floor: None,
        }
    }

    fn schedule(rows: Vec<Vec<Value>>) -> Table {
        let columns = [
            "Id",
            "Prozessname",
            "Startdatum",
            "Enddatum",
            "Status",
            "Dauer",
            "Gewerk",
            "KW Start",
            "KW Ende",
        ];
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            t.push_row(row).unwrap();
        }
        t
    }

    fn row(id: i64, process: &str, date: &str, trade: &str, week: i64) -> Vec<Value> {
        vec![
            Value::Int(id),
            Value::String(process.into()),
            Value::String(date.into()),
            Value::String("2025-12-31".into()),
            Value::String("Offen".into()),
            Value::Int(5),
            Value::String(trade.into()),
            Value::Int(week),
            Value::Int(week + 1),
        ]
    }

    #[test]
    fn finishing_row_is_kept_and_coded() {
        let table = schedule(vec![row(
            1,
            "HDD-123-45 Fertigstellung Bohrung",
            "2025-03-01",
            "HDD Bohrung",
            10,
        )]);
        let out = filter_table(&table, "NDS", &LeanRules::default(), window(27)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(
            out.value(0, crate::config::CODE_COLUMN),
            Some(&Value::String("HDD-123-45".into()))
        );
        assert_eq!(out.value(0, "NDS/NRW"), Some(&Value::String("NDS".into())));
        assert_eq!(out.columns().len(), 11);
    }

    #[test]
    fn exclude_term_beats_include_term() {
        let table = schedule(vec![row(
            1,
            "Vorarbeit HDD-123-45",
            "2025-03-01",
            "HDD Bohrung",
            10,
        )]);
        let out = filter_table(&table, "NDS", &LeanRules::default(), window(27)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn wrong_year_and_unparseable_dates_are_dropped() {
        let table = schedule(vec![
            row(1, "HDD-100-01 Fertigstellung", "2024-06-01", "HDD", 10),
            row(2, "HDD-100-02 Fertigstellung", "kein Datum", "HDD", 10),
            row(3, "HDD-100-03 Fertigstellung", "2025-06-01", "HDD", 10),
        ]);
        let out = filter_table(&table, "NDS", &LeanRules::default(), window(27)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.value(0, "Id"), Some(&Value::Int(3)));
    }

    #[test]
    fn german_date_format_is_accepted() {
        let table = schedule(vec![row(
            1,
            "OBW-10-01 Fertigstellung",
            "01.03.2025",
            "offene Bauweise",
            5,
        )]);
        let out = filter_table(&table, "NRW", &LeanRules::default(), window(27)).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn week_window_bounds_are_inclusive() {
        let table = schedule(vec![
            row(1, "HDD-100-01 Fertigstellung", "2025-01-01", "HDD", 27),
            row(2, "HDD-100-02 Fertigstellung", "2025-01-01", "HDD", 28),
            row(3, "HDD-100-03 Fertigstellung", "2025-01-01", "HDD", 3),
        ]);
        let out = filter_table(
            &table,
            "NDS",
            &LeanRules::default(),
            WeekWindow {
                cutoff: 27,
                floor: Some(3),
            },
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.value(0, "Id"), Some(&Value::Int(1)));
        assert_eq!(out.value(1, "Id"), Some(&Value::Int(3)));
    }

    #[test]
    fn trade_keyword_match_is_case_insensitive() {
        let table = schedule(vec![
            row(1, "HDD-100-01 Fertigstellung", "2025-01-01", "hdd bohrung", 5),
            row(2, "HDD-100-02 Fertigstellung", "2025-01-01", "Tiefbau", 5),
        ]);
        let out = filter_table(&table, "NDS", &LeanRules::default(), window(27)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.value(0, "Id"), Some(&Value::Int(1)));
    }

    #[test]
    fn missing_required_column_names_it() {
        let mut table = Table::new(vec!["Id".into(), "Prozessname".into()]);
        table
            .push_row(vec![Value::Int(1), Value::String("HDD".into())])
            .unwrap();
        let err = filter_table(&table, "NDS", &LeanRules::default(), window(27)).unwrap_err();
        assert!(err.to_string().contains("'Startdatum'"));
    }

    #[test]
    fn missing_projection_column_is_fatal() {
        // Filter columns present, but the projection schema wants Status
        let columns = ["Id", "Prozessname", "Startdatum", "Gewerk", "KW Start"];
        let mut table = Table::new(columns.iter().map(|c| c.to_string()).collect());
        table
            .push_row(vec![
                Value::Int(1),
                Value::String("HDD-123-45 Fertigstellung".into()),
                Value::String("2025-03-01".into()),
                Value::String("HDD".into()),
                Value::Int(10),
            ])
            .unwrap();
        let err = filter_table(&table, "NDS", &LeanRules::default(), window(27)).unwrap_err();
        assert!(err.to_string().contains("Missing required column"));
    }

    #[test]
    fn source_label_strips_extension() {
        assert_eq!(source_label(Path::new("/tmp/NDS 2025.xlsx")), "NDS 2025");
    }

    #[test]
    fn rows_without_code_stay_with_null_code() {
        let table = schedule(vec![row(
            1,
            "Fertigstellung Rohrleitung",
            "2025-03-01",
            "Mikrotunnel",
            10,
        )]);
        let out = filter_table(&table, "NDS", &LeanRules::default(), window(27)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.value(0, crate::config::CODE_COLUMN), Some(&Value::Null));
    }
}
