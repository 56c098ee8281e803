//! Stage 3: merge the filtered schedule with the crossing register
//!
//! Left join on the extracted area code, keep only rows that found a
//! crossing partner, optionally narrow to a partner subset, and sort by
//! start week for the final report.

use std::collections::HashSet;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::table::ops::{self, ColumnPolicy};
use crate::table::Table;

/// Build the merged report table.
///
/// `partners` narrows the result to the given partner names; `None`
/// keeps all of them.
pub fn merge_report(
    combined: &Table,
    crossings: &Table,
    config: &Config,
    partners: Option<&HashSet<String>>,
) -> Result<Table> {
    let lean = &config.lean;
    let rules = &config.crossings;

    let left = ops::project(
        combined,
        &[
            lean.code_column.clone(),
            lean.week_start_column.clone(),
            lean.source_column.clone(),
        ],
        &ColumnPolicy::Strict,
    )
    .context("Combined schedule table is missing a merge column")?;

    let right = ops::project(
        crossings,
        &[
            rules.id_column.clone(),
            rules.code_column.clone(),
            rules.partner_column.clone(),
            rules.object_column.clone(),
        ],
        &ColumnPolicy::Strict,
    )
    .context("Crossing table is missing a merge column")?;

    let joined = ops::left_join(&left, &right, &lean.code_column, &rules.code_column)?;

    let partner_idx = joined
        .column_index(&rules.partner_column)
        .context("Join lost the partner column")?;

    // Unmatched rows carry a null partner; drop them along with matches
    // whose partner field is blank.
    let matched = joined.filtered(|_, row| {
        let partner = &row[partner_idx];
        if partner.is_null() {
            return false;
        }
        let name = partner.to_text();
        if name.trim().is_empty() {
            return false;
        }
        partners.is_none_or(|selected| selected.contains(&name))
    });

    ops::sort_by_number(&matched, &lean.week_start_column)
}

/// Distinct partner names present in a crossing table, sorted, for the
/// interactive narrowing prompt
pub fn partner_names(crossings: &Table, config: &Config) -> Vec<String> {
    let Some(idx) = crossings.column_index(&config.crossings.partner_column) else {
        return Vec::new();
    };
    let mut names: Vec<String> = crossings
        .rows()
        .iter()
        .filter(|row| !row[idx].is_null())
        .map(|row| row[idx].to_text())
        .filter(|name| !name.trim().is_empty())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CODE_COLUMN;
    use crate::table::Value;

    fn s(text: &str) -> Value {
        Value::String(text.into())
    }

    fn combined(rows: Vec<(Option<&str>, i64, &str)>) -> Table {
        let mut t = Table::new(vec![
            CODE_COLUMN.into(),
            "KW Start".into(),
            "NDS/NRW".into(),
        ]);
        for (code, week, source) in rows {
            t.push_row(vec![
                code.map(s).unwrap_or(Value::Null),
                Value::Int(week),
                s(source),
            ])
            .unwrap();
        }
        t
    }

    fn crossings(rows: Vec<(i64, &str, Option<&str>)>) -> Table {
        let mut t = Table::new(vec![
            "ID".into(),
            CODE_COLUMN.into(),
            "Kreuzungspartner".into(),
            "Kreuzungsobjekt".into(),
        ]);
        for (id, code, partner) in rows {
            t.push_row(vec![
                Value::Int(id),
                s(code),
                partner.map(s).unwrap_or(Value::Null),
                s("Leitung"),
            ])
            .unwrap();
        }
        t
    }

    #[test]
    fn unmatched_and_partnerless_rows_are_dropped() {
        let left = combined(vec![
            (Some("HDD-100-01"), 20, "NDS"),
            (Some("KV-99-99"), 10, "NDS"),
            (None, 5, "NRW"),
            (Some("OBW-10-01"), 15, "NRW"),
        ]);
        let right = crossings(vec![
            (1, "HDD-100-01", Some("Bahn")),
            (2, "OBW-10-01", None),
        ]);
        let out = merge_report(&left, &right, &Config::default(), None).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.value(0, CODE_COLUMN), Some(&s("HDD-100-01")));
        assert_eq!(out.value(0, "Kreuzungspartner"), Some(&s("Bahn")));
    }

    #[test]
    fn every_merged_row_pairs_one_left_and_one_right_row() {
        let left = combined(vec![
            (Some("HDD-100-01"), 20, "NDS"),
            (Some("KV-01-01"), 10, "NRW"),
        ]);
        let right = crossings(vec![
            (1, "HDD-100-01", Some("Bahn")),
            (2, "HDD-100-01", Some("Stadt")),
            (3, "KV-01-01", Some("Bahn")),
        ]);
        let out = merge_report(&left, &right, &Config::default(), None).unwrap();
        // 2 matches for the first left row, 1 for the second
        assert_eq!(out.len(), 3);
        for row in out.rows() {
            let code = &row[0];
            assert!(left.rows().iter().any(|l| &l[0] == code));
            assert!(right.rows().iter().any(|r| &r[1] == code));
        }
    }

    #[test]
    fn sorted_by_week_with_stable_ties() {
        let left = combined(vec![
            (Some("HDD-100-01"), 20, "NDS"),
            (Some("KV-01-01"), 10, "NRW"),
            (Some("OBW-10-01"), 20, "NDS"),
        ]);
        let right = crossings(vec![
            (1, "HDD-100-01", Some("Bahn")),
            (2, "KV-01-01", Some("Bahn")),
            (3, "OBW-10-01", Some("Stadt")),
        ]);
        let out = merge_report(&left, &right, &Config::default(), None).unwrap();
        let weeks: Vec<_> = out
            .rows()
            .iter()
            .map(|r| r[1].as_int().unwrap())
            .collect();
        assert_eq!(weeks, vec![10, 20, 20]);
        // ties keep join order: HDD row joined before OBW row
        assert_eq!(out.value(1, CODE_COLUMN), Some(&s("HDD-100-01")));
        assert_eq!(out.value(2, CODE_COLUMN), Some(&s("OBW-10-01")));
    }

    #[test]
    fn partner_selection_narrows_the_report() {
        let left = combined(vec![
            (Some("HDD-100-01"), 20, "NDS"),
            (Some("KV-01-01"), 10, "NRW"),
        ]);
        let right = crossings(vec![
            (1, "HDD-100-01", Some("Bahn")),
            (2, "KV-01-01", Some("Stadt")),
        ]);
        let selected = HashSet::from(["Stadt".to_string()]);
        let out = merge_report(&left, &right, &Config::default(), Some(&selected)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.value(0, "Kreuzungspartner"), Some(&s("Stadt")));
    }

    #[test]
    fn partner_names_are_distinct_and_sorted() {
        let right = crossings(vec![
            (1, "HDD-100-01", Some("Stadt")),
            (2, "KV-01-01", Some("Bahn")),
            (3, "OBW-10-01", Some("Bahn")),
            (4, "OBW-10-02", None),
        ]);
        let names = partner_names(&right, &Config::default());
        assert_eq!(names, vec!["Bahn".to_string(), "Stadt".to_string()]);
    }
}
