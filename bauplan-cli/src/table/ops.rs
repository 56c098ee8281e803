//! Relational operations over [`Table`]
//!
//! Projection, concatenation, left join, stable sorting and the two
//! group-by summaries the report stages need. All operations return new
//! tables and leave their inputs untouched.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};

use super::{Table, Value};

/// How projection treats a column missing from the source table.
///
/// Schedule exports are trusted to carry their full schema, so a missing
/// column there is a hard error. Crossing registers vary between
/// partners, so missing columns are sentinel-filled instead. The policy
/// is picked per data source, not per call site.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnPolicy {
    /// Missing column is an error naming the column
    Strict,
    /// Missing column is filled with the sentinel value
    Lenient { sentinel: String },
}

/// Project a table down to the named columns, in the given order
pub fn project(table: &Table, columns: &[String], policy: &ColumnPolicy) -> Result<Table> {
    // Resolve each target column to a source index, or None for fills
    let mut sources: Vec<Option<usize>> = Vec::with_capacity(columns.len());
    for name in columns {
        match table.column_index(name) {
            Some(idx) => sources.push(Some(idx)),
            None => match policy {
                ColumnPolicy::Strict => bail!("Missing required column '{}'", name),
                ColumnPolicy::Lenient { sentinel } => {
                    log::warn!("Column '{}' not found, filling with '{}'", name, sentinel);
                    sources.push(None);
                }
            },
        }
    }

    let mut out = Table::new(columns.to_vec());
    for row in table.rows() {
        let projected: Vec<Value> = sources
            .iter()
            .map(|src| match src {
                Some(idx) => row[*idx].clone(),
                None => match policy {
                    ColumnPolicy::Lenient { sentinel } => Value::String(sentinel.clone()),
                    ColumnPolicy::Strict => unreachable!("strict projection resolved all columns"),
                },
            })
            .collect();
        out.push_row(projected)?;
    }
    Ok(out)
}

/// Concatenate labelled tables in order; schemas must match exactly.
///
/// Row order in the result is input order, then source row order within
/// each input.
pub fn concat(tables: &[(String, Table)]) -> Result<Table> {
    let Some(((_, first), rest)) = tables.split_first() else {
        bail!("No tables to concatenate");
    };

    let mut out = first.clone();
    for (label, table) in rest {
        if table.columns() != out.columns() {
            bail!(
                "Schema mismatch in '{}': expected columns {:?}, found {:?}",
                label,
                out.columns(),
                table.columns()
            );
        }
        for row in table.rows() {
            out.push_row(row.clone())?;
        }
    }
    Ok(out)
}

/// Left join on key-column equality.
///
/// Output columns are the left table's columns followed by the right
/// table's columns minus its key column. A left row with n matches
/// yields n output rows; a left row with none yields one row with null
/// right-hand cells. Null keys never match anything.
pub fn left_join(left: &Table, right: &Table, left_key: &str, right_key: &str) -> Result<Table> {
    let Some(lk) = left.column_index(left_key) else {
        bail!("Join key '{}' not found in left table", left_key);
    };
    let Some(rk) = right.column_index(right_key) else {
        bail!("Join key '{}' not found in right table", right_key);
    };

    // Right-hand columns carried into the output, key excluded
    let carried: Vec<usize> = (0..right.columns().len()).filter(|&i| i != rk).collect();

    let mut columns: Vec<String> = left.columns().to_vec();
    for &i in &carried {
        columns.push(right.columns()[i].clone());
    }

    // Index right rows by key text
    let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        if row[rk].is_null() {
            continue;
        }
        by_key.entry(row[rk].to_text()).or_default().push(i);
    }

    let mut out = Table::new(columns);
    for lrow in left.rows() {
        let matches = if lrow[lk].is_null() {
            None
        } else {
            by_key.get(&lrow[lk].to_text())
        };

        match matches {
            Some(indices) => {
                for &ri in indices {
                    let mut row = lrow.clone();
                    for &ci in &carried {
                        row.push(right.rows()[ri][ci].clone());
                    }
                    out.push_row(row)?;
                }
            }
            None => {
                let mut row = lrow.clone();
                row.extend(carried.iter().map(|_| Value::Null));
                out.push_row(row)?;
            }
        }
    }
    Ok(out)
}

/// Stable ascending sort by a numeric column; null/non-numeric rows sink
/// to the end in their original relative order.
pub fn sort_by_number(table: &Table, column: &str) -> Result<Table> {
    let Some(idx) = table.column_index(column) else {
        bail!("Sort column '{}' not found", column);
    };
    let mut rows = table.rows().to_vec();
    rows.sort_by_key(|row| match row[idx].as_int() {
        Some(n) => (false, n),
        None => (true, 0),
    });

    let mut out = Table::new(table.columns().to_vec());
    for row in rows {
        out.push_row(row)?;
    }
    Ok(out)
}

/// Row counts per distinct value of a column, most frequent first
pub fn value_counts(table: &Table, column: &str) -> Result<Vec<(String, usize)>> {
    let Some(idx) = table.column_index(column) else {
        bail!("Count column '{}' not found", column);
    };
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in table.rows() {
        if row[idx].is_null() {
            continue;
        }
        *counts.entry(row[idx].to_text()).or_default() += 1;
    }
    let mut out: Vec<(String, usize)> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(out)
}

/// Group by one column and count distinct non-null values of another.
///
/// Result columns are the group column plus `count_name`, sorted
/// ascending by count, ties by group name.
pub fn distinct_count_by(
    table: &Table,
    group_column: &str,
    value_column: &str,
    count_name: &str,
) -> Result<Table> {
    let Some(gidx) = table.column_index(group_column) else {
        bail!("Group column '{}' not found", group_column);
    };
    let Some(vidx) = table.column_index(value_column) else {
        bail!("Value column '{}' not found", value_column);
    };

    let mut groups: HashMap<String, HashSet<String>> = HashMap::new();
    for row in table.rows() {
        if row[gidx].is_null() {
            continue;
        }
        let entry = groups.entry(row[gidx].to_text()).or_default();
        if !row[vidx].is_null() {
            entry.insert(row[vidx].to_text());
        }
    }

    let mut summary: Vec<(String, usize)> = groups
        .into_iter()
        .map(|(name, codes)| (name, codes.len()))
        .collect();
    summary.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    let mut out = Table::new(vec![group_column.to_string(), count_name.to_string()]);
    for (name, count) in summary {
        out.push_row(vec![Value::String(name), Value::Int(count as i64)])?;
    }
    Ok(out)
}
