//! In-memory tabular dataset
//!
//! A `Table` is the unit of data flowing between pipeline stages: named
//! columns plus rows of loosely-typed cell values, the way a worksheet
//! presents them. Every transform produces a new `Table`; nothing is
//! mutated in place once a stage has handed its output on.

pub mod ops;

use anyhow::{Result, bail};
use chrono::NaiveDate;

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Empty/missing cell
    Null,
    /// Text value
    String(String),
    /// Whole number
    Int(i64),
    /// Floating point
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Calendar date
    Date(NaiveDate),
}

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a whole number (floats only when exact)
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Try to get as date
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Render as text for pattern matching; null becomes the empty string
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::String(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Named columns plus rows of cell values
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given column names
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact name match
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row; arity must match the column count
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            bail!(
                "Row has {} cells but table has {} columns",
                row.len(),
                self.columns.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    /// Cell lookup by row index and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)
    }

    /// New table containing only the rows the predicate keeps.
    ///
    /// The predicate receives the zero-based row index along with the row,
    /// so formatting-based exclusions can address rows by position.
    pub fn filtered<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(usize, &[Value]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .enumerate()
                .filter(|(i, row)| keep(*i, row))
                .map(|(_, row)| row.clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new(vec!["a".into(), "b".into()]);
        t.push_row(vec![Value::Int(1), Value::String("x".into())])
            .unwrap();
        t.push_row(vec![Value::Int(2), Value::Null]).unwrap();
        t
    }

    #[test]
    fn push_row_rejects_wrong_arity() {
        let mut t = sample();
        assert!(t.push_row(vec![Value::Int(3)]).is_err());
    }

    #[test]
    fn value_lookup_by_name() {
        let t = sample();
        assert_eq!(t.value(0, "b"), Some(&Value::String("x".into())));
        assert_eq!(t.value(1, "b"), Some(&Value::Null));
        assert_eq!(t.value(0, "missing"), None);
    }

    #[test]
    fn filtered_preserves_order_and_source() {
        let t = sample();
        let kept = t.filtered(|_, row| row[0].as_int() == Some(2));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.value(0, "a"), Some(&Value::Int(2)));
        // original untouched
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn null_renders_empty() {
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::Float(12.0).to_string(), "12");
    }

    #[test]
    fn as_int_accepts_exact_floats_only() {
        assert_eq!(Value::Float(27.0).as_int(), Some(27));
        assert_eq!(Value::Float(27.5).as_int(), None);
        assert_eq!(Value::String("27".into()).as_int(), None);
    }
}
