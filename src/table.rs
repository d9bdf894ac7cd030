//! Sparse ordered value tables
//!
//! A `ValueTable` stores chart values addressed by row (timestamp or
//! histogram bucket) and column (instance or counter name). Tables are
//! sparse: samples for one instance may cover timestamps another instance
//! never reports. Row and column order is established on first use and
//! preserved through export, because downstream chart rendering depends on
//! chronological (or bucket) order.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, error};

/// Row address within a value table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    /// Sample timestamp, for time-indexed series
    Time(DateTime<Utc>),
    /// Bucket index, for histogram series
    Bucket(usize),
}

impl RowKey {
    /// Row key for an integer-second sample timestamp
    pub fn from_unix_seconds(seconds: i64) -> Self {
        RowKey::Time(DateTime::from_timestamp(seconds, 0).unwrap_or_default())
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Time(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            RowKey::Bucket(index) => write!(f, "{}", index),
        }
    }
}

/// Cell-wise operation for combining two tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl TableOp {
    fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            TableOp::Add => a + b,
            TableOp::Subtract => a - b,
            TableOp::Multiply => a * b,
            TableOp::Divide => a / b,
        }
    }
}

/// Flattened table ready for tabular serialization.
///
/// `headers[0]` names the row-key column (filled in by the exporter);
/// the remaining headers are value-column names. Every row vector has the
/// same width as `headers`, with absent cells rendered as empty fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Sparse ordered 2-D value store
#[derive(Debug, Clone, Default)]
pub struct ValueTable {
    /// Cells, outer keyed by row, inner by column
    cells: HashMap<RowKey, HashMap<String, f64>>,
    /// Rows in first-insertion order
    row_order: Vec<RowKey>,
    /// Columns in first-insertion order
    column_order: Vec<String>,
}

impl ValueTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a cell. First use of a row or column fixes its position in
    /// the export order.
    pub fn insert(&mut self, row: RowKey, column: impl Into<String>, value: f64) {
        let column = column.into();
        if !self.cells.contains_key(&row) {
            self.row_order.push(row.clone());
        }
        if !self.column_order.contains(&column) {
            self.column_order.push(column.clone());
        }
        self.cells.entry(row).or_default().insert(column, value);
    }

    /// Read a cell
    pub fn get(&self, row: &RowKey, column: &str) -> Result<f64> {
        self.cells
            .get(row)
            .and_then(|columns| columns.get(column))
            .copied()
            .ok_or_else(|| Error::CellNotFound {
                row: row.to_string(),
                column: column.to_string(),
            })
    }

    /// Divide an already-stored cell by a denominator rate, in place.
    ///
    /// This is the only mutation of an existing cell the engine performs:
    /// it turns a stored rate into a ratio during base resolution. A zero
    /// denominator stores exactly 0.0. A non-finite stored value cannot be
    /// divided meaningfully and is left unchanged.
    pub fn resolve_ratio(&mut self, row: &RowKey, column: &str, denominator: f64) -> Result<()> {
        let cell = self
            .cells
            .get_mut(row)
            .and_then(|columns| columns.get_mut(column))
            .ok_or_else(|| Error::CellNotFound {
                row: row.to_string(),
                column: column.to_string(),
            })?;

        if !cell.is_finite() {
            error!(
                row = %row,
                column,
                value = *cell,
                "stored value is not a usable number, ratio resolution skipped"
            );
            return Ok(());
        }

        if denominator == 0.0 {
            debug!(row = %row, column, "ratio resolution divides by zero, storing 0");
            *cell = 0.0;
            return Ok(());
        }

        *cell /= denominator;
        Ok(())
    }

    /// True if no cell was ever inserted
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Rows in export order
    pub fn rows(&self) -> &[RowKey] {
        &self.row_order
    }

    /// Columns in export order
    pub fn columns(&self) -> &[String] {
        &self.column_order
    }

    /// Multiply every stored cell by a factor, in place
    pub fn scale(&mut self, factor: f64) {
        for columns in self.cells.values_mut() {
            for value in columns.values_mut() {
                *value *= factor;
            }
        }
    }

    /// Append a column holding a fixed value in every existing row
    pub fn add_constant_column(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        let rows: Vec<RowKey> = self.row_order.clone();
        for row in rows {
            self.insert(row, name.clone(), value);
        }
    }

    /// Drop all contents, leaving an empty table.
    ///
    /// Used for operand tables consumed by a derived-metric calculation,
    /// so they are excluded from further export.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.row_order.clear();
        self.column_order.clear();
    }

    /// Produce an ordered header list and ordered row vectors for tabular
    /// export.
    ///
    /// `column_universe` / `row_universe` override the table's own order
    /// (for charts whose column or row set is fixed externally); absent
    /// cells become empty fields. Every row carries at least `fill_width`
    /// value fields, padded with blanks, so chart files keep a constant
    /// column count. `headers[0]` is left empty for the exporter to name.
    pub fn flatten(
        &self,
        column_universe: Option<&[String]>,
        row_universe: Option<&[RowKey]>,
        fill_width: usize,
    ) -> FlatTable {
        let columns: Vec<String> = match column_universe {
            Some(columns) => columns.to_vec(),
            None => self.column_order.clone(),
        };
        let rows: Vec<RowKey> = match row_universe {
            Some(rows) => rows.to_vec(),
            None => self.row_order.clone(),
        };
        let width = columns.len().max(fill_width);

        let mut headers = Vec::with_capacity(width + 1);
        headers.push(String::new());
        headers.extend(columns.iter().cloned());
        headers.resize(width + 1, String::new());

        let mut flat_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let mut flat_row = Vec::with_capacity(width + 1);
            flat_row.push(row.to_string());
            for column in &columns {
                match self.get(&row, column) {
                    Ok(value) => flat_row.push(format!("{}", value)),
                    Err(_) => flat_row.push(String::new()),
                }
            }
            flat_row.resize(width + 1, String::new());
            flat_rows.push(flat_row);
        }

        FlatTable {
            headers,
            rows: flat_rows,
        }
    }
}

/// Combine two tables cell-wise into a new table.
///
/// Iterates the first operand's cells in its export order; the second
/// operand's missing cells read as zero. Cells whose result is not a
/// finite number (a zero divisor, typically) are dropped, so dividing two
/// tables that share no rows yields an empty result rather than an error.
pub fn combine_tables(op: TableOp, table1: &ValueTable, table2: &ValueTable) -> ValueTable {
    let mut result = ValueTable::new();
    for row in &table1.row_order {
        for column in &table1.column_order {
            let Ok(value1) = table1.get(row, column) else {
                continue;
            };
            let value2 = table2.get(row, column).unwrap_or(0.0);
            let combined = op.apply(value1, value2);
            if !combined.is_finite() {
                debug!(
                    row = %row,
                    column,
                    "combined cell is not a finite number, dropped"
                );
                continue;
            }
            result.insert(row.clone(), column.clone(), combined);
        }
    }
    result
}
