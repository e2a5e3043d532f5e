//! A table: an ordered set of equal-length columns.

use crate::column::Column;
use gpu_runtime::error::{Error, Result};

/// An ordered collection of columns sharing a single row count.
///
/// `Table` has no notion of a schema beyond the columns it holds, no column names, and no
/// support for joins, expressions, or persistence; it exists only to give the partitioning
/// orchestrator (C6) a single handle for "the key columns" and "the payload columns" of a row
/// batch.
#[derive(Debug)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Builds a table from `columns`, which must all report the same `len()`.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let num_rows = columns.first().map(Column::len).unwrap_or(0);
        for (i, col) in columns.iter().enumerate() {
            if col.len() != num_rows {
                return Err(Error::InvalidArgument(format!(
                    "column {} has {} rows, expected {} (from column 0)",
                    i,
                    col.len(),
                    num_rows
                )));
            }
        }
        Ok(Table { columns, num_rows })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Builds the sub-table consisting of the columns at `indices`, in the order given.
    ///
    /// Used by the orchestrator to pull out the hash-key columns from a wider row batch without
    /// copying any cell data.
    pub fn project(&self, indices: &[usize]) -> Result<Vec<&Column>> {
        indices
            .iter()
            .map(|&i| {
                self.columns.get(i).ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "column index {} out of range (table has {} columns)",
                        i,
                        self.columns.len()
                    ))
                })
            })
            .collect()
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}
