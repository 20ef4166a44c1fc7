//! In-memory row source
//!
//! Holds one or more pre-fetched result sets. Useful when rows were already
//! pulled from a driver, and for tests and benchmarks.

use std::collections::VecDeque;

use super::{coerce, Cell, ColumnMeta, NativeKind, RowSource, SourceError, SourceResult};

#[derive(Debug, Clone)]
struct ResultSet {
    columns: Vec<ColumnMeta>,
    rows: VecDeque<Vec<Cell>>,
}

/// Row source backed by vectors of cells
#[derive(Debug, Clone)]
pub struct MemoryRowSource {
    sets: Vec<ResultSet>,
    current: usize,
}

impl MemoryRowSource {
    /// Create a source with a single result set
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            sets: vec![ResultSet {
                columns,
                rows: rows.into(),
            }],
            current: 0,
        }
    }

    /// Builder: append another result set
    pub fn with_result_set(mut self, columns: Vec<ColumnMeta>, rows: Vec<Vec<Cell>>) -> Self {
        self.sets.push(ResultSet {
            columns,
            rows: rows.into(),
        });
        self
    }

    /// Rows left in the current result set
    pub fn remaining(&self) -> usize {
        self.sets.get(self.current).map(|s| s.rows.len()).unwrap_or(0)
    }
}

impl RowSource for MemoryRowSource {
    fn columns(&self) -> &[ColumnMeta] {
        self.sets
            .get(self.current)
            .map(|s| s.columns.as_slice())
            .unwrap_or(&[])
    }

    fn next_row(&mut self, scan: &[Option<NativeKind>]) -> SourceResult<Option<Vec<Cell>>> {
        let set = self.sets.get_mut(self.current).ok_or(SourceError::Exhausted)?;
        let Some(row) = set.rows.pop_front() else {
            return Ok(None);
        };

        if row.len() != set.columns.len() {
            return Err(SourceError::Invalid(format!(
                "expected {} cells, got {}",
                set.columns.len(),
                row.len()
            )));
        }

        Ok(Some(
            row.into_iter()
                .enumerate()
                .map(|(i, cell)| cell.map(|v| coerce(v, scan.get(i).copied().flatten())))
                .collect(),
        ))
    }

    fn next_result_set(&mut self) -> SourceResult<bool> {
        if self.current + 1 < self.sets.len() {
            self.current += 1;
            Ok(true)
        } else {
            self.current = self.sets.len();
            Ok(false)
        }
    }
}
