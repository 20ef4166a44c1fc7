//! Dynamic type sampling
//!
//! Columns bound to the dynamic converter are typed from the data: rows are
//! read ahead until every such column has shown a non-null value (or the read
//! limit is hit), the first non-null kind per column picks the field type, and
//! the buffered rows are replayed so the cursor is never read twice.

use std::collections::VecDeque;

use super::converter::Converter;
use super::error::{ConvertError, ConvertResult};
use super::registry::TypeRegistry;
use crate::frame::FieldType;
use crate::source::{Cell, NativeKind, RowSource};

/// Field type inferred from the first non-null native kind.
///
/// All-null columns (`None`) become strings.
pub fn inferred_field_type(kind: Option<NativeKind>) -> FieldType {
    match kind {
        Some(NativeKind::Temporal) => FieldType::Time,
        Some(NativeKind::Integer | NativeKind::Floating) => FieldType::Float64,
        Some(NativeKind::Text | NativeKind::Bytes) => FieldType::String,
        Some(NativeKind::Boolean | NativeKind::Other) | None => FieldType::String,
    }
}

/// Converter for a dynamically typed column, named after the column
pub fn inferred_converter(column: &str, kind: Option<NativeKind>) -> Converter {
    TypeRegistry::converter_for(inferred_field_type(kind))
        .named(format!("dynamic {}", column))
        .nullable(true)
}

/// Row reader with a replay buffer in front of the source
#[derive(Debug, Default)]
pub struct RowReader {
    buffer: VecDeque<Vec<Cell>>,
    /// Rows handed out so far
    rows_read: usize,
    exhausted: bool,
}

impl RowReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read ahead until each column in `columns` has a non-null value, the
    /// source ends, or `limit` rows are buffered.
    ///
    /// Returns the first non-null kind seen per sampled column, in the order
    /// of `columns`.
    pub fn sample<S: RowSource + ?Sized>(
        &mut self,
        source: &mut S,
        scan: &[Option<NativeKind>],
        columns: &[usize],
        limit: Option<usize>,
    ) -> ConvertResult<Vec<Option<NativeKind>>> {
        let mut kinds: Vec<Option<NativeKind>> = vec![None; columns.len()];

        while kinds.iter().any(Option::is_none) {
            if limit.is_some_and(|limit| self.buffer.len() >= limit) {
                break;
            }
            let Some(row) = self.read_source(source, scan, self.buffer.len())? else {
                break;
            };
            for (kind, &col) in kinds.iter_mut().zip(columns) {
                if kind.is_none() {
                    *kind = row.get(col).and_then(|cell| cell.as_ref()).map(|v| v.kind());
                }
            }
            self.buffer.push_back(row);
        }

        tracing::debug!(
            buffered = self.buffer.len(),
            kinds = ?kinds,
            "Sampled dynamic columns"
        );
        Ok(kinds)
    }

    /// Next row: buffered rows first, then the source
    pub fn next_row<S: RowSource + ?Sized>(
        &mut self,
        source: &mut S,
        scan: &[Option<NativeKind>],
    ) -> ConvertResult<Option<Vec<Cell>>> {
        let row = match self.buffer.pop_front() {
            Some(row) => Some(row),
            None => self.read_source(source, scan, 0)?,
        };
        if row.is_some() {
            self.rows_read += 1;
        }
        Ok(row)
    }

    /// Number of rows buffered and not yet replayed
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn read_source<S: RowSource + ?Sized>(
        &mut self,
        source: &mut S,
        scan: &[Option<NativeKind>],
        ahead: usize,
    ) -> ConvertResult<Option<Vec<Cell>>> {
        if self.exhausted {
            return Ok(None);
        }
        let row = source
            .next_row(scan)
            .map_err(|source| ConvertError::Read {
                row: self.rows_read + ahead,
                source,
            })?;
        if row.is_none() {
            self.exhausted = true;
        }
        Ok(row)
    }
}
