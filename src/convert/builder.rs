//! Frame building
//!
//! Drives a row source through the resolved column bindings into a typed
//! frame. Nulls never reach a conversion function. A conversion failure
//! abandons the frame; reaching the row cap does not, it only adds a notice.

use super::converter::Converter;
use super::error::{ConvertError, ConvertResult};
use super::registry::TypeRegistry;
use super::resolver::{resolve_columns, ColumnBinding, MatchRule};
use super::sampler::{inferred_converter, RowReader};
use crate::frame::{Field, FieldValue, Frame, Notice};
use crate::source::{Cell, NativeKind, RowSource};

/// Notice text attached to frames cut off by the row cap
pub fn truncation_notice(row_cap: i64) -> Notice {
    Notice::warning(format!(
        "Results have been limited to {} because the SQL row limit was reached",
        row_cap
    ))
}

/// Build a frame from the current result set of `source`.
///
/// `row_cap` is the maximum number of rows to materialize; a negative cap
/// means unlimited. The frame is left unnamed.
pub fn build_frame<S: RowSource + ?Sized>(
    source: &mut S,
    row_cap: i64,
    overrides: &[Converter],
    registry: &TypeRegistry,
) -> ConvertResult<Frame> {
    let columns = source.columns().to_vec();
    let mut bindings = resolve_columns(&columns, overrides, registry)?;
    let scan: Vec<Option<NativeKind>> = bindings.iter().map(|b| b.converter.scan_kind).collect();
    let limit = usize::try_from(row_cap).ok();

    let mut reader = RowReader::new();
    let dynamic: Vec<usize> = bindings
        .iter()
        .filter(|b| b.rule == MatchRule::Dynamic)
        .map(|b| b.index)
        .collect();
    if !dynamic.is_empty() {
        let kinds = reader.sample(source, &scan, &dynamic, limit)?;
        for (&index, kind) in dynamic.iter().zip(kinds) {
            let binding = &mut bindings[index];
            binding.converter = inferred_converter(&binding.column.name, kind);
            tracing::debug!(
                column = %binding.column.name,
                field_type = %binding.converter.field_type,
                "Inferred dynamic column type"
            );
        }
    }

    let mut frame = Frame::new("");
    for binding in &bindings {
        frame.add_field(Field::new(
            binding.column.name.clone(),
            binding.converter.field_type,
            binding.converter.nullable,
        ));
    }

    let mut row_index = 0usize;
    loop {
        if limit.is_some_and(|limit| row_index >= limit) {
            if reader.next_row(source, &scan)?.is_some() {
                tracing::warn!(row_cap, "Row limit reached, results truncated");
                frame.append_notice(truncation_notice(row_cap));
            }
            break;
        }

        let Some(row) = reader.next_row(source, &scan)? else {
            break;
        };
        let values = row
            .into_iter()
            .zip(&bindings)
            .map(|(cell, binding)| convert_cell(cell, binding, row_index))
            .collect::<ConvertResult<Vec<_>>>()?;
        frame.append_row(values)?;
        row_index += 1;
    }

    tracing::debug!(
        rows = frame.row_count(),
        fields = frame.fields.len(),
        "Built frame"
    );
    Ok(frame)
}

fn convert_cell(cell: Cell, binding: &ColumnBinding, row: usize) -> ConvertResult<Option<FieldValue>> {
    let Some(value) = cell else {
        return Ok(None);
    };
    binding
        .converter
        .apply(value, &binding.column)
        .map(Some)
        .map_err(|cause| ConvertError::Conversion {
            column: binding.column.name.clone(),
            type_name: binding.column.type_name.clone(),
            row,
            cause,
        })
}

/// Build one frame per result set, in encounter order
pub fn build_frames<S: RowSource + ?Sized>(
    source: &mut S,
    row_cap: i64,
    overrides: &[Converter],
    registry: &TypeRegistry,
) -> ConvertResult<Vec<Frame>> {
    let mut frames = Vec::new();
    loop {
        frames.push(build_frame(source, row_cap, overrides, registry)?);
        if !source.next_result_set()? {
            break;
        }
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::registry::to_float64;
    use crate::frame::FieldType;
    use crate::source::{ColumnMeta, MemoryRowSource, NativeValue, SourceError, SourceResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn numbers(n: i64) -> MemoryRowSource {
        MemoryRowSource::new(
            vec![ColumnMeta::new("n", "INTEGER", NativeKind::Integer)],
            (0..n).map(|i| vec![Some(NativeValue::Integer(i))]).collect(),
        )
    }

    #[test]
    fn test_row_cap() {
        let registry = TypeRegistry::new();
        for (rows, cap, expected, truncated) in [
            (5, -1, 5, false),
            (5, 10, 5, false),
            (5, 5, 5, false),
            (5, 3, 3, true),
            (5, 0, 0, true),
            (0, 0, 0, false),
        ] {
            let frame = build_frame(&mut numbers(rows), cap, &[], &registry).unwrap();
            assert_eq!(frame.row_count(), expected, "rows={} cap={}", rows, cap);
            assert_eq!(
                !frame.meta.notices.is_empty(),
                truncated,
                "rows={} cap={}",
                rows,
                cap
            );
            frame.validate().unwrap();
        }
    }

    #[test]
    fn test_truncation_notice_text() {
        let frame = build_frame(&mut numbers(3), 2, &[], &TypeRegistry::new()).unwrap();
        assert_eq!(
            frame.meta.notices[0].text,
            "Results have been limited to 2 because the SQL row limit was reached"
        );
    }

    #[test]
    fn test_nulls_skip_conversion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let failing = Converter::new(FieldType::Float64, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("always fails".to_string())
        })
        .for_column("v");

        let mut source = MemoryRowSource::new(
            vec![ColumnMeta::new("v", "REAL", NativeKind::Floating)],
            vec![vec![None], vec![None], vec![None]],
        );
        let frame = build_frame(&mut source, -1, &[failing], &TypeRegistry::new()).unwrap();

        assert_eq!(frame.row_count(), 3);
        assert!(frame.fields[0].is_null(0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_non_nullable_converter_stores_defaults() {
        let conv = Converter::new(FieldType::Float64, to_float64)
            .for_column("v")
            .nullable(false);
        let mut source = MemoryRowSource::new(
            vec![ColumnMeta::new("v", "REAL", NativeKind::Floating)],
            vec![vec![None], vec![Some(NativeValue::Floating(2.0))]],
        );
        let frame = build_frame(&mut source, -1, &[conv], &TypeRegistry::new()).unwrap();

        assert_eq!(frame.fields[0].get(0), Some(FieldValue::Float64(0.0)));
        assert_eq!(frame.fields[0].get(1), Some(FieldValue::Float64(2.0)));
    }

    #[test]
    fn test_conversion_error_names_column() {
        let mut source = MemoryRowSource::new(
            vec![
                ColumnMeta::new("id", "INTEGER", NativeKind::Integer),
                ColumnMeta::new("price", "DECIMAL", NativeKind::Text),
            ],
            vec![
                vec![Some(NativeValue::Integer(1)), Some(NativeValue::Text("1.5".into()))],
                vec![Some(NativeValue::Integer(2)), Some(NativeValue::Text("n/a".into()))],
            ],
        );
        let conv = Converter::new(FieldType::Float64, to_float64).for_type("DECIMAL");

        let err = build_frame(&mut source, -1, &[conv], &TypeRegistry::new()).unwrap_err();
        match err {
            ConvertError::Conversion {
                column,
                type_name,
                row,
                cause,
            } => {
                assert_eq!(column, "price");
                assert_eq!(type_name, "DECIMAL");
                assert_eq!(row, 1);
                assert!(cause.contains("n/a"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_dynamic_after_ten_nulls_is_float() {
        let mut rows: Vec<Vec<Cell>> = vec![vec![None]; 10];
        rows.push(vec![Some(NativeValue::Floating(4.5))]);
        let mut source =
            MemoryRowSource::new(vec![ColumnMeta::new("j", "JSON", NativeKind::Other)], rows);

        let frame =
            build_frame(&mut source, -1, &[Converter::dynamic()], &TypeRegistry::new()).unwrap();

        assert_eq!(frame.fields[0].field_type(), FieldType::Float64);
        assert_eq!(frame.row_count(), 11);
        assert_eq!(frame.fields[0].get(10), Some(FieldValue::Float64(4.5)));
    }

    #[test]
    fn test_dynamic_all_null_is_nullable_string() {
        let mut source = MemoryRowSource::new(
            vec![ColumnMeta::new("j", "JSON", NativeKind::Other)],
            vec![vec![None], vec![None]],
        );
        let frame =
            build_frame(&mut source, -1, &[Converter::dynamic()], &TypeRegistry::new()).unwrap();

        assert_eq!(frame.fields[0].field_type(), FieldType::String);
        assert!(frame.fields[0].nullable);
        assert_eq!(frame.row_count(), 2);
    }

    #[test]
    fn test_dynamic_respects_row_cap() {
        let mut rows: Vec<Vec<Cell>> = vec![vec![None]; 3];
        rows.push(vec![Some(NativeValue::Integer(7))]);
        let mut source =
            MemoryRowSource::new(vec![ColumnMeta::new("j", "", NativeKind::Other)], rows);

        let frame =
            build_frame(&mut source, 2, &[Converter::dynamic()], &TypeRegistry::new()).unwrap();
        assert_eq!(frame.row_count(), 2);
        assert_eq!(frame.fields[0].field_type(), FieldType::String);
        assert_eq!(frame.meta.notices.len(), 1);
    }

    #[test]
    fn test_multiple_result_sets() {
        let mut source = numbers(2).with_result_set(
            vec![ColumnMeta::new("s", "TEXT", NativeKind::Text)],
            vec![vec![Some(NativeValue::Text("a".into()))]],
        );
        let frames = build_frames(&mut source, -1, &[], &TypeRegistry::new()).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].fields[0].name, "n");
        assert_eq!(frames[0].row_count(), 2);
        assert_eq!(frames[1].fields[0].name, "s");
        assert_eq!(frames[1].fields[0].field_type(), FieldType::String);
    }

    struct FailingSource {
        columns: Vec<ColumnMeta>,
        served: usize,
    }

    impl RowSource for FailingSource {
        fn columns(&self) -> &[ColumnMeta] {
            &self.columns
        }

        fn next_row(&mut self, _scan: &[Option<NativeKind>]) -> SourceResult<Option<Vec<Cell>>> {
            if self.served == 2 {
                return Err(SourceError::Invalid("connection reset".to_string()));
            }
            self.served += 1;
            Ok(Some(vec![Some(NativeValue::Integer(1))]))
        }

        fn next_result_set(&mut self) -> SourceResult<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_read_error_aborts_frame() {
        let mut source = FailingSource {
            columns: vec![ColumnMeta::new("n", "INTEGER", NativeKind::Integer)],
            served: 0,
        };
        let err = build_frame(&mut source, -1, &[], &TypeRegistry::new()).unwrap_err();
        assert!(matches!(err, ConvertError::Read { row: 2, .. }));
    }
}
