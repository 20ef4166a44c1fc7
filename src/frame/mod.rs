//! Tabular Frames
//!
//! A frame is an ordered collection of named, equal-length, typed columns
//! plus metadata describing how it was produced:
//!
//! - **types**: Field types, values, time ranges and notices
//! - **field**: Typed column storage
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust
//! use sqlframe::frame::{Field, FieldType, FieldValue, Frame};
//!
//! let mut frame = Frame::new("A");
//! frame.add_field(Field::new("value", FieldType::Float64, true));
//! frame.append_row(vec![Some(FieldValue::Float64(1.0))]).unwrap();
//!
//! assert_eq!(frame.row_count(), 1);
//! ```

mod error;
mod field;
mod types;

pub use error::{FrameError, FrameResult};
pub use field::{Field, FieldData};
pub use types::{FieldType, FieldValue, Notice, NoticeSeverity, TimeRange};

use serde::{Deserialize, Serialize};
use std::io::Write;

/// Metadata attached to a frame
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameMeta {
    /// The exact SQL text that produced the frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_query_string: Option<String>,
    /// Warnings and informational messages
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
    /// Free-form annotations
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

/// An ordered collection of equal-length typed columns
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    /// Frame name (usually the query reference id)
    pub name: String,
    /// Columns in result order
    pub fields: Vec<Field>,
    /// Production metadata
    #[serde(default)]
    pub meta: FrameMeta,
}

impl Frame {
    /// Create an empty frame
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            meta: FrameMeta::default(),
        }
    }

    /// Builder: add a field
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a field
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Number of rows (length of the first field)
    pub fn row_count(&self) -> usize {
        self.fields.first().map(Field::len).unwrap_or(0)
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Index of the first time-typed field
    pub fn time_field_index(&self) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.field_type() == FieldType::Time)
    }

    /// Append one value per field.
    ///
    /// The row is checked against every field before anything is written, so a
    /// failed append leaves the frame unchanged.
    pub fn append_row(&mut self, row: Vec<Option<FieldValue>>) -> FrameResult<()> {
        if row.len() != self.fields.len() {
            return Err(FrameError::LengthMismatch {
                field: self.name.clone(),
                expected: self.fields.len(),
                actual: row.len(),
            });
        }

        for (field, value) in self.fields.iter().zip(&row) {
            if let Some(value) = value {
                if value.field_type() != field.field_type() {
                    return Err(FrameError::TypeMismatch {
                        field: field.name.clone(),
                        expected: field.field_type(),
                        actual: value.field_type(),
                    });
                }
            }
        }

        for (field, value) in self.fields.iter_mut().zip(row) {
            field.append(value)?;
        }
        Ok(())
    }

    /// Check that all fields have the same length
    pub fn validate(&self) -> FrameResult<()> {
        let expected = self.row_count();
        for field in &self.fields {
            if field.len() != expected {
                return Err(FrameError::LengthMismatch {
                    field: field.name.clone(),
                    expected,
                    actual: field.len(),
                });
            }
        }
        Ok(())
    }

    /// Attach a notice
    pub fn append_notice(&mut self, notice: Notice) {
        self.meta.notices.push(notice);
    }

    /// Record the SQL text that produced this frame
    pub fn set_executed_query(&mut self, sql: impl Into<String>) {
        self.meta.executed_query_string = Some(sql.into());
    }

    /// Write the frame as CSV with a header row
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.fields.iter().map(|f| f.name.as_str()))?;

        for row in 0..self.row_count() {
            writer.write_record(
                self.fields
                    .iter()
                    .map(|f| f.get(row).map(|v| v.to_string()).unwrap_or_default()),
            )?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Render the frame as an aligned text table
    pub fn to_table_string(&self) -> String {
        let header: Vec<String> = self.fields.iter().map(|f| f.name.clone()).collect();
        let rows: Vec<Vec<String>> = (0..self.row_count())
            .map(|row| {
                self.fields
                    .iter()
                    .map(|f| {
                        f.get(row)
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| "null".to_string())
                    })
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = header
            .iter()
            .enumerate()
            .map(|(i, h)| {
                rows.iter()
                    .map(|r| r[i].len())
                    .chain(std::iter::once(h.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let render = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<width$}", c, width = *w))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = render(&header);
        out.push('\n');
        out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
        for row in &rows {
            out.push('\n');
            out.push_str(&render(row));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> Frame {
        let mut frame = Frame::new("A")
            .with_field(Field::new("id", FieldType::Int64, false))
            .with_field(Field::new("name", FieldType::String, true));
        frame
            .append_row(vec![
                Some(FieldValue::Int64(1)),
                Some(FieldValue::String("a".to_string())),
            ])
            .unwrap();
        frame
            .append_row(vec![Some(FieldValue::Int64(2)), None])
            .unwrap();
        frame
    }

    #[test]
    fn test_append_row() {
        let frame = sample_frame();
        assert_eq!(frame.row_count(), 2);
        assert!(frame.validate().is_ok());
        assert_eq!(frame.field("name").unwrap().get(1), None);
    }

    #[test]
    fn test_append_row_is_atomic() {
        let mut frame = sample_frame();
        let result = frame.append_row(vec![
            Some(FieldValue::Int64(3)),
            Some(FieldValue::Bool(true)),
        ]);

        assert!(matches!(result, Err(FrameError::TypeMismatch { .. })));
        assert_eq!(frame.fields[0].len(), 2);
        assert_eq!(frame.fields[1].len(), 2);
    }

    #[test]
    fn test_append_row_wrong_width() {
        let mut frame = sample_frame();
        let result = frame.append_row(vec![Some(FieldValue::Int64(3))]);
        assert!(matches!(result, Err(FrameError::LengthMismatch { .. })));
    }

    #[test]
    fn test_validate_detects_unequal_fields() {
        let mut frame = sample_frame();
        frame.fields[0].append(Some(FieldValue::Int64(9))).unwrap();
        assert!(frame.validate().is_err());
    }

    #[test]
    fn test_write_csv() {
        let frame = sample_frame();
        let mut out = Vec::new();
        frame.write_csv(&mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "id,name\n1,a\n2,\n");
    }

    #[test]
    fn test_table_string() {
        let table = sample_frame().to_table_string();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "id  name");
        assert_eq!(lines[2], "1   a");
        assert_eq!(lines[3], "2   null");
    }

    #[test]
    fn test_time_field_index() {
        let frame = Frame::new("B")
            .with_field(Field::new("value", FieldType::Float64, true))
            .with_field(Field::new("time", FieldType::Time, false));
        assert_eq!(frame.time_field_index(), Some(1));
        assert_eq!(sample_frame().time_field_index(), None);
    }

    #[test]
    fn test_serialize_meta() {
        let mut frame = sample_frame();
        frame.set_executed_query("SELECT 1");
        frame.append_notice(Notice::warning("limited"));

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["meta"]["executedQueryString"], "SELECT 1");
        assert_eq!(json["meta"]["notices"][0]["severity"], "warning");
    }
}
