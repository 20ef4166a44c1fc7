//! Typed column storage
//!
//! A `Field` owns one column of a frame. Values are kept in a typed vector
//! (`Vec<Option<T>>` per `FieldType`) so consumers can read them without
//! re-inspecting every cell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{FrameError, FrameResult};
use super::types::{FieldType, FieldValue};

/// Per-type column storage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum FieldData {
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    String(Vec<Option<String>>),
    Time(Vec<Option<DateTime<Utc>>>),
}

impl FieldData {
    /// Create empty storage for a field type
    pub fn new(field_type: FieldType) -> Self {
        Self::with_capacity(field_type, 0)
    }

    /// Create empty storage with reserved capacity
    pub fn with_capacity(field_type: FieldType, capacity: usize) -> Self {
        match field_type {
            FieldType::Int64 => FieldData::Int64(Vec::with_capacity(capacity)),
            FieldType::Float64 => FieldData::Float64(Vec::with_capacity(capacity)),
            FieldType::Bool => FieldData::Bool(Vec::with_capacity(capacity)),
            FieldType::String => FieldData::String(Vec::with_capacity(capacity)),
            FieldType::Time => FieldData::Time(Vec::with_capacity(capacity)),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            FieldData::Int64(_) => FieldType::Int64,
            FieldData::Float64(_) => FieldType::Float64,
            FieldData::Bool(_) => FieldType::Bool,
            FieldData::String(_) => FieldType::String,
            FieldData::Time(_) => FieldType::Time,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldData::Int64(v) => v.len(),
            FieldData::Float64(v) => v.len(),
            FieldData::Bool(v) => v.len(),
            FieldData::String(v) => v.len(),
            FieldData::Time(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named, typed column of a frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    /// Column name
    pub name: String,
    /// Whether the column may hold nulls
    pub nullable: bool,
    /// Column values
    pub data: FieldData,
}

impl Field {
    /// Create an empty field
    pub fn new(name: impl Into<String>, field_type: FieldType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            nullable,
            data: FieldData::new(field_type),
        }
    }

    /// Create a field from existing values, checking every value's type
    pub fn from_values(
        name: impl Into<String>,
        field_type: FieldType,
        nullable: bool,
        values: impl IntoIterator<Item = Option<FieldValue>>,
    ) -> FrameResult<Self> {
        let mut field = Self::new(name, field_type, nullable);
        for value in values {
            field.append(value)?;
        }
        Ok(field)
    }

    pub fn field_type(&self) -> FieldType {
        self.data.field_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a value.
    ///
    /// A null appended to a non-nullable field stores the type's default value.
    pub fn append(&mut self, value: Option<FieldValue>) -> FrameResult<()> {
        let value = match value {
            None if !self.nullable => Some(self.field_type().default_value()),
            other => other,
        };

        match (&mut self.data, value) {
            (FieldData::Int64(v), None) => v.push(None),
            (FieldData::Float64(v), None) => v.push(None),
            (FieldData::Bool(v), None) => v.push(None),
            (FieldData::String(v), None) => v.push(None),
            (FieldData::Time(v), None) => v.push(None),
            (FieldData::Int64(v), Some(FieldValue::Int64(x))) => v.push(Some(x)),
            (FieldData::Float64(v), Some(FieldValue::Float64(x))) => v.push(Some(x)),
            (FieldData::Bool(v), Some(FieldValue::Bool(x))) => v.push(Some(x)),
            (FieldData::String(v), Some(FieldValue::String(x))) => v.push(Some(x)),
            (FieldData::Time(v), Some(FieldValue::Time(x))) => v.push(Some(x)),
            (data, Some(other)) => {
                return Err(FrameError::TypeMismatch {
                    field: self.name.clone(),
                    expected: data.field_type(),
                    actual: other.field_type(),
                })
            }
        }
        Ok(())
    }

    /// Get the value at a row; `None` for nulls and out-of-range rows
    pub fn get(&self, row: usize) -> Option<FieldValue> {
        match &self.data {
            FieldData::Int64(v) => v.get(row).copied().flatten().map(FieldValue::Int64),
            FieldData::Float64(v) => v.get(row).copied().flatten().map(FieldValue::Float64),
            FieldData::Bool(v) => v.get(row).copied().flatten().map(FieldValue::Bool),
            FieldData::String(v) => v.get(row).cloned().flatten().map(FieldValue::String),
            FieldData::Time(v) => v.get(row).copied().flatten().map(FieldValue::Time),
        }
    }

    /// Whether the cell at `row` is null
    pub fn is_null(&self, row: usize) -> bool {
        row < self.len() && self.get(row).is_none()
    }
}
