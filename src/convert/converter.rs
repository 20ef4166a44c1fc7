//! Converter descriptors
//!
//! A converter pairs a column-matching condition with a function from a
//! scanned native value to a frame value. Converters used as overrides must
//! carry at least one match key (column name, type name or type regex) or be
//! flagged for dynamic inference.
//!
//! ```rust,ignore
//! let amount = Converter::new(FieldType::Float64, to_float64)
//!     .named("amount as float")
//!     .for_column("amount")
//!     .scan(NativeKind::Floating);
//! ```

use std::sync::Arc;

use regex::Regex;

use super::error::{ConvertError, ConvertResult};
use super::registry::to_string_value;
use crate::frame::{FieldType, FieldValue};
use crate::source::{ColumnMeta, NativeKind, NativeValue};

/// Native value to frame value
pub type ConvertFn = Arc<dyn Fn(NativeValue) -> Result<FieldValue, String> + Send + Sync>;

/// Native value to frame value, with access to the column's metadata
pub type ColumnConvertFn =
    Arc<dyn Fn(NativeValue, &ColumnMeta) -> Result<FieldValue, String> + Send + Sync>;

/// Match keys of a converter
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    /// Exact column name
    pub column_name: Option<String>,
    /// Exact declared type name
    pub type_name: Option<String>,
    /// Pattern over the declared type name
    pub type_regex: Option<Regex>,
    /// Infer the field type by sampling rows
    pub dynamic: bool,
}

impl Matcher {
    /// Whether any match key or the dynamic flag is set
    pub fn is_rule(&self) -> bool {
        self.column_name.is_some()
            || self.type_name.is_some()
            || self.type_regex.is_some()
            || self.dynamic
    }
}

/// How to turn one column's native values into frame values
#[derive(Clone)]
pub struct Converter {
    /// Display name used in logs and errors
    pub name: Option<String>,
    /// Kind the row source should scan into; `None` takes the driver's value
    pub scan_kind: Option<NativeKind>,
    pub matcher: Matcher,
    /// Target frame field type
    pub field_type: FieldType,
    /// Whether the produced field holds nulls (otherwise nulls become defaults)
    pub nullable: bool,
    convert: ConvertFn,
    convert_with_column: Option<ColumnConvertFn>,
}

impl Converter {
    /// An unconditional, nullable converter to `field_type`
    pub fn new<F>(field_type: FieldType, convert: F) -> Self
    where
        F: Fn(NativeValue) -> Result<FieldValue, String> + Send + Sync + 'static,
    {
        Self {
            name: None,
            scan_kind: None,
            matcher: Matcher::default(),
            field_type,
            nullable: true,
            convert: Arc::new(convert),
            convert_with_column: None,
        }
    }

    /// A dynamic-inference converter.
    ///
    /// Its field type is a placeholder: the sampler replaces it with a converter
    /// for the type observed in the data.
    pub fn dynamic() -> Self {
        let mut converter = Self::new(FieldType::String, to_string_value).named("dynamic");
        converter.matcher.dynamic = true;
        converter
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn scan(mut self, kind: NativeKind) -> Self {
        self.scan_kind = Some(kind);
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Match columns with exactly this name
    pub fn for_column(mut self, name: impl Into<String>) -> Self {
        self.matcher.column_name = Some(name.into());
        self
    }

    /// Match columns with exactly this declared type name
    pub fn for_type(mut self, type_name: impl Into<String>) -> Self {
        self.matcher.type_name = Some(type_name.into());
        self
    }

    /// Match columns whose declared type name matches `pattern`
    pub fn for_type_regex(mut self, pattern: &str) -> ConvertResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| ConvertError::InvalidConverter {
            name: self.display_name(),
            reason: format!("invalid type regex '{}': {}", pattern, e),
        })?;
        self.matcher.type_regex = Some(regex);
        Ok(self)
    }

    /// Add a conversion that also sees the column metadata; preferred when set
    pub fn with_column_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(NativeValue, &ColumnMeta) -> Result<FieldValue, String> + Send + Sync + 'static,
    {
        self.convert_with_column = Some(Arc::new(f));
        self
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{} converter", self.field_type))
    }

    /// Check the converter can be used as an override rule
    pub fn validate(&self) -> ConvertResult<()> {
        if !self.matcher.is_rule() {
            return Err(ConvertError::InvalidConverter {
                name: self.display_name(),
                reason: "needs a column name, type name or type regex, or the dynamic flag"
                    .to_string(),
            });
        }
        Ok(())
    }

    pub fn is_dynamic(&self) -> bool {
        self.matcher.dynamic
    }

    pub fn matches_column_name(&self, column: &ColumnMeta) -> bool {
        self.matcher.column_name.as_deref() == Some(column.name.as_str())
    }

    pub fn matches_type_name(&self, column: &ColumnMeta) -> bool {
        self.matcher.type_name.as_deref() == Some(column.type_name.as_str())
    }

    pub fn matches_type_regex(&self, column: &ColumnMeta) -> bool {
        self.matcher
            .type_regex
            .as_ref()
            .is_some_and(|re| re.is_match(&column.type_name))
    }

    /// Convert one non-null value, checking the result has the declared type
    pub fn apply(&self, value: NativeValue, column: &ColumnMeta) -> Result<FieldValue, String> {
        let converted = match &self.convert_with_column {
            Some(f) => f(value, column)?,
            None => (self.convert)(value)?,
        };
        if converted.field_type() != self.field_type {
            return Err(format!(
                "{} produced {} but declares {}",
                self.display_name(),
                converted.field_type(),
                self.field_type
            ));
        }
        Ok(converted)
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("name", &self.name)
            .field("scan_kind", &self.scan_kind)
            .field("matcher", &self.matcher)
            .field("field_type", &self.field_type)
            .field("nullable", &self.nullable)
            .field("column_aware", &self.convert_with_column.is_some())
            .finish()
    }
}
