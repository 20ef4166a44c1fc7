//! Column converter resolution
//!
//! Every result column gets exactly one converter. Rules are tried in a fixed
//! order and the first that yields a converter wins:
//!
//! 1. override whose column name matches
//! 2. override whose type name matches
//! 3. override whose type regex matches
//! 4. the dynamic override, if exactly one is supplied
//! 5. registry default for the column's scan kind
//! 6. registry string fallback
//!
//! Dynamic overrides take part only in rule 4.

use std::collections::HashSet;

use super::converter::Converter;
use super::error::{ConvertError, ConvertResult};
use super::registry::TypeRegistry;
use crate::source::ColumnMeta;

/// The rule that selected a column's converter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    ColumnName,
    TypeName,
    TypeRegex,
    Dynamic,
    RegistryDefault,
    StringFallback,
}

impl MatchRule {
    /// Evaluation order
    pub const ORDER: [MatchRule; 6] = [
        MatchRule::ColumnName,
        MatchRule::TypeName,
        MatchRule::TypeRegex,
        MatchRule::Dynamic,
        MatchRule::RegistryDefault,
        MatchRule::StringFallback,
    ];

    fn select<'a>(
        self,
        column: &ColumnMeta,
        overrides: &'a [Converter],
        dynamic: Option<&'a Converter>,
        registry: &'a TypeRegistry,
    ) -> Option<&'a Converter> {
        let mut rules = overrides.iter().filter(|c| !c.is_dynamic());
        match self {
            MatchRule::ColumnName => rules.find(|c| c.matches_column_name(column)),
            MatchRule::TypeName => rules.find(|c| c.matches_type_name(column)),
            MatchRule::TypeRegex => rules.find(|c| c.matches_type_regex(column)),
            MatchRule::Dynamic => dynamic,
            MatchRule::RegistryDefault => registry.default_for(column.scan_kind),
            MatchRule::StringFallback => registry.fallback(),
        }
    }
}

impl std::fmt::Display for MatchRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchRule::ColumnName => write!(f, "column name"),
            MatchRule::TypeName => write!(f, "type name"),
            MatchRule::TypeRegex => write!(f, "type regex"),
            MatchRule::Dynamic => write!(f, "dynamic"),
            MatchRule::RegistryDefault => write!(f, "registry default"),
            MatchRule::StringFallback => write!(f, "string fallback"),
        }
    }
}

/// A result column paired with its converter
#[derive(Debug, Clone)]
pub struct ColumnBinding {
    /// Position in the result set
    pub index: usize,
    pub column: ColumnMeta,
    pub converter: Converter,
    pub rule: MatchRule,
}

/// Bind one converter to every column.
///
/// Fails before any row is read if column names repeat, an override has no
/// match key, or some column has no applicable converter.
pub fn resolve_columns(
    columns: &[ColumnMeta],
    overrides: &[Converter],
    registry: &TypeRegistry,
) -> ConvertResult<Vec<ColumnBinding>> {
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.name.as_str()) {
            return Err(ConvertError::DuplicateColumnName(column.name.clone()));
        }
    }

    for converter in overrides {
        converter.validate()?;
    }

    let dynamic_overrides: Vec<&Converter> = overrides.iter().filter(|c| c.is_dynamic()).collect();
    let dynamic = match dynamic_overrides.as_slice() {
        [single] => Some(*single),
        [] => None,
        many => {
            tracing::warn!(
                count = many.len(),
                "Multiple dynamic converters supplied, ignoring dynamic inference"
            );
            None
        }
    };

    columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let (rule, converter) = MatchRule::ORDER
                .iter()
                .find_map(|rule| {
                    rule.select(column, overrides, dynamic, registry)
                        .map(|c| (*rule, c))
                })
                .ok_or_else(|| ConvertError::UnresolvedColumnType {
                    column: column.name.clone(),
                    type_name: column.type_name.clone(),
                })?;

            tracing::debug!(
                column = %column.name,
                type_name = %column.type_name,
                rule = %rule,
                field_type = %converter.field_type,
                "Bound column"
            );

            Ok(ColumnBinding {
                index,
                column: column.clone(),
                converter: converter.clone(),
                rule,
            })
        })
        .collect()
}
