//! Macro interpolation
//!
//! Rewrites `$__name` and `$__name(arg1, arg2, ...)` invocations in raw SQL
//! with fragments computed from the [`QueryContext`].
//!
//! # Built-in macros
//!
//! ```text
//! $__interval                 context interval as a compact duration ("1m", "0ms")
//! $__interval_ms              context interval in milliseconds
//! $__timeFilter(col)          col >= '<from>' AND col <= '<to>'
//! $__timeFrom(col)            col >= '<from>'
//! $__timeTo(col)              col <= '<to>'
//! $__timeGroup(col, period)   grouping expression bucketed at period
//! $__table / $__column        context table / column name
//! ```
//!
//! The scan is a single left-to-right pass. Macro output is spliced in and
//! never re-scanned. Arguments are split on every comma and trimmed; commas
//! inside nested parentheses or quotes are not protected.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nom::{
    bytes::complete::{tag, take_while1},
    sequence::preceded,
    IResult,
};

use super::context::QueryContext;
use super::duration::{format_duration, parse_duration};
use super::error::{MacroError, MacroResult};

/// Timestamp literal format used by the default time macros (RFC 3339, UTC)
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A macro implementation: context and raw arguments in, SQL fragment out
pub type MacroFn = Arc<dyn Fn(&QueryContext, &[String]) -> MacroResult<String> + Send + Sync>;

/// A named collection of macros.
///
/// `MacroSet::default()` holds the built-ins; callers add or override entries
/// with [`MacroSet::with`] and [`MacroSet::merge`].
#[derive(Clone)]
pub struct MacroSet {
    macros: HashMap<String, MacroFn>,
}

impl MacroSet {
    /// A set with no macros
    pub fn empty() -> Self {
        Self {
            macros: HashMap::new(),
        }
    }

    /// Register or replace a macro
    pub fn insert<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&QueryContext, &[String]) -> MacroResult<String> + Send + Sync + 'static,
    {
        self.macros.insert(name.into(), Arc::new(f));
    }

    /// Builder: register or replace a macro
    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&QueryContext, &[String]) -> MacroResult<String> + Send + Sync + 'static,
    {
        self.insert(name, f);
        self
    }

    /// Merge another set into this one; entries in `other` win
    pub fn merge(mut self, other: MacroSet) -> Self {
        self.macros.extend(other.macros);
        self
    }

    /// Look up a macro by exact (case-sensitive) name
    pub fn get(&self, name: &str) -> Option<&MacroFn> {
        self.macros.get(name)
    }

    /// Registered macro names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.macros.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for MacroSet {
    fn default() -> Self {
        let mut set = Self::empty()
            .with("interval", macro_interval)
            .with("interval_ms", macro_interval_ms)
            .with("timeGroup", macro_time_group)
            .with("table", macro_table)
            .with("column", macro_column);
        set.macros.extend(time_macros(DEFAULT_TIME_FORMAT).macros);
        set
    }
}

impl std::fmt::Debug for MacroSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacroSet").field("macros", &self.names()).finish()
    }
}

/// Rewrite every macro invocation in the context's SQL text
pub fn interpolate(ctx: &QueryContext, macros: &MacroSet) -> MacroResult<String> {
    let sql = ctx.raw_sql.as_str();
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;

    while let Some(start) = rest.find("$__") {
        out.push_str(&rest[..start]);
        let position = sql.len() - rest.len() + start;
        let candidate = &rest[start..];

        let Ok((after_name, name)) = macro_name(candidate) else {
            // "$__" not followed by a name is ordinary text
            out.push_str("$__");
            rest = &candidate[3..];
            continue;
        };

        let (after, args) = match after_name.strip_prefix('(') {
            Some(inner) => {
                let close = matching_paren(inner).ok_or_else(|| MacroError::MalformedInvocation {
                    name: name.to_string(),
                    position,
                    reason: "unbalanced parentheses".to_string(),
                })?;
                (&inner[close + 1..], split_args(&inner[..close]))
            }
            None => (after_name, Vec::new()),
        };

        let f = macros.get(name).ok_or_else(|| MacroError::UnknownMacro {
            name: name.to_string(),
            position,
        })?;
        out.push_str(&f(ctx, &args)?);
        rest = after;
    }
    out.push_str(rest);

    tracing::debug!(ref_id = %ctx.ref_id, sql = %out, "Interpolated query");
    Ok(out)
}

/// Parse `$__name`, taking the longest run of identifier characters
fn macro_name(input: &str) -> IResult<&str, &str> {
    preceded(
        tag("$__"),
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    )(input)
}

/// Byte offset of the `)` closing an already-opened `(`
fn matching_paren(input: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_args(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|a| a.trim().to_string()).collect()
}

fn no_args(name: &str, args: &[String]) -> MacroResult<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(MacroError::argument_count(name, "0", args.len()))
    }
}

/// The single non-empty argument of a one-argument macro
fn single_arg<'a>(name: &str, args: &'a [String]) -> MacroResult<&'a str> {
    match args {
        [col] if !col.is_empty() => Ok(col),
        [_] => Err(MacroError::argument(name, "column argument is empty")),
        _ => Err(MacroError::argument_count(name, "1", args.len())),
    }
}

fn format_time(t: DateTime<Utc>, format: &str) -> String {
    t.format(format).to_string()
}

fn macro_interval(ctx: &QueryContext, args: &[String]) -> MacroResult<String> {
    no_args("interval", args)?;
    Ok(format_duration(ctx.interval))
}

fn macro_interval_ms(ctx: &QueryContext, args: &[String]) -> MacroResult<String> {
    no_args("interval_ms", args)?;
    Ok(ctx.interval.num_milliseconds().max(0).to_string())
}

fn macro_table(ctx: &QueryContext, args: &[String]) -> MacroResult<String> {
    no_args("table", args)?;
    if ctx.table.is_empty() {
        return Err(MacroError::argument("table", "no table name in query context"));
    }
    Ok(ctx.table.clone())
}

fn macro_column(ctx: &QueryContext, args: &[String]) -> MacroResult<String> {
    no_args("column", args)?;
    if ctx.column.is_empty() {
        return Err(MacroError::argument("column", "no column name in query context"));
    }
    Ok(ctx.column.clone())
}

/// `timeFilter`, `timeFrom` and `timeTo` rendering timestamps with `format`
pub fn time_macros(format: &'static str) -> MacroSet {
    MacroSet::empty()
        .with("timeFilter", move |ctx: &QueryContext, args: &[String]| {
            let col = single_arg("timeFilter", args)?;
            Ok(format!(
                "{col} >= '{}' AND {col} <= '{}'",
                format_time(ctx.time_range.from, format),
                format_time(ctx.time_range.to, format),
            ))
        })
        .with("timeFrom", move |ctx: &QueryContext, args: &[String]| {
            let col = single_arg("timeFrom", args)?;
            Ok(format!("{col} >= '{}'", format_time(ctx.time_range.from, format)))
        })
        .with("timeTo", move |ctx: &QueryContext, args: &[String]| {
            let col = single_arg("timeTo", args)?;
            Ok(format!("{col} <= '{}'", format_time(ctx.time_range.to, format)))
        })
}

/// Split `timeGroup` arguments into column and period
pub fn time_group_args<'a>(name: &str, args: &'a [String]) -> MacroResult<(&'a str, &'a str)> {
    match args {
        [col, period] if !col.is_empty() && !period.is_empty() => Ok((col, period)),
        [_, _] => Err(MacroError::argument(name, "column and period must be non-empty")),
        _ => Err(MacroError::argument_count(name, "2", args.len())),
    }
}

/// Whole seconds in a duration period token such as "5m"
pub fn period_seconds(name: &str, period: &str) -> MacroResult<i64> {
    let d = parse_duration(period)
        .ok_or_else(|| MacroError::argument(name, format!("unrecognized period '{}'", period)))?;
    let secs = d.num_seconds();
    if secs < 1 || d.num_milliseconds() % 1000 != 0 {
        return Err(MacroError::argument(
            name,
            format!("period '{}' must be a whole number of seconds", period),
        ));
    }
    Ok(secs)
}

fn macro_time_group(_ctx: &QueryContext, args: &[String]) -> MacroResult<String> {
    let (col, period) = time_group_args("timeGroup", args)?;

    let parts: &[&str] = match period {
        "year" => &["year"],
        "month" => &["year", "month"],
        "day" => &["year", "month", "day"],
        "hour" => &["year", "month", "day", "hour"],
        "minute" => &["year", "month", "day", "hour", "minute"],
        _ => {
            let secs = period_seconds("timeGroup", period)?;
            return Ok(format!(
                "floor(extract(epoch from {col}) / {secs}) * {secs}"
            ));
        }
    };

    Ok(parts
        .iter()
        .map(|part| format!("datepart({part}, {col})"))
        .collect::<Vec<_>>()
        .join(", "))
}
