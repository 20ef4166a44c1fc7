//! Time-grid resampling
//!
//! Rewrites a time-indexed frame onto a fixed interval grid:
//!
//! ```text
//! range.from, range.from + interval, range.from + 2 * interval, ... <= range.to
//! ```
//!
//! Each slot covers `[slot, slot + interval)`. When several source rows fall
//! into one slot, the last one wins. Empty slots are filled according to a
//! `FillMode`. The input must already be sorted ascending by time; a
//! decreasing timestamp is reported as an error rather than sorted.
//!
//! This is the legacy reshaping path. It is kept behaviour-compatible for
//! existing integrations.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::{Field, FieldType, FieldValue, Frame, FrameError, TimeRange};

/// How to populate a slot that has no source row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum FillMode {
    /// Carry the previous slot's value forward
    Previous,
    /// Insert null
    Null,
    /// Insert a fixed value, converted to each column's type
    Value { value: f64 },
}

impl FillMode {
    /// Parse from string: `previous`, `null` or `value:<number>`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "previous" | "prev" => return Some(Self::Previous),
            "null" => return Some(Self::Null),
            _ => {}
        }
        let (mode, value) = s.split_once(':')?;
        if !mode.eq_ignore_ascii_case("value") {
            return None;
        }
        value.trim().parse().ok().map(|value| Self::Value { value })
    }

    /// The fill value for a column of the given type
    fn value_for(&self, field_type: FieldType) -> Option<FieldValue> {
        let Self::Value { value } = self else {
            return None;
        };
        match field_type {
            FieldType::Int64 => Some(FieldValue::Int64(*value as i64)),
            FieldType::Float64 => Some(FieldValue::Float64(*value)),
            FieldType::Bool => Some(FieldValue::Bool(*value != 0.0)),
            FieldType::String => Some(FieldValue::String(value.to_string())),
            FieldType::Time => None,
        }
    }
}

impl std::fmt::Display for FillMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Previous => write!(f, "previous"),
            Self::Null => write!(f, "null"),
            Self::Value { value } => write!(f, "value:{}", value),
        }
    }
}

/// Errors that can occur while resampling
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResampleError {
    /// The frame has no time field to resample on
    #[error("Cannot resample frame '{0}': no time field")]
    EmptyFrame(String),

    /// The time field is not ascending or contains nulls
    #[error("Time field is not monotonic at row {row}")]
    NonMonotonicTime { row: usize },

    /// Interval must be strictly positive
    #[error("Invalid resample interval: {0}ms")]
    InvalidInterval(i64),

    /// Frame structure error
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

/// Result type for resample operations
pub type ResampleResult<T> = Result<T, ResampleError>;

/// Resample `frame` onto the grid defined by `range` and `interval`
pub fn resample(
    frame: &Frame,
    fill: FillMode,
    range: &TimeRange,
    interval: Duration,
) -> ResampleResult<Frame> {
    if interval <= Duration::zero() {
        return Err(ResampleError::InvalidInterval(interval.num_milliseconds()));
    }

    let time_idx = frame
        .time_field_index()
        .ok_or_else(|| ResampleError::EmptyFrame(frame.name.clone()))?;
    frame.validate()?;

    let times = ascending_times(&frame.fields[time_idx])?;

    let time_field = &frame.fields[time_idx];
    let value_idx: Vec<usize> = (0..frame.fields.len()).filter(|i| *i != time_idx).collect();

    let mut out_time = Field::new(time_field.name.clone(), FieldType::Time, false);
    let mut out_values: Vec<Field> = value_idx
        .iter()
        .map(|i| {
            let source = &frame.fields[*i];
            Field::new(source.name.clone(), source.field_type(), true)
        })
        .collect();
    let mut previous: Vec<Option<FieldValue>> = vec![None; value_idx.len()];

    let mut cursor = 0;
    let mut slot = range.from;
    let mut slots = 0usize;

    while slot <= range.to {
        let slot_end = slot.checked_add_signed(interval);

        // Last source row in [slot, slot_end); rows before the grid are skipped.
        let mut hit = None;
        while cursor < times.len() && slot_end.map_or(true, |end| times[cursor] < end) {
            if times[cursor] >= slot {
                hit = Some(cursor);
            }
            cursor += 1;
        }

        out_time.append(Some(FieldValue::Time(slot)))?;
        for (out_col, source_idx) in value_idx.iter().enumerate() {
            let source = &frame.fields[*source_idx];
            let value = match hit {
                Some(row) => source.get(row),
                None => match fill {
                    FillMode::Previous => previous[out_col].clone(),
                    FillMode::Null => None,
                    FillMode::Value { .. } => fill.value_for(source.field_type()),
                },
            };
            previous[out_col] = value.clone();
            out_values[out_col].append(value)?;
        }

        slots += 1;
        match slot_end {
            Some(next) => slot = next,
            None => break,
        }
    }

    tracing::debug!(
        frame = %frame.name,
        source_rows = times.len(),
        slots,
        fill = %fill,
        "Resampled frame"
    );

    // Keep the input's column order, with the time field in its original place.
    let mut fields = out_values;
    fields.insert(time_idx, out_time);

    Ok(Frame {
        name: frame.name.clone(),
        fields,
        meta: frame.meta.clone(),
    })
}

/// Read a time field, checking it is non-null and ascending
fn ascending_times(field: &Field) -> ResampleResult<Vec<DateTime<Utc>>> {
    let mut times = Vec::with_capacity(field.len());
    for row in 0..field.len() {
        let t = field
            .get(row)
            .and_then(|v| v.as_time())
            .ok_or(ResampleError::NonMonotonicTime { row })?;
        if times.last().is_some_and(|prev| t < *prev) {
            return Err(ResampleError::NonMonotonicTime { row });
        }
        times.push(t);
    }
    Ok(times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn frame(points: &[(i64, f64)]) -> Frame {
        Frame::new("A")
            .with_field(
                Field::from_values(
                    "time",
                    FieldType::Time,
                    false,
                    points.iter().map(|(t, _)| Some(FieldValue::Time(ts(*t)))),
                )
                .unwrap(),
            )
            .with_field(
                Field::from_values(
                    "value",
                    FieldType::Float64,
                    false,
                    points.iter().map(|(_, v)| Some(FieldValue::Float64(*v))),
                )
                .unwrap(),
            )
    }

    fn values(frame: &Frame) -> Vec<Option<f64>> {
        let field = frame.field("value").unwrap();
        (0..field.len())
            .map(|i| field.get(i).and_then(|v| v.as_f64()))
            .collect()
    }

    fn range(from: i64, to: i64) -> TimeRange {
        TimeRange::new(ts(from), ts(to))
    }

    #[test]
    fn test_fill_previous() {
        let input = frame(&[(0, 1.0), (30, 3.0)]);
        let out = resample(&input, FillMode::Previous, &range(0, 40), Duration::seconds(10)).unwrap();

        let times: Vec<i64> = (0..out.row_count())
            .map(|i| out.fields[0].get(i).unwrap().as_time().unwrap().timestamp())
            .collect();
        assert_eq!(times, vec![0, 10, 20, 30, 40]);
        assert_eq!(
            values(&out),
            vec![Some(1.0), Some(1.0), Some(1.0), Some(3.0), Some(3.0)]
        );
    }

    #[test]
    fn test_fill_null() {
        let input = frame(&[(0, 1.0), (30, 3.0)]);
        let out = resample(&input, FillMode::Null, &range(0, 40), Duration::seconds(10)).unwrap();

        assert_eq!(values(&out), vec![Some(1.0), None, None, Some(3.0), None]);
        assert!(out.field("value").unwrap().nullable);
        assert!(!out.field("time").unwrap().nullable);
    }

    #[test]
    fn test_fill_value() {
        let input = frame(&[(10, 5.0)]);
        let out = resample(
            &input,
            FillMode::Value { value: -1.0 },
            &range(0, 20),
            Duration::seconds(10),
        )
        .unwrap();

        assert_eq!(values(&out), vec![Some(-1.0), Some(5.0), Some(-1.0)]);
    }

    #[test]
    fn test_first_slot_previous_falls_back_to_null() {
        let input = frame(&[(20, 2.0)]);
        let out = resample(&input, FillMode::Previous, &range(0, 30), Duration::seconds(10)).unwrap();

        assert_eq!(values(&out), vec![None, None, Some(2.0), Some(2.0)]);
    }

    #[test]
    fn test_aligned_frame_is_unchanged() {
        let input = frame(&[(0, 1.0), (10, 2.0), (20, 3.0)]);
        let out = resample(&input, FillMode::Null, &range(0, 20), Duration::seconds(10)).unwrap();

        assert_eq!(values(&out), vec![Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(out.row_count(), input.row_count());
    }

    #[test]
    fn test_last_point_in_slot_wins() {
        let input = frame(&[(0, 1.0), (3, 2.0), (9, 3.0), (10, 4.0)]);
        let out = resample(&input, FillMode::Null, &range(0, 10), Duration::seconds(10)).unwrap();

        assert_eq!(values(&out), vec![Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_points_outside_range_are_ignored() {
        let input = frame(&[(-5, 9.0), (5, 1.0), (100, 7.0)]);
        let out = resample(&input, FillMode::Previous, &range(0, 20), Duration::seconds(10)).unwrap();

        assert_eq!(values(&out), vec![Some(1.0), Some(1.0), Some(1.0)]);
    }

    #[test]
    fn test_last_slot_not_after_range_end() {
        let input = frame(&[]);
        let out = resample(&input, FillMode::Null, &range(0, 25), Duration::seconds(10)).unwrap();

        assert_eq!(out.row_count(), 3);
    }

    #[test]
    fn test_fill_value_per_column_type() {
        let input = frame(&[(0, 1.0)]).with_field(
            Field::from_values(
                "host",
                FieldType::String,
                true,
                vec![Some(FieldValue::String("a".to_string()))],
            )
            .unwrap(),
        );
        let out = resample(
            &input,
            FillMode::Value { value: 0.0 },
            &range(0, 10),
            Duration::seconds(10),
        )
        .unwrap();

        assert_eq!(
            out.field("host").unwrap().get(1),
            Some(FieldValue::String("0".to_string()))
        );
    }

    #[test]
    fn test_no_time_field() {
        let input = Frame::new("B").with_field(Field::new("value", FieldType::Float64, true));
        let result = resample(&input, FillMode::Null, &range(0, 10), Duration::seconds(1));

        assert!(matches!(result, Err(ResampleError::EmptyFrame(name)) if name == "B"));
    }

    #[test]
    fn test_non_monotonic_time() {
        let input = frame(&[(10, 1.0), (0, 2.0)]);
        let result = resample(&input, FillMode::Null, &range(0, 10), Duration::seconds(1));

        assert_eq!(result.unwrap_err(), ResampleError::NonMonotonicTime { row: 1 });
    }

    #[test]
    fn test_invalid_interval() {
        let input = frame(&[(0, 1.0)]);
        let result = resample(&input, FillMode::Null, &range(0, 10), Duration::zero());

        assert!(matches!(result, Err(ResampleError::InvalidInterval(0))));
    }

    #[test]
    fn test_fill_mode_parse() {
        assert_eq!(FillMode::parse("previous"), Some(FillMode::Previous));
        assert_eq!(FillMode::parse("NULL"), Some(FillMode::Null));
        assert_eq!(
            FillMode::parse("value:2.5"),
            Some(FillMode::Value { value: 2.5 })
        );
        assert_eq!(FillMode::parse("value"), None);
        assert_eq!(FillMode::parse("linear"), None);
    }

    #[test]
    fn test_fill_mode_serde() {
        let mode: FillMode = serde_json::from_str(r#"{"mode":"value","value":3}"#).unwrap();
        assert_eq!(mode, FillMode::Value { value: 3.0 });

        let mode: FillMode = serde_json::from_str(r#"{"mode":"previous"}"#).unwrap();
        assert_eq!(mode, FillMode::Previous);
    }
}
