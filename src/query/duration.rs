//! Duration literals
//!
//! Parses and formats compact durations such as `500ms`, `30s`, `5m`, `1h`,
//! `7d` and `2w`. Used for macro output, `$__timeGroup` periods, the CLI and
//! configuration.

use chrono::Duration;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::digit1,
    combinator::{all_consuming, map_res, value},
    sequence::pair,
    IResult,
};

const MS_PER_SECOND: i64 = 1000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;
const MS_PER_WEEK: i64 = 7 * MS_PER_DAY;

/// Parse a duration like "7d", "24h", "30m", "10s" or "250ms"
pub fn parse_duration(input: &str) -> Option<Duration> {
    all_consuming(duration)(input.trim())
        .ok()
        .map(|(_, ms)| Duration::milliseconds(ms))
}

fn duration(input: &str) -> IResult<&str, i64> {
    let (input, (num, unit)) = pair(
        map_res(digit1, |s: &str| s.parse::<i64>()),
        alt((
            value(1i64, tag("ms")),
            value(MS_PER_SECOND, alt((tag("s"), tag("S")))),
            value(MS_PER_MINUTE, alt((tag("m"), tag("M")))),
            value(MS_PER_HOUR, alt((tag("h"), tag("H")))),
            value(MS_PER_DAY, alt((tag("d"), tag("D")))),
            value(MS_PER_WEEK, alt((tag("w"), tag("W")))),
        )),
    )(input)?;

    Ok((input, num.saturating_mul(unit)))
}

/// Format a duration using the largest unit that divides it exactly.
///
/// Zero and negative durations render as `0ms`.
pub fn format_duration(d: Duration) -> String {
    let ms = d.num_milliseconds();
    if ms <= 0 {
        return "0ms".to_string();
    }

    const UNITS: &[(i64, &str)] = &[
        (MS_PER_DAY, "d"),
        (MS_PER_HOUR, "h"),
        (MS_PER_MINUTE, "m"),
        (MS_PER_SECOND, "s"),
    ];
    for (size, suffix) in UNITS {
        if ms % size == 0 {
            return format!("{}{}", ms / size, suffix);
        }
    }
    format!("{}ms", ms)
}
