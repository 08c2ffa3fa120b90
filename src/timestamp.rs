//! Timestamp rendering for compact log lines.
//!
//! A compact line starts with nanoseconds since the Unix epoch written as
//! decimal digits. The first ten digits are whole seconds and the next six
//! are shown as the fractional part exactly as written.

use chrono::{DateTime, FixedOffset, Local, Offset};

/// Number of leading digits holding whole seconds.
const SECONDS_DIGITS: usize = 10;
/// Number of digits after the seconds shown as the fraction.
const FRACTION_DIGITS: usize = 6;

/// Supplies the timezone offset used to render timestamps.
///
/// `Local` asks the system for the current offset on every call, so a
/// long-running decoder follows DST changes of the machine it runs on. The
/// offset is never derived from the log line itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetSource {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl OffsetSource {
    /// Returns the offset in effect right now.
    pub fn current(&self) -> FixedOffset {
        match self {
            OffsetSource::Local => Local::now().offset().fix(),
            OffsetSource::Fixed(offset) => *offset,
        }
    }
}

/// Formats a nanosecond epoch field as `YYYY-MM-DD HH:MM:SS.ffffff+zzzz`.
///
/// Fewer than six fraction digits are shown as they are; digits beyond the
/// sixteenth are dropped.
///
/// # Returns
///
/// `None` if the field does not start with ten ASCII digits or the seconds
/// fall outside the calendar range.
///
/// # Examples
///
/// ```
/// # use clog_tools::timestamp::format_timestamp;
/// # use chrono::FixedOffset;
/// let utc = FixedOffset::east_opt(0).unwrap();
/// assert_eq!(
///     format_timestamp("15045599201964060", utc).as_deref(),
///     Some("2017-09-04 21:18:40.196406+0000"),
/// );
/// ```
pub fn format_timestamp(ts_nanos: &str, offset: FixedOffset) -> Option<String> {
    let digits = ts_nanos
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits < SECONDS_DIGITS {
        return None;
    }

    let seconds: i64 = ts_nanos[..SECONDS_DIGITS].parse().ok()?;
    let fraction_end = (SECONDS_DIGITS + FRACTION_DIGITS).min(digits);
    let fraction = &ts_nanos[SECONDS_DIGITS..fraction_end];

    let when = DateTime::from_timestamp(seconds, 0)?.with_timezone(&offset);
    Some(format!(
        "{}.{}{}",
        when.format("%Y-%m-%d %H:%M:%S"),
        fraction,
        when.format("%z")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset(seconds: i32) -> FixedOffset {
        FixedOffset::east_opt(seconds).unwrap()
    }

    #[test]
    fn test_negative_offset() {
        assert_eq!(
            format_timestamp("15045599201964060", offset(-5 * 3600)).unwrap(),
            "2017-09-04 16:18:40.196406-0500"
        );
    }

    #[test]
    fn test_fraction_kept_verbatim() {
        assert_eq!(
            format_timestamp("1504559920000007", offset(0)).unwrap(),
            "2017-09-04 21:18:40.000007+0000"
        );
    }

    #[test]
    fn test_short_fraction() {
        assert_eq!(
            format_timestamp("150455992012", offset(0)).unwrap(),
            "2017-09-04 21:18:40.12+0000"
        );
    }

    #[test]
    fn test_rejects_non_digits() {
        assert!(format_timestamp("15abc", offset(0)).is_none());
        assert!(format_timestamp("150455992", offset(0)).is_none());
    }

    #[test]
    fn test_fixed_source_is_stable() {
        let source = OffsetSource::Fixed(offset(3600));
        assert_eq!(source.current(), offset(3600));
    }
}
