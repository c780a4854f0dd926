//! Parsing of caller-supplied resume timestamps.

use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::{ParseError, ParseResult};

/// Parse a watermark timestamp.
///
/// Accepts RFC 3339 (`2024-01-15T10:30:00Z`, `...+02:00`), ISO-8601 without
/// an offset (read as UTC), a space instead of `T`, and a bare date
/// (midnight UTC). The result is always expressed in UTC.
///
/// # Example
///
/// ```
/// use trailsync_types::parse_watermark;
///
/// let a = parse_watermark("2024-01-15T10:30:00Z")?;
/// let b = parse_watermark("2024-01-15T10:30:00")?;
/// assert_eq!(a, b);
/// # Ok::<(), trailsync_types::ParseError>(())
/// ```
pub fn parse_watermark(input: &str) -> ParseResult<OffsetDateTime> {
    let trimmed = input.trim();
    let invalid = || ParseError::InvalidTimestamp(input.to_string());

    if trimmed.is_empty() {
        return Err(invalid());
    }

    let normalized = if trimmed.len() > 10 && trimmed.as_bytes()[10] == b' ' {
        format!("{}T{}", &trimmed[..10], &trimmed[11..])
    } else {
        trimmed.to_string()
    };

    if let Ok(dt) = OffsetDateTime::parse(&normalized, &Rfc3339) {
        return Ok(dt.to_offset(UtcOffset::UTC));
    }
    if let Ok(dt) = OffsetDateTime::parse(&normalized, &Iso8601::DEFAULT) {
        return Ok(dt.to_offset(UtcOffset::UTC));
    }
    if let Ok(dt) = PrimitiveDateTime::parse(&normalized, &Iso8601::DEFAULT) {
        return Ok(dt.assume_utc());
    }
    if let Ok(date) = Date::parse(&normalized, &Iso8601::DEFAULT) {
        return Ok(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc());
    }

    Err(invalid())
}
