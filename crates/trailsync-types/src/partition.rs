//! Day partition keys.
//!
//! Samples are grouped into one partition per UTC calendar day. A partition
//! is named `YYYY_MM_DD`, which makes lexicographic order of the names equal
//! to chronological order of the days.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Month, OffsetDateTime, UtcOffset};

use crate::error::{ParseError, ParseResult};

/// Name of a day partition (`YYYY_MM_DD`, UTC).
///
/// The key is always backed by a real calendar date, so its string form is
/// safe to embed in storage identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey(Date);

impl PartitionKey {
    /// Partition for the UTC calendar day of `instant`.
    pub fn for_instant(instant: OffsetDateTime) -> Self {
        Self(instant.to_offset(UtcOffset::UTC).date())
    }

    /// Partition for a calendar day.
    pub fn from_date(date: Date) -> Self {
        Self(date)
    }

    /// Parse a `YYYY_MM_DD` key.
    ///
    /// # Example
    ///
    /// ```
    /// use trailsync_types::PartitionKey;
    ///
    /// let key = PartitionKey::parse("2024_03_09")?;
    /// assert_eq!(key.to_string(), "2024_03_09");
    /// assert!(PartitionKey::parse("2024_02_30").is_err());
    /// # Ok::<(), trailsync_types::ParseError>(())
    /// ```
    pub fn parse(s: &str) -> ParseResult<Self> {
        let invalid = || ParseError::InvalidPartitionKey(s.to_string());
        let bytes = s.as_bytes();

        if bytes.len() != 10 || bytes[4] != b'_' || bytes[7] != b'_' {
            return Err(invalid());
        }
        let digits_ok = bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !digits_ok {
            return Err(invalid());
        }

        let year: i32 = s[0..4].parse().map_err(|_| invalid())?;
        let month: u8 = s[5..7].parse().map_err(|_| invalid())?;
        let day: u8 = s[8..10].parse().map_err(|_| invalid())?;
        let month = Month::try_from(month).map_err(|_| invalid())?;
        let date = Date::from_calendar_date(year, month, day).map_err(|_| invalid())?;

        Ok(Self(date))
    }

    /// The calendar day this partition covers.
    pub fn date(&self) -> Date {
        self.0
    }
}

/// Map an instant to the partition that holds samples logged at that instant.
///
/// Call this once per logical "now" so a request straddling midnight does
/// not see two different days.
pub fn partition_for(instant: OffsetDateTime) -> PartitionKey {
    PartitionKey::for_instant(instant)
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}_{:02}_{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl FromStr for PartitionKey {
    type Err = ParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        Self::parse(s)
    }
}

impl Serialize for PartitionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PartitionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
