use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::{Duration, Month, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::ValidationError;

/// Instant in UTC. Serialized as RFC3339 with a `Z` suffix; other offsets are
/// rejected on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    /// Earliest representable instant.
    pub const EARLIEST: Self = Self(PrimitiveDateTime::MIN.assume_utc());

    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match OffsetDateTime::parse(input, &Rfc3339) {
            Ok(parsed) if parsed.offset() == UtcOffset::UTC => Ok(Self(parsed)),
            _ => Err(ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }),
        }
    }

    /// Builds a timestamp from milliseconds since the Unix epoch, the unit
    /// CoinGecko uses in chart payloads.
    pub fn from_unix_millis(millis: i64) -> Result<Self, ValidationError> {
        let nanos = i128::from(millis) * 1_000_000;
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map(Self)
            .map_err(|_| ValidationError::TimestampOutOfRange { value: millis })
    }

    pub fn unix_millis(self) -> i64 {
        (self.0.unix_timestamp_nanos() / 1_000_000) as i64
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    /// Signed time elapsed from `earlier` to `self`.
    pub fn since(self, earlier: Self) -> Duration {
        self.0 - earlier.0
    }

    /// Adds `offset`, clamping at the representable range.
    pub fn saturating_add(self, offset: Duration) -> Self {
        Self(self.0.saturating_add(offset))
    }

    /// Subtracts `offset`, clamping at the representable range.
    pub fn saturating_sub(self, offset: Duration) -> Self {
        Self(self.0.saturating_sub(offset))
    }

    /// Steps back `months` calendar months, clamping the day of month to the
    /// length of the target month (Mar 31 minus one month is Feb 28/29) and
    /// the result to [`EARLIEST`](Self::EARLIEST).
    pub fn saturating_sub_months(self, months: u32) -> Self {
        let date = self.0.date();
        let total = i64::from(date.year()) * 12 + i64::from(u8::from(date.month()) - 1)
            - i64::from(months);
        let year = total.div_euclid(12);
        let month_index = total.rem_euclid(12) as u8;

        let Ok(year) = i32::try_from(year) else {
            return Self::EARLIEST;
        };
        let Ok(month) = Month::try_from(month_index + 1) else {
            return Self::EARLIEST;
        };
        let day = date.day().min(month.length(year));

        match time::Date::from_calendar_date(year, month, day) {
            Ok(target) => Self(self.0.replace_date(target)),
            Err(_) => Self::EARLIEST,
        }
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("<unformattable>"))
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl TryFrom<String> for UtcDateTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UtcDateTime> for String {
    fn from(value: UtcDateTime) -> Self {
        value.format_rfc3339()
    }
}
