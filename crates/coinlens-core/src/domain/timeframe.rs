use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{UtcDateTime, ValidationError};

/// Display resolution selectable on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1H")]
    OneHour,
    #[serde(rename = "4H")]
    FourHours,
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
}

/// Bucket width, point budget and lookback window for one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeframePolicy {
    pub bucket_duration: Duration,
    pub max_points: usize,
    pub lookback_days: u32,
}

/// Nominal spacing of synthetic candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Fixed(Duration),
    CalendarMonth,
}

impl Cadence {
    /// Timestamp `steps` cadence units before `now`.
    pub fn steps_back(self, now: UtcDateTime, steps: u32) -> UtcDateTime {
        match self {
            Self::Fixed(unit) => now.saturating_sub(unit * steps),
            Self::CalendarMonth => now.saturating_sub_months(steps),
        }
    }
}

impl Timeframe {
    pub const ALL: [Self; 5] = [
        Self::OneHour,
        Self::FourHours,
        Self::OneDay,
        Self::OneWeek,
        Self::OneMonth,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneHour => "1H",
            Self::FourHours => "4H",
            Self::OneDay => "1D",
            Self::OneWeek => "1W",
            Self::OneMonth => "1M",
        }
    }

    pub const fn policy(self) -> TimeframePolicy {
        let (minutes, max_points, lookback_days) = match self {
            Self::OneHour => (60, 24, 1),
            Self::FourHours => (240, 42, 7),
            Self::OneDay => (1_440, 30, 30),
            Self::OneWeek => (10_080, 12, 90),
            Self::OneMonth => (43_200, 12, 365),
        };

        TimeframePolicy {
            bucket_duration: Duration::minutes(minutes),
            max_points,
            lookback_days,
        }
    }

    pub const fn cadence(self) -> Cadence {
        match self {
            Self::OneHour => Cadence::Fixed(Duration::hours(1)),
            Self::FourHours => Cadence::Fixed(Duration::hours(4)),
            Self::OneDay => Cadence::Fixed(Duration::days(1)),
            Self::OneWeek => Cadence::Fixed(Duration::days(7)),
            Self::OneMonth => Cadence::CalendarMonth,
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::OneDay
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "1H" => Ok(Self::OneHour),
            "4H" => Ok(Self::FourHours),
            "1D" => Ok(Self::OneDay),
            "1W" => Ok(Self::OneWeek),
            "1M" => Ok(Self::OneMonth),
            _ => Err(ValidationError::InvalidTimeframe {
                value: value.trim().to_owned(),
            }),
        }
    }
}

/// How the caller renders a candle series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartStyle {
    Area,
    Line,
    Candle,
}

impl ChartStyle {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Area => "area",
            Self::Line => "line",
            Self::Candle => "candle",
        }
    }
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self::Area
    }
}

impl Display for ChartStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartStyle {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "area" => Ok(Self::Area),
            "line" => Ok(Self::Line),
            "candle" => Ok(Self::Candle),
            _ => Err(ValidationError::InvalidChartStyle {
                value: value.trim().to_owned(),
            }),
        }
    }
}
