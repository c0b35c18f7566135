use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Chart timeframe requested by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    OneMinute,
    TwoMinutes,
    #[default]
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    NinetyMinutes,
    OneHour,
    FourHours,
    OneDay,
    OneWeek,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    YearToDate,
    Max,
}

/// Broker history request parameters for a timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarSpec {
    pub duration: &'static str,
    pub bar_size: &'static str,
}

/// Shape of a synthesized placeholder series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticProfile {
    pub count: usize,
    pub interval_minutes: i64,
    pub lookback_hours: i64,
    pub volatility: f64,
}

impl Timeframe {
    pub const ALL: [Timeframe; 19] = [
        Timeframe::OneMinute,
        Timeframe::TwoMinutes,
        Timeframe::FiveMinutes,
        Timeframe::FifteenMinutes,
        Timeframe::ThirtyMinutes,
        Timeframe::NinetyMinutes,
        Timeframe::OneHour,
        Timeframe::FourHours,
        Timeframe::OneDay,
        Timeframe::OneWeek,
        Timeframe::OneMonth,
        Timeframe::ThreeMonths,
        Timeframe::SixMonths,
        Timeframe::OneYear,
        Timeframe::TwoYears,
        Timeframe::FiveYears,
        Timeframe::TenYears,
        Timeframe::YearToDate,
        Timeframe::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneMinute => "1m",
            Timeframe::TwoMinutes => "2m",
            Timeframe::FiveMinutes => "5m",
            Timeframe::FifteenMinutes => "15m",
            Timeframe::ThirtyMinutes => "30m",
            Timeframe::NinetyMinutes => "90m",
            Timeframe::OneHour => "1h",
            Timeframe::FourHours => "4h",
            Timeframe::OneDay => "24h",
            Timeframe::OneWeek => "1week",
            Timeframe::OneMonth => "1month",
            Timeframe::ThreeMonths => "3month",
            Timeframe::SixMonths => "6month",
            Timeframe::OneYear => "1year",
            Timeframe::TwoYears => "2year",
            Timeframe::FiveYears => "5year",
            Timeframe::TenYears => "10year",
            Timeframe::YearToDate => "ytd",
            Timeframe::Max => "max",
        }
    }

    /// Broker `(duration, bar size)` pair.
    pub fn bar_spec(&self) -> BarSpec {
        let (duration, bar_size) = match self {
            Timeframe::OneMinute => ("2 D", "1 min"),
            Timeframe::TwoMinutes => ("2 D", "2 mins"),
            Timeframe::FiveMinutes => ("2 D", "5 mins"),
            Timeframe::FifteenMinutes => ("2 D", "15 mins"),
            Timeframe::ThirtyMinutes => ("2 D", "30 mins"),
            // The gateway has no 90 minute bar
            Timeframe::NinetyMinutes => ("2 D", "1 hour"),
            Timeframe::OneHour => ("2 D", "1 hour"),
            Timeframe::FourHours => ("1 W", "4 hours"),
            Timeframe::OneDay => ("2 D", "1 hour"),
            Timeframe::OneWeek => ("1 W", "1 day"),
            Timeframe::OneMonth => ("1 M", "1 day"),
            Timeframe::ThreeMonths => ("3 M", "1 day"),
            Timeframe::SixMonths => ("6 M", "1 day"),
            Timeframe::OneYear | Timeframe::YearToDate => ("1 Y", "1 day"),
            Timeframe::TwoYears => ("2 Y", "1 day"),
            Timeframe::FiveYears => ("5 Y", "1 day"),
            Timeframe::TenYears | Timeframe::Max => ("10 Y", "1 day"),
        };
        BarSpec { duration, bar_size }
    }

    pub fn synthetic_profile(&self) -> SyntheticProfile {
        let (count, interval_minutes, lookback_hours, volatility) = match self {
            Timeframe::OneMinute => (60, 1, 1, 0.003),
            Timeframe::TwoMinutes => (60, 2, 1, 0.004),
            Timeframe::FiveMinutes => (60, 5, 5, 0.008),
            Timeframe::FifteenMinutes => (60, 15, 5, 0.01),
            Timeframe::ThirtyMinutes => (60, 30, 5, 0.012),
            Timeframe::NinetyMinutes => (60, 90, 5, 0.015),
            Timeframe::OneHour => (24, 60, 24, 0.02),
            Timeframe::FourHours => (42, 240, 168, 0.03),
            Timeframe::OneDay => (30, 1440, 720, 0.05),
            Timeframe::OneWeek => (52, 10080, 8736, 0.06),
            Timeframe::OneMonth => (30, 43200, 21600, 0.08),
            Timeframe::ThreeMonths => (20, 129600, 51840, 0.1),
            Timeframe::SixMonths => (60, 43200, 43200, 0.12),
            Timeframe::OneYear | Timeframe::YearToDate => (252, 1440, 8760, 0.15),
            Timeframe::TwoYears => (504, 1440, 17520, 0.18),
            Timeframe::FiveYears => (1260, 1440, 43800, 0.2),
            Timeframe::TenYears => (2520, 1440, 87600, 0.25),
            Timeframe::Max => (5000, 1440, 438000, 0.3),
        };
        SyntheticProfile {
            count,
            interval_minutes,
            lookback_hours,
            volatility,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Timeframe::ALL
            .iter()
            .copied()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MarketDataError::InvalidTimeframe(s.to_string()))
    }
}

impl TryFrom<String> for Timeframe {
    type Error = MarketDataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(value: Timeframe) -> Self {
        value.as_str().to_string()
    }
}
