//! US equity session classification in exchange-local (US/Eastern) time.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use chrono_tz::America::New_York;
use chrono_tz::Tz;
use serde::Serialize;

const PREMARKET_OPEN: u32 = 4 * 60;
const REGULAR_OPEN: u32 = 9 * 60 + 30;
const REGULAR_CLOSE: u32 = 16 * 60;
const LIQUIDATION_START: u32 = 15 * 60 + 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketSession {
    Closed,
    Premarket,
    Regular,
}

pub fn to_eastern(now: DateTime<Utc>) -> DateTime<Tz> {
    now.with_timezone(&New_York)
}

/// Calendar date on the exchange.
pub fn eastern_date(now: DateTime<Utc>) -> NaiveDate {
    to_eastern(now).date_naive()
}

fn minutes_into_trading_day(now: DateTime<Utc>) -> Option<u32> {
    let local = to_eastern(now);
    match local.weekday() {
        Weekday::Sat | Weekday::Sun => None,
        _ => Some(local.hour() * 60 + local.minute()),
    }
}

impl MarketSession {
    pub fn at(now: DateTime<Utc>) -> Self {
        match minutes_into_trading_day(now) {
            Some(m) if (PREMARKET_OPEN..REGULAR_OPEN).contains(&m) => MarketSession::Premarket,
            Some(m) if (REGULAR_OPEN..REGULAR_CLOSE).contains(&m) => MarketSession::Regular,
            _ => MarketSession::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, MarketSession::Closed)
    }
}

/// True from 15:50 until the 16:00 close on a weekday.
pub fn in_liquidation_window(now: DateTime<Utc>) -> bool {
    matches!(
        minutes_into_trading_day(now),
        Some(m) if (LIQUIDATION_START..REGULAR_CLOSE).contains(&m)
    )
}
