//! Placeholder candles for providers that only return a current quote.
//!
//! The series runs from the previous close to the current price along a linear
//! trend, with two sine cycles and bounded noise layered on top. Interior
//! points are floored at half the previous close and smoothed with a moving
//! average. The first open is the previous close and the last close is the
//! current price, exactly. Quotes carrying these candles are tagged
//! `is_real_data = false`.

use chrono::{DateTime, Duration, Utc};
use num_traits::{FromPrimitive, ToPrimitive};
use rand::Rng;
use rust_decimal::Decimal;

use crate::models::{Candle, Timeframe};

/// Synthesize candles for `timeframe`, the last one ending at `end`.
pub fn synthesize_candles<R: Rng + ?Sized>(
    previous_close: Decimal,
    current_price: Decimal,
    timeframe: Timeframe,
    end: DateTime<Utc>,
    rng: &mut R,
) -> Vec<Candle> {
    let profile = timeframe.synthetic_profile();
    let count = profile.count.max(1);
    let volatility = profile.volatility;

    // An unknown previous close anchors on the current price
    let previous_close = if previous_close > Decimal::ZERO {
        previous_close
    } else {
        current_price
    };
    let start = previous_close.to_f64().unwrap_or(0.0);
    let target = current_price.to_f64().unwrap_or(0.0);
    let floor = (start * 0.5).max(0.01);

    // count + 1 path points: point i opens candle i, point i + 1 closes it
    let mut interior: Vec<f64> = (1..count)
        .map(|i| {
            let progress = i as f64 / count as f64;
            let trend = start + (target - start) * progress;
            let x = i as f64;
            let cycle1 = (x * 0.1 / volatility).sin() * start * volatility * 0.5;
            let cycle2 = (x * 0.3 / volatility).sin() * start * volatility * 0.3;
            let noise = rng.gen_range(-1.0..=1.0) * start * volatility;
            (trend + cycle1 + cycle2 + noise).max(floor)
        })
        .collect();
    smooth(&mut interior, (count / 20).max(1));

    let mut path: Vec<Decimal> = Vec::with_capacity(count + 1);
    path.push(previous_close);
    path.extend(interior.into_iter().map(to_cents));
    path.push(current_price);

    let interval = Duration::minutes(profile.interval_minutes);
    let base_volume = 500_000.0 * (1.0 + profile.lookback_hours as f64 / 10.0);

    (0..count)
        .map(|i| {
            let open = path[i];
            let close = path[i + 1];
            let spread = open.abs().to_f64().unwrap_or(0.0) * volatility * rng.gen_range(0.5..1.5);
            let range = to_cents(spread);
            let high = open.max(close) + range;
            let low = (open.min(close) - range).max(Decimal::ZERO);
            let volume = (base_volume * rng.gen_range(0.5..2.0)) as u64;
            let time = end - interval * (count - 1 - i) as i32;
            Candle::new(time, open, high, low, close, volume)
        })
        .collect()
}

/// Trailing moving average in place.
fn smooth(values: &mut [f64], window: usize) {
    if window <= 1 || values.is_empty() {
        return;
    }
    let original = values.to_vec();
    for (i, value) in values.iter_mut().enumerate() {
        let from = i.saturating_sub(window - 1);
        let slice = &original[from..=i];
        *value = slice.iter().sum::<f64>() / slice.len() as f64;
    }
}

fn to_cents(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
}
