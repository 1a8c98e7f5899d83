use crate::{Candle, CandleSeries, Timeframe, UtcDateTime};

/// Baseline used when the caller has no usable reference price.
pub const DEFAULT_BASELINE_PRICE: f64 = 100.0;

/// Half-width of the multiplicative close perturbation.
const PRICE_SWING: f64 = 0.05;
const OPEN_DISCOUNT: f64 = 0.99;
const HIGH_PREMIUM: f64 = 1.02;
const LOW_DISCOUNT: f64 = 0.98;
const VOLUME_FLOOR: f64 = 500_000_000.0;
const VOLUME_SPAN: f64 = 1_000_000_000.0;

/// Builds a plausible candle series of exactly `max_points` candles ending at
/// `now`, spaced at the timeframe's nominal cadence, oldest first.
///
/// All randomness comes from `rng`, so a seeded generator reproduces the same
/// series for the same inputs.
pub fn synthetic_series(
    timeframe: Timeframe,
    reference_price: Option<f64>,
    now: UtcDateTime,
    rng: &mut fastrand::Rng,
) -> CandleSeries {
    let baseline = reference_price
        .filter(|price| price.is_finite() && *price > 0.0)
        .unwrap_or(DEFAULT_BASELINE_PRICE);
    let max_points = timeframe.policy().max_points;
    let cadence = timeframe.cadence();

    let candles = (0..max_points)
        .rev()
        .map(|steps| {
            let bucket_start = cadence.steps_back(now, steps as u32);
            let implied = baseline * (1.0 + (rng.f64() * 2.0 - 1.0) * PRICE_SWING);
            Candle {
                bucket_start,
                open: implied * OPEN_DISCOUNT,
                high: implied * HIGH_PREMIUM,
                low: implied * LOW_DISCOUNT,
                close: implied,
                volume: VOLUME_FLOOR + rng.f64() * VOLUME_SPAN,
            }
        })
        .collect();

    CandleSeries::new(candles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> UtcDateTime {
        UtcDateTime::parse("2024-06-15T12:00:00Z").expect("timestamp")
    }

    #[test]
    fn produces_max_points_well_formed_candles_for_every_timeframe() {
        let mut rng = fastrand::Rng::with_seed(7);

        for timeframe in Timeframe::ALL {
            let series = synthetic_series(timeframe, Some(81_237.0), now(), &mut rng);

            assert_eq!(series.len(), timeframe.policy().max_points, "{timeframe}");
            assert!(series.is_time_ordered(), "{timeframe}");
            assert!(series.iter().all(Candle::is_consistent), "{timeframe}");
            assert_eq!(series.last().map(|c| c.bucket_start), Some(now()));
        }
    }

    #[test]
    fn daily_candles_are_one_day_apart() {
        let mut rng = fastrand::Rng::with_seed(1);
        let series = synthetic_series(Timeframe::OneDay, None, now(), &mut rng);
        let candles = series.as_slice();

        assert_eq!(
            candles[0].bucket_start.format_rfc3339(),
            "2024-05-17T12:00:00Z"
        );
        for pair in candles.windows(2) {
            assert_eq!(pair[1].bucket_start.since(pair[0].bucket_start), time::Duration::days(1));
        }
    }

    #[test]
    fn monthly_candles_step_by_calendar_month() {
        let mut rng = fastrand::Rng::with_seed(1);
        let series = synthetic_series(Timeframe::OneMonth, None, now(), &mut rng);

        assert_eq!(
            series.first().map(|c| c.bucket_start.format_rfc3339()),
            Some(String::from("2023-07-15T12:00:00Z"))
        );
    }

    #[test]
    fn same_seed_reproduces_the_series() {
        let first = synthetic_series(
            Timeframe::FourHours,
            Some(2_533.24),
            now(),
            &mut fastrand::Rng::with_seed(99),
        );
        let second = synthetic_series(
            Timeframe::FourHours,
            Some(2_533.24),
            now(),
            &mut fastrand::Rng::with_seed(99),
        );
        assert_eq!(first, second);
    }

    #[test]
    fn closes_stay_within_five_percent_of_baseline() {
        let mut rng = fastrand::Rng::with_seed(3);
        let series = synthetic_series(Timeframe::OneHour, Some(200.0), now(), &mut rng);

        for candle in &series {
            assert!(candle.close >= 190.0 && candle.close <= 210.0);
            assert!(candle.volume >= VOLUME_FLOOR && candle.volume < VOLUME_FLOOR + VOLUME_SPAN);
        }
    }

    #[test]
    fn unusable_reference_price_falls_back_to_default_baseline() {
        let mut rng = fastrand::Rng::with_seed(5);

        for reference in [Some(f64::NAN), Some(-3.0), Some(0.0), None] {
            let series = synthetic_series(Timeframe::OneWeek, reference, now(), &mut rng);
            assert!(series.iter().all(|candle| {
                candle.close >= DEFAULT_BASELINE_PRICE * 0.95
                    && candle.close <= DEFAULT_BASELINE_PRICE * 1.05
            }));
        }
    }
}
