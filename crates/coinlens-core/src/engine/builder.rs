use tracing::warn;

use crate::{Candle, CandleSeries, Sample};

/// Zero-width candles built from raw samples, plus the number of samples
/// dropped for carrying non-finite values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub candles: CandleSeries,
    pub skipped: usize,
}

/// Turns samples into zero-width candles ordered by timestamp.
///
/// The input slice is left untouched. Samples are neither deduplicated nor
/// merged; only those with a NaN or infinite price/volume are dropped, since a
/// single NaN would poison every later `max`/`min` reduction.
pub fn build_candles(samples: &[Sample]) -> BuildReport {
    let mut candles = Vec::with_capacity(samples.len());
    let mut skipped = 0_usize;

    for sample in samples {
        if !sample.is_well_formed() {
            skipped += 1;
            continue;
        }
        candles.push(Candle::zero_width(
            sample.timestamp,
            sample.price,
            sample.volume.unwrap_or(0.0),
        ));
    }

    if skipped > 0 {
        warn!(skipped, total = samples.len(), "dropped malformed samples");
    }

    candles.sort_by_key(|candle| candle.bucket_start);

    BuildReport {
        candles: CandleSeries::new(candles),
        skipped,
    }
}
