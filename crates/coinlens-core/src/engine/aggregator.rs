use crate::{Candle, CandleSeries, Timeframe};

/// Groups candles into buckets of the timeframe's duration and reduces each
/// bucket to one OHLCV candle.
///
/// Buckets are anchored at the first candle of each group, not at wall-clock
/// boundaries: a group opens at some candle's timestamp and absorbs every later
/// candle that starts less than one bucket duration after it. The next candle
/// outside that window opens the following group. Sparse data can therefore
/// produce buckets whose anchors drift away from round hours or days.
pub fn aggregate(series: &CandleSeries, timeframe: Timeframe) -> CandleSeries {
    let bucket_duration = timeframe.policy().bucket_duration;

    let mut ordered = series.as_slice().to_vec();
    ordered.sort_by_key(|candle| candle.bucket_start);

    let mut output = Vec::new();
    let mut group_start = 0_usize;

    for index in 1..ordered.len() {
        let anchor = ordered[group_start].bucket_start;
        if ordered[index].bucket_start.since(anchor) >= bucket_duration {
            output.push(reduce_group(&ordered[group_start..index]));
            group_start = index;
        }
    }

    if group_start < ordered.len() {
        output.push(reduce_group(&ordered[group_start..]));
    }

    CandleSeries::new(output)
}

/// Collapses a non-empty, time-ordered group. Callers never pass an empty slice.
fn reduce_group(group: &[Candle]) -> Candle {
    let first = group[0];
    let last = group[group.len() - 1];

    let mut high = first.high;
    let mut low = first.low;
    let mut volume = 0.0_f64;
    for candle in group {
        high = high.max(candle.high);
        low = low.min(candle.low);
        volume += candle.volume;
    }

    Candle {
        bucket_start: first.bucket_start,
        open: first.close,
        high,
        low,
        close: last.close,
        volume,
    }
}
