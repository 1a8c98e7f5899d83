use crate::CandleSeries;

/// Keeps the most recent `max_points` candles, oldest overflow first out.
/// Shorter series are returned as they are; nothing is padded.
pub fn bound(series: CandleSeries, max_points: usize) -> CandleSeries {
    if series.len() <= max_points {
        return series;
    }

    let mut candles = series.into_vec();
    let overflow = candles.len() - max_points;
    candles.drain(..overflow);
    CandleSeries::new(candles)
}
