//! Candle aggregation engine.
//!
//! Pure, synchronous stages that turn raw samples into a bounded candle series:
//!
//! ```text
//! samples ──▶ build_candles ──▶ aggregate ──▶ bound ──▶ CandleSeries
//!                                                  ▲
//! (no usable samples) ──▶ synthetic_series ────────┘
//! ```
//!
//! None of these functions perform I/O or keep state between calls.

pub mod aggregator;
pub mod bounder;
pub mod builder;
pub mod synthetic;

pub use aggregator::aggregate;
pub use bounder::bound;
pub use builder::{build_candles, BuildReport};
pub use synthetic::{synthetic_series, DEFAULT_BASELINE_PRICE};

use tracing::debug;

use crate::{CandleSeries, Sample, Timeframe};

/// Result of running real samples through every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub candles: CandleSeries,
    pub skipped: usize,
}

/// Runs build, aggregate and bound for one timeframe.
pub fn candles_from_samples(samples: &[Sample], timeframe: Timeframe) -> PipelineOutput {
    let policy = timeframe.policy();
    let report = build_candles(samples);
    let aggregated = aggregate(&report.candles, timeframe);
    let bucket_count = aggregated.len();
    let candles = bound(aggregated, policy.max_points);

    debug!(
        %timeframe,
        samples = samples.len(),
        skipped = report.skipped,
        buckets = bucket_count,
        kept = candles.len(),
        "aggregated samples into candles"
    );

    PipelineOutput {
        candles,
        skipped: report.skipped,
    }
}
