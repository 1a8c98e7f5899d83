//! # Domain Models
//!
//! Canonical domain types for coinlens market data.
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Sample`] | Raw timestamped price/volume observation |
//! | [`Candle`] | OHLCV bar anchored at its bucket start |
//! | [`CandleSeries`] | Time-ordered candles for one request |
//! | [`Timeframe`] | Display resolution (1H, 4H, 1D, 1W, 1M) |
//! | [`TimeframePolicy`] | Bucket width, point budget, lookback window |
//! | [`ChartStyle`] | Area, line or candle rendering |
//! | [`MarketCoin`] | Market overview row |
//! | [`MarketStats`] | Totals derived from the market overview |
//! | [`CoinId`] | Validated instrument identifier |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Samples are validated loosely (the candle builder drops non-finite ones);
//! identifiers and timestamps are validated at construction time.

mod coin_id;
mod models;
mod timeframe;
mod timestamp;

pub use coin_id::CoinId;
pub use models::{Candle, CandleSeries, MarketCoin, MarketStats, Sample};
pub use timeframe::{Cadence, ChartStyle, Timeframe, TimeframePolicy};
pub use timestamp::UtcDateTime;
