use serde::{Deserialize, Serialize};

use crate::{CoinId, UtcDateTime};

/// Raw price observation as delivered by a sample source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: UtcDateTime,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Sample {
    pub fn new(timestamp: UtcDateTime, price: f64, volume: Option<f64>) -> Self {
        Self {
            timestamp,
            price,
            volume,
        }
    }

    /// Whether every numeric field is finite.
    pub fn is_well_formed(&self) -> bool {
        self.price.is_finite() && self.volume.map_or(true, f64::is_finite)
    }
}

/// OHLCV bar anchored at the start of its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub bucket_start: UtcDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Candle whose four prices are the same observation.
    pub fn zero_width(timestamp: UtcDateTime, price: f64, volume: f64) -> Self {
        Self {
            bucket_start: timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }

    /// `low <= open, close <= high` and non-negative volume.
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
            && self.volume >= 0.0
    }

    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

/// Time-ordered sequence of candles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandleSeries(Vec<Candle>);

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self(candles)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.0.last()
    }

    pub fn into_vec(self) -> Vec<Candle> {
        self.0
    }

    pub fn total_volume(&self) -> f64 {
        self.0.iter().map(|candle| candle.volume).sum()
    }

    pub fn is_time_ordered(&self) -> bool {
        self.0
            .windows(2)
            .all(|pair| pair[0].bucket_start <= pair[1].bucket_start)
    }
}

impl From<Vec<Candle>> for CandleSeries {
    fn from(value: Vec<Candle>) -> Self {
        Self(value)
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for CandleSeries {
    type Item = Candle;
    type IntoIter = std::vec::IntoIter<Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Row of the market overview table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketCoin {
    pub id: CoinId,
    pub name: String,
    pub symbol: String,
    pub image: String,
    pub rank: Option<u32>,
    pub price: f64,
    pub change_24h: Option<f64>,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub ath: Option<f64>,
}

impl MarketCoin {
    /// Percent below (negative) or above the all-time high.
    pub fn ath_distance(&self) -> Option<f64> {
        self.ath
            .filter(|ath| ath.is_finite() && *ath > 0.0)
            .map(|ath| (self.price / ath - 1.0) * 100.0)
    }
}

/// Aggregate figures shown above the market table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub total_market_cap: f64,
    pub total_volume_24h: f64,
    /// Bitcoin's share of the listed market cap, in percent.
    pub btc_dominance: f64,
}

impl MarketStats {
    pub fn from_coins(coins: &[MarketCoin]) -> Self {
        let total_market_cap: f64 = coins.iter().map(|coin| coin.market_cap).sum();
        let total_volume_24h: f64 = coins.iter().map(|coin| coin.volume_24h).sum();
        let btc_market_cap = coins
            .iter()
            .find(|coin| coin.id.as_str() == "bitcoin")
            .map_or(0.0, |coin| coin.market_cap);

        let btc_dominance = if total_market_cap > 0.0 {
            btc_market_cap / total_market_cap * 100.0
        } else {
            0.0
        };

        Self {
            total_market_cap,
            total_volume_24h,
            btc_dominance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(input: &str) -> UtcDateTime {
        UtcDateTime::parse(input).expect("timestamp")
    }

    #[test]
    fn flags_non_finite_samples() {
        let at = ts("2024-01-01T00:00:00Z");
        assert!(Sample::new(at, 10.0, None).is_well_formed());
        assert!(!Sample::new(at, f64::NAN, Some(1.0)).is_well_formed());
        assert!(!Sample::new(at, 10.0, Some(f64::INFINITY)).is_well_formed());
    }

    #[test]
    fn series_serializes_as_plain_array() {
        let series = CandleSeries::new(vec![Candle::zero_width(
            ts("2024-01-01T00:00:00Z"),
            5.0,
            2.0,
        )]);
        let json = serde_json::to_value(&series).expect("serialize");
        assert!(json.is_array());
        assert_eq!(json[0]["bucket_start"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn market_stats_compute_btc_dominance() {
        let coin = |id: &str, cap: f64| MarketCoin {
            id: CoinId::parse(id).expect("valid id"),
            name: id.to_owned(),
            symbol: id.to_ascii_uppercase(),
            image: String::new(),
            rank: None,
            price: 1.0,
            change_24h: None,
            market_cap: cap,
            volume_24h: 10.0,
            high_24h: None,
            low_24h: None,
            ath: None,
        };

        let stats = MarketStats::from_coins(&[coin("bitcoin", 600.0), coin("ethereum", 400.0)]);
        assert_eq!(stats.total_market_cap, 1_000.0);
        assert_eq!(stats.total_volume_24h, 20.0);
        assert!((stats.btc_dominance - 60.0).abs() < 1e-9);

        assert_eq!(MarketStats::from_coins(&[]).btc_dominance, 0.0);
    }

    #[test]
    fn ath_distance_is_percent_from_the_peak() {
        let mut coin = MarketCoin {
            id: CoinId::parse("bitcoin").expect("valid id"),
            name: String::from("Bitcoin"),
            symbol: String::from("BTC"),
            image: String::new(),
            rank: Some(1),
            price: 63_040.0,
            change_24h: None,
            market_cap: 0.0,
            volume_24h: 0.0,
            high_24h: None,
            low_24h: None,
            ath: Some(126_080.0),
        };
        assert!((coin.ath_distance().expect("has ath") + 50.0).abs() < 1e-9);

        coin.ath = Some(0.0);
        assert_eq!(coin.ath_distance(), None);
        coin.ath = None;
        assert_eq!(coin.ath_distance(), None);
    }
}
