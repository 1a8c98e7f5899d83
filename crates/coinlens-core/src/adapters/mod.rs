mod coingecko;

pub use coingecko::{CoinGeckoAdapter, DEFAULT_BASE_URL, DEMO_KEY_HEADER};
