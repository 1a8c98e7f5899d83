use thiserror::Error;

/// Rejected input at a parse boundary: CLI arguments, env values, upstream
/// payload fields, envelope metadata.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("coin id cannot be empty")]
    EmptyCoinId,
    #[error("coin id is {len} characters long, at most {max} allowed")]
    CoinIdTooLong { len: usize, max: usize },
    #[error("coin id has '{ch}' at index {index}; only letters, digits, '-', '_' and '.' are allowed")]
    CoinIdInvalidChar { ch: char, index: usize },

    #[error("unknown timeframe '{value}' (1H, 4H, 1D, 1W or 1M)")]
    InvalidTimeframe { value: String },
    #[error("unknown chart style '{value}' (area, line or candle)")]
    InvalidChartStyle { value: String },

    #[error("'{value}' is not an RFC3339 timestamp in UTC ending in Z")]
    TimestampNotUtc { value: String },
    #[error("unix timestamp {value}ms cannot be represented")]
    TimestampOutOfRange { value: i64 },

    #[error("'{value}' is not a 3-letter lowercase currency code")]
    InvalidCurrency { value: String },

    #[error("'{value}' is not an investment; expected coin=usd or coin=usd@entry_price with positive amounts")]
    InvalidInvestment { value: String },

    #[error("request id is shorter than 8 characters")]
    InvalidRequestId,
    #[error("a response needs at least one source in its chain")]
    EmptySourceChain,
}
