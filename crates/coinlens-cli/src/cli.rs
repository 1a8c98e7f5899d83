//! CLI argument definitions for coinlens.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `candles` | Chart-ready candles for one coin and timeframe |
//! | `markets` | Market overview of the largest coins |
//! | `timeframes` | Bucket width, point budget and lookback per timeframe |
//! | `portfolio` | Simulated holdings valued at market prices |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Fail when the result is degraded |
//! | `--timeout-ms` | `COINLENS_REQUEST_TIMEOUT_MS` or `3000` | Source timeout in ms |
//! | `--offline` | `COINLENS_OFFLINE` | Serve deterministic data without network access |
//! | `-v`, `--verbose` | warnings only | Repeat for more log detail on stderr (`RUST_LOG` wins) |
//!
//! # Examples
//!
//! ```bash
//! coinlens candles bitcoin --timeframe 4H --pretty
//! coinlens markets --format table
//! coinlens candles ethereum --offline --seed 7 --strict
//! coinlens portfolio bitcoin=1000@60000 ethereum=500 --format table
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use coinlens_core::{Investment, Timeframe};

/// Candle charts and market overview for crypto assets.
#[derive(Debug, Parser)]
#[command(
    name = "coinlens",
    author,
    version,
    about = "Crypto candle charts that degrade gracefully",
    long_about = "coinlens fetches price samples from CoinGecko, aggregates them into \
bounded OHLCV candles per timeframe, and falls back to synthetic candles when the \
upstream API is unavailable, rate limited or slow."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat degraded results as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Source timeout budget in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Serve deterministic offline data instead of calling CoinGecko.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Log more on stderr: -v for info, -vv for debug.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON envelope.
    Json,
    /// Aligned text table for terminal display.
    Table,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch chart candles for a coin.
    Candles(CandlesArgs),
    /// Show the market overview.
    Markets,
    /// List supported timeframes and their limits.
    Timeframes,
    /// Value simulated investments at current market prices.
    Portfolio(PortfolioArgs),
}

impl Command {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Candles(_) => "candles",
            Self::Markets => "markets",
            Self::Timeframes => "timeframes",
            Self::Portfolio(_) => "portfolio",
        }
    }
}

#[derive(Debug, Args)]
pub struct CandlesArgs {
    /// Coin id as used by CoinGecko (e.g. bitcoin, usd-coin).
    pub coin: String,

    /// Chart timeframe: 1H, 4H, 1D, 1W or 1M.
    #[arg(long, short = 't', default_value_t = Timeframe::OneDay)]
    pub timeframe: Timeframe,

    /// Current price used to anchor synthetic candles.
    #[arg(long)]
    pub reference_price: Option<f64>,

    /// Seed for reproducible synthetic candles.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Args)]
pub struct PortfolioArgs {
    /// Investments as coin=usd, or coin=usd@entry_price to buy at a past
    /// price. Repeating a coin adds to the holding.
    #[arg(required = true, num_args = 1.., value_name = "COIN=USD[@PRICE]")]
    pub investments: Vec<Investment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_candles_with_defaults() {
        let cli = Cli::try_parse_from(["coinlens", "candles", "bitcoin"]).expect("valid args");

        assert_eq!(cli.format, OutputFormat::Json);
        assert!(!cli.strict);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.command.name(), "candles");
        let Command::Candles(args) = cli.command else {
            panic!("expected candles command");
        };
        assert_eq!(args.coin, "bitcoin");
        assert_eq!(args.timeframe, Timeframe::OneDay);
        assert_eq!(args.seed, None);
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "coinlens",
            "candles",
            "ethereum",
            "--timeframe",
            "4h",
            "--format",
            "table",
            "--offline",
            "--timeout-ms",
            "500",
            "-vv",
        ])
        .expect("valid args");

        assert_eq!(cli.format, OutputFormat::Table);
        assert!(cli.offline);
        assert_eq!(cli.timeout_ms, Some(500));
        assert_eq!(cli.verbose, 2);
        let Command::Candles(args) = cli.command else {
            panic!("expected candles command");
        };
        assert_eq!(args.timeframe, Timeframe::FourHours);
    }

    #[test]
    fn parses_portfolio_investments() {
        let cli = Cli::try_parse_from(["coinlens", "portfolio", "bitcoin=1000@60000", "ethereum=500"])
            .expect("valid args");

        assert_eq!(cli.command.name(), "portfolio");
        let Command::Portfolio(args) = cli.command else {
            panic!("expected portfolio command");
        };
        assert_eq!(args.investments.len(), 2);
        assert_eq!(args.investments[0].entry_price, Some(60_000.0));
        assert_eq!(args.investments[1].usd, 500.0);

        assert!(Cli::try_parse_from(["coinlens", "portfolio"]).is_err());
        assert!(Cli::try_parse_from(["coinlens", "portfolio", "bitcoin=-1"]).is_err());
    }

    #[test]
    fn rejects_unknown_timeframe() {
        let result = Cli::try_parse_from(["coinlens", "candles", "bitcoin", "--timeframe", "2H"]);
        assert!(result.is_err());
    }
}
