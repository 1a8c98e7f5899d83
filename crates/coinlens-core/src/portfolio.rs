//! Simulated holdings valued against the market overview.
//!
//! An [`Investment`] buys `usd` worth of a coin at an entry price. Buying a
//! coin already held adds to the existing [`Holding`]. [`Portfolio::value`]
//! prices every holding against [`MarketCoin`] rows.

use std::str::FromStr;

use serde::Serialize;

use crate::{CoinId, MarketCoin, ValidationError};

/// `coin=usd` or `coin=usd@entry_price`, as given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Investment {
    pub coin: CoinId,
    pub usd: f64,
    /// Price paid per coin; the current market price when absent.
    pub entry_price: Option<f64>,
}

impl FromStr for Investment {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidInvestment {
            value: value.trim().to_owned(),
        };

        let (coin, amounts) = value.trim().split_once('=').ok_or_else(invalid)?;
        let coin = CoinId::parse(coin)?;
        let (usd, entry_price) = match amounts.split_once('@') {
            Some((usd, price)) => (usd, Some(price)),
            None => (amounts, None),
        };

        let usd = positive(usd).ok_or_else(invalid)?;
        let entry_price = match entry_price {
            Some(price) => Some(positive(price).ok_or_else(invalid)?),
            None => None,
        };

        Ok(Self {
            coin,
            usd,
            entry_price,
        })
    }
}

fn positive(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite() && *parsed > 0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    pub coin: CoinId,
    /// Coins held.
    pub amount: f64,
    /// USD spent buying them.
    pub invested: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Portfolio {
    holdings: Vec<Holding>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buys `usd` worth of `coin` at `price`, merging into an existing holding.
    pub fn invest(&mut self, coin: CoinId, usd: f64, price: f64) -> Result<(), ValidationError> {
        if !(usd.is_finite() && usd > 0.0 && price.is_finite() && price > 0.0) {
            return Err(ValidationError::InvalidInvestment {
                value: format!("{coin}={usd}@{price}"),
            });
        }

        let amount = usd / price;
        match self.holdings.iter_mut().find(|holding| holding.coin == coin) {
            Some(holding) => {
                holding.amount += amount;
                holding.invested += usd;
            }
            None => self.holdings.push(Holding {
                coin,
                amount,
                invested: usd,
            }),
        }
        Ok(())
    }

    pub fn remove(&mut self, coin: &CoinId) -> Option<Holding> {
        let index = self.holdings.iter().position(|holding| &holding.coin == coin)?;
        Some(self.holdings.remove(index))
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Values each holding at its market price. Holdings with no market row
    /// are listed in `unpriced` and left out of every total.
    pub fn value(&self, market: &[MarketCoin]) -> PortfolioValuation {
        let mut holdings = Vec::with_capacity(self.holdings.len());
        let mut unpriced = Vec::new();

        for holding in &self.holdings {
            let Some(coin) = market.iter().find(|coin| coin.id == holding.coin) else {
                unpriced.push(holding.coin.clone());
                continue;
            };
            let current_value = holding.amount * coin.price;
            holdings.push(HoldingValue {
                coin: holding.coin.clone(),
                symbol: coin.symbol.clone(),
                amount: holding.amount,
                invested: holding.invested,
                current_value,
                profit_loss: current_value - holding.invested,
                allocation_pct: 0.0,
            });
        }

        let total_invested: f64 = holdings.iter().map(|holding| holding.invested).sum();
        let total_current: f64 = holdings.iter().map(|holding| holding.current_value).sum();
        if total_current > 0.0 {
            for holding in &mut holdings {
                holding.allocation_pct = holding.current_value / total_current * 100.0;
            }
        }

        let profit_loss = total_current - total_invested;
        let profit_loss_pct = if total_invested > 0.0 {
            profit_loss / total_invested * 100.0
        } else {
            0.0
        };

        PortfolioValuation {
            holdings,
            total_invested,
            total_current,
            profit_loss,
            profit_loss_pct,
            unpriced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingValue {
    pub coin: CoinId,
    pub symbol: String,
    pub amount: f64,
    pub invested: f64,
    pub current_value: f64,
    pub profit_loss: f64,
    /// Share of the portfolio's current value, in percent.
    pub allocation_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioValuation {
    pub holdings: Vec<HoldingValue>,
    pub total_invested: f64,
    pub total_current: f64,
    pub profit_loss: f64,
    pub profit_loss_pct: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unpriced: Vec<CoinId>,
}
