use crate::{CoinId, MarketCoin};

struct SnapshotRow {
    id: &'static str,
    name: &'static str,
    symbol: &'static str,
    image: &'static str,
    price: f64,
    change_24h: f64,
    market_cap: f64,
    volume_24h: f64,
    high_24h: f64,
    low_24h: f64,
    ath: f64,
}

const SNAPSHOT: [SnapshotRow; 10] = [
    SnapshotRow {
        id: "bitcoin",
        name: "Bitcoin",
        symbol: "BTC",
        image: "https://coin-images.coingecko.com/coins/images/1/large/bitcoin.png",
        price: 81_237.0,
        change_24h: -2.09963,
        market_cap: 1_621_663_737_391.0,
        volume_24h: 56_510_685_937.0,
        high_24h: 84_368.0,
        low_24h: 80_898.0,
        ath: 126_080.0,
    },
    SnapshotRow {
        id: "ethereum",
        name: "Ethereum",
        symbol: "ETH",
        image: "https://coin-images.coingecko.com/coins/images/279/large/ethereum.png",
        price: 2_533.24,
        change_24h: -7.30263,
        market_cap: 305_120_886_868.0,
        volume_24h: 36_682_841_990.0,
        high_24h: 2_753.01,
        low_24h: 2_517.95,
        ath: 4_946.05,
    },
    SnapshotRow {
        id: "tether",
        name: "Tether",
        symbol: "USDT",
        image: "https://coin-images.coingecko.com/coins/images/325/large/Tether.png",
        price: 0.998583,
        change_24h: 0.00655,
        market_cap: 185_106_467_178.0,
        volume_24h: 101_686_029_463.0,
        high_24h: 0.998699,
        low_24h: 0.998257,
        ath: 1.32,
    },
    SnapshotRow {
        id: "binancecoin",
        name: "BNB",
        symbol: "BNB",
        image: "https://coin-images.coingecko.com/coins/images/825/large/bnb-icon2_2x.png",
        price: 809.83,
        change_24h: -4.89691,
        market_cap: 110_198_542_513.0,
        volume_24h: 1_860_709_175.0,
        high_24h: 859.25,
        low_24h: 806.57,
        ath: 1_369.99,
    },
    SnapshotRow {
        id: "ripple",
        name: "XRP",
        symbol: "XRP",
        image: "https://coin-images.coingecko.com/coins/images/44/large/xrp-symbol-white-128.png",
        price: 1.63,
        change_24h: -7.60609,
        market_cap: 98_999_386_079.0,
        volume_24h: 4_471_285_565.0,
        high_24h: 1.78,
        low_24h: 1.62,
        ath: 3.65,
    },
    SnapshotRow {
        id: "usd-coin",
        name: "USDC",
        symbol: "USDC",
        image: "https://coin-images.coingecko.com/coins/images/6319/large/USDC.png",
        price: 0.999722,
        change_24h: 0.00766,
        market_cap: 70_034_080_808.0,
        volume_24h: 11_947_927_261.0,
        high_24h: 0.999811,
        low_24h: 0.999521,
        ath: 1.17,
    },
    SnapshotRow {
        id: "solana",
        name: "Solana",
        symbol: "SOL",
        image: "https://coin-images.coingecko.com/coins/images/4128/large/solana.png",
        price: 108.92,
        change_24h: -6.46007,
        market_cap: 61_605_853_360.0,
        volume_24h: 6_508_111_283.0,
        high_24h: 118.61,
        low_24h: 108.81,
        ath: 293.31,
    },
    SnapshotRow {
        id: "tron",
        name: "TRON",
        symbol: "TRX",
        image: "https://coin-images.coingecko.com/coins/images/1094/large/tron-logo.png",
        price: 0.287611,
        change_24h: -1.37264,
        market_cap: 27_238_812_375.0,
        volume_24h: 746_975_023.0,
        high_24h: 0.294849,
        low_24h: 0.287585,
        ath: 0.431288,
    },
    SnapshotRow {
        id: "staked-ether",
        name: "Lido Staked Ether",
        symbol: "STETH",
        image: "https://coin-images.coingecko.com/coins/images/13442/large/steth_logo.png",
        price: 2_525.22,
        change_24h: -7.76628,
        market_cap: 24_127_356_650.0,
        volume_24h: 36_351_180.0,
        high_24h: 2_749.31,
        low_24h: 2_517.78,
        ath: 4_932.89,
    },
    SnapshotRow {
        id: "dogecoin",
        name: "Dogecoin",
        symbol: "DOGE",
        image: "https://coin-images.coingecko.com/coins/images/5/large/dogecoin.png",
        price: 0.106705,
        change_24h: -7.62512,
        market_cap: 17_976_182_266.0,
        volume_24h: 1_568_768_416.0,
        high_24h: 0.118269,
        low_24h: 0.106305,
        ath: 0.731578,
    },
];

/// Built-in market overview of ten large-cap coins, ordered by market cap.
///
/// Served when the upstream markets call fails, and by sources running on an
/// offline transport.
pub fn market_snapshot() -> Vec<MarketCoin> {
    SNAPSHOT
        .iter()
        .zip(1_u32..)
        .filter_map(|(row, rank)| {
            let id = CoinId::parse(row.id).ok()?;
            Some(MarketCoin {
                id,
                name: row.name.to_owned(),
                symbol: row.symbol.to_owned(),
                image: row.image.to_owned(),
                rank: Some(rank),
                price: row.price,
                change_24h: Some(row.change_24h),
                market_cap: row.market_cap,
                volume_24h: row.volume_24h,
                high_24h: Some(row.high_24h),
                low_24h: Some(row.low_24h),
                ath: Some(row.ath),
            })
        })
        .collect()
}

/// Snapshot price for `coin`, if the snapshot lists it.
pub fn snapshot_price(coin: &CoinId) -> Option<f64> {
    SNAPSHOT
        .iter()
        .find(|row| row.id == coin.as_str())
        .map(|row| row.price)
}
