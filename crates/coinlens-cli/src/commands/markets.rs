use coinlens_core::{CandleService, EnvelopeError, MarketResponse, SampleSource};

use crate::error::CliError;
use crate::output::{format_large_number, format_percentage, format_price, TableView};

use super::{source_chain, CommandResult};

pub async fn run<S: SampleSource>(service: &CandleService<S>) -> Result<CommandResult, CliError> {
    let response = service.markets().await;

    let errors = response
        .source_error
        .iter()
        .map(|error| EnvelopeError::from_source_error(error, service.source().id()))
        .collect();
    let data = serde_json::to_value(&response)?;

    Ok(
        CommandResult::ok(data, market_table(&response), source_chain(response.provider))
            .with_warnings(response.warnings)
            .with_errors(errors)
            .with_degraded(response.degraded),
    )
}

fn market_table(response: &MarketResponse) -> TableView {
    let rows = response
        .coins
        .iter()
        .map(|coin| {
            vec![
                coin.rank.map_or_else(|| String::from("-"), |rank| rank.to_string()),
                format!("{} ({})", coin.name, coin.symbol),
                format_price(coin.price),
                coin.change_24h
                    .map_or_else(|| String::from("-"), format_percentage),
                format_large_number(coin.market_cap),
                format_large_number(coin.volume_24h),
                coin.ath_distance()
                    .map_or_else(|| String::from("-"), format_percentage),
            ]
        })
        .collect();

    let stats = &response.stats;
    let title = format!(
        "market cap {}  volume 24h {}  btc dominance {:.1}%",
        format_large_number(stats.total_market_cap),
        format_large_number(stats.total_volume_24h),
        stats.btc_dominance
    );

    TableView::new(
        title,
        &["#", "coin", "price", "24h", "market cap", "volume 24h", "from ath"],
        rows,
    )
}
