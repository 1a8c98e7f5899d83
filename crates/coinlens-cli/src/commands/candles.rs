use coinlens_core::{CandleResponse, CandleService, CoinId, EnvelopeError, SampleSource};

use crate::cli::CandlesArgs;
use crate::error::CliError;
use crate::output::{format_large_number, format_price, format_time, TableView};

use super::{source_chain, CommandResult};

pub async fn run<S: SampleSource>(
    args: &CandlesArgs,
    service: &CandleService<S>,
) -> Result<CommandResult, CliError> {
    let coin = CoinId::parse(&args.coin)?;
    let response = service
        .get_candles_with_reference(&coin, args.timeframe, args.reference_price)
        .await;

    let errors = response
        .source_error
        .iter()
        .map(|error| EnvelopeError::from_source_error(error, service.source().id()))
        .collect();
    let data = serde_json::to_value(&response)?;

    Ok(
        CommandResult::ok(data, candle_table(&response), source_chain(response.provider))
            .with_warnings(response.warnings)
            .with_errors(errors)
            .with_degraded(response.degraded),
    )
}

fn candle_table(response: &CandleResponse) -> TableView {
    let rows = response
        .candles
        .iter()
        .map(|candle| {
            vec![
                format_time(candle.bucket_start),
                format_price(candle.open),
                format_price(candle.high),
                format_price(candle.low),
                format_price(candle.close),
                format_large_number(candle.volume),
            ]
        })
        .collect();

    TableView::new(
        format!("{} {}", response.coin, response.timeframe),
        &["time", "open", "high", "low", "close", "volume"],
        rows,
    )
}
