use coinlens_core::{CandleService, EnvelopeError, PortfolioResponse, SampleSource};

use crate::cli::PortfolioArgs;
use crate::error::CliError;
use crate::output::{format_percentage, format_price, format_signed_price, TableView};

use super::{source_chain, CommandResult};

pub async fn run<S: SampleSource>(
    args: &PortfolioArgs,
    service: &CandleService<S>,
) -> Result<CommandResult, CliError> {
    let response = service.portfolio(&args.investments).await;

    let errors = response
        .source_error
        .iter()
        .map(|error| EnvelopeError::from_source_error(error, service.source().id()))
        .collect();
    let data = serde_json::to_value(&response)?;

    Ok(
        CommandResult::ok(data, portfolio_table(&response), source_chain(response.provider))
            .with_warnings(response.warnings)
            .with_errors(errors)
            .with_degraded(response.degraded),
    )
}

fn portfolio_table(response: &PortfolioResponse) -> TableView {
    let valuation = &response.valuation;
    let rows = valuation
        .holdings
        .iter()
        .map(|holding| {
            vec![
                holding.symbol.clone(),
                format!("{:.6}", holding.amount),
                format_price(holding.invested),
                format_price(holding.current_value),
                format_signed_price(holding.profit_loss),
                format!("{:.1}%", holding.allocation_pct),
            ]
        })
        .collect();

    let title = format!(
        "invested {}  value {}  p/l {} ({})",
        format_price(valuation.total_invested),
        format_price(valuation.total_current),
        format_signed_price(valuation.profit_loss),
        format_percentage(valuation.profit_loss_pct)
    );

    TableView::new(
        title,
        &["coin", "amount", "invested", "value", "p/l", "allocation"],
        rows,
    )
}
