mod candles;
mod markets;
mod portfolio;
mod timeframes;

use std::time::{Duration, Instant};

use coinlens_core::{
    CandleService, Envelope, EnvelopeError, EnvelopeMeta, ProviderId, SourceConfig,
};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::TableView;

pub struct CommandResult {
    pub data: Value,
    pub table: TableView,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub source_chain: Vec<ProviderId>,
    pub degraded: bool,
}

impl CommandResult {
    pub fn ok(data: Value, table: TableView, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            table,
            warnings: Vec::new(),
            errors: Vec::new(),
            source_chain,
            degraded: false,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_degraded(mut self, degraded: bool) -> Self {
        self.degraded = degraded;
        self
    }
}

/// Runs the selected command and wraps its result in an envelope.
pub async fn run(cli: &Cli) -> Result<(Envelope<Value>, TableView), CliError> {
    let started = Instant::now();
    let config = source_config(cli);

    let result = match &cli.command {
        Command::Candles(args) => {
            let mut service = CandleService::new(config.build_source())
                .with_timeout(config.request_timeout());
            if let Some(seed) = args.seed {
                service = service.with_seed(seed);
            }
            candles::run(args, &service).await?
        }
        Command::Markets => {
            let service = CandleService::new(config.build_source())
                .with_timeout(config.request_timeout());
            markets::run(&service).await?
        }
        Command::Timeframes => timeframes::run()?,
        Command::Portfolio(args) => {
            let service = CandleService::new(config.build_source())
                .with_timeout(config.request_timeout());
            portfolio::run(args, &service).await?
        }
    };

    let CommandResult {
        data,
        table,
        warnings,
        errors,
        source_chain,
        degraded,
    } = result;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let request_id = Uuid::new_v4().hyphenated().to_string();
    info!(
        command = cli.command.name(),
        %request_id,
        latency_ms,
        degraded,
        "command finished"
    );
    let meta = EnvelopeMeta::new(request_id, source_chain)?
        .with_latency_ms(latency_ms)
        .with_degraded(degraded)
        .with_warnings(warnings);

    let envelope = Envelope::new(meta, data).with_errors(errors);
    Ok((envelope, table))
}

fn source_config(cli: &Cli) -> SourceConfig {
    let mut config = SourceConfig::from_env();
    if cli.offline {
        config = config.with_offline(true);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_request_timeout(Duration::from_millis(timeout_ms));
    }
    config
}

/// Providers consulted for a response, in order. A synthetic result means
/// CoinGecko was tried first.
fn source_chain(provider: ProviderId) -> Vec<ProviderId> {
    if provider.is_upstream() {
        vec![provider]
    } else {
        vec![ProviderId::Coingecko, provider]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_results_list_the_upstream_that_was_tried() {
        assert_eq!(source_chain(ProviderId::Coingecko), vec![ProviderId::Coingecko]);
        assert_eq!(
            source_chain(ProviderId::Synthetic),
            vec![ProviderId::Coingecko, ProviderId::Synthetic]
        );
    }
}
