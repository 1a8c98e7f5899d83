use coinlens_core::{ProviderId, Timeframe};
use serde::Serialize;

use crate::error::CliError;
use crate::output::TableView;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct TimeframeRow {
    timeframe: Timeframe,
    bucket_minutes: i64,
    max_points: usize,
    lookback_days: u32,
}

pub fn run() -> Result<CommandResult, CliError> {
    let rows: Vec<TimeframeRow> = Timeframe::ALL
        .iter()
        .map(|&timeframe| {
            let policy = timeframe.policy();
            TimeframeRow {
                timeframe,
                bucket_minutes: policy.bucket_duration.whole_minutes(),
                max_points: policy.max_points,
                lookback_days: policy.lookback_days,
            }
        })
        .collect();

    let table = TableView::new(
        String::from("timeframes"),
        &["timeframe", "bucket (min)", "max points", "lookback (days)"],
        rows.iter()
            .map(|row| {
                vec![
                    row.timeframe.to_string(),
                    row.bucket_minutes.to_string(),
                    row.max_points.to_string(),
                    row.lookback_days.to_string(),
                ]
            })
            .collect(),
    );
    let data = serde_json::to_value(&rows)?;

    // Served from the compiled policy table; no upstream is consulted.
    Ok(CommandResult::ok(data, table, vec![ProviderId::Synthetic]))
}
