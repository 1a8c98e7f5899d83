mod format;

use std::io::{self, Write};

use coinlens_core::Envelope;
use serde_json::Value;

pub use self::format::{
    format_large_number, format_percentage, format_price, format_signed_price, format_time,
};
use crate::cli::OutputFormat;
use crate::error::CliError;

/// Human-readable rendering of a command result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    title: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableView {
    pub fn new(title: String, headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            title,
            headers: headers.iter().map(|header| (*header).to_owned()).collect(),
            rows,
        }
    }

    #[cfg(test)]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn column_widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(column, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(column))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        let widths = self.column_widths();
        writeln!(out, "{}", self.title)?;
        write_row(out, &self.headers, &widths)?;
        let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        write_row(out, &rule, &widths)?;
        for row in &self.rows {
            write_row(out, row, &widths)?;
        }
        Ok(())
    }
}

fn write_row(out: &mut impl Write, cells: &[String], widths: &[usize]) -> io::Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(column, (cell, width))| {
            // First column left-aligned, figures right-aligned.
            if column == 0 {
                format!("{cell:<width$}")
            } else {
                format!("{cell:>width$}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(out, "{}", line.trim_end())
}

pub fn render(
    envelope: &Envelope<Value>,
    table: &TableView,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Table => render_table(&mut out, envelope, table)?,
    }

    Ok(())
}

fn render_table(
    out: &mut impl Write,
    envelope: &Envelope<Value>,
    table: &TableView,
) -> Result<(), CliError> {
    let meta = &envelope.meta;
    writeln!(out, "request_id  : {}", meta.request_id)?;
    writeln!(out, "generated_at: {}", meta.generated_at)?;
    writeln!(
        out,
        "sources     : {}",
        meta.source_chain
            .iter()
            .map(|source| source.as_str())
            .collect::<Vec<_>>()
            .join(",")
    )?;
    writeln!(out, "latency_ms  : {}", meta.latency_ms)?;
    writeln!(out, "degraded    : {}", meta.degraded)?;

    if !meta.warnings.is_empty() {
        writeln!(out, "warnings:")?;
        for warning in &meta.warnings {
            writeln!(out, "  - {warning}")?;
        }
    }

    writeln!(out)?;
    table.write_to(out)?;

    if !envelope.errors.is_empty() {
        writeln!(out)?;
        writeln!(out, "errors:")?;
        for error in &envelope.errors {
            writeln!(out, "  - {}: {}", error.code, error.message)?;
        }
    }

    Ok(())
}
