//! Batch command - resolve a list of coordinates
//!
//! Lines are `lat,lng` or `lat lng`; blank lines and `#` comments are
//! skipped. Repeated locations coalesce onto one lookup, and the cache is
//! flushed on completion or on Ctrl-C.

use crate::app::{shutdown_signal, App};
use crate::cli::args::{BatchArgs, OutputFormat};
use crate::config::Config;
use crate::error::{GeocacheError, GeocacheResult};
use crate::geocode::{ErrorKind, GeocodeError};
use crate::ui::{self, BatchProgress, UiContext};
use console::style;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// One coordinate read from the input
#[derive(Debug, Clone, PartialEq)]
struct BatchItem {
    line: usize,
    input: String,
    lat: Option<f64>,
    lng: Option<f64>,
}

/// Outcome for one input line
#[derive(Debug, Serialize)]
struct BatchRecord {
    line: usize,
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
}

impl BatchRecord {
    fn new(item: &BatchItem, result: Result<String, GeocodeError>) -> Self {
        let (address, error, kind) = match result {
            Ok(address) => (Some(address), None, None),
            Err(e) => (None, Some(e.to_string()), Some(e.kind())),
        };
        Self {
            line: item.line,
            input: item.input.clone(),
            address,
            error,
            kind,
        }
    }
}

/// Execute the batch command
pub async fn execute(args: BatchArgs, config: &Config) -> GeocacheResult<()> {
    let input = read_input(args.file.as_deref()).await?;
    let items = parse_items(&input);
    let ctx = UiContext::detect();

    if items.is_empty() {
        ui::step_info(&ctx, "No coordinates in input");
        return Ok(());
    }
    debug!("Read {} coordinates", items.len());

    let app = App::from_config(config)?;
    app.initialize().await;

    let progress = BatchProgress::new(&ctx, items.len() as u64);
    let service = app.service();
    let run = stream::iter(items.iter())
        .map(|item| {
            let progress = &progress;
            async move {
                let result = service.resolve(item.lat, item.lng).await;
                progress.advance(&item.input, result.is_ok());
                BatchRecord::new(item, result)
            }
        })
        .buffered(usize::from(args.concurrency))
        .collect::<Vec<_>>();

    let records = tokio::select! {
        records = run => Some(records),
        _ = shutdown_signal() => None,
    };
    progress.finish();
    app.shutdown_flush().await;

    let Some(records) = records else {
        return Err(GeocacheError::User(
            "Interrupted; resolved addresses were saved to the cache".to_string(),
        ));
    };

    match args.format {
        OutputFormat::Table => print_table(&records),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Plain => print_plain(&records),
    }

    let failed = records.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        return Err(GeocacheError::User(format!(
            "{} of {} coordinates could not be resolved",
            failed,
            records.len()
        )));
    }
    Ok(())
}

async fn read_input(path: Option<&Path>) -> GeocacheResult<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .await
            .map_err(|e| GeocacheError::io(format!("reading {}", path.display()), e)),
        None => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .map_err(|e| GeocacheError::io("reading stdin", e))?;
            Ok(input)
        }
    }
}

fn parse_items(input: &str) -> Vec<BatchItem> {
    input
        .lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            let (lat, lng) = parse_pair(trimmed);
            Some(BatchItem {
                line: idx + 1,
                input: trimmed.to_string(),
                lat,
                lng,
            })
        })
        .collect()
}

/// Split a line into latitude and longitude; unparsable parts become `None`
fn parse_pair(line: &str) -> (Option<f64>, Option<f64>) {
    let mut parts = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty());
    let mut next = || parts.next().and_then(|part| part.parse::<f64>().ok());
    let lat = next();
    let lng = next();
    (lat, lng)
}

fn print_table(records: &[BatchRecord]) {
    println!(
        "{:<6} {:<28} {}",
        style("LINE").bold(),
        style("INPUT").bold(),
        style("ADDRESS").bold()
    );
    println!("{}", "-".repeat(80));

    for record in records {
        let outcome = match (&record.address, &record.error) {
            (Some(address), _) => address.clone(),
            (None, Some(error)) => style(error.as_str()).red().to_string(),
            (None, None) => String::new(),
        };
        println!("{:<6} {:<28} {}", record.line, record.input, outcome);
    }

    println!();
    println!("{} coordinate(s)", records.len());
}

fn print_plain(records: &[BatchRecord]) {
    for record in records {
        match (&record.address, &record.error) {
            (Some(address), _) => println!("{}\t{}", record.input, address),
            (None, error) => println!(
                "{}\terror: {}",
                record.input,
                error.as_deref().unwrap_or("unknown")
            ),
        }
    }
}
