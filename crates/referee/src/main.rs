//! Referee console.
//!
//! Reads referee input as JSON lines from stdin, feeds it to a judge and
//! prints stage changes and match results as JSON lines on stdout. Logs go to
//! stderr.
//!
//! # Examples
//!
//! ```bash
//! echo '{"type":"start"}' | JUDGE_TICK_MS=50 cargo run -p judge-referee
//! ```
mod config;
mod input;

use anyhow::{Context, Result};
use judge_content::TablesLoader;
use judge_core::{MatchSettleEvent, StageChangedEvent, Topic};
use judge_runtime::{Judge, JudgeHandle};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use config::RefereeConfig;
use input::RefereeInput;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = RefereeConfig::from_env();
    let tables = match &config.tables {
        Some(path) => TablesLoader::load(path)
            .with_context(|| format!("failed to load rule tables from {}", path.display()))?,
        None => TablesLoader::reference()?,
    };

    let mut judge = Judge::builder()
        .config(config.judge.clone())
        .tables(tables)
        .build()?;
    tracing::info!(tables = ?config.tables, "Referee console ready");

    let reporter = tokio::spawn(report(judge.handle()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let input = match RefereeInput::parse(line) {
            Ok(input) => input,
            Err(err) => {
                tracing::warn!("{err:#}");
                continue;
            }
        };
        if let Err(err) = input.apply(&mut judge).await {
            tracing::error!("{err:#}");
        }
    }

    reporter.abort();
    judge.shutdown().await?;
    tracing::info!("Referee console closed");
    Ok(())
}

/// Prints stage changes and settle results until the bus closes.
async fn report(handle: JudgeHandle) {
    let mut events = handle.subscribe(Topic::Event);
    loop {
        let envelope = match events.recv().await {
            Ok(envelope) => envelope,
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Reporter lagged behind the event stream");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let line = if let Some(change) = envelope.downcast::<StageChangedEvent>() {
            json!({ "stage": change })
        } else if let Some(settle) = envelope.downcast::<MatchSettleEvent>() {
            json!({ "settled": settle })
        } else {
            continue;
        };
        println!("{line}");
    }
}
