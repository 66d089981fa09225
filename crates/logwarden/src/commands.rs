//! CLI command implementations.
//!
//! `parse` runs the batch ingest over both log families; `show` renders the
//! stored history. Per-event failures are contained so one bad line never
//! aborts the run; only opening the store is fatal.

use anyhow::{Context, Result};
use chrono::FixedOffset;
use owo_colors::OwoColorize;
use tracing::warn;

use logwarden_common::apt_history::TransactionScanner;
use logwarden_common::classify;
use logwarden_common::config::Config;
use logwarden_common::event::Event;
use logwarden_common::store::{open_store, EventStore, SaveOutcome, StoreError};
use logwarden_common::timeparse;

use crate::scanner::LogScanner;

/// Counters for one ingest run.
#[derive(Debug, Default)]
pub struct IngestStats {
    pub lines: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub skipped_bad_timestamp: u64,
    pub failed_saves: u64,
}

impl IngestStats {
    fn absorb(&mut self, other: &IngestStats) {
        self.lines += other.lines;
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.skipped_bad_timestamp += other.skipped_bad_timestamp;
        self.failed_saves += other.failed_saves;
    }
}

/// Parse both log families and save the extracted events.
pub fn parse(config: &Config) -> Result<()> {
    let source_offset = config.source_offset()?;
    let store = open_store(&config.storage).context("failed to open event store")?;

    let auth_logs = LogScanner::new(&config.logs.auth_dir, &config.logs.auth_name);
    if auth_logs.is_empty() {
        warn!(
            "no files matching {:?} under {}",
            config.logs.auth_name,
            config.logs.auth_dir.display()
        );
    }
    let mut auth_stats = IngestStats::default();
    for line in auth_logs.lines() {
        auth_stats.lines += 1;
        if let Some(event) = classify::classify(&line) {
            record(store.as_ref(), &event, source_offset, &mut auth_stats);
        }
    }
    println!(
        "Parsed {} strings from system authorization logs",
        auth_stats.lines.to_string().bold()
    );

    let apt_logs = LogScanner::new(&config.logs.apt_dir, &config.logs.apt_name);
    if apt_logs.is_empty() {
        warn!(
            "no files matching {:?} under {}",
            config.logs.apt_name,
            config.logs.apt_dir.display()
        );
    }
    let mut apt_stats = IngestStats::default();
    let mut transactions = TransactionScanner::new();
    for line in apt_logs.lines() {
        apt_stats.lines += 1;
        if let Some(event) = transactions.feed(&line) {
            record(store.as_ref(), &event, source_offset, &mut apt_stats);
        }
    }
    println!(
        "Parsed {} strings from apt history logs",
        apt_stats.lines.to_string().bold()
    );

    let mut total = IngestStats::default();
    total.absorb(&auth_stats);
    total.absorb(&apt_stats);
    println!(
        "{} new, {} already known, {} skipped, {} failed",
        total.inserted.to_string().green(),
        total.duplicates,
        total.skipped_bad_timestamp,
        total.failed_saves
    );
    Ok(())
}

/// Save one event; failures are counted, not propagated.
fn record(
    store: &dyn EventStore,
    event: &Event,
    source_offset: FixedOffset,
    stats: &mut IngestStats,
) {
    match store.save(event, source_offset) {
        Ok(SaveOutcome::Inserted) => stats.inserted += 1,
        Ok(SaveOutcome::Duplicate) => stats.duplicates += 1,
        Err(StoreError::Timestamp(err)) => {
            warn!("skipping event: {err}");
            stats.skipped_bad_timestamp += 1;
        }
        Err(err) => {
            warn!("failed to save event: {err}");
            stats.failed_saves += 1;
        }
    }
}

/// Render stored events, optionally filtered by a start date.
pub fn show(config: &Config, since: Option<String>) -> Result<()> {
    let source_offset = config.source_offset()?;
    let display_offset = config.display_offset()?;
    let store = open_store(&config.storage).context("failed to open event store")?;

    let threshold = match since {
        Some(raw) => Some(
            timeparse::resolve(&raw, source_offset)
                .with_context(|| format!("invalid --since date {raw:?}"))?,
        ),
        None => None,
    };

    let events = store.events_since(threshold)?;
    if events.is_empty() {
        println!("{}", "No events recorded".dimmed());
        return Ok(());
    }
    for event in &events {
        // the store hands back UTC; conversion for display happens here
        let shown = event.event_time.with_timezone(&display_offset);
        println!(
            "{}  {:18} {:12} {:15}  {}",
            shown.format("%Y-%m-%d %H:%M:%S").to_string().green(),
            event.kind.to_string().cyan(),
            event.username.as_deref().unwrap_or("-"),
            event.source_ip.as_deref().unwrap_or("-"),
            event.details.as_deref().unwrap_or(""),
        );
    }
    println!("{} events", events.len().to_string().bold());
    Ok(())
}
