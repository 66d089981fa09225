//! Backend storing true timezone-aware instants.
//!
//! `event_time` is RFC 3339 text with its UTC offset, mapped to and from
//! `DateTime<Utc>` by rusqlite's chrono support. UTC values render in one
//! fixed layout, so lexicographic ordering matches chronological ordering.

use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use rusqlite::{params, Connection, Row};
use tracing::debug;

use crate::event::Event;
use crate::timeparse;

use super::{fingerprint, kind_from_code, EventStore, SaveOutcome, StoreError, StoredEvent};

pub struct DatetimeStore {
    conn: Connection,
}

impl DatetimeStore {
    /// Open or create the database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }
}

fn row_to_stored(row: &Row<'_>) -> rusqlite::Result<(DateTime<Utc>, i64, Option<String>, Option<String>, Option<String>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

impl EventStore for DatetimeStore {
    fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_time DATETIME NOT NULL,
                event_type INTEGER NOT NULL,
                event_user TEXT,
                user_ip TEXT,
                description TEXT,
                event_hash TEXT NOT NULL UNIQUE
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_events_time ON events(event_time)",
            [],
        )?;
        Ok(())
    }

    fn save(&self, event: &Event, source_offset: FixedOffset) -> Result<SaveOutcome, StoreError> {
        let event_time = timeparse::resolve(&event.occurred_at_raw, source_offset)?;
        let hash = fingerprint(
            event_time,
            event.kind,
            event.username.as_deref(),
            event.source_ip.as_deref(),
            event.details.as_deref(),
        );
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO events
             (event_time, event_type, event_user, user_ip, description, event_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event_time,
                event.kind.code(),
                event.username,
                event.source_ip,
                event.details,
                hash
            ],
        )?;
        if inserted == 0 {
            debug!("duplicate event absorbed: {hash}");
            return Ok(SaveOutcome::Duplicate);
        }
        Ok(SaveOutcome::Inserted)
    }

    fn events_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<StoredEvent>, StoreError> {
        let mut rows = Vec::new();
        match since {
            Some(threshold) => {
                let mut stmt = self.conn.prepare(
                    "SELECT event_time, event_type, event_user, user_ip, description
                     FROM events WHERE event_time >= ?1 ORDER BY event_time ASC",
                )?;
                for row in stmt.query_map(params![threshold], row_to_stored)? {
                    rows.push(row?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT event_time, event_type, event_user, user_ip, description
                     FROM events ORDER BY event_time ASC",
                )?;
                for row in stmt.query_map([], row_to_stored)? {
                    rows.push(row?);
                }
            }
        }
        rows.into_iter()
            .map(|(event_time, code, username, source_ip, details)| {
                Ok(StoredEvent {
                    event_time,
                    kind: kind_from_code(code)?,
                    username,
                    source_ip,
                    details,
                })
            })
            .collect()
    }
}
