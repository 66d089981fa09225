//! Deduplicating event storage.
//!
//! One append-only `events` record set with two interchangeable SQLite
//! representations of the time axis. Writes are idempotent: a SHA-256
//! fingerprint over the UTC-resolved event tuple is the unique key and
//! inserts ignore conflicts, so re-ingesting rotated or overlapping log
//! files is a no-op for previously seen events.

mod datetime_db;
mod epoch_db;

pub use datetime_db::DatetimeStore;
pub use epoch_db::EpochStore;

use chrono::{DateTime, FixedOffset, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::{Backend, StorageConfig};
use crate::event::{Event, EventKind};
use crate::timeparse::TimestampError;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The event's raw timestamp could not be resolved; the event is
    /// skipped, the run continues.
    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("unknown stored event type code {0}")]
    UnknownKind(i64),

    #[error("invalid stored epoch timestamp {0}")]
    InvalidEpoch(i64),
}

/// Result of an idempotent save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    /// Fingerprint already present; absorbed, counts as success
    Duplicate,
}

/// Persisted form of an event, as read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    /// Always UTC; conversion for display is the presentation layer's job
    pub event_time: DateTime<Utc>,
    pub kind: EventKind,
    pub username: Option<String>,
    pub source_ip: Option<String>,
    pub details: Option<String>,
}

/// Storage contract shared by both backends.
pub trait EventStore {
    /// Create the events table if absent. Safe to call on every startup.
    fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Resolve the event's raw timestamp, fingerprint the resolved tuple
    /// and insert. A fingerprint conflict is absorbed as `Duplicate`.
    fn save(&self, event: &Event, source_offset: FixedOffset) -> Result<SaveOutcome, StoreError>;

    /// Records with `event_time >= since` (all records when `None`),
    /// ascending by `event_time`.
    fn events_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<StoredEvent>, StoreError>;
}

/// Open the configured backend and make sure the schema exists.
pub fn open_store(config: &StorageConfig) -> Result<Box<dyn EventStore>, StoreError> {
    let store: Box<dyn EventStore> = match config.backend {
        Backend::Datetime => Box::new(DatetimeStore::open(&config.path)?),
        Backend::Epoch => Box::new(EpochStore::open(&config.path)?),
    };
    store.ensure_schema()?;
    Ok(store)
}

/// Stable fingerprint over the UTC-resolved event tuple.
///
/// Optional fields are presence- and length-framed so that `None`,
/// `Some("")` and a value shifting between adjacent fields all hash
/// differently.
pub fn fingerprint(
    event_time: DateTime<Utc>,
    kind: EventKind,
    username: Option<&str>,
    source_ip: Option<&str>,
    details: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(event_time.timestamp().to_be_bytes());
    hasher.update(kind.code().to_be_bytes());
    for field in [username, source_ip, details] {
        match field {
            Some(value) => {
                hasher.update([1u8]);
                hasher.update((value.len() as u64).to_be_bytes());
                hasher.update(value.as_bytes());
            }
            None => hasher.update([0u8]),
        }
    }
    hex::encode(hasher.finalize())
}

fn kind_from_code(code: i64) -> Result<EventKind, StoreError> {
    EventKind::from_code(code).ok_or(StoreError::UnknownKind(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn msk() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    fn sample_event() -> Event {
        Event {
            occurred_at_raw: "2016-04-07 19:25:28".to_string(),
            kind: EventKind::InstallPackage,
            username: Some("root".to_string()),
            source_ip: None,
            details: Some("fish:amd64 (2.0.0-1)".to_string()),
        }
    }

    fn auth_event(raw: &str, username: &str) -> Event {
        Event {
            occurred_at_raw: raw.to_string(),
            kind: EventKind::AuthPassword,
            username: Some(username.to_string()),
            source_ip: Some("192.168.1.6".to_string()),
            details: None,
        }
    }

    fn open_backend(backend: Backend, dir: &TempDir) -> Box<dyn EventStore> {
        let config = StorageConfig {
            backend,
            path: dir.path().join("events.sqlite"),
        };
        open_store(&config).unwrap()
    }

    const BACKENDS: [Backend; 2] = [Backend::Datetime, Backend::Epoch];

    #[test]
    fn test_save_is_idempotent() {
        for backend in BACKENDS {
            let tmp = tempfile::tempdir().unwrap();
            let store = open_backend(backend, &tmp);
            assert_eq!(
                store.save(&sample_event(), msk()).unwrap(),
                SaveOutcome::Inserted
            );
            assert_eq!(
                store.save(&sample_event(), msk()).unwrap(),
                SaveOutcome::Duplicate
            );
            assert_eq!(store.events_since(None).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        for backend in BACKENDS {
            let tmp = tempfile::tempdir().unwrap();
            let store = open_backend(backend, &tmp);
            // open_store already ran it once
            store.ensure_schema().unwrap();
            store.ensure_schema().unwrap();
        }
    }

    #[test]
    fn test_stored_fields_roundtrip() {
        for backend in BACKENDS {
            let tmp = tempfile::tempdir().unwrap();
            let store = open_backend(backend, &tmp);
            store.save(&sample_event(), msk()).unwrap();

            let events = store.events_since(None).unwrap();
            assert_eq!(events.len(), 1);
            let stored = &events[0];
            assert_eq!(
                stored.event_time,
                Utc.with_ymd_and_hms(2016, 4, 7, 16, 25, 28).unwrap()
            );
            assert_eq!(stored.kind, EventKind::InstallPackage);
            assert_eq!(stored.username.as_deref(), Some("root"));
            assert_eq!(stored.source_ip, None);
            assert_eq!(stored.details.as_deref(), Some("fish:amd64 (2.0.0-1)"));
        }
    }

    #[test]
    fn test_events_since_threshold_and_order() {
        for backend in BACKENDS {
            let tmp = tempfile::tempdir().unwrap();
            let store = open_backend(backend, &tmp);
            // inserted out of chronological order on purpose
            store.save(&auth_event("2016-07-04 18:07:48", "warner"), msk()).unwrap();
            store.save(&auth_event("2016-07-01 09:00:00", "eve"), msk()).unwrap();
            store.save(&auth_event("2016-07-03 19:58:30", "warner"), msk()).unwrap();

            let all = store.events_since(None).unwrap();
            assert_eq!(all.len(), 3);
            assert!(all.windows(2).all(|w| w[0].event_time <= w[1].event_time));

            // threshold is inclusive
            let threshold = Utc.with_ymd_and_hms(2016, 7, 3, 16, 58, 30).unwrap();
            let recent = store.events_since(Some(threshold)).unwrap();
            assert_eq!(recent.len(), 2);
            assert!(recent.iter().all(|e| e.event_time >= threshold));
        }
    }

    #[test]
    fn test_malformed_timestamp_is_contained() {
        for backend in BACKENDS {
            let tmp = tempfile::tempdir().unwrap();
            let store = open_backend(backend, &tmp);
            let bad = auth_event("", "warner");
            assert!(matches!(
                store.save(&bad, msk()),
                Err(StoreError::Timestamp(_))
            ));
            // the store stays usable for the rest of the batch
            assert_eq!(
                store.save(&sample_event(), msk()).unwrap(),
                SaveOutcome::Inserted
            );
            assert_eq!(store.events_since(None).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_fingerprint_is_pure_and_field_sensitive() {
        let time = Utc.with_ymd_and_hms(2016, 4, 7, 16, 25, 28).unwrap();
        let kind = EventKind::AuthPassword;
        let base = fingerprint(time, kind, Some("warner"), Some("192.168.1.6"), None);

        assert_eq!(
            base,
            fingerprint(time, kind, Some("warner"), Some("192.168.1.6"), None)
        );
        assert_ne!(
            base,
            fingerprint(
                time + chrono::Duration::seconds(1),
                kind,
                Some("warner"),
                Some("192.168.1.6"),
                None
            )
        );
        assert_ne!(
            base,
            fingerprint(time, EventKind::AuthKey, Some("warner"), Some("192.168.1.6"), None)
        );
        assert_ne!(
            base,
            fingerprint(time, kind, Some("warner2"), Some("192.168.1.6"), None)
        );
        assert_ne!(base, fingerprint(time, kind, None, Some("192.168.1.6"), None));
        assert_ne!(
            base,
            fingerprint(time, kind, Some("warner"), Some("192.168.1.6"), Some(""))
        );
    }

    #[test]
    fn test_fingerprint_fields_do_not_shift() {
        let time = Utc.with_ymd_and_hms(2016, 4, 7, 16, 25, 28).unwrap();
        let kind = EventKind::SudoCommand;
        assert_ne!(
            fingerprint(time, kind, Some("x"), None, None),
            fingerprint(time, kind, None, Some("x"), None)
        );
        assert_ne!(
            fingerprint(time, kind, None, Some("x"), None),
            fingerprint(time, kind, None, None, Some("x"))
        );
    }
}
