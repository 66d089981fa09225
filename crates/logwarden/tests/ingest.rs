//! End-to-end ingest: scan, classify, store, and re-run idempotence over
//! the same (partly rotated and overlapping) log files.

use std::fs;
use std::io::Write;

use chrono::FixedOffset;
use flate2::write::GzEncoder;
use flate2::Compression;

use logwarden::scanner::LogScanner;
use logwarden_common::apt_history::TransactionScanner;
use logwarden_common::classify;
use logwarden_common::config::{Backend, StorageConfig};
use logwarden_common::event::EventKind;
use logwarden_common::store::{open_store, EventStore, SaveOutcome};

const AUTH_LINES: &str = "\
Jul  4 18:07:48 host sshd[123]: Accepted password for warner from 192.168.1.6 port 19399 ssh2
Jul  3 19:58:30 host sshd[111]: Failed password for warner from 192.168.1.6 port 19403 ssh2
Jul  3 20:01:18 host sudo:   warner : TTY=pts/1 ; PWD=/home/warner ; USER=root ; COMMAND=/usr/bin/apt-get update
Jul  3 20:01:18 host systemd: Starting Cleanup of Temporary Directories...
";

// overlaps auth.log on the first line, adds one new event
const ROTATED_LINES: &str = "\
Jul  4 18:07:48 host sshd[123]: Accepted password for warner from 192.168.1.6 port 19399 ssh2
Jul  1 09:00:00 host sshd[99]: Failed password for eve from 10.0.0.8 port 2222 ssh2
";

const APT_LINES: &str = "\
Start-Date: 2016-04-07 19:25:28
Commandline: apt-get install fish
Install: fish:amd64 (2.0.0-1)
End-Date: 2016-04-07 19:25:29
Commandline: apt-get install stray-outside-transaction
";

fn msk() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600).unwrap()
}

fn ingest_auth(store: &dyn EventStore, logdir: &std::path::Path) -> u64 {
    let scanner = LogScanner::new(logdir, "auth.log");
    let mut inserted = 0;
    for line in scanner.lines() {
        if let Some(event) = classify::classify(&line) {
            if store.save(&event, msk()).unwrap() == SaveOutcome::Inserted {
                inserted += 1;
            }
        }
    }
    inserted
}

fn ingest_apt(store: &dyn EventStore, logdir: &std::path::Path) -> u64 {
    let scanner = LogScanner::new(logdir, "history.log");
    let mut transactions = TransactionScanner::new();
    let mut inserted = 0;
    for line in scanner.lines() {
        if let Some(event) = transactions.feed(&line) {
            if store.save(&event, msk()).unwrap() == SaveOutcome::Inserted {
                inserted += 1;
            }
        }
    }
    inserted
}

#[test]
fn rescan_of_unchanged_logs_stores_nothing_new() {
    let tmp = tempfile::tempdir().unwrap();
    let logdir = tmp.path().join("log");
    fs::create_dir_all(&logdir).unwrap();
    fs::write(logdir.join("auth.log"), AUTH_LINES).unwrap();

    let gz_path = logdir.join("auth.log.1.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&gz_path).unwrap(), Compression::default());
    encoder.write_all(ROTATED_LINES.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let storage = StorageConfig {
        backend: Backend::Epoch,
        path: tmp.path().join("events.sqlite"),
    };
    let store = open_store(&storage).unwrap();

    // auth.log: password + failed + sudo; archive: one overlap + one new
    let first_run = ingest_auth(store.as_ref(), &logdir);
    assert_eq!(first_run, 4);

    let second_run = ingest_auth(store.as_ref(), &logdir);
    assert_eq!(second_run, 0);

    let all = store.events_since(None).unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0].event_time <= w[1].event_time));
}

#[test]
fn apt_history_roundtrip() {
    let tmp = tempfile::tempdir().unwrap();
    let logdir = tmp.path().join("apt");
    fs::create_dir_all(&logdir).unwrap();
    fs::write(logdir.join("history.log"), APT_LINES).unwrap();

    let storage = StorageConfig {
        backend: Backend::Datetime,
        path: tmp.path().join("events.sqlite"),
    };
    let store = open_store(&storage).unwrap();

    // the stray Commandline after End-Date is outside any transaction
    assert_eq!(ingest_apt(store.as_ref(), &logdir), 1);
    assert_eq!(ingest_apt(store.as_ref(), &logdir), 0);

    let all = store.events_since(None).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].kind, EventKind::InstallPackage);
    assert_eq!(all[0].username.as_deref(), Some("root"));
    assert!(all[0].details.as_deref().unwrap().contains("fish"));
}
