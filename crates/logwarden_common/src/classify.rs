//! Auth-log line classifiers.
//!
//! Each classifier is one anchored, case-insensitive pattern over a single
//! line. Evaluation order is fixed and the first match wins; a line matching
//! none of the patterns produces no event, which is not an error.

use regex::Regex;
use std::sync::LazyLock;

use crate::event::{Event, EventKind};

static AUTH_PASSWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^([a-z]{3}\s+[0-9]{1,2}\s+[0-9:]+).*accepted password for ([^ ]+) from ([^ ]+) (port [0-9]+ )",
    )
    .unwrap()
});

static AUTH_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^([a-z]{3}\s+[0-9]{1,2}\s+[0-9:]+).*accepted publickey for ([^ ]+) from ([^ ]+) (port [0-9]+ ).*:(.+)",
    )
    .unwrap()
});

static AUTH_FAILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z]{3}\s+[0-9]{1,2}\s+[0-9:]+).*failed password for ([^ ]+) from ([^ ]+)")
        .unwrap()
});

static SUDO_COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z]{3}\s+[0-9]{1,2}\s+[0-9:]+).*sudo:\s+([^ ]+).*command=(.*)").unwrap()
});

fn classify_password(line: &str) -> Option<Event> {
    // Captures (date, username, source_ip, port_note); the port note is part
    // of the match but is not stored for password logins.
    let caps = AUTH_PASSWORD.captures(line)?;
    Some(Event {
        occurred_at_raw: caps[1].to_string(),
        kind: EventKind::AuthPassword,
        username: Some(caps[2].to_string()),
        source_ip: Some(caps[3].to_string()),
        details: None,
    })
}

fn classify_publickey(line: &str) -> Option<Event> {
    let caps = AUTH_KEY.captures(line)?;
    // Port note and key fingerprint are concatenated verbatim, spacing
    // included, so stored fingerprints stay comparable across runs.
    let details = format!("{}{}", &caps[4], &caps[5]);
    Some(Event {
        occurred_at_raw: caps[1].to_string(),
        kind: EventKind::AuthKey,
        username: Some(caps[2].to_string()),
        source_ip: Some(caps[3].to_string()),
        details: Some(details),
    })
}

fn classify_failed(line: &str) -> Option<Event> {
    let caps = AUTH_FAILED.captures(line)?;
    Some(Event {
        occurred_at_raw: caps[1].to_string(),
        kind: EventKind::AuthFailed,
        username: Some(caps[2].to_string()),
        source_ip: Some(caps[3].to_string()),
        details: None,
    })
}

fn classify_sudo(line: &str) -> Option<Event> {
    let caps = SUDO_COMMAND.captures(line)?;
    Some(Event {
        occurred_at_raw: caps[1].to_string(),
        kind: EventKind::SudoCommand,
        username: Some(caps[2].to_string()),
        source_ip: None,
        details: Some(caps[3].to_string()),
    })
}

/// Fixed priority order; callers must not merge results across classifiers.
const CLASSIFIERS: [fn(&str) -> Option<Event>; 4] = [
    classify_password,
    classify_publickey,
    classify_failed,
    classify_sudo,
];

/// Classify one auth-log line. The first matching pattern wins.
pub fn classify(line: &str) -> Option<Event> {
    CLASSIFIERS.iter().find_map(|classifier| classifier(line))
}
