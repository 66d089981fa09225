//! APT history transaction blocks.
//!
//! `history.log` groups each apt invocation between `Start-Date:` and
//! `End-Date:` markers. The scanner tracks whether a transaction is open and
//! stamps every install/remove action inside it with the transaction's
//! timestamp. Action-looking lines outside a transaction are ignored.

use regex::Regex;
use std::sync::LazyLock;

use crate::event::{Event, EventKind};

const START_MARKER: &str = "Start-Date:";
const END_MARKER: &str = "End-Date:";

/// Actor recorded for package transactions; apt history has no per-user
/// attribution.
const PACKAGE_ACTOR: &str = "root";

static APT_ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Commandline:.*(install|remove) (.*)").unwrap());

/// Stateful scanner over the apt history line stream.
#[derive(Debug, Default)]
pub struct TransactionScanner {
    /// Timestamp of the currently open transaction, if any
    open_since: Option<String>,
}

impl TransactionScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; emits an event for each install/remove action inside
    /// an open transaction.
    ///
    /// A repeated `Start-Date:` overwrites the remembered timestamp.
    /// Truncated logs can lose an `End-Date:`, so this is tolerated rather
    /// than treated as an error.
    pub fn feed(&mut self, line: &str) -> Option<Event> {
        if let Some((_, stamp)) = line.split_once(START_MARKER) {
            self.open_since = Some(stamp.trim().to_string());
            return None;
        }
        if line.contains(END_MARKER) {
            self.open_since = None;
            return None;
        }
        let since = self.open_since.as_ref()?;
        let caps = APT_ACTION.captures(line)?;
        let kind = if caps[1].eq_ignore_ascii_case("install") {
            EventKind::InstallPackage
        } else {
            EventKind::RemovePackage
        };
        Some(Event {
            occurred_at_raw: since.clone(),
            kind,
            username: Some(PACKAGE_ACTOR.to_string()),
            source_ip: None,
            // Raw package-list payload, left unparsed for the presentation
            // layer
            details: Some(caps[2].to_string()),
        })
    }
}
