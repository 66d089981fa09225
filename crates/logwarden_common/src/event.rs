//! Event model for extracted log events.
//!
//! An `Event` is the transient in-memory form produced by the line
//! classifiers and the APT transaction scanner. It carries the raw
//! source-timezone timestamp string; resolution to UTC happens in the
//! store when the event is persisted.

use std::fmt;

/// Kind of extracted event.
///
/// The integer codes are the stable storage representation and must not be
/// renumbered: 1=AuthKey, 2=AuthPassword, 3=AuthFailed, 4=SudoCommand,
/// 5=InstallPackage, 6=RemovePackage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// SSH login with a public key
    AuthKey,
    /// SSH login with a password
    AuthPassword,
    /// Rejected login attempt
    AuthFailed,
    /// Command executed through sudo
    SudoCommand,
    /// Package installation recorded in the apt history
    InstallPackage,
    /// Package removal recorded in the apt history
    RemovePackage,
}

impl EventKind {
    /// Stable storage code for this kind.
    pub fn code(self) -> i64 {
        match self {
            EventKind::AuthKey => 1,
            EventKind::AuthPassword => 2,
            EventKind::AuthFailed => 3,
            EventKind::SudoCommand => 4,
            EventKind::InstallPackage => 5,
            EventKind::RemovePackage => 6,
        }
    }

    /// Map a stored code back to a kind.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(EventKind::AuthKey),
            2 => Some(EventKind::AuthPassword),
            3 => Some(EventKind::AuthFailed),
            4 => Some(EventKind::SudoCommand),
            5 => Some(EventKind::InstallPackage),
            6 => Some(EventKind::RemovePackage),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventKind::AuthKey => "auth (key)",
            EventKind::AuthPassword => "auth (password)",
            EventKind::AuthFailed => "auth failed",
            EventKind::SudoCommand => "sudo command",
            EventKind::InstallPackage => "package install",
            EventKind::RemovePackage => "package remove",
        };
        write!(f, "{label}")
    }
}

/// One extracted event. Immutable after construction; which of the optional
/// fields are meaningful depends on `kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Raw timestamp string as captured from the log, in the source timezone
    pub occurred_at_raw: String,
    pub kind: EventKind,
    /// Actor, where the pattern captures one
    pub username: Option<String>,
    /// Remote address string, unvalidated beyond the capturing pattern
    pub source_ip: Option<String>,
    /// Kind-dependent payload: command line, port note plus key fingerprint,
    /// or raw package list
    pub details: Option<String>,
}
