//! Shared library for logwarden.
//!
//! The extraction and persistence core: event model, auth-log line
//! classifiers, the APT transaction scanner, timestamp canonicalization
//! and the deduplicating event stores.

pub mod apt_history;
pub mod classify;
pub mod config;
pub mod event;
pub mod store;
pub mod timeparse;
