//! Logwarden CLI - batch extraction of security and package events from
//! system logs, and reporting on the stored history.

pub mod commands;
pub mod scanner;
