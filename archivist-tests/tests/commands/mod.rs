//! Command tests for archivist
//!
//! These tests drive the backup runner end to end with mocked subprocesses
//! and storage clients.

mod list;
mod run;
mod validate;
