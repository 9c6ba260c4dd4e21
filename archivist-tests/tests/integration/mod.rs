//! Integration tests for archivist
//!
//! These tests need Docker and the PostgreSQL client tools on PATH.
//! Run with: `cargo test -p archivist-tests --test integration -- --ignored`
