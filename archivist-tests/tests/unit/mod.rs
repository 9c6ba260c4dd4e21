//! Unit tests for archivist
//!
//! Configuration loading, name templates, source/vault routing and archiving.

mod archive;
mod routing;
mod template;
