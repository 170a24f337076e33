//! Domain types - core business entities
//!
//! Canonical types for tracked heap dumps, independent of the HTTP layer
//! and of how the analyzer is invoked.

pub mod report;
