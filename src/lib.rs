//! bench-store - Append-only benchmark history store with regression detection
//!
//! This library keeps one JSON document of run records per benchmark suite,
//! enforces append-time invariants (unique commits, monotonic dates, stable
//! units), and judges each new measurement against a trailing window of its
//! own history using noise-scaled tolerance bands.

pub mod cli;
pub mod config;
pub mod ingest;
pub mod model;
pub mod query;
pub mod regression;
pub mod store;
