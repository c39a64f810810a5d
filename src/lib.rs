//! fixturesync — football data mirror
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod api;
pub mod config;
pub mod error;
pub mod store;
pub mod sync;
pub mod types;
