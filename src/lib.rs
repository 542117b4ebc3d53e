//! OSINT lookup bot library.
//!
//! Forwards search queries to the LeakOsint API, formats the matched
//! database sections into pages and serves them through Telegram with
//! inline page navigation.

/// Remote search API client and response decoding.
pub mod api;
/// Telegram transport: handlers, views and the polling runner.
pub mod bot;
/// Configuration management.
pub mod config;
/// Query dispatching from a raw user query to a displayable page.
pub mod dispatcher;
/// Error taxonomy shared by the dispatcher and the API client.
pub mod error;
/// Report formatting, caching and navigation.
pub mod report;
/// Utility functions.
pub mod utils;
