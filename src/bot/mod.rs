/// Command, search and navigation handlers
pub mod handlers;
/// Telegram sends and edits with retry and plain-text fallback
pub mod resilient;
/// Update routing and the supervised polling loop
pub mod runner;
/// Texts and inline keyboards
pub mod views;

pub use runner::run_bot;
