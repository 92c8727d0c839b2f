//! SQLite persistence for lexcards.
//!
//! A [`Database`] owns one connection and exposes flashcard CRUD with
//! optimistic concurrency, per-user mastery tracking, and filtered,
//! paginated listing.  Every operation runs under the configured deadline
//! and fails with [`StoreError::Timeout`] once it is exceeded.

pub mod config;
pub mod database;
pub mod flashcards;
pub mod migrations;
pub mod models;
pub mod progress;
pub mod query;
pub mod users;

mod error;

#[cfg(test)]
mod test_support;

pub use config::StoreConfig;
pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
