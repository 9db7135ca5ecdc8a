//! Dioscuri Storage Layer
//!
//! SQLite-backed persistence for the proxy: pinned host certificates
//! keyed by host.

mod database;
mod error;
mod migrations;

pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
