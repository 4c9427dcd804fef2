//! UGC Dashboard Storage Layer
//!
//! SQLite-based durable key-value storage for client state.
//! Multi-key writes are transactional so readers never see half an update.

mod database;
mod error;
mod migrations;

pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
