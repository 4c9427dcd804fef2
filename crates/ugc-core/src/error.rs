//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] ugc_storage::StorageError),

    #[error("Session error: {0}")]
    Session(#[from] ugc_session::AuthError),

    #[error("Transport error: {0}")]
    Transport(#[from] ugc_session::TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
