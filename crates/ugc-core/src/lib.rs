//! UGC Dashboard Core
//!
//! Application root for the dashboard client: configuration, logging and
//! the wiring of token storage and HTTP transport into one session.

mod app;
mod config;
mod error;

pub use app::App;
pub use config::{Config, DEFAULT_API_URL};
pub use error::CoreError;

pub use ugc_session::{
    ApiRequest, ApiResponse, AuthError, Credentials, RegisteredUser, RegistrationForm, Session,
    SessionEvent, SessionManager, SessionStatus, UserRecord, UserRole,
};
pub use ugc_storage::{Database, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
