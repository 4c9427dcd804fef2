//! UGC Dashboard Session Management
//!
//! Authentication lifecycle for the dashboard client:
//! - Login exchanges credentials for an access/refresh token pair
//! - Tokens persist across restarts and rehydrate on startup
//! - Authenticated requests refresh once on 401 and retry once
//! - Concurrent 401s share a single refresh

mod config;
mod credentials;
mod error;
mod manager;
mod session;
mod storage;
pub mod token;
mod transport;

pub use config::{SessionConfig, CURRENT_USER_PATH, LOGIN_PATH, REFRESH_PATH, REGISTER_PATH};
pub use credentials::{Credentials, RegisteredUser, RegistrationForm};
pub use error::{AuthError, TransportError};
pub use manager::SessionManager;
pub use session::{Session, SessionEvent, SessionStatus, UserRecord, UserRole};
pub use storage::{
    DatabaseTokenStorage, MemoryTokenStorage, StoredTokens, TokenStorage, ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};

pub type Result<T> = std::result::Result<T, AuthError>;
