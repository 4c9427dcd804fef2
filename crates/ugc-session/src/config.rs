//! Session manager settings

use std::time::Duration;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const CURRENT_USER_PATH: &str = "/auth/me";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// `/auth/me` on the reference backend; some deployments use `/users/me`
    pub current_user_path: String,
    /// Upper bound for login, current-user and refresh calls
    pub auth_timeout: Duration,
    /// Buffered session events per subscriber
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            current_user_path: CURRENT_USER_PATH.to_string(),
            auth_timeout: Duration::from_secs(15),
            event_capacity: 16,
        }
    }
}
