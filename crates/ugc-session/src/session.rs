//! Session data structures
//!
//! ```text
//! Uninitialized
//!   ↓ initialize
//! Loading ──────────────┐
//!   ↓ user fetched      ↓ no token / rejected / logout
//! Authenticated ──→ Anonymous
//!        ↑   logout, refresh failure   │
//!        └────────── login ────────────┘
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created at process start, nothing read yet
    #[default]
    Uninitialized,
    /// Hydrating from persisted tokens
    Loading,
    /// Holding a validated (or optimistically trusted) access token
    Authenticated,
    /// No usable credentials
    Anonymous,
}

impl SessionStatus {
    /// Check if transition to another status is valid
    pub fn can_transition_to(&self, target: SessionStatus) -> bool {
        match (self, target) {
            (SessionStatus::Uninitialized, SessionStatus::Loading) => true,
            (SessionStatus::Loading, SessionStatus::Authenticated) => true,
            (SessionStatus::Loading, SessionStatus::Anonymous) => true,
            // logout or terminal refresh failure
            (SessionStatus::Authenticated, SessionStatus::Anonymous) => true,
            // login
            (SessionStatus::Anonymous, SessionStatus::Authenticated) => true,
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Uninitialized => "uninitialized",
            SessionStatus::Loading => "loading",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::Anonymous => "anonymous",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Creator,
    Admin,
}

/// The authenticated user as returned by the current-user endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

/// Accepts RFC 3339 as well as the naive ISO timestamps the backend emits,
/// treating the latter as UTC. Unparseable values become `None`.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Point-in-time view of the session.
///
/// Always produced under a single lock so the fields are mutually
/// consistent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub status: SessionStatus,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub current_user: Option<UserRecord>,
    /// `exp` claim of the access token, when it is a JWT
    pub access_expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub(crate) fn authenticated(
        access_token: String,
        refresh_token: Option<String>,
        user: UserRecord,
    ) -> Self {
        let access_expires_at = token::expires_at(&access_token);

        Self {
            status: SessionStatus::Authenticated,
            access_token: Some(access_token),
            refresh_token,
            current_user: Some(user),
            access_expires_at,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    pub(crate) fn replace_access_token(&mut self, access_token: String) {
        self.access_expires_at = token::expires_at(&access_token);
        self.access_token = Some(access_token);
    }

    /// Drop credentials and the cached user, leaving the status alone
    pub(crate) fn clear_credentials(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.current_user = None;
        self.access_expires_at = None;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("status", &self.status)
            .field(
                "access_token",
                &self.access_token.as_deref().map(token::fingerprint),
            )
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(token::fingerprint),
            )
            .field("current_user", &self.current_user)
            .field("access_expires_at", &self.access_expires_at)
            .finish()
    }
}

/// Notifications for the UI shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { email: String },
    /// Voluntary logout
    LoggedOut,
    /// Terminal refresh failure; the shell should route to the login surface
    Expired,
}
