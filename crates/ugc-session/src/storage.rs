//! Durable token persistence
//!
//! Two fixed keys, written through on every session mutation.

use parking_lot::RwLock;
use std::sync::Arc;

use ugc_storage::Database;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl StoredTokens {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

impl std::fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredTokens")
            .field("access_token", &self.access_token.is_some())
            .field("refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// Client-side key-value persistence for the token pair.
///
/// Synchronous on purpose: writes happen while the session lock is held so
/// memory and storage change together.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> ugc_storage::Result<StoredTokens>;

    /// Replace both entries; `None` removes the key
    fn save(&self, tokens: &StoredTokens) -> ugc_storage::Result<()>;

    /// Remove both entries atomically
    fn clear(&self) -> ugc_storage::Result<()>;
}

/// In-process storage for tests and throwaway sessions
#[derive(Clone, Default)]
pub struct MemoryTokenStorage {
    tokens: Arc<RwLock<StoredTokens>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: StoredTokens) -> Self {
        Self {
            tokens: Arc::new(RwLock::new(tokens)),
        }
    }

    pub fn snapshot(&self) -> StoredTokens {
        self.tokens.read().clone()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> ugc_storage::Result<StoredTokens> {
        Ok(self.snapshot())
    }

    fn save(&self, tokens: &StoredTokens) -> ugc_storage::Result<()> {
        *self.tokens.write() = tokens.clone();
        Ok(())
    }

    fn clear(&self) -> ugc_storage::Result<()> {
        *self.tokens.write() = StoredTokens::default();
        Ok(())
    }
}

/// Tokens stored in the SQLite key-value table
#[derive(Clone)]
pub struct DatabaseTokenStorage {
    db: Database,
}

impl DatabaseTokenStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl TokenStorage for DatabaseTokenStorage {
    fn load(&self) -> ugc_storage::Result<StoredTokens> {
        Ok(StoredTokens {
            access_token: self.db.get_value(ACCESS_TOKEN_KEY)?,
            refresh_token: self.db.get_value(REFRESH_TOKEN_KEY)?,
        })
    }

    fn save(&self, tokens: &StoredTokens) -> ugc_storage::Result<()> {
        match (tokens.access_token.as_deref(), tokens.refresh_token.as_deref()) {
            (Some(access), Some(refresh)) => self
                .db
                .set_values(&[(ACCESS_TOKEN_KEY, access), (REFRESH_TOKEN_KEY, refresh)]),
            (access, refresh) => self
                .db
                .write_batch(&[(ACCESS_TOKEN_KEY, access), (REFRESH_TOKEN_KEY, refresh)]),
        }
    }

    fn clear(&self) -> ugc_storage::Result<()> {
        self.db.remove_values(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY])
    }
}
