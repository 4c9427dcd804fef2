//! Session Manager
//!
//! Owns the token pair, the cached user and the retry-on-401 policy.
//! Every mutation writes through to [`TokenStorage`] under the same lock that
//! guards the in-memory session, so observers never see a torn state.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::{SessionConfig, LOGIN_PATH, REFRESH_PATH, REGISTER_PATH};
use crate::credentials::{Credentials, RegisteredUser, RegistrationForm};
use crate::error::{AuthError, TransportError};
use crate::session::{Session, SessionEvent, SessionStatus, UserRecord};
use crate::storage::{StoredTokens, TokenStorage};
use crate::token;
use crate::transport::{ApiRequest, ApiResponse, Transport};
use crate::Result;

const LOGIN_FALLBACK: &str = "Could not connect or invalid credentials";
const REGISTER_FALLBACK: &str = "Could not connect to the server";
const CURRENT_USER_FALLBACK: &str = "Could not load the current user";
const REFRESH_FALLBACK: &str = "Could not refresh the session";

/// Retries allowed for one logical request after an authentication failure
const MAX_AUTH_RETRIES: u32 = 1;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
enum RefreshOutcome {
    Refreshed(String),
    Expired,
}

type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct Inner {
    state: RwLock<Session>,
    storage: Arc<dyn TokenStorage>,
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    /// The one refresh in flight, joined by every request that hits a 401
    pending_refresh: Mutex<Option<PendingRefresh>>,
    events: broadcast::Sender<SessionEvent>,
}

pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        storage: Arc<dyn TokenStorage>,
        transport: Arc<dyn Transport>,
        config: SessionConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(Session::default()),
                storage,
                transport,
                config,
                pending_refresh: Mutex::new(None),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn snapshot(&self) -> Session {
        self.inner.state.read().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.read().status
    }

    pub fn current_user(&self) -> Option<UserRecord> {
        self.inner.state.read().current_user.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.state.read().access_token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.read().is_authenticated()
    }

    /// Hydrate from persisted tokens.
    ///
    /// Never fails: any problem resolves to `Anonymous` with storage cleared.
    /// Only the first call does work; later calls return the current snapshot.
    pub async fn initialize(&self) -> Session {
        {
            let mut state = self.inner.state.write();
            if state.status != SessionStatus::Uninitialized {
                return state.clone();
            }
            state.status = SessionStatus::Loading;
        }

        let stored = match self.inner.storage.load() {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted tokens");
                StoredTokens::default()
            }
        };

        let Some(access_token) = stored.access_token else {
            // A lone refresh token is a leftover; drop it
            let session = self.finish_anonymous(stored.refresh_token.is_some());
            tracing::info!("No persisted session");
            return session;
        };

        match self.fetch_current_user(&access_token).await {
            Ok(user) => {
                let mut state = self.inner.state.write();
                // logout() may have run while the user was being fetched
                if state.status == SessionStatus::Loading {
                    tracing::info!(
                        user = %user.email,
                        token = %token::fingerprint(&access_token),
                        "Restored session"
                    );
                    *state = Session::authenticated(access_token, stored.refresh_token, user);
                }
                state.clone()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Persisted session rejected");
                self.finish_anonymous(true)
            }
        }
    }

    /// Exchange credentials for a token pair and load the user.
    ///
    /// Nothing is persisted or cached unless every step succeeds.
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        credentials.validate()?;
        check_login_allowed(self.status())?;

        let email = credentials.email.trim().to_string();
        let request = ApiRequest::post(LOGIN_PATH).with_json(json!({
            "email": email,
            "password": credentials.password,
        }));

        let response = self.send_bounded(&request, None).await.map_err(|e| {
            tracing::warn!(user = %email, error = %e, "Login request failed");
            AuthError::Network(LOGIN_FALLBACK.to_string())
        })?;

        if !response.is_success() {
            tracing::info!(user = %email, status = response.status, "Login rejected");
            return Err(AuthError::from_response(&response, LOGIN_FALLBACK));
        }

        let tokens: LoginResponse = response.json().map_err(|e| {
            tracing::warn!(error = %e, "Malformed login response");
            AuthError::Server(LOGIN_FALLBACK.to_string())
        })?;

        let user = self
            .fetch_current_user(&tokens.access_token)
            .await
            .map_err(|e| match e {
                AuthError::Network(_) => AuthError::Network(LOGIN_FALLBACK.to_string()),
                other => other,
            })?;
        let user_email = user.email.clone();

        {
            let mut state = self.inner.state.write();
            check_login_allowed(state.status)?;

            self.inner.storage.save(&StoredTokens::new(
                tokens.access_token.clone(),
                tokens.refresh_token.clone(),
            ))?;
            *state = Session::authenticated(tokens.access_token, Some(tokens.refresh_token), user);
        }

        tracing::info!(user = %user_email, "Logged in");
        self.emit(SessionEvent::LoggedIn { email: user_email });

        Ok(())
    }

    /// Create an account. Registration does not sign the user in.
    pub async fn register(&self, form: &RegistrationForm) -> Result<RegisteredUser> {
        form.validate()?;

        let email = form.email.trim().to_string();
        let request = ApiRequest::post(REGISTER_PATH).with_json(json!({
            "full_name": form.full_name.trim(),
            "email": email,
            "password": form.password,
        }));

        let response = self.send_bounded(&request, None).await.map_err(|e| {
            tracing::warn!(user = %email, error = %e, "Register request failed");
            AuthError::Network(REGISTER_FALLBACK.to_string())
        })?;

        if !response.is_success() {
            tracing::info!(user = %email, status = response.status, "Registration rejected");
            return Err(AuthError::from_response(&response, REGISTER_FALLBACK));
        }

        let registered: RegisteredUser = response.json().unwrap_or_default();
        tracing::info!(user = %email, user_id = ?registered.user_id, "Registered account");

        Ok(registered)
    }

    /// Purely local: clears storage and memory, no network call.
    pub fn logout(&self) {
        let ended = {
            let mut state = self.inner.state.write();
            self.clear_locked(&mut state)
        };

        if ended {
            tracing::info!("Logged out");
            self.emit(SessionEvent::LoggedOut);
        }
    }

    /// Send `request` with the current access token.
    ///
    /// A 401 triggers one shared refresh and one retry. A second 401, or a
    /// failed refresh, ends the session and yields `SessionExpired`. Other
    /// failures pass through untouched.
    pub async fn authorized_request(&self, request: ApiRequest) -> Result<ApiResponse> {
        let request_id = Uuid::new_v4();
        let mut access_token = self.access_token().ok_or(AuthError::NotAuthenticated)?;
        let mut retries = 0;

        loop {
            let response = self
                .inner
                .transport
                .send(&request, Some(access_token.as_str()))
                .await?;

            if !response.is_unauthorized() {
                return into_result(response);
            }

            if retries >= MAX_AUTH_RETRIES {
                tracing::warn!(
                    %request_id,
                    path = %request.path,
                    "Still unauthorized after refresh"
                );
                let rejected = access_token.as_str();
                self.expire_if(|state| state.access_token.as_deref() == Some(rejected));
                return Err(AuthError::SessionExpired);
            }

            retries += 1;
            tracing::debug!(
                %request_id,
                path = %request.path,
                token = %token::fingerprint(&access_token),
                "Access token rejected, refreshing"
            );
            access_token = self.refreshed_access_token(&access_token).await?;
        }
    }

    /// Join (or start) the refresh for a rejected access token
    async fn refreshed_access_token(&self, rejected: &str) -> Result<String> {
        let pending = {
            let mut slot = self.inner.pending_refresh.lock();

            // Checked under the slot lock: a finished refresh commits its
            // token before it empties the slot.
            {
                let state = self.inner.state.read();
                match state.access_token.as_deref() {
                    None => return Err(AuthError::SessionExpired),
                    Some(current) if current != rejected => return Ok(current.to_string()),
                    Some(_) => {}
                }
            }

            match slot.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    let pending = self.start_refresh();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        match pending.await {
            RefreshOutcome::Refreshed(access_token) => Ok(access_token),
            RefreshOutcome::Expired => Err(AuthError::SessionExpired),
        }
    }

    fn start_refresh(&self) -> PendingRefresh {
        let manager = self.clone();

        async move {
            let outcome = manager.run_refresh().await;
            *manager.inner.pending_refresh.lock() = None;
            outcome
        }
        .boxed()
        .shared()
    }

    async fn run_refresh(&self) -> RefreshOutcome {
        let refresh_token = self.inner.state.read().refresh_token.clone();

        let Some(refresh_token) = refresh_token else {
            tracing::warn!("No refresh token available");
            self.expire_if(|state| state.refresh_token.is_none());
            return RefreshOutcome::Expired;
        };

        match self.request_refresh(&refresh_token).await {
            Ok(tokens) => self.commit_refresh(&refresh_token, tokens),
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                self.expire_if(|state| state.refresh_token.as_deref() == Some(refresh_token.as_str()));
                RefreshOutcome::Expired
            }
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let request = ApiRequest::post(REFRESH_PATH);
        let response = self.send_bounded(&request, Some(refresh_token)).await?;

        if !response.is_success() {
            return Err(AuthError::from_response(&response, REFRESH_FALLBACK));
        }

        response
            .json()
            .map_err(|e| AuthError::Server(format!("Malformed refresh response: {e}")))
    }

    fn commit_refresh(&self, used_refresh_token: &str, tokens: RefreshResponse) -> RefreshOutcome {
        let mut state = self.inner.state.write();

        if state.refresh_token.as_deref() != Some(used_refresh_token) {
            // Logged out, or replaced by a new login, while the refresh was in flight
            return match state.access_token.clone() {
                Some(current) if state.is_authenticated() => RefreshOutcome::Refreshed(current),
                _ => RefreshOutcome::Expired,
            };
        }

        let refresh_token = tokens
            .refresh_token
            .unwrap_or_else(|| used_refresh_token.to_string());

        if let Err(e) = self.inner.storage.save(&StoredTokens::new(
            tokens.access_token.clone(),
            refresh_token.clone(),
        )) {
            tracing::error!(error = %e, "Failed to persist refreshed tokens");
            let ended = self.clear_locked(&mut state);
            drop(state);
            if ended {
                self.emit(SessionEvent::Expired);
            }
            return RefreshOutcome::Expired;
        }

        state.replace_access_token(tokens.access_token.clone());
        state.refresh_token = Some(refresh_token);

        tracing::info!(
            token = %token::fingerprint(&tokens.access_token),
            "Access token refreshed"
        );

        RefreshOutcome::Refreshed(tokens.access_token)
    }

    async fn fetch_current_user(&self, access_token: &str) -> Result<UserRecord> {
        let request = ApiRequest::get(self.inner.config.current_user_path.clone());
        let response = self.send_bounded(&request, Some(access_token)).await?;

        if !response.is_success() {
            return Err(AuthError::from_response(&response, CURRENT_USER_FALLBACK));
        }

        response.json().map_err(|e| {
            tracing::warn!(error = %e, "Malformed user record");
            AuthError::Server(CURRENT_USER_FALLBACK.to_string())
        })
    }

    /// Transport call capped at `auth_timeout`
    async fn send_bounded(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> std::result::Result<ApiResponse, TransportError> {
        let call = self.inner.transport.send(request, bearer);
        match tokio::time::timeout(self.inner.config.auth_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    /// End an authenticated session if `still_current` holds, emitting
    /// `Expired` once.
    fn expire_if(&self, still_current: impl FnOnce(&Session) -> bool) {
        let ended = {
            let mut state = self.inner.state.write();
            if !still_current(&state) {
                return;
            }
            self.clear_locked(&mut state)
        };

        if ended {
            tracing::warn!("Session expired");
            self.emit(SessionEvent::Expired);
        }
    }

    fn finish_anonymous(&self, clear_persisted: bool) -> Session {
        let mut state = self.inner.state.write();
        // logout(), and possibly a new login, may have landed while loading
        if state.status == SessionStatus::Loading {
            if clear_persisted {
                self.clear_storage();
            }
            state.clear_credentials();
            state.status = SessionStatus::Anonymous;
        }
        state.clone()
    }

    /// Returns whether an authenticated session was ended
    fn clear_locked(&self, state: &mut Session) -> bool {
        self.clear_storage();

        let was_authenticated = state.is_authenticated();
        state.clear_credentials();
        if state.status.can_transition_to(SessionStatus::Anonymous) {
            state.status = SessionStatus::Anonymous;
        }

        was_authenticated
    }

    fn clear_storage(&self) {
        if let Err(e) = self.inner.storage.clear() {
            tracing::error!(error = %e, "Failed to clear persisted tokens");
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Login only from a settled session; hydration owns `Loading`
fn check_login_allowed(status: SessionStatus) -> Result<()> {
    if status == SessionStatus::Loading {
        return Err(AuthError::InvalidTransition {
            from: status.to_string(),
            to: SessionStatus::Authenticated.to_string(),
        });
    }
    check_transition(status, SessionStatus::Authenticated)
}

fn check_transition(from: SessionStatus, to: SessionStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(AuthError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

fn into_result(response: ApiResponse) -> Result<ApiResponse> {
    if response.status < 400 {
        Ok(response)
    } else {
        let fallback = format!("Request failed with status {}", response.status);
        Err(AuthError::from_response(&response, &fallback))
    }
}
