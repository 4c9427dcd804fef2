//! Session error types

use thiserror::Error;

use crate::transport::ApiResponse;

/// Errors surfaced by the session manager.
///
/// Cloneable so one refresh outcome can be handed to every request waiting
/// on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Session expired")]
    SessionExpired,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl AuthError {
    /// Map a non-success response to an error, preferring the server's
    /// `detail` over `fallback`.
    pub fn from_response(response: &ApiResponse, fallback: &str) -> Self {
        let message = response.detail().unwrap_or_else(|| fallback.to_string());

        match response.status {
            401 => AuthError::Authentication(message),
            400 | 422 => AuthError::Validation(message),
            500..=599 => AuthError::Server(message),
            status => AuthError::Rejected { status, message },
        }
    }

    /// Human-readable message for display in a form or banner
    pub fn message(&self) -> String {
        match self {
            AuthError::Validation(message)
            | AuthError::Authentication(message)
            | AuthError::Network(message)
            | AuthError::Server(message)
            | AuthError::Rejected { message, .. } => message.clone(),
            AuthError::SessionExpired => "Your session has expired. Please sign in again.".into(),
            AuthError::NotAuthenticated => "You need to sign in first.".into(),
            AuthError::Storage(_) => "Could not save your session on this device.".into(),
            AuthError::InvalidTransition { .. } => {
                "The session is not ready yet. Please try again.".into()
            }
        }
    }

    /// True for the outcomes that end the session
    pub fn is_session_ended(&self) -> bool {
        matches!(self, AuthError::SessionExpired | AuthError::NotAuthenticated)
    }
}

impl From<ugc_storage::StorageError> for AuthError {
    fn from(err: ugc_storage::StorageError) -> Self {
        AuthError::Storage(err.to_string())
    }
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        AuthError::Network(err.to_string())
    }
}

/// Failures below HTTP: the request never produced a status code
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_response_prefers_detail() {
        let response =
            ApiResponse::from_json(401, &json!({ "detail": "Incorrect email or password" }));
        assert_eq!(
            AuthError::from_response(&response, "fallback"),
            AuthError::Authentication("Incorrect email or password".to_string())
        );
    }

    #[test]
    fn test_from_response_falls_back() {
        let response = ApiResponse::new(502, b"<html>bad gateway</html>".to_vec());
        assert_eq!(
            AuthError::from_response(&response, "Server unavailable"),
            AuthError::Server("Server unavailable".to_string())
        );
    }

    #[test]
    fn test_from_response_status_classes() {
        let validation = ApiResponse::from_json(422, &json!({}));
        assert!(matches!(
            AuthError::from_response(&validation, "x"),
            AuthError::Validation(_)
        ));

        let missing = ApiResponse::from_json(404, &json!({ "detail": "Profile not found" }));
        assert_eq!(
            AuthError::from_response(&missing, "x"),
            AuthError::Rejected {
                status: 404,
                message: "Profile not found".to_string()
            }
        );
    }

    #[test]
    fn test_message() {
        assert_eq!(
            AuthError::Network("Could not reach the server".into()).message(),
            "Could not reach the server"
        );
        assert!(AuthError::SessionExpired.is_session_ended());
        assert!(!AuthError::Server("boom".into()).is_session_ended());
    }
}
