//! Login and registration payloads

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::Result;

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Local format check, run before anything goes on the wire
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct RegistrationForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.full_name.trim().is_empty() {
            return Err(AuthError::Validation("Full name is required".into()));
        }
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of a successful `/auth/register` call.
///
/// Parsed leniently; a 2xx with an unexpected body still counts as success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AuthError::Validation("Enter a valid email address".into()))
    }
}

fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        Err(AuthError::Validation("Password is required".into()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_validation() {
        assert!(Credentials::new("a@b.com", "secret1").validate().is_ok());
        assert!(Credentials::new("  a@b.com ", "secret1").validate().is_ok());

        for email in ["", "ab.com", "@b.com", "a@", "a@b@c", "a b@c.com"] {
            assert!(
                matches!(
                    Credentials::new(email, "secret1").validate(),
                    Err(AuthError::Validation(_))
                ),
                "{email:?} should be rejected"
            );
        }

        assert_eq!(
            Credentials::new("a@b.com", "").validate(),
            Err(AuthError::Validation("Password is required".into()))
        );
    }

    #[test]
    fn test_registration_requires_name() {
        let form = RegistrationForm::new("  ", "a@b.com", "secret1");
        assert!(matches!(form.validate(), Err(AuthError::Validation(_))));
        assert!(RegistrationForm::new("Ana", "a@b.com", "secret1")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", Credentials::new("a@b.com", "hunter2"));
        assert!(rendered.contains("a@b.com"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_registered_user_is_lenient() {
        let parsed: RegisteredUser = serde_json::from_str(
            r#"{"message": "User created successfully", "user_id": "abc123"}"#,
        )
        .unwrap();
        assert_eq!(parsed.user_id.as_deref(), Some("abc123"));

        let empty: RegisteredUser = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, RegisteredUser::default());
    }
}
