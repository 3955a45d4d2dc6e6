use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{api::id::ApiId, db::admin::Admin, db::admin::NewAdmin};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Reasons a sign-up request is rejected.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("password must be at least {} characters", MIN_PASSWORD_LENGTH)]
    ShortPassword,
    #[error("failed to hash password")]
    Hash(#[from] argon2::Error),
}

/// A request to register a new admin. The password is in plaintext and never stored.
#[derive(Clone, Deserialize, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Raw login credentials, received from a user.
#[derive(Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl From<SignupRequest> for LoginRequest {
    fn from(request: SignupRequest) -> Self {
        Self {
            email: request.email,
            password: request.password,
        }
    }
}

/// Normalise an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A loose sanity check: one `@`, something before it, and a dotted domain after it.
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain.contains('.')
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}

impl TryFrom<SignupRequest> for NewAdmin {
    type Error = CredentialsError;

    /// Convert a [`SignupRequest`] to a new admin by hashing the password.
    /// This enforces a non-empty name, a plausible email, and the minimum password length.
    fn try_from(request: SignupRequest) -> Result<Self, Self::Error> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(CredentialsError::EmptyName);
        }
        let email = normalize_email(&request.email);
        if !is_plausible_email(&email) {
            return Err(CredentialsError::InvalidEmail(request.email));
        }
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(CredentialsError::ShortPassword);
        }

        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(request.password.as_bytes(), &salt, &Config::default())?;
        Ok(Self {
            name,
            email,
            password_hash,
        })
    }
}

/// API-friendly view of an admin, without the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminDescription {
    pub id: ApiId,
    pub name: String,
    pub email: String,
}

impl From<Admin> for AdminDescription {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id.into(),
            name: admin.admin.name,
            email: admin.admin.email,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_good_signup() {
        let admin: NewAdmin = SignupRequest::example2().try_into().unwrap();
        assert_eq!(admin.name, "Bob Organiser");
        assert_eq!(admin.email, "bob@example.org");
    }

    #[test]
    fn rejects_bad_signup() {
        let mut request = SignupRequest::example();
        request.name = "  ".into();
        assert!(matches!(
            NewAdmin::try_from(request),
            Err(CredentialsError::EmptyName)
        ));

        for email in ["", "no-at-sign", "@example.com", "a@b", "a@b..com", "a b@c.com"] {
            let mut request = SignupRequest::example();
            request.email = email.into();
            assert!(
                matches!(
                    NewAdmin::try_from(request),
                    Err(CredentialsError::InvalidEmail(_))
                ),
                "accepted {email:?}"
            );
        }

        let mut request = SignupRequest::example();
        request.password = "12345".into();
        assert!(matches!(
            NewAdmin::try_from(request),
            Err(CredentialsError::ShortPassword)
        ));
    }
}
