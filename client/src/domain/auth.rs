//! Authentication primitives: bearer tokens, login credentials, the persisted
//! session pair and the gate's observable state.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::user::User;

/// Validation error for bearer tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessTokenValidationError {
    /// Token was blank once trimmed.
    Empty,
    /// Token contains whitespace or control characters and cannot be sent
    /// in an `Authorization` header.
    InvalidCharacters,
}

impl fmt::Display for AccessTokenValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "access token must not be empty"),
            Self::InvalidCharacters => {
                write!(f, "access token must not contain whitespace or control characters")
            }
        }
    }
}

impl std::error::Error for AccessTokenValidationError {}

/// Opaque bearer credential.
///
/// The value is wiped from memory on drop and redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    /// Validate and construct a token.
    pub fn new(raw: impl Into<String>) -> Result<Self, AccessTokenValidationError> {
        let raw = Zeroizing::new(raw.into());
        if raw.trim().is_empty() {
            return Err(AccessTokenValidationError::Empty);
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(AccessTokenValidationError::InvalidCharacters);
        }
        Ok(Self(raw))
    }

    /// Raw token text for the `Authorization` header.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

impl TryFrom<String> for AccessToken {
    type Error = AccessTokenValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccessToken> for String {
    fn from(value: AccessToken) -> Self {
        value.0.as_str().to_owned()
    }
}

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Email was missing or blank once trimmed.
    EmptyEmail,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated login credentials submitted from a sign-in form.
///
/// ## Invariants
/// - `email` is trimmed and must not be empty after trimming.
/// - `password` is required to be non-empty but retains caller-provided
///   whitespace to avoid surprising credential comparisons.
///
/// # Examples
/// ```
/// use portal_session::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" ada@example.com ", "secret").unwrap();
/// assert_eq!(creds.email(), "ada@example.com");
/// assert_eq!(creds.password(), "secret");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw form inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, LoginValidationError> {
        let normalized = email.trim();
        if normalized.is_empty() {
            return Err(LoginValidationError::EmptyEmail);
        }

        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }

        Ok(Self {
            email: normalized.to_owned(),
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Email used as the login identifier.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token and cached user, persisted and restored as one unit.
///
/// Holding both in a single value is what lets the store write them
/// all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// Bearer credential.
    pub token: AccessToken,
    /// Cached principal, used for optimistic rendering only.
    pub user: User,
}

impl StoredSession {
    /// Pair a token with its user.
    pub const fn new(token: AccessToken, user: User) -> Self {
        Self { token, user }
    }
}

/// Observable state of the [`crate::domain::AuthGate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// The start-up identity check has not resolved yet.
    ///
    /// `cached` is the user read from the store, available for an optimistic
    /// render only. It grants nothing.
    Initializing {
        /// User restored from the session store, if any.
        cached: Option<User>,
    },
    /// The server confirmed the session.
    Authenticated(StoredSession),
    /// No session, or the last one was rejected.
    Unauthenticated,
}

impl AuthState {
    /// User confirmed by the server, if authenticated.
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(session) => Some(&session.user),
            Self::Initializing { .. } | Self::Unauthenticated => None,
        }
    }

    /// Session confirmed by the server, if authenticated.
    pub const fn session(&self) -> Option<&StoredSession> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::Initializing { .. } | Self::Unauthenticated => None,
        }
    }

    /// Whether the start-up check is still outstanding.
    pub const fn is_initializing(&self) -> bool {
        matches!(self, Self::Initializing { .. })
    }
}
