//! Failures reported back to the person who triggered them.
//!
//! Only explicit user actions (submitting a sign-in form) surface these.
//! Ambient session maintenance degrades silently instead; see
//! [`crate::domain::AuthGate`] and [`crate::domain::NotificationChannel`].

use serde::{Deserialize, Serialize};

/// Stable machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The submitted input was refused as malformed.
    InvalidRequest,
    /// Credentials were wrong or the session is no longer valid.
    Unauthorized,
    /// Signed in, but the role may not do this.
    Forbidden,
    /// The addressed resource does not exist.
    NotFound,
    /// The identity service could not be reached.
    ServiceUnavailable,
    /// The service answered with something unusable.
    InternalError,
}

impl ErrorCode {
    /// Text shown when no more specific message is available.
    pub const fn fallback_message(self) -> &'static str {
        match self {
            Self::InvalidRequest => "the request was not accepted",
            Self::Unauthorized => "please sign in again",
            Self::Forbidden => "you do not have access to this",
            Self::NotFound => "nothing was found",
            Self::ServiceUnavailable => "the service is temporarily unavailable",
            Self::InternalError => "something went wrong",
        }
    }
}

/// A user-visible failure: a code for programmatic handling plus display text.
///
/// The message is never blank; an empty one is replaced by the code's
/// [`ErrorCode::fallback_message`].
///
/// # Examples
/// ```
/// use portal_session::domain::{DomainError, ErrorCode};
///
/// let err = DomainError::unauthorized("invalid email or password");
/// assert_eq!(err.code(), ErrorCode::Unauthorized);
/// assert_eq!(DomainError::new(ErrorCode::NotFound, " ").message(), "nothing was found");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct DomainError {
    code: ErrorCode,
    message: String,
}

impl DomainError {
    /// Build an error, substituting the fallback text for a blank message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            code.fallback_message().to_owned()
        } else {
            message
        };
        Self { code, message }
    }

    /// Failure category.
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Text shown next to the action that failed.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// [`ErrorCode::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}
