//! Port abstraction for the remote identity endpoints.
//!
//! The server is the authority on who the caller is. Adapters translate the
//! login, "who am I" and logout calls into whatever transport the backend
//! speaks.

use async_trait::async_trait;

use crate::domain::{AccessToken, LoginCredentials, StoredSession, User};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity API adapters.
    pub enum IdentityApiError {
        /// The server rejected the credentials or the token.
        Unauthorized { message: String } => "identity request unauthorized: {message}",
        /// The server answered with another non-success status.
        Rejected { status: u16, message: String } => "identity request rejected with status {status}: {message}",
        /// The request did not complete in time.
        Timeout { message: String } => "identity request timed out: {message}",
        /// The request could not be delivered.
        Transport { message: String } => "identity transport failed: {message}",
        /// The response body did not match the expected shape.
        Decode { message: String } => "identity response malformed: {message}",
    }
}

/// Remote identity operations used by the session lifecycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Exchange credentials for a token and the user it belongs to.
    async fn login(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<StoredSession, IdentityApiError>;

    /// Resolve the user a token belongs to.
    async fn who_am_i(&self, token: &AccessToken) -> Result<User, IdentityApiError>;

    /// Invalidate the token server-side.
    async fn logout(&self, token: &AccessToken) -> Result<(), IdentityApiError>;
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(IdentityApiError::unauthorized("expired"), true)]
    #[case(IdentityApiError::rejected(500_u16, "boom"), false)]
    #[case(IdentityApiError::transport("refused"), false)]
    fn classifies_unauthorized(#[case] error: IdentityApiError, #[case] expected: bool) {
        assert_eq!(error.is_unauthorized(), expected);
    }

    #[test]
    fn rejected_message_includes_status() {
        let error = IdentityApiError::rejected(503_u16, "maintenance");
        assert_eq!(
            error.to_string(),
            "identity request rejected with status 503: maintenance"
        );
    }
}
