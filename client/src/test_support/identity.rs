//! Identity API double for integration tests, where `mockall` mocks of the
//! crate's ports are not compiled.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{IdentityApi, IdentityApiError};
use crate::domain::{AccessToken, LoginCredentials, StoredSession, User};

/// Canned identity responses plus a record of what was asked.
pub struct StubIdentityApi {
    login: Result<StoredSession, IdentityApiError>,
    who_am_i: Result<User, IdentityApiError>,
    logout: Result<(), IdentityApiError>,
    calls: Mutex<Vec<String>>,
}

impl StubIdentityApi {
    /// Accepts `session` at login and confirms its user on revalidation.
    pub fn accepting(session: StoredSession) -> Self {
        Self {
            who_am_i: Ok(session.user.clone()),
            login: Ok(session),
            logout: Ok(()),
            calls: Mutex::default(),
        }
    }

    /// Rejects every login and every token.
    pub fn rejecting() -> Self {
        Self {
            login: Err(IdentityApiError::unauthorized("invalid credentials")),
            who_am_i: Err(IdentityApiError::unauthorized("invalid token")),
            logout: Err(IdentityApiError::unauthorized("invalid token")),
            calls: Mutex::default(),
        }
    }

    /// Replace the revalidation response.
    #[must_use]
    pub fn with_who_am_i(mut self, response: Result<User, IdentityApiError>) -> Self {
        self.who_am_i = response;
        self
    }

    /// Replace the logout response.
    #[must_use]
    pub fn with_logout(mut self, response: Result<(), IdentityApiError>) -> Self {
        self.logout = response;
        self
    }

    /// Calls made so far, as `"<operation>"` or `"<operation>:<token>"`.
    pub fn calls(&self) -> Vec<String> {
        self.lock_calls().clone()
    }

    fn record(&self, call: String) {
        self.lock_calls().push(call);
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<String>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("identity calls mutex"),
        }
    }
}

#[async_trait]
impl IdentityApi for StubIdentityApi {
    async fn login(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<StoredSession, IdentityApiError> {
        self.record(format!("login:{}", credentials.email()));
        self.login.clone()
    }

    async fn who_am_i(&self, token: &AccessToken) -> Result<User, IdentityApiError> {
        self.record(format!("who_am_i:{}", token.expose()));
        self.who_am_i.clone()
    }

    async fn logout(&self, token: &AccessToken) -> Result<(), IdentityApiError> {
        self.record(format!("logout:{}", token.expose()));
        self.logout.clone()
    }
}
