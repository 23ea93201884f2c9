//! Port abstraction for the client-side session store.
//!
//! The store is the only resource shared between the auth gate and other
//! consumers. Its methods are synchronous on purpose: a save can never be
//! split across an await point, so no consumer can observe a token without
//! its user record.

use std::sync::{Mutex, PoisonError};

use crate::domain::StoredSession;

use super::define_port_error;

define_port_error! {
    /// Errors raised by session store adapters.
    pub enum SessionStoreError {
        /// The backing medium could not be read or written.
        Io { message: String } => "session store I/O failed: {message}",
        /// The persisted record exists but cannot be decoded.
        Corrupt { message: String } => "session store record is corrupt: {message}",
    }
}

/// Persistence of the token and cached user.
#[cfg_attr(test, mockall::automock)]
pub trait SessionStore: Send + Sync {
    /// Return the persisted session, or `None` when logged out.
    fn load(&self) -> Result<Option<StoredSession>, SessionStoreError>;

    /// Persist token and user together, replacing any previous session.
    fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError>;

    /// Remove both fields. Clearing an empty store succeeds.
    fn clear(&self) -> Result<(), SessionStoreError>;
}

/// Process-local store used by tests and embedding hosts without a disk.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    slot: Mutex<Option<StoredSession>>,
}

impl InMemorySessionStore {
    /// Build a store pre-populated with `session`.
    pub fn with_session(session: StoredSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }

    /// Peek at the current contents.
    pub fn current(&self) -> Option<StoredSession> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>, SessionStoreError> {
        Ok(self.current())
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}
