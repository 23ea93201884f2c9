//! Start-up session revalidation, login and logout.
//!
//! State machine: `Initializing -> {Authenticated, Unauthenticated}`. Every
//! failure during initialisation degrades to logged-out without retrying; a
//! stale or invalid token must never block the app.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::ports::{IdentityApi, SessionStore};
use super::{AuthState, StoredSession};

/// Session gate shared by every view.
///
/// Each `login`, `logout` and `teardown` advances an epoch. An identity check
/// that resolves under an older epoch is discarded: it touches neither the
/// published state nor the store.
pub struct AuthGate {
    store: Arc<dyn SessionStore>,
    identity: Arc<dyn IdentityApi>,
    state: watch::Sender<AuthState>,
    epoch: AtomicU64,
}

impl AuthGate {
    /// Build a gate in the `Initializing` state.
    pub fn new(store: Arc<dyn SessionStore>, identity: Arc<dyn IdentityApi>) -> Self {
        let (state, _) = watch::channel(AuthState::Initializing { cached: None });
        Self {
            store,
            identity,
            state,
            epoch: AtomicU64::new(0),
        }
    }

    /// Current state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Revalidate the persisted session against the identity endpoint.
    ///
    /// The server's user record overwrites the cached one on success. Any
    /// failure clears the store and ends logged out; nothing is surfaced.
    pub async fn initialize(&self) -> AuthState {
        let epoch = self.epoch.load(Ordering::SeqCst);

        let stored = match self.store.load() {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                debug!("no stored session; starting logged out");
                self.apply(epoch, AuthState::Unauthenticated);
                return self.state();
            }
            Err(error) => {
                if error.is_corrupt() {
                    warn!(error = %error, "stored session corrupt; purging");
                } else {
                    warn!(error = %error, "stored session unreadable; purging");
                }
                self.clear_store();
                self.apply(epoch, AuthState::Unauthenticated);
                return self.state();
            }
        };

        self.apply(
            epoch,
            AuthState::Initializing {
                cached: Some(stored.user.clone()),
            },
        );

        let outcome = self.identity.who_am_i(&stored.token).await;
        if !self.is_current(epoch) {
            debug!("session changed while the identity check was in flight; discarding result");
            return self.state();
        }

        match outcome {
            Ok(user) => {
                let session = StoredSession::new(stored.token, user);
                if let Err(error) = self.store.save(&session) {
                    warn!(error = %error, "failed to refresh stored session");
                }
                self.apply(epoch, AuthState::Authenticated(session));
            }
            Err(error) => {
                info!(error = %error, "stored session rejected; continuing logged out");
                self.clear_store();
                self.apply(epoch, AuthState::Unauthenticated);
            }
        }
        self.state()
    }

    /// Enter `Authenticated` after an interactive login.
    ///
    /// Only in-memory state changes here; the caller persists the session when
    /// the login response arrives.
    pub fn login(&self, session: StoredSession) {
        self.state.send_modify(|state| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *state = AuthState::Authenticated(session);
        });
    }

    /// Log out locally, then tell the server on a best-effort basis.
    ///
    /// The client transition never waits for, or depends on, the server call.
    pub async fn logout(&self) {
        let mut previous = AuthState::Unauthenticated;
        self.state.send_modify(|state| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            previous = std::mem::replace(state, AuthState::Unauthenticated);
        });

        let token = match previous {
            AuthState::Authenticated(session) => Some(session.token),
            AuthState::Initializing { .. } | AuthState::Unauthenticated => self
                .store
                .load()
                .ok()
                .flatten()
                .map(|stored| stored.token),
        };
        self.clear_store();

        if let Some(token) = token {
            if let Err(error) = self.identity.logout(&token).await {
                warn!(error = %error, "server-side logout failed; client session already cleared");
            }
        }
    }

    /// Discard any identity check still in flight.
    ///
    /// Called when the owning view goes away. Safe to call repeatedly.
    pub fn teardown(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn apply(&self, epoch: u64, next: AuthState) {
        self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            *state = next;
            true
        });
    }

    fn clear_store(&self) {
        if let Err(error) = self.store.clear() {
            warn!(error = %error, "failed to clear stored session");
        }
    }
}
