//! Test utilities for the portal session crate.
//!
//! Shared by unit tests in `src/` and integration tests in `tests/`. Only
//! compiled for tests or with the `test-support` feature.

pub mod channel;
pub mod identity;

use crate::domain::{
    AccessToken, Notification, NotificationId, NotificationKind, StoredSession, User,
};

/// Build a valid user, panicking on invalid fixture input.
pub fn user(id: &str, name: &str, role: &str) -> User {
    let email = format!("{id}@example.com");
    match User::try_from_strings(id, name, email, role) {
        Ok(user) => user,
        Err(error) => panic!("fixture user '{id}' is invalid: {error}"),
    }
}

/// Pair `token` with `user`.
pub fn session(token: &str, user: User) -> StoredSession {
    match AccessToken::new(token) {
        Ok(token) => StoredSession::new(token, user),
        Err(error) => panic!("fixture token is invalid: {error}"),
    }
}

/// Parse a notification id.
pub fn notification_id(id: &str) -> NotificationId {
    match NotificationId::new(id) {
        Ok(id) => id,
        Err(error) => panic!("fixture notification id '{id}' is invalid: {error}"),
    }
}

/// Build an unread notification with a fixed timestamp.
pub fn notification(id: &str, kind: NotificationKind, message: &str) -> Notification {
    let timestamp = match chrono::DateTime::parse_from_rfc3339("2026-03-01T09:30:00Z") {
        Ok(timestamp) => timestamp.to_utc(),
        Err(error) => panic!("fixture timestamp is invalid: {error}"),
    };
    match Notification::new(notification_id(id), kind, message, timestamp) {
        Ok(notification) => notification,
        Err(error) => panic!("fixture notification '{id}' is invalid: {error}"),
    }
}
