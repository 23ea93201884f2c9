//! Notifications pushed to privileged sessions and the in-memory feed that
//! holds them.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validation errors for notification payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationValidationError {
    /// Id was blank once trimmed.
    EmptyId,
    /// Message was blank once trimmed.
    EmptyMessage,
}

impl fmt::Display for NotificationValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "notification id must not be empty"),
            Self::EmptyMessage => write!(f, "notification message must not be empty"),
        }
    }
}

impl std::error::Error for NotificationValidationError {}

/// Server-assigned notification identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NotificationId(String);

impl NotificationId {
    /// Validate and construct a [`NotificationId`].
    pub fn new(id: impl Into<String>) -> Result<Self, NotificationValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(NotificationValidationError::EmptyId);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for NotificationId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<NotificationId> for String {
    fn from(value: NotificationId) -> Self {
        value.0
    }
}

impl TryFrom<String> for NotificationId {
    type Error = NotificationValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Closed set of events the notification service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A user signed in.
    Login,
    /// A generic account registration.
    Registration,
    /// A contractor registered and awaits review.
    ContractorRegistration,
    /// A coordinator registered and awaits review.
    CoordinatorRegistration,
    /// A customer registered.
    CustomerRegistration,
    /// A technician registered and awaits review.
    TechnicianRegistration,
    /// Something needs an administrator's approval.
    ApprovalRequest,
    /// A pending request was approved.
    ApprovalGranted,
    /// A pending request was rejected.
    ApprovalRejected,
}

/// One entry of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    id: NotificationId,
    kind: NotificationKind,
    message: String,
    timestamp: DateTime<Utc>,
    read: bool,
}

impl Notification {
    /// Build an unread notification.
    pub fn new(
        id: NotificationId,
        kind: NotificationKind,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, NotificationValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(NotificationValidationError::EmptyMessage);
        }
        Ok(Self {
            id,
            kind,
            message,
            timestamp,
            read: false,
        })
    }

    /// Server-assigned identifier.
    pub const fn id(&self) -> &NotificationId {
        &self.id
    }

    /// Event category.
    pub const fn kind(&self) -> NotificationKind {
        self.kind
    }

    /// Text shown in the feed.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// When the server emitted the event.
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether the user has read the entry.
    pub const fn is_read(&self) -> bool {
        self.read
    }
}

/// Ordered, newest-first collection of notifications for one session.
///
/// ## Invariants
/// - The unread count is derived from the entries on every call, so it always
///   equals the number of entries with `read = false`.
/// - Ids are unique; pushing an id that is already present is a no-op.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use portal_session::domain::{Notification, NotificationFeed, NotificationId, NotificationKind};
///
/// let mut feed = NotificationFeed::default();
/// let id = NotificationId::new("n-1").unwrap();
/// let entry = Notification::new(id.clone(), NotificationKind::Login, "Ada signed in", Utc::now()).unwrap();
/// feed.push(entry);
/// assert_eq!(feed.unread_count(), 1);
/// assert!(feed.mark_as_read(&id));
/// assert_eq!(feed.unread_count(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFeed {
    entries: VecDeque<Notification>,
}

impl NotificationFeed {
    /// Prepend an inbound notification.
    ///
    /// Returns `false` when an entry with the same id is already present.
    pub fn push(&mut self, notification: Notification) -> bool {
        if self.position(notification.id()).is_some() {
            return false;
        }
        self.entries.push_front(notification);
        true
    }

    /// Mark one entry as read.
    ///
    /// Returns `true` only when the entry existed and was unread, i.e. when
    /// the unread count actually dropped.
    pub fn mark_as_read(&mut self, id: &NotificationId) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id() == id) {
            Some(entry) if !entry.read => {
                entry.read = true;
                true
            }
            _ => false,
        }
    }

    /// Mark every entry as read.
    pub fn mark_all_as_read(&mut self) {
        for entry in &mut self.entries {
            entry.read = true;
        }
    }

    /// Remove one entry, returning it if it was present.
    pub fn delete(&mut self, id: &NotificationId) -> Option<Notification> {
        self.position(id).and_then(|index| self.entries.remove(index))
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries with `read = false`.
    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.read).count()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the feed is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries newest-first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    /// Owned copy of the entries, newest-first.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries.iter().cloned().collect()
    }

    fn position(&self, id: &NotificationId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id() == id)
    }
}
