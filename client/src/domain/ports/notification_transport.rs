//! Port abstraction for the push notification transport.
//!
//! The channel runs on the UI's single-threaded executor, so these traits do
//! not require `Send`. A transport opens connections; a connection yields
//! inbound notifications and carries best-effort read acknowledgements.

use async_trait::async_trait;

use crate::domain::{AccessToken, Notification, NotificationId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by notification transport adapters.
    pub enum NotificationTransportError {
        /// The handshake was refused or failed.
        Handshake { message: String } => "notification handshake failed: {message}",
        /// The established connection broke.
        Transport { message: String } => "notification transport failed: {message}",
    }
}

/// Factory for authenticated notification connections.
#[async_trait(?Send)]
pub trait NotificationTransport {
    /// Open a connection, presenting `token` at handshake time.
    async fn connect(
        &self,
        token: &AccessToken,
    ) -> Result<Box<dyn NotificationConnection>, NotificationTransportError>;
}

/// One live connection to the notification service.
#[async_trait(?Send)]
pub trait NotificationConnection {
    /// Wait for the next notification.
    ///
    /// Returns `Ok(None)` when the server closed the connection. Must be
    /// cancel-safe: dropping the future loses no already-received event.
    async fn next_notification(
        &mut self,
    ) -> Result<Option<Notification>, NotificationTransportError>;

    /// Tell the server a notification was read.
    async fn acknowledge_read(
        &mut self,
        id: &NotificationId,
    ) -> Result<(), NotificationTransportError>;

    /// Close the connection. Calling it more than once is harmless.
    async fn close(&mut self);
}
