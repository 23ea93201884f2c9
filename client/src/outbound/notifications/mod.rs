//! Notification outbound adapters.
//!
//! A WebSocket implementation of the `NotificationTransport` port.

mod dto;
mod ws_transport;

pub use ws_transport::WsNotificationTransport;
