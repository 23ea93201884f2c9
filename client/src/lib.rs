//! Session, role routing and notification feed core for the portal front-ends.
//!
//! The crate is laid out hexagonally: `domain` owns the types, services and
//! ports; `outbound` holds the adapters that talk to the filesystem, the
//! identity REST API and the notification socket.

pub mod config;
pub mod domain;
pub mod outbound;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::ClientSettings;
pub use domain::{AuthGate, AuthState, NotificationChannel, RoleRouter, SessionService};
