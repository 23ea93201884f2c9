//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **storage**: the session file, written through `cap-std`
//! - **identity**: the REST identity endpoints, reached with `reqwest`
//! - **notifications**: the push socket, reached with the `awc` WebSocket client
//! - **wire**: JSON shapes both remote adapters decode
//!
//! Adapters are thin translators between domain types and wire formats. They
//! contain no session logic.

pub mod identity;
pub mod notifications;
pub mod storage;
mod wire;
