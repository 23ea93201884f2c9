//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod identity_api;
mod notification_transport;
mod session_store;

#[cfg(test)]
pub use identity_api::MockIdentityApi;
pub use identity_api::{IdentityApi, IdentityApiError};
pub use notification_transport::{
    NotificationConnection, NotificationTransport, NotificationTransportError,
};
#[cfg(test)]
pub use session_store::MockSessionStore;
pub use session_store::{InMemorySessionStore, SessionStore, SessionStoreError};
