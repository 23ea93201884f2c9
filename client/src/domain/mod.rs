//! Domain primitives, services and ports.
//!
//! Purpose: model the session lifecycle (store, gate, router) and the
//! admin notification feed without depending on any transport. Adapters in
//! `crate::outbound` implement the ports declared in [`ports`].
//!
//! Public surface:
//! - DomainError / ErrorCode: failures surfaced to explicit user actions.
//! - User, Role: the authenticated principal as seen by the UI.
//! - AuthGate: start-up revalidation, login and logout state machine.
//! - RoleRouter: advisory, fail-closed path dispatch.
//! - NotificationChannel: reconnecting push feed for privileged roles.
//! - SessionService: the injected object views receive.

pub mod auth;
pub mod auth_gate;
pub mod error;
pub mod notification;
pub mod notification_channel;
pub mod ports;
pub mod role;
pub mod role_router;
pub mod session_service;
pub mod user;

pub use self::auth::{
    AccessToken, AccessTokenValidationError, AuthState, LoginCredentials, LoginValidationError,
    StoredSession,
};
pub use self::auth_gate::AuthGate;
pub use self::error::{DomainError, ErrorCode};
pub use self::notification::{
    Notification, NotificationFeed, NotificationId, NotificationKind,
    NotificationValidationError,
};
pub use self::notification_channel::{
    AttemptJitter, BackoffJitter, ChannelOutcome, ChannelRuntime, ChannelStatus, DisconnectReason,
    NotificationChannel, ReconnectPolicy, ReconnectSleeper, TokioSleeper,
};
pub use self::role::{Role, RoleClaim};
pub use self::role_router::{
    Access, RoleRouter, RouteDecision, RouteTable, RouteTableError, ViewTree,
};
pub use self::session_service::{SessionService, SessionServicePorts};
pub use self::user::{DisplayName, Email, User, UserId, UserValidationError};

/// Convenient result alias for user-initiated operations.
pub type DomainResult<T> = Result<T, DomainError>;
