//! The session object views receive.
//!
//! Bundles the auth gate, the role router and the notification channel
//! behind one injected service with an explicit `init` / `teardown`
//! lifecycle. Interactive sign-in is the only operation that reports
//! failures to the caller; ambient session and connectivity maintenance
//! degrades silently and logs.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::ports::{IdentityApi, IdentityApiError, NotificationTransport, SessionStore};
use super::{
    AuthGate, AuthState, ChannelOutcome, ChannelRuntime, DomainError, DomainResult,
    LoginCredentials, NotificationChannel, ReconnectPolicy, RoleRouter, RouteDecision, User,
};

/// Port bundle required by the session service.
pub struct SessionServicePorts {
    /// Persistence for the token and cached user.
    pub store: Arc<dyn SessionStore>,
    /// Remote identity endpoints.
    pub identity: Arc<dyn IdentityApi>,
    /// Push notification transport.
    pub transport: Arc<dyn NotificationTransport>,
}

impl SessionServicePorts {
    /// Build a strongly-typed port bundle.
    pub fn new(
        store: Arc<dyn SessionStore>,
        identity: Arc<dyn IdentityApi>,
        transport: Arc<dyn NotificationTransport>,
    ) -> Self {
        Self {
            store,
            identity,
            transport,
        }
    }
}

/// Session lifecycle, routing and notifications for one front-end.
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    identity: Arc<dyn IdentityApi>,
    gate: AuthGate,
    router: RoleRouter,
    channel: NotificationChannel,
}

impl SessionService {
    /// Build a service using the default reconnect runtime.
    pub fn new(ports: SessionServicePorts, router: RoleRouter, policy: ReconnectPolicy) -> Self {
        Self::with_runtime(ports, router, ChannelRuntime::default(), policy)
    }

    /// Build a service with injected reconnect timing seams.
    pub fn with_runtime(
        ports: SessionServicePorts,
        router: RoleRouter,
        runtime: ChannelRuntime,
        policy: ReconnectPolicy,
    ) -> Self {
        let SessionServicePorts {
            store,
            identity,
            transport,
        } = ports;
        Self {
            gate: AuthGate::new(Arc::clone(&store), Arc::clone(&identity)),
            channel: NotificationChannel::with_runtime(transport, runtime, policy),
            store,
            identity,
            router,
        }
    }

    /// Revalidate any persisted session. Never fails; see [`AuthGate::initialize`].
    pub async fn init(&self) -> AuthState {
        self.gate.initialize().await
    }

    /// Sign in interactively.
    ///
    /// Token and user are persisted together before the gate flips to
    /// `Authenticated`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::ErrorCode::Unauthorized`] for wrong
    /// credentials, `ServiceUnavailable` when the identity service cannot be
    /// reached and `InternalError` for an unusable response.
    pub async fn sign_in(&self, credentials: &LoginCredentials) -> DomainResult<User> {
        let session = self
            .identity
            .login(credentials)
            .await
            .map_err(map_sign_in_error)?;

        if let Err(error) = self.store.save(&session) {
            warn!(error = %error, "failed to persist session; it will not survive a reload");
        }
        self.channel.reset();
        let user = session.user.clone();
        self.gate.login(session);
        info!(user_id = %user.id(), role = ?user.role(), "signed in");
        Ok(user)
    }

    /// Close notifications, clear the feed and log out.
    pub async fn logout(&self) {
        self.channel.close();
        self.channel.clear_all();
        self.gate.logout().await;
    }

    /// Discard in-flight work when the owning view goes away. Idempotent.
    pub fn teardown(&self) {
        self.gate.teardown();
        self.channel.close();
    }

    /// Route `path` against the current session state.
    pub fn route(&self, path: &str) -> RouteDecision {
        self.router.resolve_for_state(&self.gate.state(), path)
    }

    /// Current session state.
    pub fn auth_state(&self) -> AuthState {
        self.gate.state()
    }

    /// Subscribe to session state changes.
    pub fn subscribe_auth(&self) -> watch::Receiver<AuthState> {
        self.gate.subscribe()
    }

    /// Notification feed and connection status.
    pub const fn notifications(&self) -> &NotificationChannel {
        &self.channel
    }

    /// Run the notification channel for the confirmed session.
    ///
    /// Resolves immediately with `Ineligible` when nobody is signed in or
    /// the role does not receive notifications.
    pub async fn run_notifications(&self) -> ChannelOutcome {
        let state = self.gate.state();
        match state.session() {
            Some(session) => self.channel.run(session).await,
            None => ChannelOutcome::Ineligible,
        }
    }
}

fn map_sign_in_error(error: IdentityApiError) -> DomainError {
    match error {
        IdentityApiError::Unauthorized { .. } => {
            DomainError::unauthorized("invalid email or password")
        }
        IdentityApiError::Rejected { status, message } if (400..500).contains(&status) => {
            DomainError::invalid_request(format!("sign-in rejected ({status}): {message}"))
        }
        IdentityApiError::Rejected { .. }
        | IdentityApiError::Timeout { .. }
        | IdentityApiError::Transport { .. } => {
            warn!(error = %error, "identity service unavailable during sign-in");
            DomainError::service_unavailable("sign-in is temporarily unavailable")
        }
        IdentityApiError::Decode { message } => {
            DomainError::internal(format!("unexpected sign-in response: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;
    use crate::domain::ports::{InMemorySessionStore, MockIdentityApi};
    use crate::domain::{ErrorCode, RouteTable, ViewTree};
    use crate::domain::ChannelStatus;
    use crate::test_support::channel::{
        ConnectScript, RecordingSleeper, ScriptedTransport, recording_runtime,
    };
    use crate::test_support::{session, user};

    fn service(store: Arc<InMemorySessionStore>, identity: MockIdentityApi) -> SessionService {
        service_over(store, identity, Arc::new(ScriptedTransport::default()))
    }

    fn service_over(
        store: Arc<InMemorySessionStore>,
        identity: MockIdentityApi,
        transport: Arc<ScriptedTransport>,
    ) -> SessionService {
        let router = RoleRouter::new(RouteTable::portal()).expect("portal table is valid");
        SessionService::with_runtime(
            SessionServicePorts::new(store, Arc::new(identity), transport),
            router,
            recording_runtime(Arc::new(RecordingSleeper::default())),
            ReconnectPolicy {
                max_attempts: 0,
                ..ReconnectPolicy::default()
            },
        )
    }

    fn credentials() -> LoginCredentials {
        LoginCredentials::try_from_parts("ada@example.com", "secret").expect("valid credentials")
    }

    #[tokio::test]
    async fn sign_in_persists_then_authenticates() {
        let signed_in = session("tok-1", user("1", "Ada Lovelace", "admin"));
        let returned = signed_in.clone();
        let mut identity = MockIdentityApi::new();
        identity
            .expect_login()
            .withf(|creds| creds.email() == "ada@example.com")
            .times(1)
            .returning(move |_| Ok(returned.clone()));
        let store = Arc::new(InMemorySessionStore::default());
        let service = service(store.clone(), identity);

        let user = service.sign_in(&credentials()).await.expect("sign-in succeeds");

        assert_eq!(&user, &signed_in.user);
        assert_eq!(store.current(), Some(signed_in.clone()));
        assert_eq!(service.auth_state(), AuthState::Authenticated(signed_in));
        assert_eq!(
            service.route("/admin/dashboard"),
            RouteDecision::Render {
                view: ViewTree::Role(crate::domain::Role::Admin)
            }
        );
    }

    #[rstest]
    #[case(IdentityApiError::unauthorized("bad password"), ErrorCode::Unauthorized)]
    #[case(IdentityApiError::rejected(422_u16, "email malformed"), ErrorCode::InvalidRequest)]
    #[case(IdentityApiError::rejected(503_u16, "maintenance"), ErrorCode::ServiceUnavailable)]
    #[case(IdentityApiError::timeout("10s elapsed"), ErrorCode::ServiceUnavailable)]
    #[case(IdentityApiError::decode("missing token"), ErrorCode::InternalError)]
    #[tokio::test]
    async fn sign_in_failures_are_surfaced(
        #[case] failure: IdentityApiError,
        #[case] expected: ErrorCode,
    ) {
        let mut identity = MockIdentityApi::new();
        identity
            .expect_login()
            .returning(move |_| Err(failure.clone()));
        let store = Arc::new(InMemorySessionStore::default());
        let service = service(store.clone(), identity);

        let error = service
            .sign_in(&credentials())
            .await
            .expect_err("sign-in must fail");

        assert_eq!(error.code(), expected);
        assert_eq!(store.current(), None);
        assert!(service.auth_state().is_initializing());
    }

    #[tokio::test]
    async fn logout_clears_session_and_feed() {
        let signed_in = session("tok-1", user("1", "Ada Lovelace", "admin"));
        let store = Arc::new(InMemorySessionStore::with_session(signed_in.clone()));
        let mut identity = MockIdentityApi::new();
        identity
            .expect_who_am_i()
            .returning(move |_| Ok(signed_in.user.clone()));
        identity
            .expect_logout()
            .withf(|token| token.expose() == "tok-1")
            .times(1)
            .returning(|_| Ok(()));
        let service = service(store.clone(), identity);
        service.init().await;

        service.logout().await;

        assert_eq!(service.auth_state(), AuthState::Unauthenticated);
        assert_eq!(store.current(), None);
        assert!(service.notifications().notifications().is_empty());
        assert_eq!(
            service.route("/admin/dashboard"),
            RouteDecision::RedirectToLogin {
                return_to: "/admin/dashboard".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn notifications_need_a_confirmed_session() {
        let service = service(
            Arc::new(InMemorySessionStore::default()),
            MockIdentityApi::new(),
        );

        assert_eq!(service.route("/admin"), RouteDecision::Loading);
        assert_eq!(service.run_notifications().await, ChannelOutcome::Ineligible);
    }

    async fn until(mut condition: impl FnMut() -> bool) {
        while !condition() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn signing_in_again_moves_the_feed_to_the_new_session() {
        let first = session("tok-a", user("1", "Ada Lovelace", "admin"));
        let second = session("tok-b", user("2", "Bo Admin", "admin"));
        let restored_user = first.user.clone();
        let returned = second.clone();
        let mut identity = MockIdentityApi::new();
        identity
            .expect_who_am_i()
            .returning(move |_| Ok(restored_user.clone()));
        identity
            .expect_login()
            .times(1)
            .returning(move |_| Ok(returned.clone()));
        let transport = Arc::new(ScriptedTransport::new([
            ConnectScript::Accept(vec![]),
            ConnectScript::Accept(vec![]),
        ]));
        let service = service_over(
            Arc::new(InMemorySessionStore::with_session(first)),
            identity,
            transport.clone(),
        );
        service.init().await;
        let connected = || service.notifications().status() == ChannelStatus::Connected;

        let switch = async {
            until(connected).await;
            service.sign_in(&credentials()).await.expect("sign-in succeeds");
            let stop = async {
                until(|| transport.connect_calls() == 2 && connected()).await;
                service.teardown();
            };
            let (outcome, ()) = tokio::join!(service.run_notifications(), stop);
            outcome
        };
        let (before, after) = tokio::join!(service.run_notifications(), switch);

        assert_eq!(before, ChannelOutcome::TornDown);
        assert_eq!(after, ChannelOutcome::TornDown);
        assert_eq!(transport.tokens(), ["tok-a", "tok-b"]);
        assert_eq!(service.auth_state(), AuthState::Authenticated(second));
    }
}
