//! End-to-end session scenarios across the gate, router and notification
//! channel, driven through in-process doubles.

use std::sync::Arc;
use std::time::Duration;

use portal_session::domain::ports::{IdentityApiError, InMemorySessionStore, SessionStore};
use portal_session::domain::{
    AuthState, ChannelOutcome, ChannelStatus, DisconnectReason, ErrorCode, LoginCredentials,
    NotificationKind, ReconnectPolicy, Role, RoleRouter, RouteDecision, RouteTable,
    SessionService, SessionServicePorts, StoredSession, ViewTree,
};
use portal_session::test_support::channel::{
    ConnectScript, RecordingSleeper, ScriptedEvent, ScriptedTransport, recording_runtime,
};
use portal_session::test_support::identity::StubIdentityApi;
use portal_session::test_support::{notification, notification_id, session, user};
use rstest::{fixture, rstest};

struct Harness {
    store: Arc<InMemorySessionStore>,
    identity: Arc<StubIdentityApi>,
    transport: Arc<ScriptedTransport>,
    service: SessionService,
}

impl Harness {
    fn new(
        store: InMemorySessionStore,
        identity: StubIdentityApi,
        transport: ScriptedTransport,
    ) -> Self {
        let store = Arc::new(store);
        let identity = Arc::new(identity);
        let transport = Arc::new(transport);
        let service = SessionService::with_runtime(
            SessionServicePorts::new(store.clone(), identity.clone(), transport.clone()),
            RoleRouter::new(RouteTable::portal()).expect("portal table is valid"),
            recording_runtime(Arc::new(RecordingSleeper::default())),
            ReconnectPolicy {
                max_attempts: 1,
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(20),
            },
        );
        Self {
            store,
            identity,
            transport,
            service,
        }
    }
}

#[fixture]
fn admin() -> StoredSession {
    session("tok-admin", user("1", "Ada Admin", "admin"))
}

#[fixture]
fn contractor() -> StoredSession {
    session("tok-contractor", user("7", "Cy Contractor", "contractor"))
}

fn credentials(email: &str) -> LoginCredentials {
    LoginCredentials::try_from_parts(email, "secret").expect("valid credentials")
}

async fn until(mut condition: impl FnMut() -> bool) {
    while !condition() {
        tokio::task::yield_now().await;
    }
}

#[rstest]
#[tokio::test]
async fn restored_admin_receives_notifications_until_logout(admin: StoredSession) {
    let harness = Harness::new(
        InMemorySessionStore::with_session(admin.clone()),
        StubIdentityApi::accepting(admin.clone()),
        ScriptedTransport::new([ConnectScript::Accept(vec![
            ScriptedEvent::Deliver(notification(
                "n-1",
                NotificationKind::ContractorRegistration,
                "Cy registered",
            )),
            ScriptedEvent::Deliver(notification("n-2", NotificationKind::Login, "Ada signed in")),
        ])]),
    );
    let service = &harness.service;

    assert_eq!(service.init().await, AuthState::Authenticated(admin.clone()));
    assert_eq!(
        service.route("/admin/users"),
        RouteDecision::Render {
            view: ViewTree::Role(Role::Admin)
        }
    );

    let (outcome, ()) = tokio::join!(service.run_notifications(), async {
        let feed = service.notifications();
        until(|| feed.unread_count() == 2).await;
        assert!(feed.mark_as_read(&notification_id("n-1")));
        until(|| harness.transport.acks().len() == 1).await;
        service.logout().await;
    });

    assert_eq!(outcome, ChannelOutcome::TornDown);
    assert_eq!(harness.transport.tokens(), vec!["tok-admin".to_owned()]);
    assert_eq!(harness.transport.acks(), vec![notification_id("n-1")]);
    assert_eq!(
        service.notifications().status(),
        ChannelStatus::Disconnected {
            reason: DisconnectReason::TornDown
        }
    );
    assert!(service.notifications().notifications().is_empty());
    assert_eq!(service.auth_state(), AuthState::Unauthenticated);
    assert_eq!(harness.store.current(), None);
    assert_eq!(
        harness.identity.calls(),
        vec!["who_am_i:tok-admin".to_owned(), "logout:tok-admin".to_owned()]
    );
}

#[rstest]
#[tokio::test]
async fn rejected_token_is_purged_on_start_up(admin: StoredSession) {
    let harness = Harness::new(
        InMemorySessionStore::with_session(admin.clone()),
        StubIdentityApi::accepting(admin)
            .with_who_am_i(Err(IdentityApiError::unauthorized("token expired"))),
        ScriptedTransport::default(),
    );
    let service = &harness.service;

    assert_eq!(service.init().await, AuthState::Unauthenticated);
    assert_eq!(harness.store.load().expect("load succeeds"), None);
    assert_eq!(
        service.route("/admin/dashboard"),
        RouteDecision::RedirectToLogin {
            return_to: "/admin/dashboard".to_owned()
        }
    );
    assert_eq!(service.run_notifications().await, ChannelOutcome::Ineligible);
    assert_eq!(harness.transport.connect_calls(), 0);
}

#[rstest]
#[tokio::test]
async fn contractor_sign_in_routes_home_without_notifications(contractor: StoredSession) {
    let harness = Harness::new(
        InMemorySessionStore::default(),
        StubIdentityApi::accepting(contractor.clone()),
        ScriptedTransport::default(),
    );
    let service = &harness.service;
    assert_eq!(service.init().await, AuthState::Unauthenticated);

    let signed_in = service
        .sign_in(&credentials("7@example.com"))
        .await
        .expect("sign-in succeeds");

    assert_eq!(&signed_in, &contractor.user);
    assert_eq!(harness.store.current(), Some(contractor));
    assert_eq!(
        service.route("/admin"),
        RouteDecision::RedirectToDashboard {
            path: "/contractor/dashboard"
        }
    );
    assert_eq!(service.run_notifications().await, ChannelOutcome::Ineligible);
    assert_eq!(harness.transport.connect_calls(), 0);
    assert_eq!(harness.identity.calls(), vec!["login:7@example.com".to_owned()]);
}

#[tokio::test]
async fn wrong_credentials_leave_the_visitor_signed_out() {
    let harness = Harness::new(
        InMemorySessionStore::default(),
        StubIdentityApi::rejecting(),
        ScriptedTransport::default(),
    );
    let service = &harness.service;
    service.init().await;

    let error = service
        .sign_in(&credentials("eve@example.com"))
        .await
        .expect_err("sign-in must fail");

    assert_eq!(error.code(), ErrorCode::Unauthorized);
    assert_eq!(service.auth_state(), AuthState::Unauthenticated);
    assert_eq!(harness.store.current(), None);
    assert_eq!(
        service.route("/register"),
        RouteDecision::Render {
            view: ViewTree::Public
        }
    );
}
