//! Identity adapter tests against a local actix-web server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::http::header;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use portal_session::domain::ports::IdentityApi;
use portal_session::domain::{AccessToken, LoginCredentials, Role};
use portal_session::outbound::identity::HttpIdentityApi;
use portal_session::test_support::{session, user};
use rstest::rstest;
use serde_json::{Value, json};
use url::Url;

const TOKEN: &str = "tok-1";

#[derive(Clone, Default)]
struct ServerLog(Arc<Mutex<Vec<String>>>);

impl ServerLog {
    fn push(&self, entry: String) {
        self.0.lock().expect("server log").push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().expect("server log").clone()
    }
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

async fn login(body: web::Json<Value>, log: web::Data<ServerLog>) -> HttpResponse {
    let email = body["email"].as_str().unwrap_or_default();
    log.push(format!("login:{email}"));
    if body["password"] != "secret" {
        return HttpResponse::Unauthorized().json(json!({ "message": "invalid credentials" }));
    }
    HttpResponse::Ok().json(json!({
        "token": TOKEN,
        "user": {
            "id": 5,
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "5@example.com",
            "role": "admin"
        }
    }))
}

async fn who_am_i(req: HttpRequest, log: web::Data<ServerLog>) -> HttpResponse {
    let presented = bearer(&req).unwrap_or_default();
    log.push(format!("me:{presented}"));
    match presented {
        TOKEN => HttpResponse::Ok().json(json!({
            "user": {
                "id": "5",
                "name": "Ada Lovelace",
                "email": "5@example.com",
                "role": "admin"
            }
        })),
        "tok-banned" => HttpResponse::Forbidden().finish(),
        _ => HttpResponse::Unauthorized().body("token expired"),
    }
}

async fn logout(req: HttpRequest, log: web::Data<ServerLog>) -> HttpResponse {
    let presented = bearer(&req).unwrap_or_default();
    log.push(format!("logout:{presented}"));
    if presented == TOKEN {
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::InternalServerError().body("session store offline")
    }
}

fn start_server(log: ServerLog) -> (Url, ServerHandle) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(log.clone()))
            .route("/api/v1/auth/login", web::post().to(login))
            .route("/api/v1/auth/me", web::get().to(who_am_i))
            .route("/api/v1/auth/logout", web::post().to(logout))
    })
    .listen(listener)
    .expect("bind test server")
    .disable_signals()
    .run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    let base = Url::parse(&format!("http://{addr}/api/v1")).expect("valid base url");
    (base, handle)
}

fn api(base: &Url) -> HttpIdentityApi {
    HttpIdentityApi::new(base, Duration::from_secs(5)).expect("client builds")
}

fn token(raw: &str) -> AccessToken {
    AccessToken::new(raw).expect("valid token")
}

#[actix_rt::test]
async fn who_am_i_unwraps_the_user_record() {
    let log = ServerLog::default();
    let (base, handle) = start_server(log.clone());

    let resolved = api(&base).who_am_i(&token(TOKEN)).await.expect("identity resolves");

    assert_eq!(resolved, user("5", "Ada Lovelace", "admin"));
    assert_eq!(resolved.role().role(), Some(Role::Admin));
    assert_eq!(log.entries(), vec![format!("me:{TOKEN}")]);
    handle.stop(false).await;
}

#[rstest]
#[case::expired("tok-2")]
#[case::forbidden("tok-banned")]
#[actix_rt::test]
async fn refused_tokens_are_unauthorized(#[case] presented: &str) {
    let (base, handle) = start_server(ServerLog::default());

    let error = api(&base)
        .who_am_i(&token(presented))
        .await
        .expect_err("token must be refused");

    assert!(error.is_unauthorized(), "unexpected error: {error}");
    handle.stop(false).await;
}

#[actix_rt::test]
async fn login_returns_a_session_with_a_synthesised_name() {
    let log = ServerLog::default();
    let (base, handle) = start_server(log.clone());
    let credentials =
        LoginCredentials::try_from_parts("5@example.com", "secret").expect("valid credentials");

    let signed_in = api(&base).login(&credentials).await.expect("login succeeds");

    assert_eq!(signed_in, session(TOKEN, user("5", "Ada Lovelace", "admin")));
    assert_eq!(log.entries(), vec!["login:5@example.com".to_owned()]);
    handle.stop(false).await;
}

#[actix_rt::test]
async fn wrong_password_is_unauthorized() {
    let (base, handle) = start_server(ServerLog::default());
    let credentials =
        LoginCredentials::try_from_parts("5@example.com", "guess").expect("valid credentials");

    let error = api(&base)
        .login(&credentials)
        .await
        .expect_err("login must fail");

    assert!(error.is_unauthorized());
    assert!(error.to_string().contains("invalid credentials"));
    handle.stop(false).await;
}

#[actix_rt::test]
async fn logout_posts_the_bearer_token() {
    let log = ServerLog::default();
    let (base, handle) = start_server(log.clone());
    let api = api(&base);

    api.logout(&token(TOKEN)).await.expect("logout succeeds");
    let error = api
        .logout(&token("tok-2"))
        .await
        .expect_err("server failure is reported");

    assert!(!error.is_unauthorized());
    assert!(error.to_string().contains("session store offline"));
    assert_eq!(
        log.entries(),
        vec![format!("logout:{TOKEN}"), "logout:tok-2".to_owned()]
    );
    handle.stop(false).await;
}
