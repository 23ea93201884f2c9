//! Host entry-point: wires the session service to its adapters and keeps the
//! notification feed running until Ctrl-C.

use std::sync::Arc;

use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};

use portal_session::ClientSettings;
use portal_session::domain::{RoleRouter, RouteTable, SessionService, SessionServicePorts};
use portal_session::outbound::identity::HttpIdentityApi;
use portal_session::outbound::notifications::WsNotificationTransport;
use portal_session::outbound::storage::FileSessionStore;
use portal_session::telemetry::init_tracing;

#[actix_rt::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let settings = ClientSettings::load_from_iter(std::env::args_os())
        .map_err(|error| eyre!("failed to load settings: {error}"))?;
    let service = build_service(&settings)?;

    let state = service.init().await;
    match state.user() {
        Some(user) => info!(user_id = %user.id(), "session initialised"),
        None => info!("no session to restore"),
    }

    let (outcome, ()) = tokio::join!(service.run_notifications(), async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "failed to listen for Ctrl-C");
        }
        service.teardown();
    });
    info!(?outcome, "notification channel stopped");
    Ok(())
}

fn build_service(settings: &ClientSettings) -> Result<SessionService> {
    let session_file = settings.session_file();
    let directory = session_file
        .parent()
        .ok_or_else(|| eyre!("session file {} has no parent", session_file.display()))?;
    let file_name = session_file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| eyre!("session file {} has no file name", session_file.display()))?;
    let store = FileSessionStore::open(directory, file_name)
        .wrap_err("failed to open the session store")?;

    let timeout = settings.request_timeout();
    let identity = HttpIdentityApi::new(&settings.api_base_url()?, timeout)
        .wrap_err("failed to build the identity client")?;
    let transport = WsNotificationTransport::new(
        settings.notifications_url()?,
        timeout,
        Arc::new(DefaultClock),
    );

    let router = RoleRouter::new(RouteTable::portal())
        .map_err(|error| eyre!("invalid route table: {error}"))?;
    Ok(SessionService::new(
        SessionServicePorts::new(Arc::new(store), Arc::new(identity), Arc::new(transport)),
        router,
        settings.reconnect_policy(),
    ))
}
