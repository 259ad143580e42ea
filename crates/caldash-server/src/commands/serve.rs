//! The `serve` command: wires the Google broker and event source into the
//! router and runs it until Ctrl-C.

use std::sync::Arc;

use caldash_providers::google::{GoogleEventSource, GoogleSessionBroker};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::app::{AppState, router};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Runs the web server.
pub async fn run(config: &ServerConfig) -> ServerResult<()> {
    let addr = config.bind_addr().map_err(ServerError::config)?;
    let google = config.to_google_config().map_err(ServerError::config)?;
    let settings = config.to_app_settings().map_err(ServerError::config)?;

    let broker = GoogleSessionBroker::new(&google)?;
    let source = GoogleEventSource::new(&google)?;

    info!(
        timezone = %settings.timezone,
        calendar = %settings.calendar_id,
        redirect_uri = %settings.redirect_uri,
        "starting dashboard"
    );

    let app = router(AppState::new(Arc::new(broker), Arc::new(source), settings));

    let listener = TcpListener::bind(addr).await?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
    }
}
