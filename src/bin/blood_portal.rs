//! Blood-donation portal server.
//!
//! Serves the auth routes and a session-protected `/profile` area.
//! Configuration comes from the environment; see
//! [`PortalConfig::from_env`](blood_portal::session::PortalConfig::from_env).

use std::net::SocketAddr;

use axum::response::{IntoResponse, Redirect};
use axum::routing::get;
use axum::{Json, Router};
use blood_portal::session::{PortalConfig, PortalState, Session, auth_routes, protect};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Portal stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = PortalConfig::from_env()?;
    let state = PortalState::new(config);

    let addr: SocketAddr = std::env::var("PORTAL_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;

    let app = app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Portal listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Portal shut down");
    Ok(())
}

fn app(state: PortalState) -> Router {
    let pages = Router::new()
        .route("/", get(|| async { Redirect::to("/profile") }))
        .route("/profile", get(profile))
        .with_state(state.clone());

    protect(pages, &state).merge(auth_routes(state))
}

/// Profile data of the logged-in visitor. Anonymous visitors never get here.
async fn profile(session: Session) -> impl IntoResponse {
    Json(session.into_data())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,tower=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
