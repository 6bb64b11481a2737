//! HTTP server.
//!
//! Public routes: `/`, `/submit`, `/health`, `/version`, `/static/{filename}`.
//! The `/admin` routes are mounted when `admin.enabled` is set at startup.

pub mod admin;
pub mod handlers;
pub mod pages;
pub mod session;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::{from_fn, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::error::Result;

pub use state::{AppState, SharedState};

/// Build the router.
pub fn router(state: SharedState, admin_enabled: bool) -> Router {
    let mut app = Router::new()
        .route("/", get(handlers::index))
        .route("/submit", post(handlers::submit))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        .route("/static/{filename}", get(handlers::static_file));

    if admin_enabled {
        app = app.merge(admin::routes());
    }

    app.fallback(handlers::not_found)
        .layer(from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    debug!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        "Request completed"
    );
    response
}

/// Run the server until Ctrl+C or SIGTERM, then close the radio link.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(state: SharedState) -> Result<()> {
    let config = state.config().await;
    let app = router(Arc::clone(&state), config.admin.enabled);
    let address = config.bind_address();

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(
        "{} v{} ({})",
        config.app.name, config.app.version, config.app.build_date
    );
    info!("Web server: http://{}", address);
    info!("Meshtastic: {}", config.meshtastic.device);
    info!(
        "Channel: {} ({})",
        config.meshtastic.channel_index, config.meshtastic.channel_name
    );
    info!("Template: {}", config.template_path().display());
    if config.admin.enabled {
        info!("Administration: http://{}/admin", address);
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    state.transmitter().close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
