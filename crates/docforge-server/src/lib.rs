//! HTTP surface for the docforge pipeline: project/document lifecycle,
//! per-stage agent execution, streaming progress, and export. Everything
//! under `/api/v1` except health/auth bootstrap requires a bearer token.

mod accounts;
mod error;
mod handlers;
mod middleware;
mod state;

use std::net::SocketAddr;
use std::time::Duration;

use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use error::AppError;
pub use state::{AppState, ServerConfig};

fn api_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/validate-token", post(handlers::auth::validate_token))
        .route("/agents/health", get(handlers::agents::agents_health));

    let protected = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/blacklist/stats", get(handlers::auth::blacklist_stats))
        .route(
            "/projects",
            get(handlers::projects::list_projects).post(handlers::projects::create_project),
        )
        .route(
            "/projects/{id}",
            get(handlers::projects::get_project)
                .put(handlers::projects::update_project)
                .delete(handlers::projects::delete_project),
        )
        .route("/projects/{id}/step{step}", post(handlers::stages::execute_stage))
        .route("/projects/{id}/progress", get(handlers::progress::get_progress))
        .route("/projects/{id}/events", get(handlers::events::stream_events))
        .route("/projects/{id}/export", post(handlers::exports::create_export))
        .route("/exports/{id}", get(handlers::exports::download_export))
        .route("/agents/workflow/execute-stream", post(handlers::agents::execute_workflow_stream))
        .layer(axum_middleware::from_fn_with_state(state.clone(), middleware::auth_middleware));

    Router::new().merge(public).merge(protected)
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .nest("/api/v1", api_router(state.clone()))
        .layer(axum_middleware::from_fn_with_state(state.clone(), middleware::rate_limit_middleware))
        .layer(axum_middleware::from_fn(middleware::request_size_limit_middleware))
        .layer(axum_middleware::from_fn(middleware::security_headers_middleware))
        .layer(cors)
        .with_state(state)
}

/// Binds and serves until Ctrl-C, running the export sweeper as a
/// background task that shares the same repository handle as the request
/// handlers. The sweeper task is aborted once the listener shuts down.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::bootstrap(&config).await?;
    let sweeper_exports = state.exports.exports();
    let sweeper = tokio::spawn(docforge_export::sweeper::run(sweeper_exports));

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "docforge-server listening");

    let result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                futures::future::pending::<()>().await;
            }
            tracing::info!("shutdown signal received");
        })
        .await;

    sweeper.abort();
    let _ = tokio::time::timeout(Duration::from_secs(1), sweeper).await;
    result?;
    Ok(())
}
