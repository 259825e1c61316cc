use axum::{
    Router,
    http::{Method, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use std::{future::Future, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    sensitive_headers::SetSensitiveHeadersLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    api::{realtime, screens},
    config::AppConfig,
    pairing::PairingCoordinator,
    util::app_state::AppState,
};

async fn get_status() -> impl IntoResponse {
    "ok".to_string()
}

async fn fallback() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}

fn request_timeout(timeout: std::time::Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    // the websocket route stays outside the timeout layer, sockets live for hours
    let rest = Router::new()
        .nest("/api/screens", screens::create_route())
        .route("/status", get(get_status))
        .layer(request_timeout(state.config.request_timeout));

    Router::new()
        .merge(rest)
        .merge(realtime::create_route())
        .fallback(fallback)
        .with_state(state)
        .layer(cors)
        .layer(SetSensitiveHeadersLayer::new(std::iter::once(
            header::AUTHORIZATION,
        )))
        .layer(TraceLayer::new_for_http())
}

/// Serves until `shutdown` resolves. The expiry sweeper runs alongside and
/// stops with the server.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let sweeper = tokio::spawn(run_sweeper(
        state.pairing.clone(),
        state.config.sweep_interval,
    ));

    info!("REST listening on {}", listener.local_addr()?);
    let app = build_router(state);
    let res = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    sweeper.abort();
    if let Err(e) = &res {
        warn!("Axum server failed: {e:?}");
    }
    Ok(res?)
}

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind((config.bind_address.as_str(), config.rest_port)).await?;
    let state = AppState::new(config);
    serve(listener, state, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, stopping server");
        }
    })
    .await
}

async fn run_sweeper(pairing: Arc<PairingCoordinator>, every: std::time::Duration) {
    let mut interval = tokio::time::interval(every.max(std::time::Duration::from_secs(1)));
    loop {
        interval.tick().await;
        pairing.purge_expired(Utc::now()).await;
    }
}
