use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Serialize;
use signage_shared::{
    pairing::{
        CompletePairingBody, CompletedPairing, InitiatePairingBody, InitiatePairingResponse,
        PairingStatus, PendingPairing,
    },
    realtime::Envelope,
    screen::ScreenId,
};

use crate::auth::admin::AdminAccess;
use crate::realtime::ScreenSession;
use crate::response::{ServerAppResult, ServerError, ServerResponse};
use crate::util::app_state::AppState;

pub fn create_route() -> Router<AppState> {
    Router::new()
        .route("/initiate-pairing", post(initiate_pairing))
        .route("/pairing-status/{device_id}", get(get_pairing_status))
        .route("/complete-pairing", post(complete_pairing))
        .route("/pairing-requests", get(get_pairing_requests))
        .route("/sessions", get(get_sessions))
        .route("/broadcast", post(broadcast))
        .route("/{screen_id}/push", post(push_to_screen))
}

async fn initiate_pairing(
    State(state): State<AppState>,
    Json(payload): Json<InitiatePairingBody>,
) -> ServerAppResult<InitiatePairingResponse> {
    let res = state
        .pairing
        .initiate_pairing(&payload.device_hardware_id)
        .await?;
    Ok(ServerResponse::builder().body(res).ok().build())
}

async fn get_pairing_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> ServerAppResult<PairingStatus> {
    let status = state.pairing.pairing_status(&device_id).await;
    Ok(ServerResponse::builder().body(status).ok().build())
}

async fn complete_pairing(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Json(payload): Json<CompletePairingBody>,
) -> ServerAppResult<CompletedPairing> {
    let res = state
        .pairing
        .complete_pairing(
            &payload.pairing_code,
            payload.screen_id,
            payload.playlist_id,
            payload.name,
        )
        .await?;
    Ok(ServerResponse::builder().body(res).ok().build())
}

async fn get_pairing_requests(
    _admin: AdminAccess,
    State(state): State<AppState>,
) -> ServerAppResult<Vec<PendingPairing>> {
    let pending = state.pairing.pending_requests().await;
    Ok(ServerResponse::builder().body(pending).ok().build())
}

async fn get_sessions(
    _admin: AdminAccess,
    State(state): State<AppState>,
) -> ServerAppResult<Vec<ScreenSession>> {
    let sessions = state.realtime.sessions().snapshot();
    Ok(ServerResponse::builder().body(sessions).ok().build())
}

#[derive(Debug, Serialize)]
struct PushResult {
    delivered: usize,
}

async fn push_to_screen(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(screen_id): Path<String>,
    Json(envelope): Json<Envelope>,
) -> ServerAppResult<PushResult> {
    let screen_id = ScreenId::from(screen_id);
    if screen_id.is_empty() {
        return Err(ServerError::bad_request("screen id must not be empty"));
    }
    let delivered = state.realtime.push_to_screen(&screen_id, envelope);
    Ok(ServerResponse::builder()
        .body(PushResult { delivered })
        .ok()
        .build())
}

async fn broadcast(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Json(envelope): Json<Envelope>,
) -> ServerAppResult<PushResult> {
    let delivered = state.realtime.broadcast(envelope);
    Ok(ServerResponse::builder()
        .body(PushResult { delivered })
        .ok()
        .build())
}
