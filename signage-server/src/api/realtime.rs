use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use signage_shared::realtime::Envelope;
use tracing::{debug, info, warn};

use crate::auth::screen_token::verify_screen_token;
use crate::realtime::ConnectionId;
use crate::util::app_state::AppState;

pub fn create_route() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (connection_id, mut outbound) = state.realtime.open();
    info!(%connection_id, "realtime connection opened");

    let writer = tokio::spawn(async move {
        while let Some(envelope) = outbound.recv().await {
            let text = match serde_json::to_string(&envelope) {
                Ok(text) => text,
                Err(e) => {
                    warn!("failed to encode realtime message: {e}");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_text(&state, connection_id, text.as_str()),
            Ok(Message::Close(_)) => break,
            // ping/pong are answered by axum, binary frames carry nothing for us
            Ok(_) => {}
            Err(e) => {
                debug!(%connection_id, "realtime connection dropped: {e}");
                break;
            }
        }
    }

    state.realtime.close(connection_id);
    writer.abort();
    info!(%connection_id, "realtime connection closed");
}

fn handle_text(state: &AppState, connection_id: ConnectionId, text: &str) {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!(%connection_id, "ignoring malformed realtime frame: {e}");
            state
                .realtime
                .send_to(connection_id, Envelope::error("malformed message"));
            return;
        }
    };

    if envelope.kind != signage_shared::realtime::IDENTIFY_SCREEN {
        debug!(%connection_id, kind = %envelope.kind, "unhandled realtime message");
        return;
    }

    let Some(claim) = envelope.as_identify() else {
        state
            .realtime
            .send_to(connection_id, Envelope::error("identify_screen requires screenId"));
        return;
    };

    if state.config.require_identify_token {
        let verified = claim
            .auth_token
            .as_deref()
            .and_then(|token| verify_screen_token(token, &state.config.token_secret).ok());
        if verified.as_ref() != Some(&claim.screen_id) {
            warn!(%connection_id, screen_id = %claim.screen_id, "identify rejected: token mismatch");
            state
                .realtime
                .send_to(connection_id, Envelope::error("invalid screen token"));
            return;
        }
    }

    state.realtime.identify(connection_id, claim.screen_id);
}
