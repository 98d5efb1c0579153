use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};

use crate::state::AppState;

/// `GET /ws`: upgrades to a push-stream subscription. The server sends one
/// snapshot immediately, then one frame per broadcast tick or
/// state-changing event (spec §6's push-stream protocol). Frames the client
/// sends are read and discarded; a read error is the unsubscribe signal.
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle(socket, state))
}

async fn handle(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (id, mut rx) = state.broadcaster.subscribe(&state.registry);

    tracing::debug!(subscriber = %id, event = "ws_subscribe");

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Drain and discard inbound frames; any read error or stream close is
    // the signal to unsubscribe (spec §4.6).
    let reader = async {
        while let Some(msg) = stream.next().await {
            if msg.is_err() {
                break;
            }
        }
    };

    tokio::select! {
        _ = &mut writer => {}
        _ = reader => { writer.abort(); }
    }

    state.broadcaster.unsubscribe(id);
    tracing::debug!(subscriber = %id, event = "ws_unsubscribe");
}
