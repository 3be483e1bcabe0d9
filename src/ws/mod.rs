pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use handlers::{Attachment, Caller};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Signed account token; absent means the connection acts as a guest
    pub token: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// One connection's event loop: dispatch inbound messages, forward room
/// broadcasts, and fire the implicit leave when the connection drops.
async fn handle_socket(socket: WebSocket, params: WsQuery, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let caller = Caller {
        user_id: match params.token.as_deref() {
            Some(token) => state.identities.resolve(token).await,
            None => None,
        },
    };
    tracing::info!(registered = caller.user_id.is_some(), "WebSocket connected");

    // Set once the connection creates or joins a session
    let mut attachment: Option<Attachment> = None;
    let mut room_rx: Option<broadcast::Receiver<ServerMessage>> = None;

    loop {
        tokio::select! {
            // Room events for the session this connection belongs to
            room_msg = async {
                match &mut room_rx {
                    Some(rx) => rx.recv().await,
                    // Not in a room yet: wait forever
                    None => std::future::pending().await,
                }
            } => {
                match room_msg {
                    Ok(msg) => {
                        if let Ok(json) = serde_json::to_string(&msg) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    // The room is gone (session finished). Drop the dead
                    // receiver so this arm goes back to waiting instead of
                    // completing instantly on every loop iteration.
                    Err(broadcast::error::RecvError::Closed) => room_rx = None,
                    // Fell behind; newer events still arrive
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                }
            }

            // Client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                let outcome =
                                    handlers::handle_message(&state.engine, &caller, client_msg)
                                        .await;

                                if let Some(attach) = outcome.attach {
                                    room_rx = Some(
                                        state
                                            .engine
                                            .broadcaster()
                                            .subscribe(&attach.routing_key)
                                            .await,
                                    );
                                    attachment = Some(attach);
                                }

                                if let Some(reply) = outcome.reply {
                                    if let Ok(json) = serde_json::to_string(&reply) {
                                        if sender.send(Message::Text(json.into())).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::debug!("failed to parse client message: {e}");
                                let error = ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {e}"),
                                };
                                if let Ok(json) = serde_json::to_string(&error) {
                                    let _ = sender.send(Message::Text(json.into())).await;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket error: {e}");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // A dropped connection means the participant is gone. Leave is
    // idempotent, so firing it redundantly (or after the session already
    // finished) is harmless.
    if let Some(attach) = attachment {
        if let Some(username) = attach.username {
            if let Err(e) = state.engine.leave(&attach.session_id, &username).await {
                tracing::debug!("implicit leave on disconnect: {e}");
            }
        }
    }

    tracing::info!("WebSocket connection closed");
}
