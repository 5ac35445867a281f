use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::protocol::{ServerMessage, Topic, PROTOCOL_VERSION};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub topic: Option<Topic>,
}

/// WebSocket subscribe endpoint.
///
/// GET /ws?topic=ranked|binary
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let topic = params.topic.unwrap_or(Topic::Ranked);
    tracing::info!(?topic, "WebSocket connection request");

    ws.on_upgrade(move |socket| handle_socket(socket, topic, state))
}

/// One subscriber connection: greet, then forward the topic's events until
/// either side hangs up. The subscription is read-only; votes and operator
/// actions travel over HTTP.
async fn handle_socket(socket: WebSocket, topic: Topic, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let greeting = ServerMessage::Subscribed {
        protocol: PROTOCOL_VERSION.to_string(),
        topic,
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if let Ok(msg) = serde_json::to_string(&greeting) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            tracing::error!("Failed to send subscription greeting");
            return;
        }
    }

    let mut events = state.subscribe(topic);

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(msg) => {
                        if let Ok(json) = serde_json::to_string(&msg) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // keep the subscription; the client re-pulls state over HTTP
                        tracing::warn!(?topic, skipped, "Subscriber lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(?topic, "Ignoring inbound frame: {}", text);
                        let error = ServerMessage::Error {
                            code: "READ_ONLY".to_string(),
                            msg: "This socket only delivers events; use the HTTP API".to_string(),
                        };
                        if let Ok(json) = serde_json::to_string(&error) {
                            let _ = sender.send(Message::Text(json.into())).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(?topic, "WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!(?topic, "WebSocket connection closed");
}
