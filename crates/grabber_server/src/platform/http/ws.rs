use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use grabber_engine::{ProgressChannel, ProgressEvent};
use grabber_logging::{grabber_debug, grabber_info, grabber_warn};
use serde::{Deserialize, Serialize};

use super::constants::MSG_SOCKET_GREETING;
use super::AppState;

/// Frames the server sends besides progress events.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerFrame {
    ServerStatus {
        status: &'static str,
        message: &'static str,
    },
    Pong {
        timestamp: i64,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    Ping,
}

pub(crate) async fn progress_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    let channel = state.engine.progress().clone();
    ws.on_upgrade(move |socket| serve_socket(socket, channel))
}

async fn serve_socket(socket: WebSocket, channel: ProgressChannel) {
    let mut subscription = channel.subscribe();
    let id = subscription.id();
    grabber_info!("websocket client {id} connected");
    let (mut sender, mut receiver) = socket.split();

    let greeting = ServerFrame::ServerStatus {
        status: "ok",
        message: MSG_SOCKET_GREETING,
    };
    if let Some(text) = encode(&greeting) {
        if sender.send(Message::Text(text)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                let Some(text) = encode_event(&event) else { continue };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = answer_client(&text) {
                        if sender.send(Message::Text(reply)).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    grabber_debug!("websocket client {id} errored: {err}");
                    break;
                }
            },
        }
    }

    subscription.unsubscribe();
    grabber_info!("websocket client {id} disconnected");
}

fn answer_client(text: &str) -> Option<String> {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::Ping) => encode(&ServerFrame::Pong {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }),
        Err(err) => {
            grabber_warn!("ignoring websocket message: {err}");
            None
        }
    }
}

fn encode(frame: &ServerFrame) -> Option<String> {
    serde_json::to_string(frame)
        .map_err(|err| grabber_warn!("could not encode websocket frame: {err}"))
        .ok()
}

fn encode_event(event: &ProgressEvent) -> Option<String> {
    serde_json::to_string(event)
        .map_err(|err| grabber_warn!("could not encode progress event: {err}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_gets_pong() {
        let reply = answer_client(r#"{"type":"ping"}"#).unwrap();
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["type"], "pong");
        assert!(value["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn unknown_or_malformed_messages_are_ignored() {
        assert_eq!(answer_client(r#"{"type":"subscribe"}"#), None);
        assert_eq!(answer_client("not json"), None);
    }

    #[test]
    fn greeting_has_wire_shape() {
        let text = encode(&ServerFrame::ServerStatus {
            status: "ok",
            message: MSG_SOCKET_GREETING,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "server_status");
        assert_eq!(value["status"], "ok");
        assert_eq!(value["message"], MSG_SOCKET_GREETING);
    }
}
