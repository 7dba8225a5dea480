use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tokio::sync::mpsc;
use tracing::{info, warn};

use foundnet_types::api::Claims;
use foundnet_types::events::{ChatCommand, ChatEvent};

use crate::dispatcher::{Dispatcher, pair_room};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// How long a fresh connection gets to send its Identify command.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle a single WebSocket connection: Identify handshake, then the
/// Join/Leave command loop with heartbeat.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, jwt_secret: String) {
    let (mut sender, mut receiver) = socket.split();

    let (user_id, name) = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(identity) => identity,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    info!("{} ({}) connected to chat gateway", name, user_id);

    let ready = ChatEvent::Ready {
        user_id,
        name: name.clone(),
    };
    let Ok(ready_json) = serde_json::to_string(&ready) else {
        return;
    };
    if sender.send(Message::Text(ready_json.into())).await.is_err() {
        return;
    }

    let conn_id = dispatcher.next_conn_id();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ChatEvent>();

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward room events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = event_rx.recv() => {
                    let event = match result {
                        Some(event) => event,
                        None => break,
                    };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to serialize chat event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let dispatcher_recv = dispatcher.clone();
    let name_recv = name.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ChatCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(&dispatcher_recv, conn_id, user_id, &name_recv, cmd, &event_tx)
                            .await;
                    }
                    Err(e) => {
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            name_recv,
                            user_id,
                            e,
                            truncate_preview(&text, 200)
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.leave_all(conn_id).await;
    info!("{} ({}) disconnected from chat gateway", name, user_id);
}

/// Clamp a log preview to at most `limit` bytes, backing off to the nearest
/// char boundary so multibyte input never splits mid-character.
fn truncate_preview(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

async fn wait_for_identify(
    receiver: &mut futures_util::stream::SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<(i64, String)> {
    let timeout = tokio::time::timeout(IDENTIFY_TIMEOUT, async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(ChatCommand::Identify { token }) =
                    serde_json::from_str::<ChatCommand>(&text)
                {
                    let token_data = decode::<Claims>(
                        &token,
                        &DecodingKey::from_secret(jwt_secret.as_bytes()),
                        &Validation::default(),
                    )
                    .ok()?;

                    return Some((token_data.claims.sub, token_data.claims.name));
                }
            }
        }
        None
    });

    timeout.await.ok().flatten()
}

async fn handle_command(
    dispatcher: &Dispatcher,
    conn_id: u64,
    user_id: i64,
    name: &str,
    cmd: ChatCommand,
    event_tx: &mpsc::UnboundedSender<ChatEvent>,
) {
    match cmd {
        ChatCommand::Identify { .. } => {} // Already handled

        ChatCommand::Join { user_id: other_id } => {
            let room = pair_room(user_id, other_id);
            info!("{} ({}) joining room {}", name, user_id, room);
            dispatcher
                .join(&room, conn_id, user_id, event_tx.clone())
                .await;
            dispatcher
                .publish(
                    &room,
                    ChatEvent::Status {
                        msg: format!("User {} has joined the room.", user_id),
                    },
                )
                .await;
        }

        ChatCommand::Leave { user_id: other_id } => {
            let room = pair_room(user_id, other_id);
            info!("{} ({}) leaving room {}", name, user_id, room);
            dispatcher.leave(&room, conn_id).await;
            dispatcher
                .publish(
                    &room,
                    ChatEvent::Status {
                        msg: format!("User {} has left the room.", user_id),
                    },
                )
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_passes_short_text_through() {
        assert_eq!(truncate_preview("hello", 200), "hello");
    }

    #[test]
    fn preview_clamps_ascii_at_limit() {
        let long = "x".repeat(500);
        assert_eq!(truncate_preview(&long, 200).len(), 200);
    }

    #[test]
    fn preview_never_splits_a_multibyte_char() {
        // 'é' is 2 bytes; an odd limit lands mid-character
        let text = "é".repeat(150);
        let preview = truncate_preview(&text, 199);
        assert_eq!(preview.len(), 198);
        assert!(text.starts_with(preview));
    }
}
