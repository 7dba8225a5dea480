use serde::{Deserialize, Serialize};

/// Events sent over the WebSocket chat channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Server confirms successful authentication
    Ready { user_id: i64, name: String },

    /// A new message was posted to the room
    NewMessage {
        id: i64,
        sender_id: i64,
        receiver_id: i64,
        content: String,
        created_at: chrono::DateTime<chrono::Utc>,
    },

    /// A participant joined or left the room
    Status { msg: String },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChatCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Join the chat room shared with another user
    Join { user_id: i64 },

    /// Leave the chat room shared with another user
    Leave { user_id: i64 },
}
