use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use foundnet_gateway::pair_room;
use foundnet_types::api::{ChatHistoryResponse, Claims, SendMessageRequest};
use foundnet_types::events::ChatEvent;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::views;

pub async fn get_history(
    State(state): State<AppState>,
    Path(other_user_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let messages = blocking(move || {
        db.db
            .find_match_between(claims.sub, other_user_id)?
            .ok_or_else(|| ApiError::not_found("no match found between users"))?;

        let rows = db.db.messages_between(claims.sub, other_user_id)?;
        Ok(rows.iter().map(views::message_response).collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(ChatHistoryResponse { messages }))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if req.content.is_empty() {
        return Err(ApiError::bad_request("content is required"));
    }

    let db = state.clone();
    let message = blocking(move || {
        // Messages only flow between already-matched pairs, any status.
        db.db
            .find_match_between(claims.sub, req.receiver_id)?
            .ok_or_else(|| ApiError::not_found("no match found between users"))?;

        let row = db.db.insert_message(claims.sub, req.receiver_id, &req.content)?;
        Ok(views::message_response(&row))
    })
    .await?;

    // Publish after successful persist; delivery is best-effort.
    state
        .dispatcher
        .publish(
            &pair_room(message.sender_id, message.receiver_id),
            ChatEvent::NewMessage {
                id: message.id,
                sender_id: message.sender_id,
                receiver_id: message.receiver_id,
                content: message.content.clone(),
                created_at: message.created_at,
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let message = blocking(move || {
        let row = db
            .db
            .get_message(message_id)?
            .ok_or_else(|| ApiError::not_found("message not found"))?;

        if row.receiver_id != claims.sub {
            return Err(ApiError::forbidden("only the receiver can mark a message read"));
        }

        // Idempotent: re-marking an already-read message is fine.
        db.db.mark_message_read(message_id)?;
        let row = db
            .db
            .get_message(message_id)?
            .ok_or_else(|| anyhow::anyhow!("message {} vanished after update", message_id))?;
        Ok(views::message_response(&row))
    })
    .await?;

    Ok(Json(message))
}
