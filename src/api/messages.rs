use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use crate::api::service_error;
use crate::auth::Claims;
use crate::db::AppState;
use crate::domain::ServiceError;
use crate::services::message_service;

#[derive(Deserialize)]
pub struct SendMessageBody {
    pub receiver_id: i32,
    pub body: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<SendMessageBody>,
) -> impl IntoResponse {
    let Some(sender_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    match message_service::send_message(
        &state.db,
        &state.chat,
        sender_id,
        payload.receiver_id,
        payload.body,
    )
    .await
    {
        Ok(message) => (StatusCode::CREATED, Json(message)).into_response(),
        Err(e) => service_error(e),
    }
}

pub async fn get_thread(
    State(state): State<AppState>,
    claims: Claims,
    Path(peer_id): Path<i32>,
) -> impl IntoResponse {
    let Some(user_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    match message_service::thread(&state.db, user_id, peer_id).await {
        Ok(messages) => {
            let total = messages.len();
            (
                StatusCode::OK,
                Json(json!({ "messages": messages, "total": total })),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}

#[derive(Deserialize)]
pub struct SubscribeQuery {
    pub peer_id: i32,
}

/// Live subscription for one conversation. Messages stored after the
/// upgrade are pushed to the client as JSON text frames; the subscription
/// ends when the client disconnects.
pub async fn subscribe(
    ws: WebSocketUpgrade,
    claims: Claims,
    Query(params): Query<SubscribeQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Some(user_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id, params.peer_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: i32, peer_id: i32) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.chat.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ev) if ev.involves(user_id, peer_id) => {
                    let Ok(text) = serde_json::to_string(&ev) else { continue };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("chat subscriber for user {} lagged by {} events", user_id, n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!("chat subscriber for user {} disconnected", user_id);
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!("WebSocket error: {}", e);
                    break;
                }
                // Inbound frames carry no commands; sending goes through POST /messages.
                Some(Ok(_)) => {}
            },
        }
    }
}
