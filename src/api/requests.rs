use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::service_error;
use crate::auth::Claims;
use crate::db::AppState;
use crate::domain::ServiceError;
use crate::services::request_service;

#[derive(Deserialize)]
pub struct CreateRequestBody {
    pub book_id: i32,
}

pub async fn create_request(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<CreateRequestBody>,
) -> impl IntoResponse {
    let Some(buyer_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    match request_service::create_request(&state.db, buyer_id, payload.book_id).await {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(e) => service_error(e),
    }
}

/// Optional per-type filter shared by the list views.
#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    #[serde(rename = "type")]
    pub request_type: Option<String>,
}

pub async fn list_incoming(
    State(state): State<AppState>,
    claims: Claims,
    Query(params): Query<ListRequestsQuery>,
) -> impl IntoResponse {
    let Some(owner_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    match request_service::incoming_requests(&state.db, owner_id, params.request_type).await {
        Ok(requests) => {
            let total = requests.len();
            (
                StatusCode::OK,
                Json(json!({ "requests": requests, "total": total })),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}

pub async fn list_outgoing(
    State(state): State<AppState>,
    claims: Claims,
    Query(params): Query<ListRequestsQuery>,
) -> impl IntoResponse {
    let Some(buyer_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    match request_service::outgoing_requests(&state.db, buyer_id, params.request_type).await {
        Ok(requests) => {
            let total = requests.len();
            (
                StatusCode::OK,
                Json(json!({ "requests": requests, "total": total })),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}

pub async fn list_fulfillment(
    State(state): State<AppState>,
    claims: Claims,
    Query(params): Query<ListRequestsQuery>,
) -> impl IntoResponse {
    let Some(owner_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    match request_service::fulfillment_requests(&state.db, owner_id, params.request_type).await {
        Ok(requests) => {
            let total = requests.len();
            (
                StatusCode::OK,
                Json(json!({ "requests": requests, "total": total })),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}

pub async fn list_received(State(state): State<AppState>, claims: Claims) -> impl IntoResponse {
    let Some(buyer_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    match request_service::received_books_for_buyer(&state.db, buyer_id).await {
        Ok(rows) => {
            let total = rows.len();
            (
                StatusCode::OK,
                Json(json!({ "received": rows, "total": total })),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}

pub async fn confirm_request(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let Some(actor_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    match request_service::confirm_request(&state.db, actor_id, id).await {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => service_error(e),
    }
}

pub async fn cancel_request(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let Some(actor_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    match request_service::cancel_request(&state.db, actor_id, id).await {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => service_error(e),
    }
}

pub async fn mark_received(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let Some(actor_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    match request_service::mark_received(&state.db, actor_id, id).await {
        Ok(received) => (
            StatusCode::OK,
            Json(json!({
                "message": "Book marked as received",
                "received": received
            })),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

pub async fn purge_cancelled(State(state): State<AppState>, claims: Claims) -> impl IntoResponse {
    let Some(actor_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    match request_service::purge_cancelled(&state.db, actor_id).await {
        Ok(deleted) => (StatusCode::OK, Json(json!({ "deleted": deleted }))).into_response(),
        Err(e) => service_error(e),
    }
}
