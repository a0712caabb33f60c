pub mod admin;
pub mod auth;
pub mod books;
pub mod health;
pub mod messages;
pub mod profile;
pub mod requests;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;

use crate::db::AppState;
use crate::domain::ServiceError;

/// Map a business-level failure to an HTTP response.
pub(crate) fn service_error(err: ServiceError) -> Response {
    let (status, message) = match &err {
        ServiceError::NotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
        ServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        ServiceError::Duplicate(msg) => (StatusCode::CONFLICT, msg.clone()),
        ServiceError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()),
        ServiceError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        ServiceError::InvalidState(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        ServiceError::Upload(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
        ServiceError::Database(msg) => {
            tracing::error!("database error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
        }
    };

    (status, Json(json!({ "error": message }))).into_response()
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::get_me))
        // Listings
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Requests
        .route("/requests", post(requests::create_request))
        .route("/requests/incoming", get(requests::list_incoming))
        .route("/requests/outgoing", get(requests::list_outgoing))
        .route("/requests/fulfillment", get(requests::list_fulfillment))
        .route("/requests/received", get(requests::list_received))
        .route("/requests/cancelled", delete(requests::purge_cancelled))
        .route("/requests/:id/confirm", put(requests::confirm_request))
        .route("/requests/:id/cancel", put(requests::cancel_request))
        .route("/requests/:id/received", post(requests::mark_received))
        // Messaging
        .route("/messages", post(messages::send_message))
        .route("/messages/ws", get(messages::subscribe))
        .route("/messages/:peer_id", get(messages::get_thread))
        // Admin console
        .route("/admin/books", get(admin::list_books))
        .route("/admin/books/:id", delete(admin::delete_book))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id", delete(admin::delete_user))
        .route("/admin/users/:id/promote", post(admin::promote_user))
        // Profile & settings
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/profile/books", get(profile::list_own_books))
        .with_state(state)
}
