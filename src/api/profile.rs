use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use sea_orm::*;
use serde::Deserialize;
use serde_json::json;

use crate::api::service_error;
use crate::auth::Claims;
use crate::db::AppState;
use crate::domain::ServiceError;
use crate::models::user::{self, Entity as User, PublicUser};
use crate::models::Book;
use crate::services::catalog_service;

pub async fn get_profile(State(state): State<AppState>, claims: Claims) -> impl IntoResponse {
    let Some(user_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    match User::find_by_id(user_id).one(&state.db).await {
        Ok(Some(user)) => (StatusCode::OK, Json(PublicUser::from(user))).into_response(),
        Ok(None) => service_error(ServiceError::NotFound),
        Err(e) => service_error(e.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub theme: Option<String>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    let Some(user_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    if let Some(theme) = &req.theme {
        if theme != "dark" && theme != "light" {
            return service_error(ServiceError::Validation(
                "theme must be 'dark' or 'light'".to_string(),
            ));
        }
    }

    let user = match User::find_by_id(user_id).one(&state.db).await {
        Ok(Some(user)) => user,
        Ok(None) => return service_error(ServiceError::NotFound),
        Err(e) => return service_error(e.into()),
    };

    let mut active: user::ActiveModel = user.into();
    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return service_error(ServiceError::Validation("name is required".to_string()));
        }
        active.name = Set(name);
    }
    if let Some(email) = req.email {
        active.email = Set(email);
    }
    if let Some(phone) = req.phone {
        active.phone = Set(phone);
    }
    if let Some(theme) = req.theme {
        active.theme = Set(theme);
    }
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    // Email/phone changes hit the same unique constraints as registration.
    match active.update(&state.db).await {
        Ok(updated) => (StatusCode::OK, Json(PublicUser::from(updated))).into_response(),
        Err(e) => service_error(e.into()),
    }
}

pub async fn list_own_books(State(state): State<AppState>, claims: Claims) -> impl IntoResponse {
    let Some(user_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    match catalog_service::list_books_by_owner(&state.db, user_id).await {
        Ok(books) => {
            let dtos: Vec<Book> = books.into_iter().map(Book::from).collect();
            let total = dtos.len();
            (
                StatusCode::OK,
                Json(json!({ "books": dtos, "total": total })),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}
