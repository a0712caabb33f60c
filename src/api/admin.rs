//! Admin console: privileged variants of catalog and user management.
//! Every handler requires role == "admin"; ownership checks do not apply.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sea_orm::*;
use serde_json::json;
use std::collections::HashMap;

use crate::api::service_error;
use crate::auth::Claims;
use crate::db::AppState;
use crate::domain::ServiceError;
use crate::models::book::{self, Entity as Book};
use crate::models::user::{self, Entity as User, PublicUser, ROLE_ADMIN};
use crate::services::catalog_service;

fn require_admin(claims: &Claims) -> Result<i32, ServiceError> {
    let user_id = claims.user_id().ok_or(ServiceError::Unauthorized)?;
    if !claims.is_admin() {
        return Err(ServiceError::Forbidden(
            "admin role required".to_string(),
        ));
    }
    Ok(user_id)
}

/// Every listing with owner names batched in.
pub async fn list_books(State(state): State<AppState>, claims: Claims) -> impl IntoResponse {
    if let Err(e) = require_admin(&claims) {
        return service_error(e);
    }

    let books = match Book::find()
        .order_by_asc(book::Column::Title)
        .all(&state.db)
        .await
    {
        Ok(books) => books,
        Err(e) => return service_error(e.into()),
    };

    let mut owner_ids: Vec<i32> = books.iter().map(|b| b.owner_id).collect();
    owner_ids.sort_unstable();
    owner_ids.dedup();

    let mut owner_names: HashMap<i32, String> = HashMap::new();
    if !owner_ids.is_empty() {
        match User::find()
            .filter(user::Column::Id.is_in(owner_ids))
            .all(&state.db)
            .await
        {
            Ok(users) => {
                for u in users {
                    owner_names.insert(u.id, u.name);
                }
            }
            Err(e) => return service_error(e.into()),
        }
    }

    let rows: Vec<serde_json::Value> = books
        .into_iter()
        .map(|b| {
            let owner_name = owner_names
                .get(&b.owner_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());
            json!({
                "book": crate::models::Book::from(b),
                "owner_name": owner_name
            })
        })
        .collect();

    let total = rows.len();
    (
        StatusCode::OK,
        Json(json!({ "books": rows, "total": total })),
    )
        .into_response()
}

pub async fn delete_book(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let actor_id = match require_admin(&claims) {
        Ok(id) => id,
        Err(e) => return service_error(e),
    };

    match catalog_service::delete_book(&state.db, &state.images, id, actor_id, true).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Book deleted successfully" })),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// Regular users and admins as separate lists; admins are excluded from
/// the general user list.
pub async fn list_users(State(state): State<AppState>, claims: Claims) -> impl IntoResponse {
    if let Err(e) = require_admin(&claims) {
        return service_error(e);
    }

    let all = match User::find()
        .order_by_asc(user::Column::Name)
        .all(&state.db)
        .await
    {
        Ok(users) => users,
        Err(e) => return service_error(e.into()),
    };

    let (admins, users): (Vec<_>, Vec<_>) = all.into_iter().partition(|u| u.role == ROLE_ADMIN);
    let admins: Vec<PublicUser> = admins.into_iter().map(PublicUser::from).collect();
    let users: Vec<PublicUser> = users.into_iter().map(PublicUser::from).collect();

    (
        StatusCode::OK,
        Json(json!({ "users": users, "admins": admins })),
    )
        .into_response()
}

pub async fn delete_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    if let Err(e) = require_admin(&claims) {
        return service_error(e);
    }

    let user = match User::find_by_id(id).one(&state.db).await {
        Ok(Some(user)) => user,
        Ok(None) => return service_error(ServiceError::NotFound),
        Err(e) => return service_error(e.into()),
    };

    match user.delete(&state.db).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "message": "User deleted" }))).into_response(),
        Err(e) => service_error(e.into()),
    }
}

/// Admin provisioning: promote an existing user.
pub async fn promote_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    if let Err(e) = require_admin(&claims) {
        return service_error(e);
    }

    let user = match User::find_by_id(id).one(&state.db).await {
        Ok(Some(user)) => user,
        Ok(None) => return service_error(ServiceError::NotFound),
        Err(e) => return service_error(e.into()),
    };

    if user.role == ROLE_ADMIN {
        return service_error(ServiceError::InvalidState(
            "user is already an admin".to_string(),
        ));
    }

    let mut active: user::ActiveModel = user.into();
    active.role = Set(ROLE_ADMIN.to_string());
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    match active.update(&state.db).await {
        Ok(updated) => (StatusCode::OK, Json(PublicUser::from(updated))).into_response(),
        Err(e) => service_error(e.into()),
    }
}
