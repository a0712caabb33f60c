use axum::{
    extract::{Multipart, Path, Query, State},
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
use crate::models::Book;
use crate::services::catalog_service::{self, BookFilter, BookPatch, NewBook};

#[derive(Debug, Deserialize, Clone, utoipa::IntoParams)]
pub struct ListBooksQuery {
    /// Prefix match on the title.
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

#[utoipa::path(
    get,
    path = "/api/books",
    params(ListBooksQuery),
    responses(
        (status = 200, description = "Matching listings; an empty list is a valid result")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<ListBooksQuery>,
) -> impl IntoResponse {
    let filter = BookFilter {
        title: params.title,
        author: params.author,
        category: params.category,
        status: params.status,
        min_price: params.min_price,
        max_price: params.max_price,
    };

    match catalog_service::list_books(&state.db, filter).await {
        Ok(books) => {
            let dtos: Vec<Book> = books.into_iter().map(Book::from).collect();
            let total = dtos.len();
            (
                StatusCode::OK,
                Json(json!({
                    "books": dtos,
                    "total": total
                })),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/books/{id}",
    responses(
        (status = 200, description = "The listing", body = Book),
        (status = 404, description = "No such listing")
    )
)]
pub async fn get_book(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match catalog_service::get_book(&state.db, id).await {
        Ok(book) => (StatusCode::OK, Json(Book::from(book))).into_response(),
        Err(e) => service_error(e),
    }
}

/// Multipart create: text fields for the listing plus an optional `image`
/// file part.
pub async fn create_book(
    State(state): State<AppState>,
    claims: Claims,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let Some(owner_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    let mut title = String::new();
    let mut author = String::new();
    let mut category = String::new();
    let mut condition = String::new();
    let mut status = String::new();
    let mut price: Option<f64> = None;
    let mut image: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => return service_error(ServiceError::Validation(e.to_string())),
        };

        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            match field.bytes().await {
                Ok(bytes) if !bytes.is_empty() => {
                    image = Some((file_name, bytes.to_vec()));
                }
                Ok(_) => {}
                Err(e) => return service_error(ServiceError::Upload(e.to_string())),
            }
            continue;
        }

        let value = match field.text().await {
            Ok(v) => v,
            Err(e) => return service_error(ServiceError::Validation(e.to_string())),
        };
        match name.as_str() {
            "title" => title = value,
            "author" => author = value,
            "category" => category = value,
            "condition" => condition = value,
            "status" => status = value,
            "price" => {
                if !value.trim().is_empty() {
                    match value.trim().parse() {
                        Ok(p) => price = Some(p),
                        Err(_) => {
                            return service_error(ServiceError::Validation(
                                "price must be a number".to_string(),
                            ))
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let dto = NewBook {
        title,
        author,
        category,
        price,
        condition,
        status,
    };

    match catalog_service::create_book(&state.db, &state.images, owner_id, dto, image).await {
        Ok(book) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Book created successfully",
                "book": Book::from(book)
            })),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub price: Option<f64>,
}

pub async fn update_book(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateBookRequest>,
) -> impl IntoResponse {
    let Some(actor_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    let patch = BookPatch {
        title: payload.title,
        author: payload.author,
        category: payload.category,
        condition: payload.condition,
        price: payload.price,
    };

    match catalog_service::update_book(&state.db, id, actor_id, claims.is_admin(), patch).await {
        Ok(book) => (StatusCode::OK, Json(Book::from(book))).into_response(),
        Err(e) => service_error(e),
    }
}

#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    responses(
        (status = 200, description = "Listing and its image removed"),
        (status = 403, description = "Caller is neither owner nor admin"),
        (status = 404, description = "No such listing")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let Some(actor_id) = claims.user_id() else {
        return service_error(ServiceError::Unauthorized);
    };

    match catalog_service::delete_book(&state.db, &state.images, id, actor_id, claims.is_admin())
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Book deleted successfully" })),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}
