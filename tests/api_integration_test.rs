use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use bookmarket::db::{self, AppState};
use bookmarket::models::{book, user};
use bookmarket::services::catalog_service::{self, BookFilter};
use bookmarket::services::chat_hub::ChatHub;
use bookmarket::storage::ImageStore;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};
use tower::util::ServiceExt; // for `oneshot`

// Helper to create a test state backed by an in-memory database
async fn setup_test_state() -> AppState {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    AppState {
        db,
        images: ImageStore::new(std::env::temp_dir().join("bookmarket-test-images")),
        chat: ChatHub::default(),
    }
}

// Helper to create a test user
async fn create_test_user(db: &DatabaseConnection, name: &str, email: &str, phone: &str) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let user = user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        phone: Set(phone.to_string()),
        password_hash: Set(bookmarket::auth::hash_password("password").unwrap()),
        role: Set("user".to_string()),
        theme: Set("dark".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    user.insert(db).await.expect("Failed to create user").id
}

// Helper to create a test book
async fn create_test_book(
    db: &DatabaseConnection,
    owner_id: i32,
    title: &str,
    category: &str,
    status: &str,
    price: Option<f64>,
) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let book = book::ActiveModel {
        title: Set(title.to_string()),
        author: Set("Author".to_string()),
        category: Set(category.to_string()),
        price: Set(price),
        condition: Set("used".to_string()),
        status: Set(status.to_string()),
        image_url: Set("/images/book-placeholder.png".to_string()),
        owner_id: Set(owner_id),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    book.insert(db).await.expect("Failed to create book").id
}

fn register_body(name: &str, email: &str, phone: &str) -> Body {
    let payload = serde_json::json!({
        "name": name,
        "email": email,
        "phone": phone,
        "password": "password",
        "confirm_password": "password"
    });
    Body::from(serde_json::to_vec(&payload).unwrap())
}

fn post_json(uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json")
        .body(body)
        .unwrap()
}

#[tokio::test]
async fn test_register_creates_exactly_one_user() {
    let state = setup_test_state().await;
    let db = state.db.clone();
    let app = bookmarket::api::api_router(state);

    let res = app
        .oneshot(post_json(
            "/auth/register",
            register_body("Bat", "bat@example.com", "99112233"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let users = user::Entity::find()
        .filter(user::Column::Email.eq("bat@example.com"))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].role, "user");
}

#[tokio::test]
async fn test_register_duplicate_email_creates_nothing() {
    let state = setup_test_state().await;
    let db = state.db.clone();
    create_test_user(&db, "Bat", "bat@example.com", "99112233").await;
    let app = bookmarket::api::api_router(state);

    let res = app
        .oneshot(post_json(
            "/auth/register",
            register_body("Other", "bat@example.com", "88112233"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let count = user::Entity::find().count(&db).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_register_duplicate_phone_creates_nothing() {
    let state = setup_test_state().await;
    let db = state.db.clone();
    create_test_user(&db, "Bat", "bat@example.com", "99112233").await;
    let app = bookmarket::api::api_router(state);

    let res = app
        .oneshot(post_json(
            "/auth/register",
            register_body("Other", "other@example.com", "99112233"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let count = user::Entity::find().count(&db).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_register_password_mismatch() {
    let state = setup_test_state().await;
    let app = bookmarket::api::api_router(state);

    let payload = serde_json::json!({
        "name": "Bat",
        "email": "bat@example.com",
        "phone": "99112233",
        "password": "password",
        "confirm_password": "different"
    });
    let res = app
        .oneshot(post_json(
            "/auth/register",
            Body::from(serde_json::to_vec(&payload).unwrap()),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_donate_book_visible_without_filters() {
    let state = setup_test_state().await;
    let owner = create_test_user(&state.db, "Owner", "owner@example.com", "90000001").await;
    create_test_book(&state.db, owner, "Physics Primer", "science", "donate", None).await;

    let all = catalog_service::list_books(&state.db, BookFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "Physics Primer");
}

#[tokio::test]
async fn test_category_filter_is_exact_match() {
    let state = setup_test_state().await;
    let owner = create_test_user(&state.db, "Owner", "owner@example.com", "90000001").await;
    create_test_book(&state.db, owner, "Physics Primer", "science", "donate", None).await;

    let science = catalog_service::list_books(
        &state.db,
        BookFilter {
            category: Some("science".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(science.len(), 1);

    let history = catalog_service::list_books(
        &state.db,
        BookFilter {
            category: Some("history".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_title_filter_is_prefix_match() {
    let state = setup_test_state().await;
    let owner = create_test_user(&state.db, "Owner", "owner@example.com", "90000001").await;
    create_test_book(&state.db, owner, "Dune", "literature", "sell", Some(100.0)).await;
    create_test_book(&state.db, owner, "Dune Messiah", "literature", "sell", Some(100.0)).await;
    create_test_book(&state.db, owner, "Foundation", "literature", "sell", Some(100.0)).await;

    let results = catalog_service::list_books(
        &state.db,
        BookFilter {
            title: Some("Dune".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|b| b.title.starts_with("Dune")));
}

#[tokio::test]
async fn test_price_range_filter() {
    let state = setup_test_state().await;
    let owner = create_test_user(&state.db, "Owner", "owner@example.com", "90000001").await;
    create_test_book(&state.db, owner, "Cheap", "history", "sell", Some(5000.0)).await;
    create_test_book(&state.db, owner, "Mid", "history", "sell", Some(15000.0)).await;
    create_test_book(&state.db, owner, "Dear", "history", "sell", Some(40000.0)).await;

    let results = catalog_service::list_books(
        &state.db,
        BookFilter {
            min_price: Some(10000.0),
            max_price: Some(20000.0),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Mid");
}

#[tokio::test]
async fn test_list_books_empty_result_is_ok() {
    let state = setup_test_state().await;
    let app = bookmarket::api::api_router(state);

    let res = app
        .oneshot(
            Request::builder()
                .uri("/books?title=nothing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["total"], 0);
    assert!(json["books"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_book_requires_ownership() {
    let state = setup_test_state().await;
    let owner = create_test_user(&state.db, "Owner", "owner@example.com", "90000001").await;
    let stranger = create_test_user(&state.db, "Other", "other@example.com", "90000002").await;
    let book_id =
        create_test_book(&state.db, owner, "Dune", "literature", "sell", Some(100.0)).await;

    let patch = bookmarket::services::catalog_service::BookPatch {
        price: Some(200.0),
        ..Default::default()
    };
    let err = catalog_service::update_book(&state.db, book_id, stranger, false, patch.clone())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        bookmarket::domain::ServiceError::Forbidden(_)
    ));

    // Owner can edit; admin can edit anything.
    let updated = catalog_service::update_book(&state.db, book_id, owner, false, patch.clone())
        .await
        .unwrap();
    assert_eq!(updated.price, Some(200.0));

    let updated = catalog_service::update_book(&state.db, book_id, stranger, true, patch)
        .await
        .unwrap();
    assert_eq!(updated.price, Some(200.0));
}

#[tokio::test]
async fn test_delete_book_removes_record() {
    let state = setup_test_state().await;
    let owner = create_test_user(&state.db, "Owner", "owner@example.com", "90000001").await;
    let book_id =
        create_test_book(&state.db, owner, "Dune", "literature", "sell", Some(100.0)).await;

    catalog_service::delete_book(&state.db, &state.images, book_id, owner, false)
        .await
        .unwrap();

    let remaining = book::Entity::find_by_id(book_id)
        .one(&state.db)
        .await
        .unwrap();
    assert!(remaining.is_none());
}
