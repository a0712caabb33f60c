use bookmarket::db::{self, AppState};
use bookmarket::domain::ServiceError;
use bookmarket::models::{book, received_book, request, user};
use bookmarket::services::catalog_service::{self, BookFilter};
use bookmarket::services::chat_hub::ChatHub;
use bookmarket::services::{message_service, request_service};
use bookmarket::storage::ImageStore;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

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

async fn create_test_book(
    db: &DatabaseConnection,
    owner_id: i32,
    title: &str,
    status: &str,
    price: Option<f64>,
) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let book = book::ActiveModel {
        title: Set(title.to_string()),
        author: Set("Author".to_string()),
        category: Set("literature".to_string()),
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

#[tokio::test]
async fn test_new_request_is_pending_with_book_type() {
    let state = setup_test_state().await;
    let owner = create_test_user(&state.db, "Owner", "owner@example.com", "90000001").await;
    let buyer = create_test_user(&state.db, "Buyer", "buyer@example.com", "90000002").await;
    let book_id = create_test_book(&state.db, owner, "Dune", "exchange", Some(100.0)).await;

    let created = request_service::create_request(&state.db, buyer, book_id)
        .await
        .unwrap();

    let read_back = request::Entity::find_by_id(created.id)
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read_back.status, "pending");
    assert_eq!(read_back.request_type, "exchange");
    assert_eq!(read_back.owner_id, owner);
    assert_eq!(read_back.buyer_id, buyer);
}

#[tokio::test]
async fn test_cannot_request_own_listing() {
    let state = setup_test_state().await;
    let owner = create_test_user(&state.db, "Owner", "owner@example.com", "90000001").await;
    let book_id = create_test_book(&state.db, owner, "Dune", "sell", Some(100.0)).await;

    let err = request_service::create_request(&state.db, owner, book_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn test_request_against_missing_book() {
    let state = setup_test_state().await;
    let buyer = create_test_user(&state.db, "Buyer", "buyer@example.com", "90000002").await;

    let err = request_service::create_request(&state.db, buyer, 4242)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));
}

#[tokio::test]
async fn test_only_owner_may_confirm() {
    let state = setup_test_state().await;
    let owner = create_test_user(&state.db, "Owner", "owner@example.com", "90000001").await;
    let buyer = create_test_user(&state.db, "Buyer", "buyer@example.com", "90000002").await;
    let book_id = create_test_book(&state.db, owner, "Dune", "sell", Some(100.0)).await;
    let req = request_service::create_request(&state.db, buyer, book_id)
        .await
        .unwrap();

    // The requester cannot confirm their own request.
    let err = request_service::confirm_request(&state.db, buyer, req.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let confirmed = request_service::confirm_request(&state.db, owner, req.id)
        .await
        .unwrap();
    assert_eq!(confirmed.status, "confirmed");

    // A second confirm is no longer valid.
    let err = request_service::confirm_request(&state.db, owner, req.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn test_requester_may_cancel_own_pending_request() {
    let state = setup_test_state().await;
    let owner = create_test_user(&state.db, "Owner", "owner@example.com", "90000001").await;
    let buyer = create_test_user(&state.db, "Buyer", "buyer@example.com", "90000002").await;
    let stranger = create_test_user(&state.db, "Other", "other@example.com", "90000003").await;
    let book_id = create_test_book(&state.db, owner, "Dune", "sell", Some(100.0)).await;
    let req = request_service::create_request(&state.db, buyer, book_id)
        .await
        .unwrap();

    let err = request_service::cancel_request(&state.db, stranger, req.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let cancelled = request_service::cancel_request(&state.db, buyer, req.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, "cancelled");
}

#[tokio::test]
async fn test_mark_received_projects_and_deletes() {
    let state = setup_test_state().await;
    let owner = create_test_user(&state.db, "Owner", "owner@example.com", "90000001").await;
    let buyer = create_test_user(&state.db, "Buyer", "buyer@example.com", "90000002").await;
    let book_id = create_test_book(&state.db, owner, "Dune", "sell", Some(100.0)).await;
    let req = request_service::create_request(&state.db, buyer, book_id)
        .await
        .unwrap();

    // Cannot mark a pending request received.
    let err = request_service::mark_received(&state.db, owner, req.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));

    request_service::confirm_request(&state.db, owner, req.id)
        .await
        .unwrap();

    // Only the owner completes the hand-over.
    let err = request_service::mark_received(&state.db, buyer, req.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let received = request_service::mark_received(&state.db, owner, req.id)
        .await
        .unwrap();
    assert_eq!(received.book_id, book_id);
    assert_eq!(received.buyer_id, buyer);
    assert_eq!(received.owner_id, owner);
    assert_eq!(received.request_type, "sell");

    // The request is gone and exactly one fulfillment record exists.
    let gone = request::Entity::find_by_id(req.id)
        .one(&state.db)
        .await
        .unwrap();
    assert!(gone.is_none());

    let count = received_book::Entity::find()
        .filter(received_book::Column::BookId.eq(book_id))
        .count(&state.db)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_purge_cancelled_only_touches_own_cancelled_rows() {
    let state = setup_test_state().await;
    let owner = create_test_user(&state.db, "Owner", "owner@example.com", "90000001").await;
    let other_owner = create_test_user(&state.db, "Other", "other@example.com", "90000002").await;
    let buyer = create_test_user(&state.db, "Buyer", "buyer@example.com", "90000003").await;
    let book_a = create_test_book(&state.db, owner, "Dune", "sell", Some(100.0)).await;
    let book_b = create_test_book(&state.db, other_owner, "Foundation", "sell", Some(100.0)).await;

    let req_a = request_service::create_request(&state.db, buyer, book_a)
        .await
        .unwrap();
    let req_b = request_service::create_request(&state.db, buyer, book_b)
        .await
        .unwrap();
    let req_c = request_service::create_request(&state.db, buyer, book_a)
        .await
        .unwrap();

    request_service::cancel_request(&state.db, owner, req_a.id)
        .await
        .unwrap();
    request_service::cancel_request(&state.db, other_owner, req_b.id)
        .await
        .unwrap();

    let deleted = request_service::purge_cancelled(&state.db, owner).await.unwrap();
    assert_eq!(deleted, 1);

    // The other owner's cancelled request and the still-pending request survive.
    assert!(request::Entity::find_by_id(req_b.id)
        .one(&state.db)
        .await
        .unwrap()
        .is_some());
    assert!(request::Entity::find_by_id(req_c.id)
        .one(&state.db)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_views_join_titles_and_names_and_split_by_type() {
    let state = setup_test_state().await;
    let owner = create_test_user(&state.db, "Owner", "owner@example.com", "90000001").await;
    let buyer = create_test_user(&state.db, "Buyer", "buyer@example.com", "90000002").await;
    let sell_book = create_test_book(&state.db, owner, "Dune", "sell", Some(100.0)).await;
    let donate_book = create_test_book(&state.db, owner, "Primer", "donate", None).await;

    request_service::create_request(&state.db, buyer, sell_book)
        .await
        .unwrap();
    request_service::create_request(&state.db, buyer, donate_book)
        .await
        .unwrap();

    let incoming = request_service::incoming_requests(&state.db, owner, None)
        .await
        .unwrap();
    assert_eq!(incoming.len(), 2);
    assert!(incoming.iter().all(|r| r.owner_name == "Owner"));
    assert!(incoming.iter().all(|r| r.buyer_name == "Buyer"));

    let donations = request_service::incoming_requests(&state.db, owner, Some("donate".into()))
        .await
        .unwrap();
    assert_eq!(donations.len(), 1);
    assert_eq!(donations[0].book_title, "Primer");

    let outgoing = request_service::outgoing_requests(&state.db, buyer, None)
        .await
        .unwrap();
    assert_eq!(outgoing.len(), 2);

    // Nothing confirmed yet, so the fulfillment view is empty.
    let fulfillment = request_service::fulfillment_requests(&state.db, owner, None)
        .await
        .unwrap();
    assert!(fulfillment.is_empty());
}

// Full scenario from the marketplace flow: list for exchange with no price,
// request, confirm, hand over.
#[tokio::test]
async fn test_exchange_fulfillment_scenario() {
    let state = setup_test_state().await;
    let user_a = create_test_user(&state.db, "А", "a@example.com", "90000001").await;
    let user_b = create_test_user(&state.db, "Б", "b@example.com", "90000002").await;

    let book = catalog_service::create_book(
        &state.db,
        &state.images,
        user_a,
        bookmarket::services::catalog_service::NewBook {
            title: "Атлас".to_string(),
            author: "Зохиолч".to_string(),
            category: "science".to_string(),
            price: None,
            condition: "used".to_string(),
            status: "exchange".to_string(),
        },
        None,
    )
    .await
    .unwrap();

    let req = request_service::create_request(&state.db, user_b, book.id)
        .await
        .unwrap();
    request_service::confirm_request(&state.db, user_a, req.id)
        .await
        .unwrap();
    request_service::mark_received(&state.db, user_a, req.id)
        .await
        .unwrap();

    // Request gone, fulfillment record present.
    assert!(request::Entity::find_by_id(req.id)
        .one(&state.db)
        .await
        .unwrap()
        .is_none());
    let received = received_book::Entity::find()
        .filter(received_book::Column::BuyerId.eq(user_b))
        .all(&state.db)
        .await
        .unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].book_id, book.id);

    // Fulfillment does not change the book's status or visibility.
    let listed = catalog_service::list_books(
        &state.db,
        BookFilter {
            status: Some("exchange".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, book.id);
    assert_eq!(listed[0].status, "exchange");
}

// Exchange listings carry no price requirement at creation time; the
// validation only binds for sale listings.
#[tokio::test]
async fn test_price_required_for_sale_only() {
    let state = setup_test_state().await;
    let owner = create_test_user(&state.db, "Owner", "owner@example.com", "90000001").await;

    let err = catalog_service::create_book(
        &state.db,
        &state.images,
        owner,
        bookmarket::services::catalog_service::NewBook {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            category: "literature".to_string(),
            price: None,
            condition: "new".to_string(),
            status: "sell".to_string(),
        },
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    // Donations never carry a price, even when one is supplied.
    let donated = catalog_service::create_book(
        &state.db,
        &state.images,
        owner,
        bookmarket::services::catalog_service::NewBook {
            title: "Primer".to_string(),
            author: "Someone".to_string(),
            category: "science".to_string(),
            price: Some(5000.0),
            condition: "old".to_string(),
            status: "donate".to_string(),
        },
        None,
    )
    .await
    .unwrap();
    assert_eq!(donated.price, None);
}

#[tokio::test]
async fn test_message_thread_is_symmetric_and_ordered() {
    let state = setup_test_state().await;
    let user_a = create_test_user(&state.db, "А", "a@example.com", "90000001").await;
    let user_b = create_test_user(&state.db, "Б", "b@example.com", "90000002").await;
    let user_c = create_test_user(&state.db, "В", "c@example.com", "90000003").await;

    message_service::send_message(&state.db, &state.chat, user_a, user_b, "сайн уу".to_string())
        .await
        .unwrap();
    message_service::send_message(&state.db, &state.chat, user_b, user_a, "сайн".to_string())
        .await
        .unwrap();
    // Noise in another conversation must not leak into the pair's thread.
    message_service::send_message(&state.db, &state.chat, user_a, user_c, "hello".to_string())
        .await
        .unwrap();

    let thread_ab = message_service::thread(&state.db, user_a, user_b).await.unwrap();
    let thread_ba = message_service::thread(&state.db, user_b, user_a).await.unwrap();

    assert_eq!(thread_ab.len(), 2);
    assert_eq!(thread_ab[0].body, "сайн уу");
    assert_eq!(thread_ab[1].body, "сайн");
    assert_eq!(thread_ab, thread_ba);
}

#[tokio::test]
async fn test_send_message_to_missing_user() {
    let state = setup_test_state().await;
    let user_a = create_test_user(&state.db, "А", "a@example.com", "90000001").await;

    let err =
        message_service::send_message(&state.db, &state.chat, user_a, 4242, "hi".to_string())
            .await
            .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));
}

#[tokio::test]
async fn test_live_subscription_receives_stored_messages() {
    let state = setup_test_state().await;
    let user_a = create_test_user(&state.db, "А", "a@example.com", "90000001").await;
    let user_b = create_test_user(&state.db, "Б", "b@example.com", "90000002").await;

    let mut events = state.chat.subscribe();

    message_service::send_message(&state.db, &state.chat, user_a, user_b, "сайн уу".to_string())
        .await
        .unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(event.body, "сайн уу");
    assert!(event.involves(user_a, user_b));
    assert!(event.involves(user_b, user_a));
}
