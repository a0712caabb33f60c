use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

use crate::services::chat_hub::ChatHub;
use crate::storage::ImageStore;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub images: ImageStore,
    pub chat: ChatHub,
}

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Users. Email and phone uniqueness is enforced here rather than by a
    // pre-insert query, which would leave a window for concurrent
    // registrations to both pass the check.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user',
            theme TEXT NOT NULL DEFAULT 'dark',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Listings. Price is NULL for donations.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            category TEXT NOT NULL,
            price REAL,
            condition TEXT NOT NULL,
            status TEXT NOT NULL,
            image_url TEXT NOT NULL,
            owner_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Acquisition requests. request_type mirrors the book's status at
    // creation time; no uniqueness constraint on (book_id, buyer_id) since
    // duplicate requests are allowed.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS requests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL,
            buyer_id INTEGER NOT NULL,
            owner_id INTEGER NOT NULL,
            request_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Fulfillment records, written when a confirmed request is marked
    // received (the request row is deleted in the same transaction).
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS received_books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL,
            owner_id INTEGER NOT NULL,
            buyer_id INTEGER NOT NULL,
            request_type TEXT NOT NULL,
            date TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Messages are immutable once written.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sender_id INTEGER NOT NULL,
            receiver_id INTEGER NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    Ok(())
}
