//! Catalog Service - listing create/search/update/delete without the HTTP layer

use sea_orm::*;

use crate::domain::ServiceError;
use crate::models::book::{self, Entity as Book};
use crate::storage::{ImageStore, PLACEHOLDER_IMAGE_URL};

/// Filter parameters for listing books. Absent fields impose no
/// constraint; present fields combine with AND.
#[derive(Debug, Default, Clone)]
pub struct BookFilter {
    /// Prefix match on the title.
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

pub async fn list_books(
    db: &DatabaseConnection,
    filter: BookFilter,
) -> Result<Vec<book::Model>, ServiceError> {
    let mut condition = Condition::all();

    if let Some(title) = filter.title {
        if !title.is_empty() {
            condition = condition.add(book::Column::Title.starts_with(&title));
        }
    }

    if let Some(author) = filter.author {
        if !author.is_empty() {
            condition = condition.add(book::Column::Author.eq(author));
        }
    }

    if let Some(category) = filter.category {
        if !category.is_empty() {
            condition = condition.add(book::Column::Category.eq(category));
        }
    }

    if let Some(status) = filter.status {
        if !status.is_empty() {
            condition = condition.add(book::Column::Status.eq(status));
        }
    }

    if let Some(min) = filter.min_price {
        condition = condition.add(book::Column::Price.gte(min));
    }

    if let Some(max) = filter.max_price {
        condition = condition.add(book::Column::Price.lte(max));
    }

    let books = Book::find()
        .filter(condition)
        .order_by_asc(book::Column::Title)
        .all(db)
        .await?;

    Ok(books)
}

pub async fn get_book(db: &DatabaseConnection, id: i32) -> Result<book::Model, ServiceError> {
    Book::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)
}

/// Input for creating a listing.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub category: String,
    pub price: Option<f64>,
    pub condition: String,
    pub status: String,
}

fn validate_new_book(dto: &NewBook) -> Result<(), ServiceError> {
    if dto.title.trim().is_empty() {
        return Err(ServiceError::Validation("title is required".to_string()));
    }
    if dto.author.trim().is_empty() {
        return Err(ServiceError::Validation("author is required".to_string()));
    }
    if !book::is_valid_category(&dto.category) {
        return Err(ServiceError::Validation(format!(
            "category must be one of {:?}",
            book::CATEGORIES
        )));
    }
    if !book::is_valid_condition(&dto.condition) {
        return Err(ServiceError::Validation(format!(
            "condition must be one of {:?}",
            book::CONDITIONS
        )));
    }
    if !book::is_valid_status(&dto.status) {
        return Err(ServiceError::Validation(
            "status must be 'sell', 'exchange' or 'donate'".to_string(),
        ));
    }
    if dto.status != book::STATUS_DONATE {
        match dto.price {
            Some(p) if p >= 0.0 => {}
            Some(_) => {
                return Err(ServiceError::Validation(
                    "price must not be negative".to_string(),
                ))
            }
            None => {
                return Err(ServiceError::Validation(
                    "price is required unless donating".to_string(),
                ))
            }
        }
    }
    Ok(())
}

/// Create a listing. The image, when present, is stored first and the book
/// row is only written once a durable URL exists; an upload failure aborts
/// the whole operation rather than leaving a broken reference.
pub async fn create_book(
    db: &DatabaseConnection,
    images: &ImageStore,
    owner_id: i32,
    dto: NewBook,
    image: Option<(String, Vec<u8>)>,
) -> Result<book::Model, ServiceError> {
    validate_new_book(&dto)?;

    let image_url = match image {
        Some((file_name, bytes)) => images.save(&file_name, &bytes).await?,
        None => PLACEHOLDER_IMAGE_URL.to_string(),
    };

    // Donations carry no price even if the caller supplied one.
    let price = if dto.status == book::STATUS_DONATE {
        None
    } else {
        dto.price
    };

    let now = chrono::Utc::now().to_rfc3339();
    let new_book = book::ActiveModel {
        title: Set(dto.title),
        author: Set(dto.author),
        category: Set(dto.category),
        price: Set(price),
        condition: Set(dto.condition),
        status: Set(dto.status),
        image_url: Set(image_url),
        owner_id: Set(owner_id),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    Ok(new_book.insert(db).await?)
}

/// Partial update of a listing; absent fields are left untouched.
#[derive(Debug, Default, Clone)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub price: Option<f64>,
}

pub async fn update_book(
    db: &DatabaseConnection,
    book_id: i32,
    actor_id: i32,
    is_admin: bool,
    patch: BookPatch,
) -> Result<book::Model, ServiceError> {
    let existing = Book::find_by_id(book_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    if existing.owner_id != actor_id && !is_admin {
        return Err(ServiceError::Forbidden(
            "only the owner may edit a listing".to_string(),
        ));
    }

    if let Some(category) = &patch.category {
        if !book::is_valid_category(category) {
            return Err(ServiceError::Validation(format!(
                "category must be one of {:?}",
                book::CATEGORIES
            )));
        }
    }
    if let Some(condition) = &patch.condition {
        if !book::is_valid_condition(condition) {
            return Err(ServiceError::Validation(format!(
                "condition must be one of {:?}",
                book::CONDITIONS
            )));
        }
    }
    if patch.price.is_some() && existing.status == book::STATUS_DONATE {
        return Err(ServiceError::Validation(
            "a donated listing has no price".to_string(),
        ));
    }

    let mut active: book::ActiveModel = existing.into();
    if let Some(title) = patch.title {
        active.title = Set(title);
    }
    if let Some(author) = patch.author {
        active.author = Set(author);
    }
    if let Some(category) = patch.category {
        active.category = Set(category);
    }
    if let Some(condition) = patch.condition {
        active.condition = Set(condition);
    }
    if let Some(price) = patch.price {
        active.price = Set(Some(price));
    }
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    Ok(active.update(db).await?)
}

/// Delete a listing together with its stored image. The image delete is
/// best-effort: a failure is logged but never blocks removing the record.
pub async fn delete_book(
    db: &DatabaseConnection,
    images: &ImageStore,
    book_id: i32,
    actor_id: i32,
    is_admin: bool,
) -> Result<(), ServiceError> {
    let existing = Book::find_by_id(book_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    if existing.owner_id != actor_id && !is_admin {
        return Err(ServiceError::Forbidden(
            "only the owner may delete a listing".to_string(),
        ));
    }

    let image_url = existing.image_url.clone();
    Book::delete_by_id(book_id).exec(db).await?;

    if let Err(e) = images.delete(&image_url).await {
        tracing::warn!(
            "failed to delete image {} for book {}: {}",
            image_url,
            book_id,
            e
        );
    }

    Ok(())
}

/// Listings owned by one user (profile screen).
pub async fn list_books_by_owner(
    db: &DatabaseConnection,
    owner_id: i32,
) -> Result<Vec<book::Model>, ServiceError> {
    let books = Book::find()
        .filter(book::Column::OwnerId.eq(owner_id))
        .order_by_asc(book::Column::Title)
        .all(db)
        .await?;
    Ok(books)
}
