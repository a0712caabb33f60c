//! Request Service - the acquisition request lifecycle
//!
//! States: pending -> confirmed | cancelled; confirmed -> received, which
//! deletes the request and writes a received_books row in one transaction.
//! Cancelled requests are retained until the owner purges them in bulk.

use sea_orm::*;
use std::collections::HashMap;

use crate::domain::ServiceError;
use crate::models::book::{self, Entity as Book};
use crate::models::received_book::{self, Entity as ReceivedBook};
use crate::models::request::{self, Entity as Request};
use crate::models::user::{self, Entity as User};

/// A request joined with the book title and both party names, for the
/// list screens. Titles and names are fetched with batched multi-gets,
/// not one lookup per row.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RequestWithDetails {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub owner_id: i32,
    pub owner_name: String,
    pub buyer_id: i32,
    pub buyer_name: String,
    #[serde(rename = "type")]
    pub request_type: String,
    pub status: String,
    pub date: String,
}

/// Create a pending request. The type is copied from the book's current
/// status, so it cannot disagree with the listing.
pub async fn create_request(
    db: &DatabaseConnection,
    buyer_id: i32,
    book_id: i32,
) -> Result<request::Model, ServiceError> {
    let book = Book::find_by_id(book_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    if book.owner_id == buyer_id {
        return Err(ServiceError::Validation(
            "cannot request your own listing".to_string(),
        ));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let new_request = request::ActiveModel {
        book_id: Set(book.id),
        buyer_id: Set(buyer_id),
        owner_id: Set(book.owner_id),
        request_type: Set(book.status),
        status: Set(request::STATUS_PENDING.to_owned()),
        date: Set(now.clone()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    Ok(new_request.insert(db).await?)
}

/// Confirm a pending request. Only the book's owner may do this.
pub async fn confirm_request(
    db: &DatabaseConnection,
    actor_id: i32,
    request_id: i32,
) -> Result<request::Model, ServiceError> {
    let req = Request::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    if req.owner_id != actor_id {
        return Err(ServiceError::Forbidden(
            "only the book owner may confirm a request".to_string(),
        ));
    }
    if req.status != request::STATUS_PENDING {
        return Err(ServiceError::InvalidState(format!(
            "request is {}, not pending",
            req.status
        )));
    }

    let mut active: request::ActiveModel = req.into();
    active.status = Set(request::STATUS_CONFIRMED.to_owned());
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    Ok(active.update(db).await?)
}

/// Cancel a pending request. The book owner or the requester may do this.
pub async fn cancel_request(
    db: &DatabaseConnection,
    actor_id: i32,
    request_id: i32,
) -> Result<request::Model, ServiceError> {
    let req = Request::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    if req.owner_id != actor_id && req.buyer_id != actor_id {
        return Err(ServiceError::Forbidden(
            "only the book owner or the requester may cancel".to_string(),
        ));
    }
    if req.status != request::STATUS_PENDING {
        return Err(ServiceError::InvalidState(format!(
            "request is {}, not pending",
            req.status
        )));
    }

    let mut active: request::ActiveModel = req.into();
    active.status = Set(request::STATUS_CANCELLED.to_owned());
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    Ok(active.update(db).await?)
}

/// Mark a confirmed request as received: write the fulfillment record and
/// delete the request. Both writes run in one transaction so a failure
/// between them cannot leave a deleted request without its received_books
/// row. The book itself keeps its status and stays listed.
pub async fn mark_received(
    db: &DatabaseConnection,
    actor_id: i32,
    request_id: i32,
) -> Result<received_book::Model, ServiceError> {
    let req = Request::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    if req.owner_id != actor_id {
        return Err(ServiceError::Forbidden(
            "only the book owner may mark a request received".to_string(),
        ));
    }
    if req.status != request::STATUS_CONFIRMED {
        return Err(ServiceError::InvalidState(format!(
            "request is {}, not confirmed",
            req.status
        )));
    }

    let txn = db.begin().await?;

    let received = received_book::ActiveModel {
        book_id: Set(req.book_id),
        owner_id: Set(req.owner_id),
        buyer_id: Set(req.buyer_id),
        request_type: Set(req.request_type.clone()),
        date: Set(chrono::Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    Request::delete_by_id(req.id).exec(&txn).await?;

    txn.commit().await?;

    Ok(received)
}

/// Bulk-delete the caller's own cancelled requests. Returns how many rows
/// went away.
pub async fn purge_cancelled(
    db: &DatabaseConnection,
    actor_id: i32,
) -> Result<u64, ServiceError> {
    let res = Request::delete_many()
        .filter(
            Condition::all()
                .add(request::Column::OwnerId.eq(actor_id))
                .add(request::Column::Status.eq(request::STATUS_CANCELLED)),
        )
        .exec(db)
        .await?;

    Ok(res.rows_affected)
}

/// Requests filed against books the given user owns.
pub async fn incoming_requests(
    db: &DatabaseConnection,
    owner_id: i32,
    request_type: Option<String>,
) -> Result<Vec<RequestWithDetails>, ServiceError> {
    let mut condition = Condition::all().add(request::Column::OwnerId.eq(owner_id));
    if let Some(t) = request_type {
        condition = condition.add(request::Column::RequestType.eq(t));
    }
    list_with_details(db, condition).await
}

/// Requests the given user has filed.
pub async fn outgoing_requests(
    db: &DatabaseConnection,
    buyer_id: i32,
    request_type: Option<String>,
) -> Result<Vec<RequestWithDetails>, ServiceError> {
    let mut condition = Condition::all().add(request::Column::BuyerId.eq(buyer_id));
    if let Some(t) = request_type {
        condition = condition.add(request::Column::RequestType.eq(t));
    }
    list_with_details(db, condition).await
}

/// Confirmed requests on the given user's books, ready to be marked
/// received.
pub async fn fulfillment_requests(
    db: &DatabaseConnection,
    owner_id: i32,
    request_type: Option<String>,
) -> Result<Vec<RequestWithDetails>, ServiceError> {
    let mut condition = Condition::all()
        .add(request::Column::OwnerId.eq(owner_id))
        .add(request::Column::Status.eq(request::STATUS_CONFIRMED));
    if let Some(t) = request_type {
        condition = condition.add(request::Column::RequestType.eq(t));
    }
    list_with_details(db, condition).await
}

/// Fulfillment records where the given user was the requester.
pub async fn received_books_for_buyer(
    db: &DatabaseConnection,
    buyer_id: i32,
) -> Result<Vec<received_book::Model>, ServiceError> {
    let rows = ReceivedBook::find()
        .filter(received_book::Column::BuyerId.eq(buyer_id))
        .order_by_desc(received_book::Column::Date)
        .all(db)
        .await?;
    Ok(rows)
}

async fn list_with_details(
    db: &DatabaseConnection,
    condition: Condition,
) -> Result<Vec<RequestWithDetails>, ServiceError> {
    let requests = Request::find()
        .filter(condition)
        .order_by_desc(request::Column::Date)
        .all(db)
        .await?;

    // Batched multi-gets instead of one lookup per row.
    let book_ids: Vec<i32> = requests.iter().map(|r| r.book_id).collect();
    let mut user_ids: Vec<i32> = requests
        .iter()
        .flat_map(|r| [r.owner_id, r.buyer_id])
        .collect();
    user_ids.sort_unstable();
    user_ids.dedup();

    let mut book_titles: HashMap<i32, String> = HashMap::new();
    if !book_ids.is_empty() {
        for b in Book::find()
            .filter(book::Column::Id.is_in(book_ids))
            .all(db)
            .await?
        {
            book_titles.insert(b.id, b.title);
        }
    }

    let mut user_names: HashMap<i32, String> = HashMap::new();
    if !user_ids.is_empty() {
        for u in User::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(db)
            .await?
        {
            user_names.insert(u.id, u.name);
        }
    }

    let result = requests
        .into_iter()
        .map(|req| {
            let book_title = book_titles
                .get(&req.book_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());
            let owner_name = user_names
                .get(&req.owner_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());
            let buyer_name = user_names
                .get(&req.buyer_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());

            RequestWithDetails {
                id: req.id,
                book_id: req.book_id,
                book_title,
                owner_id: req.owner_id,
                owner_name,
                buyer_id: req.buyer_id,
                buyer_name,
                request_type: req.request_type,
                status: req.status,
                date: req.date,
            }
        })
        .collect();

    Ok(result)
}
