//! Message Service - per-pair threads and live fan-out

use sea_orm::*;

use crate::domain::ServiceError;
use crate::models::message::{self, Entity as Message};
use crate::models::user::Entity as User;
use crate::services::chat_hub::ChatHub;

/// Store a message and publish it to live subscribers. Messages are
/// immutable once written.
pub async fn send_message(
    db: &DatabaseConnection,
    hub: &ChatHub,
    sender_id: i32,
    receiver_id: i32,
    body: String,
) -> Result<message::Model, ServiceError> {
    if body.trim().is_empty() {
        return Err(ServiceError::Validation(
            "message body is required".to_string(),
        ));
    }

    User::find_by_id(receiver_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let new_message = message::ActiveModel {
        sender_id: Set(sender_id),
        receiver_id: Set(receiver_id),
        body: Set(body),
        created_at: Set(chrono::Utc::now().to_rfc3339()),
        ..Default::default()
    };

    let saved = new_message.insert(db).await?;
    hub.publish(saved.clone().into());

    Ok(saved)
}

/// Full thread for the unordered pair {a, b}, oldest first. No pagination:
/// the whole thread is loaded at once.
pub async fn thread(
    db: &DatabaseConnection,
    a: i32,
    b: i32,
) -> Result<Vec<message::Model>, ServiceError> {
    let pair = Condition::any()
        .add(
            Condition::all()
                .add(message::Column::SenderId.eq(a))
                .add(message::Column::ReceiverId.eq(b)),
        )
        .add(
            Condition::all()
                .add(message::Column::SenderId.eq(b))
                .add(message::Column::ReceiverId.eq(a)),
        );

    let messages = Message::find()
        .filter(pair)
        .order_by_asc(message::Column::CreatedAt)
        .order_by_asc(message::Column::Id)
        .all(db)
        .await?;

    Ok(messages)
}
