use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Listed for sale.
pub const STATUS_SELL: &str = "sell";
/// Listed for exchange.
pub const STATUS_EXCHANGE: &str = "exchange";
/// Listed for donation; such listings carry no price.
pub const STATUS_DONATE: &str = "donate";

pub const CONDITIONS: [&str; 3] = ["new", "used", "old"];
pub const CATEGORIES: [&str; 4] = ["science", "literature", "technology", "history"];

pub fn is_valid_status(status: &str) -> bool {
    status == STATUS_SELL || status == STATUS_EXCHANGE || status == STATUS_DONATE
}

pub fn is_valid_condition(condition: &str) -> bool {
    CONDITIONS.contains(&condition)
}

pub fn is_valid_category(category: &str) -> bool {
    CATEGORIES.contains(&category)
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub author: String,
    pub category: String,
    pub price: Option<f64>,
    pub condition: String,
    pub status: String,
    pub image_url: String,
    pub owner_id: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::request::Entity")]
    Requests,
}

impl Related<super::request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// DTO for API responses
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub condition: String,
    pub status: String,
    pub image_url: String,
    pub owner_id: i32,
    pub created_at: String,
}

impl From<Model> for Book {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            author: model.author,
            category: model.category,
            price: model.price,
            condition: model.condition,
            status: model.status,
            image_url: model.image_url,
            owner_id: model.owner_id,
            created_at: model.created_at,
        }
    }
}
