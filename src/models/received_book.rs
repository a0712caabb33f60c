use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fulfillment record: the terminal projection of a confirmed request.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "received_books")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub book_id: i32,
    pub owner_id: i32,
    pub buyer_id: i32,
    #[serde(rename = "type")]
    pub request_type: String,
    pub date: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
