use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: String,
    pub theme: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Safe-to-share view of a user, returned by auth, profile and admin
/// endpoints.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PublicUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub theme: String,
}

impl From<Model> for PublicUser {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            role: model.role,
            theme: model.theme,
        }
    }
}
