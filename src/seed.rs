use sea_orm::*;

use crate::auth::hash_password;
use crate::models::{book, user};
use crate::storage::PLACEHOLDER_IMAGE_URL;

pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    let now = chrono::Utc::now().to_rfc3339();

    // 1. Users
    let admin_password = hash_password("admin").map_err(DbErr::Custom)?;
    let user_password = hash_password("user").map_err(DbErr::Custom)?;

    let admin = user::ActiveModel {
        name: Set("Administrator".to_owned()),
        email: Set("admin@bookmarket.local".to_owned()),
        phone: Set("99000001".to_owned()),
        password_hash: Set(admin_password),
        role: Set("admin".to_owned()),
        theme: Set("dark".to_owned()),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    };

    let demo_user = user::ActiveModel {
        name: Set("Demo User".to_owned()),
        email: Set("user@bookmarket.local".to_owned()),
        phone: Set("99000002".to_owned()),
        password_hash: Set(user_password),
        role: Set("user".to_owned()),
        theme: Set("dark".to_owned()),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    };

    user::Entity::insert(admin)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(user::Column::Email)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    user::Entity::insert(demo_user)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(user::Column::Email)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    // 2. A couple of listings for the demo user
    let owner = user::Entity::find()
        .filter(user::Column::Email.eq("user@bookmarket.local"))
        .one(db)
        .await?;
    let Some(owner) = owner else {
        return Ok(());
    };

    let existing = book::Entity::find()
        .filter(book::Column::OwnerId.eq(owner.id))
        .count(db)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    let listings = [
        ("Dune", "Frank Herbert", "literature", Some(25000.0), "sell"),
        ("Атлас", "Билл Гэйтс", "science", None, "donate"),
    ];

    for (title, author, category, price, status) in listings {
        let book = book::ActiveModel {
            title: Set(title.to_owned()),
            author: Set(author.to_owned()),
            category: Set(category.to_owned()),
            price: Set(price),
            condition: Set("used".to_owned()),
            status: Set(status.to_owned()),
            image_url: Set(PLACEHOLDER_IMAGE_URL.to_owned()),
            owner_id: Set(owner.id),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        };
        book::Entity::insert(book).exec(db).await?;
    }

    Ok(())
}
