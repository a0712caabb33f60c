use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::auth::register,
        api::auth::login,
        api::books::list_books,
        api::books::get_book,
        api::books::delete_book,
        // Add other endpoints here as we document them
    ),
    components(
        schemas(
            crate::models::Book,
            crate::models::PublicUser,
            api::auth::RegisterRequest,
            api::auth::LoginRequest,
            api::auth::LoginResponse,
        )
    ),
    tags(
        (name = "bookmarket", description = "Book marketplace API")
    )
)]
pub struct ApiDoc;
