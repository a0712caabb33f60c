pub mod book;
pub mod message;
pub mod received_book;
pub mod request;
pub mod user;

pub use book::Book;
pub use user::PublicUser;
