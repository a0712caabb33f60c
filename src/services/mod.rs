pub mod catalog_service;
pub mod chat_hub;
pub mod message_service;
pub mod request_service;
