pub mod credential_service;
pub mod health_service;
pub mod image_service;
pub mod message_service;
