pub mod access;
pub mod message;
