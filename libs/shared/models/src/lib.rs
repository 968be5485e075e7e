pub mod appointment;
pub mod auth;
pub mod chat;
pub mod error;
pub mod notification;
pub mod records;
pub mod user;

/// Auto-increment identifier shared by every stored entity.
pub type EntityId = i64;
