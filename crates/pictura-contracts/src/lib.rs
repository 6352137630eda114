pub mod chat;
pub mod events;
pub mod styles;
pub mod validation;
