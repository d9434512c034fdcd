//! Data models for civicdesk

mod bot;
mod chat;

pub use bot::*;
pub use chat::*;
