//! CivicDesk Core Library
//!
//! Chat models, SQLite storage, and the scripted bot that greets citizens
//! in live and complaint chats until a city admin takes over.

pub mod bot;
pub mod cache;
pub mod chat;
pub mod config;
pub mod error;
pub mod invariants;
pub mod models;
pub mod storage;

pub use bot::{BotEngine, BotEvent, EngineSettings, RuleCache, StepPolicy};
pub use cache::TtlCache;
pub use chat::{AdminSend, ChatService, CitizenSend};
pub use config::{BotSettings, Config};
pub use error::{Error, Result};
pub use models::*;
pub use storage::{BotStorage, ChatStorage, Database};
