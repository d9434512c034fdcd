//! SQLite storage layer for civicdesk

mod analytics;
mod catalog;
mod chat_messages;
mod conversation_state;
mod migrations;
mod parse;
mod traits;
mod trigger_rules;

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::instrument;

use crate::error::Result;
use crate::models::{
    BotMessage, ChatMessage, ChatType, ConversationId, ConversationState, TriggerRule,
};

pub use analytics::BotAnalyticsStore;
pub use catalog::BotMessageStore;
pub use chat_messages::ChatMessageStore;
pub use conversation_state::ConversationStateStore;
pub use traits::{
    BotAnalyticsRepository, BotStorage, ChatMessageRepository, ChatStorage,
    ConversationStateRepository, MessageCatalog, TriggerRuleRepository,
};
pub use trigger_rules::TriggerRuleStore;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<u32> {
        migrations::get_current_version(&self.conn)
    }

    pub fn trigger_rules(&self) -> TriggerRuleStore<'_> {
        TriggerRuleStore::new(&self.conn)
    }

    pub fn bot_messages(&self) -> BotMessageStore<'_> {
        BotMessageStore::new(&self.conn)
    }

    pub fn conversation_states(&self) -> ConversationStateStore<'_> {
        ConversationStateStore::new(&self.conn)
    }

    pub fn chat_messages(&self) -> ChatMessageStore<'_> {
        ChatMessageStore::new(&self.conn)
    }

    pub fn bot_analytics(&self) -> BotAnalyticsStore<'_> {
        BotAnalyticsStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl TriggerRuleRepository for Database {
    fn trigger_rule(&self, chat_type: ChatType) -> Result<Option<TriggerRule>> {
        self.trigger_rules().get(chat_type)
    }
}

impl MessageCatalog for Database {
    fn message_for_step(&self, chat_type: ChatType, step: u32) -> Result<Option<BotMessage>> {
        self.bot_messages().message_for_step(chat_type, step)
    }

    fn next_active_after(&self, chat_type: ChatType, step: u32) -> Result<Option<BotMessage>> {
        self.bot_messages().next_active_after(chat_type, step)
    }
}

impl ConversationStateRepository for Database {
    fn load_state(
        &self,
        chat_type: ChatType,
        conversation_id: &ConversationId,
    ) -> Result<ConversationState> {
        self.conversation_states().load(chat_type, conversation_id)
    }

    fn save_state(&self, state: &ConversationState) -> Result<ConversationState> {
        self.conversation_states().save(state)
    }
}

impl BotAnalyticsRepository for Database {
    fn record_trigger(
        &self,
        chat_type: ChatType,
        message_key: &str,
        step_number: u32,
        date: NaiveDate,
    ) -> Result<()> {
        self.bot_analytics()
            .record_trigger(chat_type, message_key, step_number, date)
    }

    fn record_admin_reply(
        &self,
        chat_type: ChatType,
        step_number: u32,
        date: NaiveDate,
    ) -> Result<bool> {
        self.bot_analytics()
            .record_admin_reply(chat_type, step_number, date)
    }
}

impl ChatMessageRepository for Database {
    fn create_chat_message(&self, message: &ChatMessage) -> Result<()> {
        self.chat_messages().create(message)
    }

    fn list_chat_messages(
        &self,
        chat_type: ChatType,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>> {
        self.chat_messages()
            .list_for_conversation(chat_type, conversation_id, limit)
    }
}
