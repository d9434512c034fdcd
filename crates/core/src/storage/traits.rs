//! Storage repository traits
//!
//! These traits define the storage interface the bot engine and chat
//! service run against, allowing SQLite or test doubles underneath.

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{
    BotMessage, ChatMessage, ChatType, ConversationId, ConversationState, TriggerRule,
};

/// Read access to per chat type trigger rules
pub trait TriggerRuleRepository {
    /// Rule for a chat type, None when unconfigured
    fn trigger_rule(&self, chat_type: ChatType) -> Result<Option<TriggerRule>>;
}

/// Read access to the scripted bot messages. Only active entries are returned.
pub trait MessageCatalog {
    /// Active message at exactly `step`
    fn message_for_step(&self, chat_type: ChatType, step: u32) -> Result<Option<BotMessage>>;

    /// First active message numbered above `step`
    fn next_active_after(&self, chat_type: ChatType, step: u32) -> Result<Option<BotMessage>>;
}

/// Conversation state persistence
pub trait ConversationStateRepository {
    /// Load the state, creating a fresh one if absent
    fn load_state(
        &self,
        chat_type: ChatType,
        conversation_id: &ConversationId,
    ) -> Result<ConversationState>;

    /// Version-checked save; fails with `Error::ConcurrentUpdate` on a stale state
    fn save_state(&self, state: &ConversationState) -> Result<ConversationState>;
}

/// Bot analytics counters
pub trait BotAnalyticsRepository {
    fn record_trigger(
        &self,
        chat_type: ChatType,
        message_key: &str,
        step_number: u32,
        date: NaiveDate,
    ) -> Result<()>;

    fn record_admin_reply(&self, chat_type: ChatType, step_number: u32, date: NaiveDate)
        -> Result<bool>;
}

/// Chat message persistence
pub trait ChatMessageRepository {
    fn create_chat_message(&self, message: &ChatMessage) -> Result<()>;

    fn list_chat_messages(
        &self,
        chat_type: ChatType,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>>;
}

/// Everything the bot engine needs
pub trait BotStorage:
    TriggerRuleRepository + MessageCatalog + ConversationStateRepository + BotAnalyticsRepository
{
}

// Blanket implementation: any type implementing all traits implements BotStorage
impl<T> BotStorage for T where
    T: TriggerRuleRepository
        + MessageCatalog
        + ConversationStateRepository
        + BotAnalyticsRepository
        + ?Sized
{
}

/// Everything the chat service needs
pub trait ChatStorage: BotStorage + ChatMessageRepository {}

impl<T> ChatStorage for T where T: BotStorage + ChatMessageRepository + ?Sized {}
