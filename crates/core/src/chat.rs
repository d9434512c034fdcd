//! Chat send flows
//!
//! Human messages are always persisted. The bot runs as a separate step
//! whose failure is logged and reported, never propagated.

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::bot::{BotEngine, EngineSettings, RuleCache};
use crate::error::{Error, Result};
use crate::models::{ChatMessage, ChatType, ConversationId, Language, SenderType};
use crate::storage::ChatStorage;

/// Messages returned by `history` when no limit is given
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Result of a citizen send
#[derive(Debug, Clone, Serialize)]
pub struct CitizenSend {
    pub message: ChatMessage,
    /// Scripted reply stored after the citizen message
    pub bot_reply: Option<ChatMessage>,
    /// Bot failure, if any; the citizen message is stored regardless
    pub bot_error: Option<String>,
}

/// Result of an admin send
#[derive(Debug, Clone, Serialize)]
pub struct AdminSend {
    pub message: ChatMessage,
    pub bot_error: Option<String>,
}

pub struct ChatService<'a, S: ChatStorage + ?Sized> {
    storage: &'a S,
    engine: BotEngine<'a, S>,
}

impl<'a, S: ChatStorage + ?Sized> ChatService<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self {
            storage,
            engine: BotEngine::new(storage),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.engine = self.engine.with_settings(settings);
        self
    }

    pub fn with_rule_cache(mut self, cache: &'a RuleCache) -> Self {
        self.engine = self.engine.with_rule_cache(cache);
        self
    }

    /// Store a citizen message, then let the bot answer.
    pub fn send_citizen_message(
        &self,
        chat_type: ChatType,
        conversation_id: &ConversationId,
        citizen_id: Uuid,
        content: &str,
        language: Language,
    ) -> Result<CitizenSend> {
        let message = ChatMessage::new(
            chat_type,
            conversation_id.clone(),
            Some(citizen_id),
            SenderType::Citizen,
            validate_content(content)?,
        );
        self.storage.create_chat_message(&message)?;

        let (bot_reply, bot_error) = match self.bot_reply(chat_type, conversation_id, language) {
            Ok(reply) => (reply, None),
            Err(e) => {
                warn!(%chat_type, %conversation_id, error = %e, "Bot failed on citizen message");
                (None, Some(e.to_string()))
            }
        };

        Ok(CitizenSend {
            message,
            bot_reply,
            bot_error,
        })
    }

    /// Suppress the bot, then store the admin's message.
    pub fn send_admin_message(
        &self,
        chat_type: ChatType,
        conversation_id: &ConversationId,
        admin_id: Uuid,
        content: &str,
    ) -> Result<AdminSend> {
        let content = validate_content(content)?;

        let bot_error = match self.engine.on_admin_reply(chat_type, conversation_id) {
            Ok(()) => None,
            Err(e) => {
                warn!(%chat_type, %conversation_id, error = %e, "Bot failed to record admin reply");
                Some(e.to_string())
            }
        };

        let message = ChatMessage::new(
            chat_type,
            conversation_id.clone(),
            Some(admin_id),
            SenderType::Admin,
            content,
        );
        self.storage.create_chat_message(&message)?;

        Ok(AdminSend { message, bot_error })
    }

    /// Latest messages of a conversation, oldest first
    pub fn history(
        &self,
        chat_type: ChatType,
        conversation_id: &ConversationId,
        limit: Option<u32>,
    ) -> Result<Vec<ChatMessage>> {
        self.storage.list_chat_messages(
            chat_type,
            conversation_id,
            limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        )
    }

    fn bot_reply(
        &self,
        chat_type: ChatType,
        conversation_id: &ConversationId,
        language: Language,
    ) -> Result<Option<ChatMessage>> {
        let Some(scripted) = self.engine.on_user_message(chat_type, conversation_id)? else {
            return Ok(None);
        };

        let reply = ChatMessage::new(
            chat_type,
            conversation_id.clone(),
            None,
            SenderType::Bot,
            scripted.content_for(language).to_string(),
        );
        self.storage.create_chat_message(&reply)?;
        debug!(%chat_type, %conversation_id, message_key = %scripted.message_key, "Stored bot reply");
        Ok(Some(reply))
    }
}

fn validate_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("message content must not be empty".into()));
    }
    Ok(trimmed.to_string())
}
