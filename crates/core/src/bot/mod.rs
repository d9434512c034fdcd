//! Scripted chat bot
//!
//! Decides, on every citizen message, whether the next canned message of
//! the chat type's script is sent into the conversation, and goes quiet
//! as soon as an admin replies. The bot resumes once the citizen has
//! written `reactivation_threshold` more messages.
//!
//! The engine never persists chat messages itself; callers store an
//! emitted `BotMessage` as a `SenderType::Bot` chat row.

mod seed;
mod transition;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::error::{Error, Result};
use crate::invariants::assert_transition_invariants;
use crate::models::{BotMessage, ChatType, ConversationId, ConversationState, TriggerRule};
use crate::storage::BotStorage;

pub use seed::{default_catalog, seed_defaults, SeedReport};
pub use transition::{apply_admin_reply, apply_user_message, UserMessageEffect};

/// Attempts made when saves keep hitting version conflicts
pub const DEFAULT_MAX_SAVE_ATTEMPTS: u32 = 3;

/// Trigger rules cached per chat type; `None` caches "unconfigured"
pub type RuleCache = TtlCache<ChatType, Option<TriggerRule>>;

/// How the next message is picked when the exact next step has none
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPolicy {
    /// Only the message at `current_step + 1`; otherwise stay silent
    #[default]
    Exact,
    /// The first active message numbered above `current_step`
    SkipForward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub step_policy: StepPolicy,
    pub max_save_attempts: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            step_policy: StepPolicy::Exact,
            max_save_attempts: DEFAULT_MAX_SAVE_ATTEMPTS,
        }
    }
}

/// Events the engine reacts to
#[derive(Debug, Clone)]
pub enum BotEvent {
    /// A citizen posted into the conversation
    UserMessage {
        chat_type: ChatType,
        conversation_id: ConversationId,
    },
    /// An admin is about to post into the conversation
    AdminReply {
        chat_type: ChatType,
        conversation_id: ConversationId,
    },
}

/// Bot decision engine over some storage
pub struct BotEngine<'a, S: BotStorage + ?Sized> {
    storage: &'a S,
    settings: EngineSettings,
    rule_cache: Option<&'a RuleCache>,
}

impl<'a, S: BotStorage + ?Sized> BotEngine<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self {
            storage,
            settings: EngineSettings::default(),
            rule_cache: None,
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_rule_cache(mut self, cache: &'a RuleCache) -> Self {
        self.rule_cache = Some(cache);
        self
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// Dispatch an event. Only citizen messages can yield a message.
    pub fn handle(&self, event: &BotEvent) -> Result<Option<BotMessage>> {
        match event {
            BotEvent::UserMessage {
                chat_type,
                conversation_id,
            } => self.on_user_message(*chat_type, conversation_id),
            BotEvent::AdminReply {
                chat_type,
                conversation_id,
            } => self.on_admin_reply(*chat_type, conversation_id).map(|_| None),
        }
    }

    /// React to a citizen message, returning the message to emit, if any
    pub fn on_user_message(
        &self,
        chat_type: ChatType,
        conversation_id: &ConversationId,
    ) -> Result<Option<BotMessage>> {
        let rule = match self.rule(chat_type)? {
            Some(rule) if rule.is_enabled => rule,
            _ => {
                debug!(%chat_type, %conversation_id, "Bot disabled for chat type");
                return Ok(None);
            }
        };

        let (before, saved, effect) = self.update_state(chat_type, conversation_id, |state| {
            let candidate = if state.bot_active {
                self.candidate(chat_type, state.current_step)?
            } else {
                None
            };
            Ok(apply_user_message(state, &rule, candidate, Utc::now()))
        })?;
        assert_transition_invariants(&before, &saved, rule.reset_steps_on_reactivate);

        match effect {
            UserMessageEffect::Emit(message) => {
                info!(
                    %chat_type,
                    %conversation_id,
                    step = message.step_number,
                    message_key = %message.message_key,
                    "Bot emitting scripted message"
                );
                self.track_trigger(&message);
                Ok(Some(message))
            }
            UserMessageEffect::Exhausted => {
                debug!(%chat_type, %conversation_id, step = saved.current_step, "Bot script exhausted");
                Ok(None)
            }
            UserMessageEffect::Counted { count, threshold } => {
                debug!(%chat_type, %conversation_id, count, threshold, "Bot suppressed, counting");
                Ok(None)
            }
            UserMessageEffect::Reactivated { reset_steps } => {
                info!(%chat_type, %conversation_id, reset_steps, "Bot reactivated");
                Ok(None)
            }
        }
    }

    /// Suppress the bot for a conversation.
    ///
    /// Must complete before the admin's own message is stored.
    pub fn on_admin_reply(&self, chat_type: ChatType, conversation_id: &ConversationId) -> Result<()> {
        let (before, saved, ()) = self.update_state(chat_type, conversation_id, |state| {
            apply_admin_reply(state, Utc::now());
            Ok(())
        })?;
        assert_transition_invariants(&before, &saved, false);

        if before.bot_active {
            info!(%chat_type, %conversation_id, step = saved.current_step, "Bot suppressed by admin reply");
        }
        if saved.current_step > 0 {
            self.track_admin_reply(chat_type, saved.current_step);
        }
        Ok(())
    }

    /// Same as `on_user_message` for an untyped chat type.
    ///
    /// Unknown chat types are treated like an unconfigured rule.
    pub fn on_user_message_raw(
        &self,
        chat_type: &str,
        conversation_id: &ConversationId,
    ) -> Result<Option<BotMessage>> {
        match chat_type.parse::<ChatType>() {
            Ok(chat_type) => self.on_user_message(chat_type, conversation_id),
            Err(_) => {
                debug!(chat_type, %conversation_id, "Ignoring unknown chat type");
                Ok(None)
            }
        }
    }

    /// Same as `on_admin_reply` for an untyped chat type; unknown types are ignored
    pub fn on_admin_reply_raw(&self, chat_type: &str, conversation_id: &ConversationId) -> Result<()> {
        match chat_type.parse::<ChatType>() {
            Ok(chat_type) => self.on_admin_reply(chat_type, conversation_id),
            Err(_) => {
                debug!(chat_type, %conversation_id, "Ignoring unknown chat type");
                Ok(())
            }
        }
    }

    fn rule(&self, chat_type: ChatType) -> Result<Option<TriggerRule>> {
        if let Some(cache) = self.rule_cache {
            if let Some(rule) = cache.get(&chat_type) {
                return Ok(rule);
            }
            let rule = self.storage.trigger_rule(chat_type)?;
            cache.insert(chat_type, rule.clone());
            return Ok(rule);
        }
        self.storage.trigger_rule(chat_type)
    }

    fn candidate(&self, chat_type: ChatType, current_step: u32) -> Result<Option<BotMessage>> {
        match self.settings.step_policy {
            StepPolicy::Exact => self.storage.message_for_step(chat_type, current_step + 1),
            StepPolicy::SkipForward => self.storage.next_active_after(chat_type, current_step),
        }
    }

    /// Load, mutate and save a state, retrying on version conflicts.
    ///
    /// Returns the state as loaded, the state as saved and the closure's output.
    fn update_state<T, F>(
        &self,
        chat_type: ChatType,
        conversation_id: &ConversationId,
        mut apply: F,
    ) -> Result<(ConversationState, ConversationState, T)>
    where
        F: FnMut(&mut ConversationState) -> Result<T>,
    {
        let max_attempts = self.settings.max_save_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let before = self.storage.load_state(chat_type, conversation_id)?;
            let mut state = before.clone();
            let output = apply(&mut state)?;

            match self.storage.save_state(&state) {
                Ok(saved) => return Ok((before, saved, output)),
                Err(Error::ConcurrentUpdate { .. }) if attempt < max_attempts => {
                    debug!(%chat_type, %conversation_id, attempt, "Conversation state changed underneath, retrying");
                }
                Err(e) => {
                    warn!(%chat_type, %conversation_id, attempt, error = %e, "Failed to save conversation state");
                    return Err(e);
                }
            }
        }
    }

    fn track_trigger(&self, message: &BotMessage) {
        let today = Utc::now().date_naive();
        if let Err(e) = self.storage.record_trigger(
            message.chat_type,
            &message.message_key,
            message.step_number,
            today,
        ) {
            warn!(error = %e, message_key = %message.message_key, "Failed to record bot trigger");
        }
    }

    fn track_admin_reply(&self, chat_type: ChatType, step: u32) {
        let today = Utc::now().date_naive();
        if let Err(e) = self.storage.record_admin_reply(chat_type, step, today) {
            warn!(error = %e, %chat_type, step, "Failed to record admin reply");
        }
    }
}
