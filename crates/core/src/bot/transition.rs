//! Conversation state transitions
//!
//! Pure functions over `ConversationState`. Storage lookups happen in the
//! engine; these only decide what changes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{BotMessage, ConversationState, TriggerRule};

/// What a citizen message did to a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserMessageEffect {
    /// The bot emits this catalog message
    Emit(BotMessage),
    /// Bot active but the script has no message for the next step
    Exhausted,
    /// Bot suppressed; counting towards reactivation
    Counted { count: u32, threshold: u32 },
    /// Threshold reached; bot active again from the next message on
    Reactivated { reset_steps: bool },
}

/// Apply a citizen message to `state`.
///
/// `candidate` is the catalog message the step policy offers for the
/// next step; it is only consulted while the bot is active.
pub fn apply_user_message(
    state: &mut ConversationState,
    rule: &TriggerRule,
    candidate: Option<BotMessage>,
    now: DateTime<Utc>,
) -> UserMessageEffect {
    if state.bot_active {
        return match candidate {
            Some(message) if message.step_number > state.current_step => {
                state.current_step = message.step_number;
                state.last_bot_message_at = Some(now);
                UserMessageEffect::Emit(message)
            }
            _ => UserMessageEffect::Exhausted,
        };
    }

    state.messages_since_admin_reply += 1;
    if state.messages_since_admin_reply < rule.reactivation_threshold {
        return UserMessageEffect::Counted {
            count: state.messages_since_admin_reply,
            threshold: rule.reactivation_threshold,
        };
    }

    // Reactivation never emits in the same turn
    state.bot_active = true;
    state.messages_since_admin_reply = 0;
    if rule.reset_steps_on_reactivate {
        state.current_step = 0;
    }
    UserMessageEffect::Reactivated {
        reset_steps: rule.reset_steps_on_reactivate,
    }
}

/// Apply an admin reply: suppress the bot and remember the reply.
pub fn apply_admin_reply(state: &mut ConversationState, now: DateTime<Utc>) {
    state.bot_active = false;
    state.has_admin_replied = true;
    state.messages_since_admin_reply = 0;
    state.last_admin_reply_at = Some(now);
}
