//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible conversation states during
//! development. These checks are compiled out in release builds.

use crate::models::ConversationState;

/// Validate that a conversation state is internally consistent
pub fn assert_state_invariants(state: &ConversationState) {
    // Only an admin reply can switch the bot off
    debug_assert!(
        state.bot_active || state.has_admin_replied,
        "Conversation {}/{} is suppressed but no admin has replied",
        state.chat_type,
        state.conversation_id
    );

    // The counter is reset whenever the bot is (re)activated
    debug_assert!(
        !state.bot_active || state.messages_since_admin_reply == 0,
        "Conversation {}/{} is active with {} pending citizen messages",
        state.chat_type,
        state.conversation_id,
        state.messages_since_admin_reply
    );
}

/// Validate a single transition from `before` to `after`
pub fn assert_transition_invariants(
    before: &ConversationState,
    after: &ConversationState,
    reset_allowed: bool,
) {
    debug_assert!(
        after.current_step >= before.current_step || (reset_allowed && after.current_step == 0),
        "Conversation {}/{} step went from {} to {}",
        after.chat_type,
        after.conversation_id,
        before.current_step,
        after.current_step
    );

    debug_assert!(
        !before.has_admin_replied || after.has_admin_replied,
        "Conversation {}/{} forgot its admin reply",
        after.chat_type,
        after.conversation_id
    );

    assert_state_invariants(after);
}
