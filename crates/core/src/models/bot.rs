//! Bot configuration and conversation state models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ChatType, ConversationId, Language};

/// Threshold used when a rule is created without one
pub const DEFAULT_REACTIVATION_THRESHOLD: u32 = 5;

/// Per chat type bot configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    pub chat_type: ChatType,
    /// When false the bot never emits for this chat type
    pub is_enabled: bool,
    /// Citizen messages needed after an admin reply before the bot resumes
    pub reactivation_threshold: u32,
    /// Restart the script at step 1 on reactivation
    pub reset_steps_on_reactivate: bool,
    pub updated_at: DateTime<Utc>,
}

impl TriggerRule {
    pub fn new(chat_type: ChatType) -> Self {
        Self {
            chat_type,
            is_enabled: true,
            reactivation_threshold: DEFAULT_REACTIVATION_THRESHOLD,
            reset_steps_on_reactivate: false,
            updated_at: Utc::now(),
        }
    }
}

/// Partial update for a trigger rule; unset fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerRuleUpdate {
    pub is_enabled: Option<bool>,
    pub reactivation_threshold: Option<u32>,
    pub reset_steps_on_reactivate: Option<bool>,
}

/// One canned message of a chat type's script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotMessage {
    pub id: i64,
    pub chat_type: ChatType,
    /// Globally unique authoring key, e.g. `live_chat_welcome`
    pub message_key: String,
    /// 1-based position in the script
    pub step_number: u32,
    pub content: String,
    /// Localized (Bangla) content
    pub content_alt: Option<String>,
    pub is_active: bool,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
}

impl BotMessage {
    /// Text to show a citizen with the given language preference
    pub fn content_for(&self, language: Language) -> &str {
        match language {
            Language::En => &self.content,
            Language::Bn => self
                .content_alt
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(&self.content),
        }
    }
}

/// Input for authoring a catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBotMessage {
    pub chat_type: ChatType,
    pub message_key: String,
    pub step_number: u32,
    pub content: String,
    pub content_alt: Option<String>,
    /// Defaults to the step number
    pub display_order: Option<i64>,
}

/// Partial update for a catalog entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotMessageUpdate {
    pub content: Option<String>,
    pub content_alt: Option<Option<String>>,
    pub step_number: Option<u32>,
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

/// Coarse phase of a conversation, derived from its flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationPhase {
    /// Bot active, nothing emitted yet
    Fresh,
    /// Bot active and has emitted at least once
    Engaged,
    /// An admin replied; waiting for the reactivation threshold
    Suppressed,
}

/// Bot engagement state of one conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub chat_type: ChatType,
    pub conversation_id: ConversationId,
    /// 0 means the script has not started
    pub current_step: u32,
    /// Only meaningful while the bot is inactive
    pub messages_since_admin_reply: u32,
    pub bot_active: bool,
    /// Sticky once set
    pub has_admin_replied: bool,
    pub last_bot_message_at: Option<DateTime<Utc>>,
    pub last_admin_reply_at: Option<DateTime<Utc>>,
    /// Optimistic lock counter, bumped on every save
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn fresh(chat_type: ChatType, conversation_id: ConversationId) -> Self {
        Self {
            chat_type,
            conversation_id,
            current_step: 0,
            messages_since_admin_reply: 0,
            bot_active: true,
            has_admin_replied: false,
            last_bot_message_at: None,
            last_admin_reply_at: None,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn phase(&self) -> ConversationPhase {
        if !self.bot_active {
            ConversationPhase::Suppressed
        } else if self.current_step == 0 && self.last_bot_message_at.is_none() {
            ConversationPhase::Fresh
        } else {
            ConversationPhase::Engaged
        }
    }
}

/// Filter for analytics summaries. Dates are inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsQuery {
    pub chat_type: Option<ChatType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Daily counters for one catalog message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub chat_type: ChatType,
    pub message_key: String,
    pub step_number: u32,
    pub date: NaiveDate,
    pub trigger_count: u64,
    pub admin_reply_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepStats {
    pub step: u32,
    pub triggers: u64,
    pub replies: u64,
}

/// Aggregated bot effectiveness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotAnalytics {
    pub total_triggers: u64,
    /// Admin replies per bot emission, 0 when nothing was emitted
    pub admin_reply_rate: f64,
    pub step_breakdown: Vec<StepStats>,
}

impl BotAnalytics {
    pub fn from_records(records: &[AnalyticsRecord]) -> Self {
        let mut steps: std::collections::BTreeMap<u32, StepStats> =
            std::collections::BTreeMap::new();
        let mut total_triggers = 0;
        let mut total_replies = 0;

        for record in records {
            total_triggers += record.trigger_count;
            total_replies += record.admin_reply_count;
            let entry = steps.entry(record.step_number).or_insert(StepStats {
                step: record.step_number,
                triggers: 0,
                replies: 0,
            });
            entry.triggers += record.trigger_count;
            entry.replies += record.admin_reply_count;
        }

        let admin_reply_rate = if total_triggers > 0 {
            total_replies as f64 / total_triggers as f64
        } else {
            0.0
        };

        Self {
            total_triggers,
            admin_reply_rate,
            step_breakdown: steps.into_values().collect(),
        }
    }
}
