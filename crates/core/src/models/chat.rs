//! Chat channel, sender and message models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Chat channel category. Each has its own bot rule and script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatType {
    /// General live chat between a citizen and the city desk
    LiveChat,
    /// Chat thread attached to one complaint
    ComplaintChat,
}

impl ChatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatType::LiveChat => "LIVE_CHAT",
            ChatType::ComplaintChat => "COMPLAINT_CHAT",
        }
    }

    pub fn all() -> &'static [ChatType] {
        &[ChatType::LiveChat, ChatType::ComplaintChat]
    }
}

impl fmt::Display for ChatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIVE_CHAT" => Ok(ChatType::LiveChat),
            "COMPLAINT_CHAT" => Ok(ChatType::ComplaintChat),
            other => Err(Error::InvalidInput(format!("unknown chat type '{}'", other))),
        }
    }
}

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderType {
    Citizen,
    Admin,
    /// Synthetic sender for scripted bot messages
    Bot,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::Citizen => "CITIZEN",
            SenderType::Admin => "ADMIN",
            SenderType::Bot => "BOT",
        }
    }
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SenderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CITIZEN" => Ok(SenderType::Citizen),
            "ADMIN" => Ok(SenderType::Admin),
            "BOT" => Ok(SenderType::Bot),
            other => Err(Error::InvalidInput(format!("unknown sender type '{}'", other))),
        }
    }
}

/// Preferred display language of a citizen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Bn,
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "bn" => Ok(Language::Bn),
            other => Err(Error::InvalidInput(format!("unknown language '{}'", other))),
        }
    }
}

/// Opaque identifier of one chat thread within a chat type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidInput("conversation id must not be empty".into()));
        }
        Ok(Self(id))
    }

    /// Conversation attached to a complaint, e.g. `complaint-42`
    pub fn complaint(complaint_id: i64) -> Self {
        Self(format!("complaint-{}", complaint_id))
    }

    /// Live chat conversation of one citizen
    pub fn live(citizen_id: Uuid) -> Self {
        Self(format!("live-{}", citizen_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_type: ChatType,
    pub conversation_id: ConversationId,
    /// None for bot-authored messages
    pub sender_id: Option<Uuid>,
    pub sender_type: SenderType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        chat_type: ChatType,
        conversation_id: ConversationId,
        sender_id: Option<Uuid>,
        sender_type: SenderType,
        content: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_type,
            conversation_id,
            sender_id,
            sender_type,
            content,
            created_at: Utc::now(),
        }
    }

    pub fn is_bot(&self) -> bool {
        self.sender_type == SenderType::Bot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_type_parse() {
        assert_eq!("LIVE_CHAT".parse::<ChatType>().unwrap(), ChatType::LiveChat);
        assert_eq!(
            "COMPLAINT_CHAT".parse::<ChatType>().unwrap(),
            ChatType::ComplaintChat
        );
        assert!("live_chat".parse::<ChatType>().is_err());
        assert!("DIRECT_CHAT".parse::<ChatType>().is_err());
    }

    #[test]
    fn test_chat_type_serde_matches_storage_form() {
        let json = serde_json::to_string(&ChatType::ComplaintChat).unwrap();
        assert_eq!(json, "\"COMPLAINT_CHAT\"");
        let json = serde_json::to_string(&SenderType::Bot).unwrap();
        assert_eq!(json, "\"BOT\"");
    }

    #[test]
    fn test_conversation_id_helpers() {
        assert_eq!(ConversationId::complaint(42).as_str(), "complaint-42");
        let user = Uuid::new_v4();
        assert_eq!(ConversationId::live(user).to_string(), format!("live-{}", user));
        assert!(ConversationId::new("   ").is_err());
    }

    #[test]
    fn test_language_parse() {
        assert_eq!("BN".parse::<Language>().unwrap(), Language::Bn);
        assert_eq!(Language::default(), Language::En);
        assert!("fr".parse::<Language>().is_err());
    }
}
