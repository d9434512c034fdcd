//! Console chat desk
//!
//! One command per stdin line, one JSON object per result on stdout.

use std::sync::Arc;

use civicdesk_core::models::AnalyticsQuery;
use civicdesk_core::{ChatService, ChatType, ConversationId, Language, Result};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::state::AppState;

pub const USAGE: &str = "commands: citizen <live|complaint> <conversation> <text...> | \
admin <live|complaint> <conversation> <text...> | history <live|complaint> <conversation> | \
stats [live|complaint] | lang <en|bn> | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Citizen {
        chat_type: ChatType,
        conversation_id: ConversationId,
        text: String,
    },
    Admin {
        chat_type: ChatType,
        conversation_id: ConversationId,
        text: String,
    },
    History {
        chat_type: ChatType,
        conversation_id: ConversationId,
    },
    Stats {
        chat_type: Option<ChatType>,
    },
    Lang(Language),
    Quit,
}

impl Command {
    /// Parse one input line; `Ok(None)` for a blank line
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (verb, rest) = split_word(line);
        let command = match verb {
            "citizen" | "admin" => {
                let (chat, rest) = split_word(rest);
                let (conversation, text) = split_word(rest);
                let chat_type = parse_chat(chat)?;
                let conversation_id = parse_conversation(conversation)?;
                if text.is_empty() {
                    return Err(format!("missing message text\n{}", USAGE));
                }
                let text = text.to_string();
                if verb == "citizen" {
                    Command::Citizen {
                        chat_type,
                        conversation_id,
                        text,
                    }
                } else {
                    Command::Admin {
                        chat_type,
                        conversation_id,
                        text,
                    }
                }
            }
            "history" => {
                let (chat, rest) = split_word(rest);
                let (conversation, _) = split_word(rest);
                Command::History {
                    chat_type: parse_chat(chat)?,
                    conversation_id: parse_conversation(conversation)?,
                }
            }
            "stats" => {
                let (chat, _) = split_word(rest);
                let chat_type = if chat.is_empty() {
                    None
                } else {
                    Some(parse_chat(chat)?)
                };
                Command::Stats { chat_type }
            }
            "lang" => {
                let (lang, _) = split_word(rest);
                Command::Lang(lang.parse::<Language>().map_err(|e| e.to_string())?)
            }
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command '{}'\n{}", other, USAGE)),
        };
        Ok(Some(command))
    }
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (input, ""),
    }
}

fn parse_chat(word: &str) -> std::result::Result<ChatType, String> {
    match word {
        "live" => Ok(ChatType::LiveChat),
        "complaint" => Ok(ChatType::ComplaintChat),
        "" => Err(format!("missing chat type\n{}", USAGE)),
        other => other.parse::<ChatType>().map_err(|e| e.to_string()),
    }
}

fn parse_conversation(word: &str) -> std::result::Result<ConversationId, String> {
    if word.is_empty() {
        return Err(format!("missing conversation\n{}", USAGE));
    }
    ConversationId::new(word).map_err(|e| e.to_string())
}

/// A desk session: one citizen and one admin identity
pub struct Desk {
    state: Arc<AppState>,
    citizen_id: Uuid,
    admin_id: Uuid,
    language: Language,
}

impl Desk {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            citizen_id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            language: Language::default(),
        }
    }

    /// Run a command and render its JSON result
    pub fn execute(&mut self, command: Command) -> Value {
        match self.run(command) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Desk command failed");
                json!({ "ok": false, "error": e.to_string() })
            }
        }
    }

    fn run(&mut self, command: Command) -> Result<Value> {
        let db = self.state.db()?;
        let service = ChatService::new(&*db)
            .with_settings(self.state.settings)
            .with_rule_cache(&self.state.rule_cache);

        let value = match command {
            Command::Citizen {
                chat_type,
                conversation_id,
                text,
            } => {
                let sent = service.send_citizen_message(
                    chat_type,
                    &conversation_id,
                    self.citizen_id,
                    &text,
                    self.language,
                )?;
                json!({ "ok": true, "sent": sent })
            }
            Command::Admin {
                chat_type,
                conversation_id,
                text,
            } => {
                let sent =
                    service.send_admin_message(chat_type, &conversation_id, self.admin_id, &text)?;
                json!({ "ok": true, "sent": sent })
            }
            Command::History {
                chat_type,
                conversation_id,
            } => {
                let messages = service.history(chat_type, &conversation_id, None)?;
                json!({ "ok": true, "messages": messages })
            }
            Command::Stats { chat_type } => {
                let summary = db.bot_analytics().summary(&AnalyticsQuery {
                    chat_type,
                    ..Default::default()
                })?;
                json!({ "ok": true, "stats": summary })
            }
            Command::Lang(language) => {
                self.language = language;
                json!({ "ok": true, "language": language })
            }
            Command::Quit => json!({ "ok": true, "bye": true }),
        };
        Ok(value)
    }
}
