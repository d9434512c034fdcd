//! Chat message storage operations

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ChatMessage, ChatType, ConversationId, SenderType};
use crate::storage::parse::{
    parse_chat_type, parse_conversation_id, parse_datetime, parse_sender_type, parse_uuid,
    parse_uuid_opt, OptionalExt,
};

pub struct ChatMessageStore<'a> {
    conn: &'a Connection,
}

impl<'a> ChatMessageStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Persist a new message
    pub fn create(&self, message: &ChatMessage) -> Result<()> {
        self.conn.execute(
            "INSERT INTO chat_messages (id, chat_type, conversation_id, sender_id, sender_type, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                message.id.to_string(),
                message.chat_type.as_str(),
                message.conversation_id.as_str(),
                message.sender_id.map(|id| id.to_string()),
                message.sender_type.as_str(),
                message.content,
                message.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get message by ID
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<ChatMessage>> {
        let message = self
            .conn
            .query_row(
                "SELECT id, chat_type, conversation_id, sender_id, sender_type, content, created_at
                 FROM chat_messages WHERE id = ?1",
                params![id.to_string()],
                map_message,
            )
            .optional()?;
        Ok(message)
    }

    /// Latest `limit` messages of a conversation, oldest first
    pub fn list_for_conversation(
        &self,
        chat_type: ChatType,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, chat_type, conversation_id, sender_id, sender_type, content, created_at
             FROM chat_messages
             WHERE chat_type = ?1 AND conversation_id = ?2
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?3",
        )?;

        let mut messages = stmt
            .query_map(
                params![chat_type.as_str(), conversation_id.as_str(), limit],
                map_message,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // Reverse to get chronological order
        messages.reverse();
        Ok(messages)
    }

    /// Count messages in a conversation, optionally by sender type
    pub fn count_for_conversation(
        &self,
        chat_type: ChatType,
        conversation_id: &ConversationId,
        sender_type: Option<SenderType>,
    ) -> Result<u64> {
        let count: i64 = match sender_type {
            Some(sender_type) => self.conn.query_row(
                "SELECT COUNT(*) FROM chat_messages
                 WHERE chat_type = ?1 AND conversation_id = ?2 AND sender_type = ?3",
                params![
                    chat_type.as_str(),
                    conversation_id.as_str(),
                    sender_type.as_str()
                ],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT COUNT(*) FROM chat_messages WHERE chat_type = ?1 AND conversation_id = ?2",
                params![chat_type.as_str(), conversation_id.as_str()],
                |row| row.get(0),
            )?,
        };
        Ok(count as u64)
    }
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        chat_type: parse_chat_type(&row.get::<_, String>(1)?)?,
        conversation_id: parse_conversation_id(row.get(2)?)?,
        sender_id: parse_uuid_opt(row.get(3)?)?,
        sender_type: parse_sender_type(&row.get::<_, String>(4)?)?,
        content: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn citizen_message(conv: &ConversationId, content: &str) -> ChatMessage {
        ChatMessage::new(
            ChatType::ComplaintChat,
            conv.clone(),
            Some(Uuid::new_v4()),
            SenderType::Citizen,
            content.to_string(),
        )
    }

    #[test]
    fn test_create_and_find() {
        let db = Database::open_in_memory().unwrap();
        let conv = ConversationId::complaint(1);
        let message = citizen_message(&conv, "Garbage not collected");
        db.chat_messages().create(&message).unwrap();

        let found = db.chat_messages().find_by_id(message.id).unwrap().unwrap();
        assert_eq!(found.content, "Garbage not collected");
        assert_eq!(found.sender_type, SenderType::Citizen);
        assert_eq!(found.conversation_id, conv);
        assert!(db.chat_messages().find_by_id(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_bot_message_has_no_sender() {
        let db = Database::open_in_memory().unwrap();
        let conv = ConversationId::complaint(1);
        let bot = ChatMessage::new(
            ChatType::ComplaintChat,
            conv,
            None,
            SenderType::Bot,
            "Your complaint has been received".to_string(),
        );
        db.chat_messages().create(&bot).unwrap();

        let found = db.chat_messages().find_by_id(bot.id).unwrap().unwrap();
        assert!(found.is_bot());
        assert!(found.sender_id.is_none());
    }

    #[test]
    fn test_list_is_chronological_and_limited() {
        let db = Database::open_in_memory().unwrap();
        let store = db.chat_messages();
        let conv = ConversationId::complaint(9);

        for i in 0..5 {
            store.create(&citizen_message(&conv, &format!("msg {}", i))).unwrap();
        }
        store
            .create(&citizen_message(&ConversationId::complaint(10), "other"))
            .unwrap();

        let all = store
            .list_for_conversation(ChatType::ComplaintChat, &conv, 50)
            .unwrap();
        let contents: Vec<_> = all.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);

        let latest = store
            .list_for_conversation(ChatType::ComplaintChat, &conv, 2)
            .unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].content, "msg 3");
        assert_eq!(latest[1].content, "msg 4");
    }

    #[test]
    fn test_count_by_sender_type() {
        let db = Database::open_in_memory().unwrap();
        let store = db.chat_messages();
        let conv = ConversationId::complaint(2);

        store.create(&citizen_message(&conv, "one")).unwrap();
        store.create(&citizen_message(&conv, "two")).unwrap();
        store
            .create(&ChatMessage::new(
                ChatType::ComplaintChat,
                conv.clone(),
                Some(Uuid::new_v4()),
                SenderType::Admin,
                "On it".to_string(),
            ))
            .unwrap();

        let total = store
            .count_for_conversation(ChatType::ComplaintChat, &conv, None)
            .unwrap();
        let citizens = store
            .count_for_conversation(ChatType::ComplaintChat, &conv, Some(SenderType::Citizen))
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(citizens, 2);
    }
}
