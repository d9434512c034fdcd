//! Bot message catalog storage
//!
//! Scripted messages per chat type, addressed by step number.

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::models::{BotMessage, BotMessageUpdate, ChatType, NewBotMessage};
use crate::storage::parse::{parse_chat_type, parse_datetime, OptionalExt};

const SELECT_COLUMNS: &str = "SELECT id, chat_type, message_key, step_number, content, content_alt,
        is_active, display_order, created_at
 FROM bot_messages";

pub struct BotMessageStore<'a> {
    conn: &'a Connection,
}

impl<'a> BotMessageStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Add an active message to a chat type's script.
    ///
    /// Fails when another active message already occupies the step.
    pub fn create(&self, message: &NewBotMessage) -> Result<BotMessage> {
        validate_new(message)?;
        self.ensure_step_free(message.chat_type, message.step_number, None)?;
        self.insert(message)?;

        let id = self.conn.last_insert_rowid();
        self.find_by_id(id)?
            .ok_or_else(|| Error::NotFound(format!("bot message {}", id)))
    }

    /// Insert a message unless its key already exists (used for seeding).
    ///
    /// Returns the new message, or None when the key was taken. Existing
    /// entries are never modified.
    pub fn create_if_absent(&self, message: &NewBotMessage) -> Result<Option<BotMessage>> {
        if self.find_by_key(&message.message_key)?.is_some() {
            return Ok(None);
        }
        self.create(message).map(Some)
    }

    fn insert(&self, message: &NewBotMessage) -> Result<()> {
        self.conn.execute(
            "INSERT INTO bot_messages
                (chat_type, message_key, step_number, content, content_alt, is_active, display_order, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)",
            params![
                message.chat_type.as_str(),
                message.message_key,
                message.step_number,
                message.content,
                message.content_alt,
                message.display_order.unwrap_or(i64::from(message.step_number)),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Reject a step already held by an active message other than `except_id`
    fn ensure_step_free(&self, chat_type: ChatType, step: u32, except_id: Option<i64>) -> Result<()> {
        let holder: Option<String> = self
            .conn
            .query_row(
                "SELECT message_key FROM bot_messages
                 WHERE chat_type = ?1 AND step_number = ?2 AND is_active = 1 AND id != ?3
                 LIMIT 1",
                params![chat_type.as_str(), step, except_id.unwrap_or(-1)],
                |row| row.get(0),
            )
            .optional()?;

        match holder {
            Some(key) => Err(Error::InvalidInput(format!(
                "step {} of {} is already held by active message '{}'",
                step, chat_type, key
            ))),
            None => Ok(()),
        }
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<BotMessage>> {
        let message = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                map_message,
            )
            .optional()?;
        Ok(message)
    }

    pub fn find_by_key(&self, message_key: &str) -> Result<Option<BotMessage>> {
        let message = self
            .conn
            .query_row(
                &format!("{} WHERE message_key = ?1", SELECT_COLUMNS),
                params![message_key],
                map_message,
            )
            .optional()?;
        Ok(message)
    }

    /// Apply a partial update
    pub fn update(&self, id: i64, update: &BotMessageUpdate) -> Result<BotMessage> {
        let mut message = self
            .find_by_id(id)?
            .ok_or_else(|| Error::NotFound(format!("bot message {}", id)))?;

        if let Some(content) = &update.content {
            if content.trim().is_empty() {
                return Err(Error::InvalidInput("bot message content must not be empty".into()));
            }
            message.content = content.clone();
        }
        if let Some(content_alt) = &update.content_alt {
            message.content_alt = content_alt.clone();
        }
        if let Some(step) = update.step_number {
            if step == 0 {
                return Err(Error::InvalidInput("step numbers start at 1".into()));
            }
            message.step_number = step;
        }
        if let Some(order) = update.display_order {
            message.display_order = order;
        }
        if let Some(active) = update.is_active {
            message.is_active = active;
        }
        if message.is_active {
            self.ensure_step_free(message.chat_type, message.step_number, Some(id))?;
        }

        self.conn.execute(
            "UPDATE bot_messages SET
                content = ?1, content_alt = ?2, step_number = ?3, display_order = ?4, is_active = ?5
             WHERE id = ?6",
            params![
                message.content,
                message.content_alt,
                message.step_number,
                message.display_order,
                message.is_active,
                id,
            ],
        )?;
        Ok(message)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM bot_messages WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(Error::NotFound(format!("bot message {}", id)));
        }
        Ok(())
    }

    /// All messages of a chat type, active or not, in display order
    pub fn list_for_chat_type(&self, chat_type: ChatType) -> Result<Vec<BotMessage>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE chat_type = ?1 ORDER BY display_order ASC, step_number ASC",
            SELECT_COLUMNS
        ))?;
        let messages = stmt
            .query_map(params![chat_type.as_str()], map_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    /// The active message at exactly this step
    pub fn message_for_step(&self, chat_type: ChatType, step: u32) -> Result<Option<BotMessage>> {
        let message = self
            .conn
            .query_row(
                &format!(
                    "{} WHERE chat_type = ?1 AND step_number = ?2 AND is_active = 1",
                    SELECT_COLUMNS
                ),
                params![chat_type.as_str(), step],
                map_message,
            )
            .optional()?;
        Ok(message)
    }

    /// The first active message numbered strictly above `step`
    pub fn next_active_after(&self, chat_type: ChatType, step: u32) -> Result<Option<BotMessage>> {
        let message = self
            .conn
            .query_row(
                &format!(
                    "{} WHERE chat_type = ?1 AND step_number > ?2 AND is_active = 1
                     ORDER BY step_number ASC LIMIT 1",
                    SELECT_COLUMNS
                ),
                params![chat_type.as_str(), step],
                map_message,
            )
            .optional()?;
        Ok(message)
    }

    /// Highest active step number, if the script has any active entry
    pub fn highest_active_step(&self, chat_type: ChatType) -> Result<Option<u32>> {
        let step: Option<u32> = self.conn.query_row(
            "SELECT MAX(step_number) FROM bot_messages WHERE chat_type = ?1 AND is_active = 1",
            params![chat_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(step)
    }
}

fn validate_new(message: &NewBotMessage) -> Result<()> {
    if message.step_number == 0 {
        return Err(Error::InvalidInput("step numbers start at 1".into()));
    }
    if message.message_key.trim().is_empty() {
        return Err(Error::InvalidInput("message key must not be empty".into()));
    }
    if message.content.trim().is_empty() {
        return Err(Error::InvalidInput("bot message content must not be empty".into()));
    }
    Ok(())
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<BotMessage> {
    Ok(BotMessage {
        id: row.get(0)?,
        chat_type: parse_chat_type(&row.get::<_, String>(1)?)?,
        message_key: row.get(2)?,
        step_number: row.get(3)?,
        content: row.get(4)?,
        content_alt: row.get(5)?,
        is_active: row.get(6)?,
        display_order: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?)?,
    })
}
