//! Bot conversation state storage
//!
//! One row per (chat type, conversation id). Saves are guarded by a
//! version column: a save only lands if nobody else saved since the
//! state was loaded.

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::models::{ChatType, ConversationId, ConversationState};
use crate::storage::parse::{
    parse_chat_type, parse_conversation_id, parse_datetime, parse_datetime_opt, OptionalExt,
};

pub struct ConversationStateStore<'a> {
    conn: &'a Connection,
}

impl<'a> ConversationStateStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get the stored state without creating it
    pub fn get(
        &self,
        chat_type: ChatType,
        conversation_id: &ConversationId,
    ) -> Result<Option<ConversationState>> {
        let state = self
            .conn
            .query_row(
                "SELECT chat_type, conversation_id, current_step, messages_since_admin_reply,
                        bot_active, has_admin_replied, last_bot_message_at, last_admin_reply_at,
                        version, updated_at
                 FROM bot_conversation_state WHERE chat_type = ?1 AND conversation_id = ?2",
                params![chat_type.as_str(), conversation_id.as_str()],
                map_state,
            )
            .optional()?;
        Ok(state)
    }

    /// Load the state, creating a fresh one on first use
    pub fn load(
        &self,
        chat_type: ChatType,
        conversation_id: &ConversationId,
    ) -> Result<ConversationState> {
        let fresh = ConversationState::fresh(chat_type, conversation_id.clone());
        self.conn.execute(
            "INSERT INTO bot_conversation_state
                (chat_type, conversation_id, current_step, messages_since_admin_reply,
                 bot_active, has_admin_replied, version, updated_at)
             VALUES (?1, ?2, 0, 0, 1, 0, 0, ?3)
             ON CONFLICT(chat_type, conversation_id) DO NOTHING",
            params![
                chat_type.as_str(),
                conversation_id.as_str(),
                fresh.updated_at.to_rfc3339(),
            ],
        )?;

        self.get(chat_type, conversation_id)?.ok_or_else(|| {
            Error::NotFound(format!(
                "conversation state {}/{}",
                chat_type, conversation_id
            ))
        })
    }

    /// Persist `state` if its version still matches the stored row.
    ///
    /// Returns the saved state with its bumped version, or
    /// `Error::ConcurrentUpdate` when another writer got there first.
    pub fn save(&self, state: &ConversationState) -> Result<ConversationState> {
        let now = Utc::now();
        let new_version = state.version + 1;

        let affected = self.conn.execute(
            "UPDATE bot_conversation_state SET
                current_step = ?1,
                messages_since_admin_reply = ?2,
                bot_active = ?3,
                has_admin_replied = ?4,
                last_bot_message_at = ?5,
                last_admin_reply_at = ?6,
                version = ?7,
                updated_at = ?8
             WHERE chat_type = ?9 AND conversation_id = ?10 AND version = ?11",
            params![
                state.current_step,
                state.messages_since_admin_reply,
                state.bot_active,
                state.has_admin_replied,
                state.last_bot_message_at.map(|t| t.to_rfc3339()),
                state.last_admin_reply_at.map(|t| t.to_rfc3339()),
                new_version,
                now.to_rfc3339(),
                state.chat_type.as_str(),
                state.conversation_id.as_str(),
                state.version,
            ],
        )?;

        if affected == 0 {
            return Err(Error::ConcurrentUpdate {
                chat_type: state.chat_type,
                conversation_id: state.conversation_id.to_string(),
                expected_version: state.version,
            });
        }

        Ok(ConversationState {
            version: new_version,
            updated_at: now,
            ..state.clone()
        })
    }
}

fn map_state(row: &Row<'_>) -> rusqlite::Result<ConversationState> {
    Ok(ConversationState {
        chat_type: parse_chat_type(&row.get::<_, String>(0)?)?,
        conversation_id: parse_conversation_id(row.get(1)?)?,
        current_step: row.get(2)?,
        messages_since_admin_reply: row.get(3)?,
        bot_active: row.get(4)?,
        has_admin_replied: row.get(5)?,
        last_bot_message_at: parse_datetime_opt(row.get(6)?)?,
        last_admin_reply_at: parse_datetime_opt(row.get(7)?)?,
        version: row.get(8)?,
        updated_at: parse_datetime(&row.get::<_, String>(9)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use tempfile::tempdir;

    #[test]
    fn test_load_creates_fresh_state_once() {
        let db = Database::open_in_memory().unwrap();
        let store = db.conversation_states();
        let conv = ConversationId::complaint(7);

        assert!(store.get(ChatType::ComplaintChat, &conv).unwrap().is_none());

        let state = store.load(ChatType::ComplaintChat, &conv).unwrap();
        assert_eq!(state.current_step, 0);
        assert!(state.bot_active);
        assert!(!state.has_admin_replied);
        assert_eq!(state.version, 0);

        // A second load returns the same row, not a new one
        let mut changed = state.clone();
        changed.current_step = 2;
        store.save(&changed).unwrap();
        let reloaded = store.load(ChatType::ComplaintChat, &conv).unwrap();
        assert_eq!(reloaded.current_step, 2);
        assert_eq!(reloaded.version, 1);
    }

    #[test]
    fn test_states_are_scoped_by_chat_type() {
        let db = Database::open_in_memory().unwrap();
        let store = db.conversation_states();
        let conv = ConversationId::new("c-1").unwrap();

        let mut live = store.load(ChatType::LiveChat, &conv).unwrap();
        live.bot_active = false;
        store.save(&live).unwrap();

        let complaint = store.load(ChatType::ComplaintChat, &conv).unwrap();
        assert!(complaint.bot_active);
    }

    #[test]
    fn test_stale_save_conflicts() {
        let db = Database::open_in_memory().unwrap();
        let store = db.conversation_states();
        let conv = ConversationId::new("c-1").unwrap();

        let first = store.load(ChatType::LiveChat, &conv).unwrap();
        let second = first.clone();

        let mut winner = first;
        winner.current_step = 1;
        store.save(&winner).unwrap();

        let mut loser = second;
        loser.current_step = 5;
        let result = store.save(&loser);
        assert!(matches!(
            result,
            Err(Error::ConcurrentUpdate { expected_version: 0, .. })
        ));

        let stored = store.get(ChatType::LiveChat, &conv).unwrap().unwrap();
        assert_eq!(stored.current_step, 1);
    }

    #[test]
    fn test_state_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        let conv = ConversationId::complaint(3);

        {
            let db = Database::open(&path).unwrap();
            let store = db.conversation_states();
            let mut state = store.load(ChatType::ComplaintChat, &conv).unwrap();
            state.has_admin_replied = true;
            state.bot_active = false;
            state.last_admin_reply_at = Some(Utc::now());
            store.save(&state).unwrap();
        }

        let db = Database::open(&path).unwrap();
        let state = db
            .conversation_states()
            .get(ChatType::ComplaintChat, &conv)
            .unwrap()
            .unwrap();
        assert!(state.has_admin_replied);
        assert!(!state.bot_active);
        assert!(state.last_admin_reply_at.is_some());
    }
}
