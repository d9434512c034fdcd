//! Bot trigger rule storage
//!
//! One rule per chat type: enablement, reactivation threshold and the
//! step reset policy.

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::models::{ChatType, TriggerRule, TriggerRuleUpdate};
use crate::storage::parse::{parse_chat_type, parse_datetime, OptionalExt};

/// Trigger rule store
pub struct TriggerRuleStore<'a> {
    conn: &'a Connection,
}

impl<'a> TriggerRuleStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get the rule for a chat type
    pub fn get(&self, chat_type: ChatType) -> Result<Option<TriggerRule>> {
        let rule = self
            .conn
            .query_row(
                "SELECT chat_type, is_enabled, reactivation_threshold, reset_steps_on_reactivate, updated_at
                 FROM bot_trigger_rules WHERE chat_type = ?1",
                params![chat_type.as_str()],
                map_rule,
            )
            .optional()?;
        Ok(rule)
    }

    /// List rules for every configured chat type
    pub fn list(&self) -> Result<Vec<TriggerRule>> {
        let mut stmt = self.conn.prepare(
            "SELECT chat_type, is_enabled, reactivation_threshold, reset_steps_on_reactivate, updated_at
             FROM bot_trigger_rules ORDER BY chat_type",
        )?;
        let rules = stmt
            .query_map([], map_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    /// Create or update the rule for a chat type.
    ///
    /// Fields left unset keep their stored value, or the defaults
    /// (enabled, threshold 5, no reset) when the rule is new.
    pub fn upsert(&self, chat_type: ChatType, update: &TriggerRuleUpdate) -> Result<TriggerRule> {
        if update.reactivation_threshold == Some(0) {
            return Err(Error::InvalidInput(
                "reactivation threshold must be at least 1".into(),
            ));
        }

        let mut rule = self
            .get(chat_type)?
            .unwrap_or_else(|| TriggerRule::new(chat_type));
        if let Some(enabled) = update.is_enabled {
            rule.is_enabled = enabled;
        }
        if let Some(threshold) = update.reactivation_threshold {
            rule.reactivation_threshold = threshold;
        }
        if let Some(reset) = update.reset_steps_on_reactivate {
            rule.reset_steps_on_reactivate = reset;
        }
        rule.updated_at = Utc::now();

        self.conn.execute(
            "INSERT INTO bot_trigger_rules
                (chat_type, is_enabled, reactivation_threshold, reset_steps_on_reactivate, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(chat_type) DO UPDATE SET
                is_enabled = excluded.is_enabled,
                reactivation_threshold = excluded.reactivation_threshold,
                reset_steps_on_reactivate = excluded.reset_steps_on_reactivate,
                updated_at = excluded.updated_at",
            params![
                chat_type.as_str(),
                rule.is_enabled,
                rule.reactivation_threshold,
                rule.reset_steps_on_reactivate,
                rule.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(rule)
    }

    /// Remove the rule for a chat type; the bot is then off for it
    pub fn delete(&self, chat_type: ChatType) -> Result<()> {
        self.conn.execute(
            "DELETE FROM bot_trigger_rules WHERE chat_type = ?1",
            params![chat_type.as_str()],
        )?;
        Ok(())
    }
}

fn map_rule(row: &Row<'_>) -> rusqlite::Result<TriggerRule> {
    Ok(TriggerRule {
        chat_type: parse_chat_type(&row.get::<_, String>(0)?)?,
        is_enabled: row.get(1)?,
        reactivation_threshold: row.get(2)?,
        reset_steps_on_reactivate: row.get(3)?,
        updated_at: parse_datetime(&row.get::<_, String>(4)?)?,
    })
}
