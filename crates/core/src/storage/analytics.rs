//! Daily bot message analytics

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

use crate::error::Result;
use crate::models::{AnalyticsQuery, AnalyticsRecord, BotAnalytics, ChatType};
use crate::storage::parse::{parse_chat_type, parse_date};

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub struct BotAnalyticsStore<'a> {
    conn: &'a Connection,
}

impl<'a> BotAnalyticsStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Count one emission of a catalog message on `date`
    pub fn record_trigger(
        &self,
        chat_type: ChatType,
        message_key: &str,
        step_number: u32,
        date: NaiveDate,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO bot_message_analytics
                (chat_type, message_key, step_number, date, trigger_count, admin_reply_count)
             VALUES (?1, ?2, ?3, ?4, 1, 0)
             ON CONFLICT(chat_type, message_key, date) DO UPDATE SET
                trigger_count = trigger_count + 1,
                step_number = excluded.step_number",
            params![chat_type.as_str(), message_key, step_number, date_key(date)],
        )?;
        Ok(())
    }

    /// Count an admin reply against the step the bot had reached.
    ///
    /// Returns false when that step has no record for the day.
    pub fn record_admin_reply(
        &self,
        chat_type: ChatType,
        step_number: u32,
        date: NaiveDate,
    ) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE bot_message_analytics SET admin_reply_count = admin_reply_count + 1
             WHERE rowid = (
                SELECT rowid FROM bot_message_analytics
                WHERE chat_type = ?1 AND step_number = ?2 AND date = ?3
                ORDER BY message_key LIMIT 1
             )",
            params![chat_type.as_str(), step_number, date_key(date)],
        )?;
        Ok(affected > 0)
    }

    /// Records matching a query, oldest day first
    pub fn list(&self, query: &AnalyticsQuery) -> Result<Vec<AnalyticsRecord>> {
        let mut sql = String::from(
            "SELECT chat_type, message_key, step_number, date, trigger_count, admin_reply_count
             FROM bot_message_analytics WHERE 1 = 1",
        );
        let mut values: Vec<Value> = Vec::new();

        if let Some(chat_type) = query.chat_type {
            values.push(Value::Text(chat_type.as_str().to_string()));
            sql.push_str(&format!(" AND chat_type = ?{}", values.len()));
        }
        if let Some(start) = query.start_date {
            values.push(Value::Text(date_key(start)));
            sql.push_str(&format!(" AND date >= ?{}", values.len()));
        }
        if let Some(end) = query.end_date {
            values.push(Value::Text(date_key(end)));
            sql.push_str(&format!(" AND date <= ?{}", values.len()));
        }
        sql.push_str(" ORDER BY date ASC, chat_type ASC, step_number ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values), map_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Aggregate totals, reply rate and per-step breakdown
    pub fn summary(&self, query: &AnalyticsQuery) -> Result<BotAnalytics> {
        let records = self.list(query)?;
        Ok(BotAnalytics::from_records(&records))
    }
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<AnalyticsRecord> {
    Ok(AnalyticsRecord {
        chat_type: parse_chat_type(&row.get::<_, String>(0)?)?,
        message_key: row.get(1)?,
        step_number: row.get(2)?,
        date: parse_date(&row.get::<_, String>(3)?)?,
        trigger_count: row.get::<_, i64>(4)? as u64,
        admin_reply_count: row.get::<_, i64>(5)? as u64,
    })
}
