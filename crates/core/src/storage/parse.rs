//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Error as SqlError;
use uuid::Uuid;

use crate::models::{ChatType, ConversationId, SenderType};

fn conversion_error<E>(e: E) -> SqlError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(conversion_error)
}

/// Parse an optional UUID from a database string column
pub fn parse_uuid_opt(s: Option<String>) -> Result<Option<Uuid>, SqlError> {
    s.map(|s| parse_uuid(&s)).transpose()
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_error)
}

/// Parse an optional DateTime from an RFC3339 string
pub fn parse_datetime_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>, SqlError> {
    s.map(|s| parse_datetime(&s)).transpose()
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate, SqlError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(conversion_error)
}

/// Parse a stored chat type
pub fn parse_chat_type(s: &str) -> Result<ChatType, SqlError> {
    ChatType::from_str(s).map_err(conversion_error)
}

/// Parse a stored sender type
pub fn parse_sender_type(s: &str) -> Result<SenderType, SqlError> {
    SenderType::from_str(s).map_err(conversion_error)
}

/// Parse a stored conversation id
pub fn parse_conversation_id(s: String) -> Result<ConversationId, SqlError> {
    ConversationId::new(s).map_err(conversion_error)
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_uuid("not-a-uuid").is_err());
        assert!(parse_datetime("yesterday").is_err());
        assert!(parse_chat_type("GROUP_CHAT").is_err());
        assert!(parse_sender_type("SYSTEM").is_err());
        assert!(parse_conversation_id(String::new()).is_err());
    }

    #[test]
    fn test_parse_roundtrips_stored_forms() {
        let now = Utc::now();
        let parsed = parse_datetime(&now.to_rfc3339()).unwrap();
        assert_eq!(parsed, now);
        assert_eq!(parse_date("2026-01-31").unwrap().to_string(), "2026-01-31");
        assert_eq!(parse_datetime_opt(None).unwrap(), None);
        assert_eq!(parse_uuid_opt(None).unwrap(), None);
    }
}
