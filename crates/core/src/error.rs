//! Error types for civicdesk core

use thiserror::Error;

use crate::models::ChatType;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "Concurrent update on {chat_type} conversation '{conversation_id}' (expected version {expected_version})"
    )]
    ConcurrentUpdate {
        chat_type: ChatType,
        conversation_id: String,
        expected_version: i64,
    },

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from the persistence layer.
    ///
    /// Bot callers treat these as non-fatal side-effect failures.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::ConcurrentUpdate { .. } | Error::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
