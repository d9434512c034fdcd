//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{debug, info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial chat and bot schema",
        sql: r#"
            -- Chat messages (citizen, admin and bot authored)
            CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                chat_type TEXT NOT NULL,
                conversation_id TEXT NOT NULL,
                sender_id TEXT,
                sender_type TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- One rule per chat type
            CREATE TABLE IF NOT EXISTS bot_trigger_rules (
                chat_type TEXT PRIMARY KEY,
                is_enabled INTEGER NOT NULL DEFAULT 1,
                reactivation_threshold INTEGER NOT NULL DEFAULT 5,
                reset_steps_on_reactivate INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );

            -- Scripted bot messages
            CREATE TABLE IF NOT EXISTS bot_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_type TEXT NOT NULL,
                message_key TEXT NOT NULL UNIQUE,
                step_number INTEGER NOT NULL,
                content TEXT NOT NULL,
                content_alt TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                display_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            -- Bot engagement per conversation
            CREATE TABLE IF NOT EXISTS bot_conversation_state (
                chat_type TEXT NOT NULL,
                conversation_id TEXT NOT NULL,
                current_step INTEGER NOT NULL DEFAULT 0,
                messages_since_admin_reply INTEGER NOT NULL DEFAULT 0,
                bot_active INTEGER NOT NULL DEFAULT 1,
                has_admin_replied INTEGER NOT NULL DEFAULT 0,
                last_bot_message_at TEXT,
                last_admin_reply_at TEXT,
                version INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (chat_type, conversation_id)
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Add indexes for chat history and catalog lookups",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_chat_messages_conversation
                ON chat_messages(chat_type, conversation_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_bot_messages_step
                ON bot_messages(chat_type, step_number, is_active);
        "#,
    },
    Migration {
        version: 3,
        description: "Add daily bot message analytics",
        sql: r#"
            -- Daily counters per catalog message
            CREATE TABLE IF NOT EXISTS bot_message_analytics (
                chat_type TEXT NOT NULL,
                message_key TEXT NOT NULL,
                step_number INTEGER NOT NULL,
                date TEXT NOT NULL,
                trigger_count INTEGER NOT NULL DEFAULT 0,
                admin_reply_count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (chat_type, message_key, date)
            );

            CREATE INDEX IF NOT EXISTS idx_bot_analytics_step
                ON bot_message_analytics(chat_type, step_number, date);
        "#,
    },
    Migration {
        version: 4,
        description: "One active bot message per step",
        sql: r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_bot_messages_active_step
                ON bot_messages(chat_type, step_number) WHERE is_active = 1;
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version (0 for an empty database)
pub(crate) fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(0))
}

/// Apply one migration and record it in the same transaction
fn apply_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    tx.commit()?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;
    debug!(current_version, "Checking for pending migrations");

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        info!(
            version = migration.version,
            description = migration.description,
            "Applying migration"
        );
        apply_migration(conn, migration)?;
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latest_version() -> u32 {
        MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn test_migrations_run() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_current_version(&conn).unwrap(), latest_version());
        for table in [
            "chat_messages",
            "bot_trigger_rules",
            "bot_messages",
            "bot_conversation_state",
            "bot_message_analytics",
        ] {
            assert!(table_exists(&conn, table), "missing table {}", table);
        }
    }

    #[test]
    fn test_active_step_index_rejects_duplicates() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let insert = |key: &str, active: bool| {
            conn.execute(
                "INSERT INTO bot_messages
                    (chat_type, message_key, step_number, content, is_active, display_order, created_at)
                 VALUES ('LIVE_CHAT', ?1, 1, 'hi', ?2, 1, '2026-01-01T00:00:00Z')",
                rusqlite::params![key, active],
            )
        };
        insert("first", true).unwrap();
        insert("parked", false).unwrap();
        assert!(insert("second", true).is_err());
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_current_version(&conn).unwrap(), latest_version());
        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied as usize, MIGRATIONS.len());
    }

    #[test]
    fn test_migrations_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(
                migration.version as usize,
                i + 1,
                "Migration {} should have version {}",
                migration.description,
                i + 1
            );
        }
    }
}
