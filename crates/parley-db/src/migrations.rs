use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const SCHEMA_VERSION: i64 = 2;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Cache: running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE chats (
                id          TEXT PRIMARY KEY,
                payload     TEXT NOT NULL,
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                chat_id     TEXT NOT NULL,
                sender_id   TEXT NOT NULL,
                sent_at     INTEGER,
                payload     TEXT NOT NULL,
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_messages_chat
                ON messages(chat_id, sent_at);

            CREATE TABLE translations (
                message_id  TEXT NOT NULL,
                language    TEXT NOT NULL,
                chat_id     TEXT NOT NULL,
                payload     TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (message_id, language)
            );

            CREATE INDEX idx_translations_chat
                ON translations(chat_id);

            CREATE TABLE preferences (
                key         TEXT PRIMARY KEY,
                value       TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Cache: running migration v2 (cultural analyses, scroll positions)");
        conn.execute_batch(
            "
            CREATE TABLE cultural_analyses (
                message_id  TEXT NOT NULL,
                chat_id     TEXT NOT NULL,
                payload     TEXT NOT NULL,
                analyzed_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (message_id, chat_id)
            );

            CREATE TABLE scroll_positions (
                chat_id             TEXT PRIMARY KEY,
                scroll_offset       REAL NOT NULL,
                anchor_message_id   TEXT,
                saved_at            TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 2);
    }
}
