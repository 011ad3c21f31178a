use crate::Database;
use crate::models::{CulturalAnalysisRow, MessageRow, ScrollPositionRow, TranslationRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Chats --

    pub fn upsert_chat(&self, id: &str, payload: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chats (id, payload) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, updated_at = datetime('now')",
                (id, payload),
            )?;
            Ok(())
        })
    }

    pub fn get_chat(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT payload FROM chats WHERE id = ?1", [id], |row| row.get(0))
                .optional()
        })
    }

    // -- Messages --

    /// Insert or replace a batch of messages in one transaction.
    pub fn upsert_messages(&self, rows: &[MessageRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO messages (id, chat_id, sender_id, sent_at, payload)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET
                        chat_id = excluded.chat_id,
                        sender_id = excluded.sender_id,
                        sent_at = excluded.sent_at,
                        payload = excluded.payload,
                        updated_at = datetime('now')",
                )?;
                for row in rows {
                    stmt.execute(rusqlite::params![
                        row.id,
                        row.chat_id,
                        row.sender_id,
                        row.sent_at,
                        row.payload
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_messages(&self, chat_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, chat_id))
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, chat_id, sender_id, sent_at, payload FROM messages WHERE id = ?1",
                [id],
                |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        chat_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        sent_at: row.get(3)?,
                        payload: row.get(4)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Translations --

    pub fn upsert_translation(
        &self,
        message_id: &str,
        language: &str,
        chat_id: &str,
        payload: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO translations (message_id, language, chat_id, payload)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(message_id, language) DO UPDATE SET
                    payload = excluded.payload,
                    created_at = datetime('now')",
                rusqlite::params![message_id, language, chat_id, payload],
            )?;
            Ok(())
        })
    }

    pub fn get_translations_for_chat(&self, chat_id: &str) -> Result<Vec<TranslationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT message_id, language, payload FROM translations WHERE chat_id = ?1",
            )?;
            let rows = stmt
                .query_map([chat_id], |row| {
                    Ok(TranslationRow {
                        message_id: row.get(0)?,
                        language: row.get(1)?,
                        payload: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch translations for a set of message IDs.
    pub fn get_translations_for_messages(&self, message_ids: &[String]) -> Result<Vec<TranslationRow>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=message_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT message_id, language, payload FROM translations WHERE message_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = message_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(TranslationRow {
                        message_id: row.get(0)?,
                        language: row.get(1)?,
                        payload: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Cultural analyses --

    pub fn upsert_cultural_analysis(&self, message_id: &str, chat_id: &str, payload: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO cultural_analyses (message_id, chat_id, payload)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(message_id, chat_id) DO UPDATE SET
                    payload = excluded.payload,
                    analyzed_at = datetime('now')",
                (message_id, chat_id, payload),
            )?;
            Ok(())
        })
    }

    pub fn get_cultural_analysis(&self, message_id: &str, chat_id: &str) -> Result<Option<CulturalAnalysisRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT message_id, chat_id, payload, analyzed_at FROM cultural_analyses
                 WHERE message_id = ?1 AND chat_id = ?2",
                [message_id, chat_id],
                |row| {
                    Ok(CulturalAnalysisRow {
                        message_id: row.get(0)?,
                        chat_id: row.get(1)?,
                        payload: row.get(2)?,
                        analyzed_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Scroll positions --

    pub fn save_scroll_position(
        &self,
        chat_id: &str,
        scroll_offset: f64,
        anchor_message_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO scroll_positions (chat_id, scroll_offset, anchor_message_id)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(chat_id) DO UPDATE SET
                    scroll_offset = excluded.scroll_offset,
                    anchor_message_id = excluded.anchor_message_id,
                    saved_at = datetime('now')",
                rusqlite::params![chat_id, scroll_offset, anchor_message_id],
            )?;
            Ok(())
        })
    }

    pub fn get_scroll_position(&self, chat_id: &str) -> Result<Option<ScrollPositionRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT chat_id, scroll_offset, anchor_message_id FROM scroll_positions WHERE chat_id = ?1",
                [chat_id],
                |row| {
                    Ok(ScrollPositionRow {
                        chat_id: row.get(0)?,
                        scroll_offset: row.get(1)?,
                        anchor_message_id: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Preferences --

    pub fn get_preference(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM preferences WHERE key = ?1", [key], |row| row.get(0))
                .optional()
        })
    }

    pub fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO preferences (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                (key, value),
            )?;
            Ok(())
        })
    }

    // -- Cleanup --

    /// Drop everything cached for a chat. Returns the number of messages removed.
    pub fn purge_chat(&self, chat_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute("DELETE FROM messages WHERE chat_id = ?1", [chat_id])?;
            tx.execute("DELETE FROM translations WHERE chat_id = ?1", [chat_id])?;
            tx.execute("DELETE FROM cultural_analyses WHERE chat_id = ?1", [chat_id])?;
            tx.execute("DELETE FROM scroll_positions WHERE chat_id = ?1", [chat_id])?;
            tx.execute("DELETE FROM chats WHERE id = ?1", [chat_id])?;
            tx.commit()?;
            Ok(removed)
        })
    }
}

fn query_messages(conn: &Connection, chat_id: &str) -> Result<Vec<MessageRow>> {
    // Rows without a resolvable timestamp sort first; the materializer drops them.
    let mut stmt = conn.prepare(
        "SELECT id, chat_id, sender_id, sent_at, payload
         FROM messages
         WHERE chat_id = ?1
         ORDER BY sent_at ASC",
    )?;

    let rows = stmt
        .query_map([chat_id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                chat_id: row.get(1)?,
                sender_id: row.get(2)?,
                sent_at: row.get(3)?,
                payload: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
