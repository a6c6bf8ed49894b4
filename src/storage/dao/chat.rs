//! Chat sessions and their messages.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{column_enum, column_timestamp, column_uuid};
use crate::storage::db::Database;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::models::{ChatMessage, ChatSession, MessageRole};

/// Session and message storage for the study assistant.
pub struct ChatDao<'a> {
    db: &'a Database,
}

impl<'a> ChatDao<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // ==================== Sessions ====================

    /// Insert a new session
    pub fn create_session(&self, session: &ChatSession) -> StoreResult<()> {
        self.db.conn().execute(
            "INSERT INTO chat_sessions (id, title, created_at) VALUES (?1, ?2, ?3)",
            params![
                session.id.to_string(),
                session.title,
                session.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a session by ID
    pub fn get_session(&self, id: &Uuid) -> StoreResult<Option<ChatSession>> {
        let session = self
            .db
            .conn()
            .query_row(
                "SELECT id, title, created_at FROM chat_sessions WHERE id = ?1",
                params![id.to_string()],
                row_to_session,
            )
            .optional()?;
        Ok(session)
    }

    /// List sessions, most recent first
    pub fn list_sessions(&self) -> StoreResult<Vec<ChatSession>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, title, created_at FROM chat_sessions ORDER BY created_at DESC, id",
        )?;
        let rows = stmt.query_map([], row_to_session)?;
        let sessions = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Delete a session and all of its messages. Returns how many messages
    /// were removed.
    pub fn delete_session(&self, id: &Uuid) -> StoreResult<usize> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        let messages = tx.execute(
            "DELETE FROM chat_messages WHERE session_id = ?1",
            params![id.to_string()],
        )?;
        let sessions = tx.execute(
            "DELETE FROM chat_sessions WHERE id = ?1",
            params![id.to_string()],
        )?;
        if sessions == 0 {
            return Err(StoreError::NotFound(format!("chat session {id}")));
        }

        tx.commit()?;
        Ok(messages)
    }

    // ==================== Messages ====================

    /// Append a message to the end of a session.
    ///
    /// The message's position is one past the session's current last
    /// message, assigned inside the insert transaction. Appending to a
    /// session that does not exist fails with a constraint error.
    pub fn append_message(
        &self,
        session_id: &Uuid,
        role: MessageRole,
        content: &str,
    ) -> StoreResult<ChatMessage> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        let index: i64 = tx.query_row(
            "SELECT COALESCE(MAX(idx) + 1, 0) FROM chat_messages WHERE session_id = ?1",
            params![session_id.to_string()],
            |row| row.get(0),
        )?;

        let message = ChatMessage {
            id: Uuid::new_v4(),
            session_id: *session_id,
            index,
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        };

        tx.execute(
            r#"
            INSERT INTO chat_messages (id, session_id, idx, role, content, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                message.id.to_string(),
                message.session_id.to_string(),
                message.index,
                message.role.to_string(),
                message.content,
                message.timestamp.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(message)
    }

    /// Get messages for a session in insertion order
    pub fn get_messages(&self, session_id: &Uuid) -> StoreResult<Vec<ChatMessage>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, idx, role, content, timestamp
             FROM chat_messages
             WHERE session_id = ?1
             ORDER BY idx",
        )?;

        let rows = stmt.query_map(params![session_id.to_string()], |row| {
            Ok(ChatMessage {
                id: column_uuid(row, 0)?,
                session_id: column_uuid(row, 1)?,
                index: row.get(2)?,
                role: column_enum(row, 3)?,
                content: row.get(4)?,
                timestamp: column_timestamp(row, 5)?,
            })
        })?;

        let messages = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    /// Get total message count
    pub fn count_messages(&self) -> StoreResult<i64> {
        let count = self
            .db
            .conn()
            .query_row("SELECT COUNT(*) FROM chat_messages", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<ChatSession> {
    Ok(ChatSession {
        id: column_uuid(row, 0)?,
        title: row.get(1)?,
        created_at: column_timestamp(row, 2)?,
    })
}
