//! Access objects over the store.
//!
//! Each access object borrows the [`Database`](super::Database) and locks
//! its connection for the duration of one operation. Multi-row writes run
//! inside an explicit transaction.

mod chat;
mod document;
mod document_query;

pub use chat::ChatDao;
pub use document::DocumentDao;
pub use document_query::DocumentQueryDao;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use std::str::FromStr;
use uuid::Uuid;

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

/// Reads an RFC 3339 text column.
pub(crate) fn column_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

/// Reads a nullable RFC 3339 text column.
pub(crate) fn column_opt_timestamp(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| conversion_error(idx, e)),
        None => Ok(None),
    }
}

/// Reads a UUID stored as text.
pub(crate) fn column_uuid(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

/// Reads an enum stored by its string value.
pub(crate) fn column_enum<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| conversion_error(idx, e))
}

/// Reads a JSON array of strings.
pub(crate) fn column_string_list(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}
