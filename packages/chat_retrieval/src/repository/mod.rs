// Repository layer: one file per concern, all `impl ChatRepository`.
//
// Every operation takes a `CancellationToken` that is checked before each
// sequential sub-query. Multi-query operations do not share a transaction.

use chrono::{DateTime, NaiveDateTime};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::models::{Message, media_path, parse_store_timestamp};

mod chats;
mod contacts;
mod context;
mod messages;

#[cfg(test)]
pub(crate) mod test_helpers;

/// Message columns joined with the owning chat's name. Append a WHERE clause.
pub(crate) const MESSAGE_SELECT: &str = r#"
    SELECT m.id, m.chat_jid, c.name AS chat_name, m.sender, m.content,
           m.timestamp, m.is_from_me, m.media_type, m.filename
    FROM messages m
    JOIN chats c ON m.chat_jid = c.jid
"#;

#[derive(Clone)]
pub struct ChatRepository {
    pub(crate) pool: SqlitePool,
}

impl ChatRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(crate) fn ensure_live(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Decode a stored timestamp. The canonical layout is `YYYY-MM-DD HH:MM:SS`;
/// rows written with a fractional part or UTC offset keep their wall-clock
/// time so ordering still matches the stored text.
pub(crate) fn decode_timestamp(column: &str, raw: &str) -> std::result::Result<NaiveDateTime, sqlx::Error> {
    if let Ok(ts) = parse_store_timestamp(raw) {
        return Ok(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(ts);
    }
    DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|ts| ts.naive_local())
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
}

pub(crate) fn message_from_row(row: &SqliteRow) -> std::result::Result<Message, sqlx::Error> {
    let chat_jid: String = row.try_get("chat_jid")?;
    let raw_ts: String = row.try_get("timestamp")?;
    let filename: Option<String> = row.try_get("filename")?;

    Ok(Message {
        id: row.try_get("id")?,
        chat_name: row.try_get("chat_name")?,
        sender: row.try_get::<Option<String>, _>("sender")?.unwrap_or_default(),
        content: row.try_get::<Option<String>, _>("content")?.unwrap_or_default(),
        timestamp: decode_timestamp("timestamp", &raw_ts)?,
        is_from_me: row.try_get::<Option<bool>, _>("is_from_me")?.unwrap_or(false),
        media_type: row
            .try_get::<Option<String>, _>("media_type")?
            .filter(|t| !t.is_empty()),
        media_path: media_path(&chat_jid, filename.as_deref()),
        filename: filename.filter(|f| !f.is_empty()),
        chat_jid,
        stored_timestamp: raw_ts,
    })
}
