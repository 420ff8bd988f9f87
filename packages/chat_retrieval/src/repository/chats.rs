use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Enriched, EnrichmentFailure, EnrichmentWarning, Error, Result};
use crate::filter::{ChatFilter, direct_chat_predicates};
use crate::identity;
use crate::models::{Chat, LastMessage};
use crate::pagination::{ChatSort, Pagination};
use crate::params::ListChatsParams;

use super::{ChatRepository, decode_timestamp, ensure_live};

const CHAT_SELECT: &str = "SELECT c.jid, c.name, c.last_message_time FROM chats c";

impl ChatRepository {
    /// Chat metadata by JID. With `include_last_message`, the message stored
    /// at the chat's `last_message_time` is attached on a best-effort basis.
    pub async fn get_chat(
        &self,
        jid: &str,
        include_last_message: bool,
        cancel: &CancellationToken,
    ) -> Result<Enriched<Chat>> {
        ensure_live(cancel)?;

        let row = sqlx::query(&format!("{CHAT_SELECT} WHERE c.jid = ?"))
            .bind(jid)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::retrieval("look up chat"))?;

        let mut chat = match row {
            Some(row) => chat_from_row(&row).map_err(Error::retrieval("look up chat"))?,
            None => return Err(Error::not_found("chat", jid)),
        };

        let mut warnings = Vec::new();
        if include_last_message {
            ensure_live(cancel)?;
            warnings.extend(self.enrich_one(&mut chat).await);
        }
        Ok(Enriched {
            value: chat,
            warnings,
        })
    }

    pub async fn list_chats(
        &self,
        params: &ListChatsParams,
        cancel: &CancellationToken,
    ) -> Result<Enriched<Vec<Chat>>> {
        let sort: ChatSort = params.sort_by.parse()?;
        let pagination = Pagination::new(params.limit, params.page)?;
        ensure_live(cancel)?;

        let (where_clause, bind_values) = ChatFilter::new(params.query.as_deref())
            .predicates()
            .where_clause();
        let sql = format!(
            "{CHAT_SELECT}{where_clause} ORDER BY {} LIMIT ? OFFSET ?",
            sort.order_by()
        );
        debug!(%where_clause, ?sort, "listing chats");

        let mut query = sqlx::query(&sql);
        for val in &bind_values {
            query = query.bind(val);
        }
        let rows = query
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(Error::retrieval("list chats"))?;

        let chats = rows
            .iter()
            .map(chat_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::retrieval("list chats"))?;

        if params.include_last_message {
            self.enrich(chats, cancel).await
        } else {
            Ok(Enriched::new(chats))
        }
    }

    /// The direct chat for a phone number, with its last message.
    ///
    /// The number is matched as a substring of non-group JIDs, so a partial
    /// number or one missing its country prefix still finds the chat. An exact
    /// `<phone>@s.whatsapp.net` match wins over other candidates.
    pub async fn get_direct_chat_by_contact(
        &self,
        phone_number: &str,
        cancel: &CancellationToken,
    ) -> Result<Enriched<Chat>> {
        let phone = phone_number.trim();
        if phone.is_empty() {
            return Err(Error::validation("phone_number", "must not be empty"));
        }
        ensure_live(cancel)?;

        let (where_clause, bind_values) = direct_chat_predicates(phone).where_clause();
        let sql = format!("{CHAT_SELECT}{where_clause} ORDER BY c.jid = ? DESC, c.jid ASC LIMIT 1");
        debug!(%where_clause, "looking up direct chat");

        let mut query = sqlx::query(&sql);
        for val in &bind_values {
            query = query.bind(val);
        }
        let row = query
            .bind(identity::phone_to_jid(phone))
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::retrieval("look up direct chat"))?;

        let mut chat = match row {
            Some(row) => chat_from_row(&row).map_err(Error::retrieval("look up direct chat"))?,
            None => return Err(Error::not_found("chat", phone)),
        };

        ensure_live(cancel)?;
        let warnings = self.enrich_one(&mut chat).await.into_iter().collect();
        Ok(Enriched {
            value: chat,
            warnings,
        })
    }

    /// Chats involving a contact: its direct chat plus every chat it has sent
    /// a message to, most recently active first.
    pub async fn get_contact_chats(
        &self,
        jid: &str,
        pagination: Pagination,
        cancel: &CancellationToken,
    ) -> Result<Enriched<Vec<Chat>>> {
        let jid = jid.trim();
        if jid.is_empty() {
            return Err(Error::validation("jid", "must not be empty"));
        }
        ensure_live(cancel)?;

        let rows = sqlx::query(&format!(
            r#"
            {CHAT_SELECT}
            WHERE c.jid = ?
               OR EXISTS (SELECT 1 FROM messages m WHERE m.chat_jid = c.jid AND m.sender = ?)
            ORDER BY {}
            LIMIT ? OFFSET ?
            "#,
            ChatSort::LastActive.order_by()
        ))
        .bind(jid)
        .bind(jid)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::retrieval("list contact chats"))?;

        let chats = rows
            .iter()
            .map(chat_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::retrieval("list contact chats"))?;

        self.enrich(chats, cancel).await
    }

    /// Attach last messages row by row. A row whose lookup fails keeps its
    /// base fields and contributes a warning; cancellation still aborts.
    async fn enrich(
        &self,
        mut chats: Vec<Chat>,
        cancel: &CancellationToken,
    ) -> Result<Enriched<Vec<Chat>>> {
        let mut warnings = Vec::new();
        for chat in &mut chats {
            ensure_live(cancel)?;
            warnings.extend(self.enrich_one(chat).await);
        }
        Ok(Enriched {
            value: chats,
            warnings,
        })
    }

    async fn enrich_one(&self, chat: &mut Chat) -> Option<EnrichmentWarning> {
        let failure = match self.last_message(&chat.jid).await {
            Ok(Some(last)) => {
                chat.last_message = Some(last);
                return None;
            }
            // never active: nothing to attach
            Ok(None) if chat.last_message_time.is_none() => return None,
            Ok(None) => EnrichmentFailure::NoMatchingMessage,
            Err(e) => EnrichmentFailure::Store {
                message: e.to_string(),
            },
        };

        let warning = EnrichmentWarning {
            chat_jid: chat.jid.clone(),
            failure,
        };
        warn!(chat_jid = %warning.chat_jid, "Enrichment skipped: {}", warning);
        Some(warning)
    }

    /// The message whose timestamp equals the chat's stored
    /// `last_message_time`; highest id wins a tie.
    async fn last_message(&self, chat_jid: &str) -> std::result::Result<Option<LastMessage>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT m.id, m.sender, m.content, m.timestamp, m.is_from_me, m.media_type
            FROM chats c
            JOIN messages m ON m.chat_jid = c.jid AND m.timestamp = c.last_message_time
            WHERE c.jid = ?
            ORDER BY m.id DESC
            LIMIT 1
            "#,
        )
        .bind(chat_jid)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| last_message_from_row(&r)).transpose()
    }
}

fn chat_from_row(row: &SqliteRow) -> std::result::Result<Chat, sqlx::Error> {
    let last_message_time = row
        .try_get::<Option<String>, _>("last_message_time")?
        .filter(|raw| !raw.is_empty())
        .map(|raw| decode_timestamp("last_message_time", &raw))
        .transpose()?;

    Ok(Chat {
        jid: row.try_get("jid")?,
        name: row.try_get("name")?,
        last_message_time,
        last_message: None,
    })
}

fn last_message_from_row(row: &SqliteRow) -> std::result::Result<LastMessage, sqlx::Error> {
    let raw_ts: String = row.try_get("timestamp")?;
    Ok(LastMessage {
        id: row.try_get("id")?,
        sender: row.try_get::<Option<String>, _>("sender")?.unwrap_or_default(),
        content: row.try_get::<Option<String>, _>("content")?.unwrap_or_default(),
        timestamp: decode_timestamp("timestamp", &raw_ts)?,
        is_from_me: row.try_get::<Option<bool>, _>("is_from_me")?.unwrap_or(false),
        media_type: row
            .try_get::<Option<String>, _>("media_type")?
            .filter(|t| !t.is_empty()),
    })
}
