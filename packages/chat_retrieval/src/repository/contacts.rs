use sqlx::Row;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::filter::{Column, Operator, Predicate, PredicateSet, contact_predicates, escape_like};
use crate::identity;
use crate::models::{Contact, Message};
use crate::pagination::MESSAGE_ORDER;

use super::{ChatRepository, ensure_live};

const CONTACT_SEARCH_CAP: i64 = 50;

impl ChatRepository {
    /// Non-group chats whose JID or name contains `query`, case-insensitively.
    pub async fn search_contacts(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Contact>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::validation("query", "must not be empty"));
        }
        ensure_live(cancel)?;

        let (where_clause, bind_values) = contact_predicates(query).where_clause();
        let sql = format!(
            "SELECT DISTINCT c.jid, c.name FROM chats c{where_clause} ORDER BY c.name ASC, c.jid ASC LIMIT ?"
        );
        debug!(%where_clause, "searching contacts");

        let mut q = sqlx::query(&sql);
        for val in &bind_values {
            q = q.bind(val);
        }
        let rows = q
            .bind(CONTACT_SEARCH_CAP)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::retrieval("search contacts"))?;

        rows.iter()
            .map(|row| -> std::result::Result<Contact, sqlx::Error> {
                Ok(Contact::from_chat_row(row.try_get("jid")?, row.try_get("name")?))
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::retrieval("search contacts"))
    }

    /// Best display name for a sender JID or bare phone number.
    ///
    /// Exact JID match first, then the first chat (by JID) whose identifier
    /// contains the user part. Falls back to the identifier itself; store
    /// failures and cancellation degrade the same way.
    pub async fn resolve_sender_name(&self, identifier: &str, cancel: &CancellationToken) -> String {
        match self.lookup_sender_name(identifier, cancel).await {
            Ok(Some(name)) => name,
            Ok(None) => identifier.to_string(),
            Err(e) => {
                debug!(identifier, error = %e, "sender name lookup failed");
                identifier.to_string()
            }
        }
    }

    async fn lookup_sender_name(
        &self,
        identifier: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        ensure_live(cancel)?;
        let exact: Option<String> = sqlx::query_scalar(
            "SELECT name FROM chats WHERE jid = ? AND name IS NOT NULL AND name != '' LIMIT 1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::retrieval("resolve sender name"))?;
        if exact.is_some() {
            return Ok(exact);
        }

        let user = identity::user_part(identifier);
        if user.is_empty() {
            return Ok(None);
        }

        ensure_live(cancel)?;
        sqlx::query_scalar(
            r#"
            SELECT name FROM chats
            WHERE jid LIKE ? ESCAPE '\' AND name IS NOT NULL AND name != ''
            ORDER BY jid ASC
            LIMIT 1
            "#,
        )
        .bind(format!("%{}%", escape_like(user)))
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::retrieval("resolve sender name"))
    }

    /// Most recent message sent by `jid` or posted in the chat with that JID.
    pub async fn get_last_interaction(
        &self,
        jid: &str,
        cancel: &CancellationToken,
    ) -> Result<Message> {
        let jid = jid.trim();
        if jid.is_empty() {
            return Err(Error::validation("jid", "must not be empty"));
        }

        let mut predicates = PredicateSet::new();
        predicates.push(Predicate::Any(vec![
            Predicate::compare(Column::MessageSender, Operator::Eq, jid),
            Predicate::compare(Column::MessageChatJid, Operator::Eq, jid),
        ]));

        self.fetch_messages(&predicates, MESSAGE_ORDER, 1, 0, "last interaction", cancel)
            .await?
            .pop()
            .ok_or_else(|| Error::not_found("interaction", jid))
    }
}
