use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::filter::{Column, Operator, Predicate, PredicateSet};
use crate::models::{ContextItems, Message, MessageContext};
use crate::pagination::context_count;
use crate::params::MessageContextParams;

use super::ChatRepository;

impl ChatRepository {
    /// Assemble the context window around an anchor message.
    ///
    /// Neighbours are restricted to the anchor's chat and compared with strict
    /// inequality on the timestamp, so other messages sharing the anchor's
    /// exact timestamp are in neither side. A missing anchor fails the whole
    /// call; no partial window is returned.
    pub async fn get_message_context(
        &self,
        params: &MessageContextParams,
        cancel: &CancellationToken,
    ) -> Result<MessageContext> {
        if params.message_id.trim().is_empty() {
            return Err(Error::validation("message_id", "must not be empty"));
        }
        let before = context_count("before", params.before)?;
        let after = context_count("after", params.after)?;

        let anchor = self
            .get_message(&params.message_id, params.chat_jid.as_deref(), cancel)
            .await?;
        let items = self.context_items(&anchor, before, after, cancel).await?;

        Ok(MessageContext::new(anchor, items))
    }

    /// Up to `before` predecessors and `after` successors of `anchor` in its
    /// chat, both in ascending time order.
    pub(crate) async fn context_items(
        &self,
        anchor: &Message,
        before: i64,
        after: i64,
        cancel: &CancellationToken,
    ) -> Result<ContextItems> {
        let anchor_ts = anchor.timestamp_key();

        let mut preceding = if before > 0 {
            self.fetch_messages(
                &neighbours(&anchor.chat_jid, Operator::Lt, &anchor_ts),
                "m.timestamp DESC, m.id DESC",
                before,
                0,
                "fetch context before anchor",
                cancel,
            )
            .await?
        } else {
            Vec::new()
        };
        // nearest-first from the query; flip to chronological
        preceding.reverse();

        let following = if after > 0 {
            self.fetch_messages(
                &neighbours(&anchor.chat_jid, Operator::Gt, &anchor_ts),
                "m.timestamp ASC, m.id ASC",
                after,
                0,
                "fetch context after anchor",
                cancel,
            )
            .await?
        } else {
            Vec::new()
        };

        Ok(ContextItems {
            before: preceding,
            after: following,
        })
    }
}

fn neighbours(chat_jid: &str, op: Operator, anchor_ts: &str) -> PredicateSet {
    let mut set = PredicateSet::new();
    set.push(Predicate::compare(Column::MessageChatJid, Operator::Eq, chat_jid))
        .push(Predicate::compare(Column::MessageTimestamp, op, anchor_ts));
    set
}
