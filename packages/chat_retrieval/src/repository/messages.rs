use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::filter::{Column, MessageFilter, Operator, Predicate, PredicateSet};
use crate::models::{ListedMessage, Message};
use crate::pagination::{MESSAGE_ORDER, Pagination, context_count};
use crate::params::ListMessagesParams;

use super::{ChatRepository, MESSAGE_SELECT, ensure_live, message_from_row};

impl ChatRepository {
    /// Filtered, paginated message listing, newest first. With
    /// `include_context` each row carries its surrounding messages.
    pub async fn list_messages(
        &self,
        params: &ListMessagesParams,
        cancel: &CancellationToken,
    ) -> Result<Vec<ListedMessage>> {
        let filter = MessageFilter::from_params(params)?;
        let pagination = Pagination::new(params.limit, params.page)?;
        let window = if params.include_context {
            Some((
                context_count("context_before", params.context_before)?,
                context_count("context_after", params.context_after)?,
            ))
        } else {
            None
        };

        let messages = self.query_messages(&filter, pagination, cancel).await?;

        let mut listed = Vec::with_capacity(messages.len());
        for message in messages {
            let context = match window {
                Some((before, after)) => {
                    Some(self.context_items(&message, before, after, cancel).await?)
                }
                None => None,
            };
            listed.push(ListedMessage { message, context });
        }
        Ok(listed)
    }

    /// One page of messages matching `filter`, without context.
    pub async fn query_messages(
        &self,
        filter: &MessageFilter,
        pagination: Pagination,
        cancel: &CancellationToken,
    ) -> Result<Vec<Message>> {
        self.fetch_messages(
            &filter.predicates(),
            MESSAGE_ORDER,
            pagination.limit(),
            pagination.offset(),
            "list messages",
            cancel,
        )
        .await
    }

    /// Look up a single message. Ids are unique per chat; without `chat_jid`
    /// the most recent match wins.
    pub async fn get_message(
        &self,
        message_id: &str,
        chat_jid: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Message> {
        let mut predicates = PredicateSet::new();
        predicates.push(Predicate::compare(Column::MessageId, Operator::Eq, message_id));
        if let Some(chat) = chat_jid.filter(|c| !c.is_empty()) {
            predicates.push(Predicate::compare(Column::MessageChatJid, Operator::Eq, chat));
        }

        self.fetch_messages(
            &predicates,
            "m.timestamp DESC, m.chat_jid ASC",
            1,
            0,
            "look up message",
            cancel,
        )
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("message", message_id))
    }

    pub(crate) async fn fetch_messages(
        &self,
        predicates: &PredicateSet,
        order_by: &str,
        limit: i64,
        offset: i64,
        stage: &'static str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Message>> {
        ensure_live(cancel)?;

        let (where_clause, bind_values) = predicates.where_clause();
        let sql = format!("{MESSAGE_SELECT}{where_clause} ORDER BY {order_by} LIMIT ? OFFSET ?");
        debug!(stage, %where_clause, limit, offset, "querying messages");

        let mut query = sqlx::query(&sql);
        for val in &bind_values {
            query = query.bind(val);
        }
        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::retrieval(stage))?;

        rows.iter()
            .map(message_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::retrieval(stage))
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use crate::error::Error;
    use crate::params::ListMessagesParams;
    use crate::repository::test_helpers::{self, MessageRow};

    const ALICE: &str = "15550001111@s.whatsapp.net";
    const BOB: &str = "15550002222@s.whatsapp.net";
    const GROUP: &str = "120363000000000001@g.us";

    fn no_context() -> ListMessagesParams {
        ListMessagesParams {
            include_context: false,
            ..Default::default()
        }
    }

    async fn fixture() -> crate::repository::ChatRepository {
        let repo = test_helpers::test_repository().await;
        test_helpers::insert_chat(&repo, ALICE, Some("Alice"), Some("2024-01-01 10:03:00")).await;
        test_helpers::insert_chat(&repo, GROUP, Some("Book Club"), Some("2024-01-01 10:04:00")).await;

        // sender match only
        test_helpers::insert_message(
            &repo,
            MessageRow::text("m1", ALICE, "2024-01-01 10:00:00", "good morning"),
        )
        .await;
        // content match only
        test_helpers::insert_message(
            &repo,
            MessageRow::text("m2", GROUP, "2024-01-01 10:01:00", "Lunch at noon?").from_sender(BOB),
        )
        .await;
        // both
        test_helpers::insert_message(
            &repo,
            MessageRow::text("m3", GROUP, "2024-01-01 10:02:00", "LUNCH sounds great")
                .from_sender(ALICE),
        )
        .await;
        // neither
        test_helpers::insert_message(
            &repo,
            MessageRow::text("m4", GROUP, "2024-01-01 10:04:00", "see you").from_sender(BOB),
        )
        .await;
        test_helpers::insert_message(
            &repo,
            MessageRow::text("m5", ALICE, "2024-01-01 10:03:00", "photo")
                .from_me()
                .with_media("image", "IMG_1.jpg"),
        )
        .await;
        repo
    }

    fn ids(listed: &[crate::models::ListedMessage]) -> Vec<&str> {
        listed.iter().map(|l| l.message.id.as_str()).collect()
    }

    #[tokio::test]
    async fn empty_filter_lists_everything_newest_first() {
        let repo = fixture().await;
        let listed = repo
            .list_messages(&no_context(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ids(&listed), vec!["m4", "m5", "m3", "m2", "m1"]);
        assert!(listed.iter().all(|l| l.context.is_none()));
    }

    #[tokio::test]
    async fn sender_and_content_filters_combine_with_and() {
        let repo = fixture().await;
        let params = ListMessagesParams {
            sender_phone_number: Some("15550001111".to_string()),
            query: Some("lunch".to_string()),
            ..no_context()
        };
        let listed = repo
            .list_messages(&params, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ids(&listed), vec!["m3"]);
    }

    #[tokio::test]
    async fn content_filter_is_case_insensitive_substring() {
        let repo = fixture().await;
        let params = ListMessagesParams {
            query: Some("lUnCh".to_string()),
            ..no_context()
        };
        let listed = repo
            .list_messages(&params, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ids(&listed), vec!["m3", "m2"]);
    }

    #[tokio::test]
    async fn time_bounds_are_exclusive() {
        let repo = fixture().await;
        let params = ListMessagesParams {
            after: Some("2024-01-01T10:00:00Z".to_string()),
            before: Some("2024-01-01 10:03:00".to_string()),
            ..no_context()
        };
        let listed = repo
            .list_messages(&params, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ids(&listed), vec!["m3", "m2"]);
    }

    #[tokio::test]
    async fn chat_filter_and_media_path() {
        let repo = fixture().await;
        let params = ListMessagesParams {
            chat_jid: Some(ALICE.to_string()),
            ..no_context()
        };
        let listed = repo
            .list_messages(&params, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ids(&listed), vec!["m5", "m1"]);

        let photo = &listed[0].message;
        assert!(photo.is_from_me);
        assert_eq!(photo.chat_name.as_deref(), Some("Alice"));
        assert_eq!(photo.media_type.as_deref(), Some("image"));
        assert_eq!(
            photo.media_path.as_deref(),
            Some("store/15550001111@s.whatsapp.net/IMG_1.jpg")
        );
        assert!(listed[1].message.media_path.is_none());
    }

    #[tokio::test]
    async fn pagination_offsets_and_is_repeatable() {
        let repo = fixture().await;
        let page = |page| ListMessagesParams {
            limit: 2,
            page,
            ..no_context()
        };
        let cancel = CancellationToken::new();

        let first = repo.list_messages(&page(0), &cancel).await.unwrap();
        let again = repo.list_messages(&page(0), &cancel).await.unwrap();
        let third = repo.list_messages(&page(2), &cancel).await.unwrap();
        let beyond = repo.list_messages(&page(3), &cancel).await.unwrap();

        assert_eq!(ids(&first), vec!["m4", "m5"]);
        assert_eq!(first, again);
        assert_eq!(ids(&third), vec!["m1"]);
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn invalid_pagination_is_rejected() {
        let repo = fixture().await;
        let cancel = CancellationToken::new();
        let zero = ListMessagesParams {
            limit: 0,
            ..no_context()
        };
        let negative = ListMessagesParams {
            page: -1,
            ..no_context()
        };
        assert!(matches!(
            repo.list_messages(&zero, &cancel).await,
            Err(Error::Validation { field: "limit", .. })
        ));
        assert!(matches!(
            repo.list_messages(&negative, &cancel).await,
            Err(Error::Validation { field: "page", .. })
        ));
    }

    #[tokio::test]
    async fn malformed_time_bound_is_rejected() {
        let repo = fixture().await;
        let params = ListMessagesParams {
            after: Some("last tuesday".to_string()),
            ..no_context()
        };
        assert!(matches!(
            repo.list_messages(&params, &CancellationToken::new()).await,
            Err(Error::Validation { field: "after", .. })
        ));
    }

    #[tokio::test]
    async fn listing_with_context_attaches_neighbours() {
        let repo = fixture().await;
        let params = ListMessagesParams {
            chat_jid: Some(GROUP.to_string()),
            query: Some("sounds".to_string()),
            ..Default::default()
        };
        let listed = repo
            .list_messages(&params, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ids(&listed), vec!["m3"]);

        let context = listed[0].context.as_ref().unwrap();
        assert_eq!(context.before.len(), 1);
        assert_eq!(context.before[0].id, "m2");
        assert_eq!(context.after.len(), 1);
        assert_eq!(context.after[0].id, "m4");
    }

    #[tokio::test]
    async fn get_message_not_found() {
        let repo = fixture().await;
        let err = repo
            .get_message("nope", None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "message", .. }));
    }

    #[tokio::test]
    async fn cancelled_listing_issues_no_query() {
        let repo = fixture().await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            repo.list_messages(&no_context(), &cancel).await,
            Err(Error::Cancelled)
        ));
    }
}
