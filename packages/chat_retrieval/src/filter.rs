//! Typed predicate descriptors and the parameterized WHERE-clause builder.
//!
//! Column names only ever come from [`Column`]; every user-supplied value is
//! bound as a parameter, never spliced into SQL text.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};
use crate::identity;
use crate::models::{format_store_timestamp, parse_store_timestamp};
use crate::params::ListMessagesParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    MessageId,
    MessageTimestamp,
    MessageSender,
    MessageChatJid,
    MessageContent,
    ChatJid,
    ChatName,
}

impl Column {
    fn sql(self) -> &'static str {
        match self {
            Self::MessageId => "m.id",
            Self::MessageTimestamp => "m.timestamp",
            Self::MessageSender => "m.sender",
            Self::MessageChatJid => "m.chat_jid",
            Self::MessageContent => "m.content",
            Self::ChatJid => "c.jid",
            Self::ChatName => "c.name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Lt,
    /// Case-insensitive substring match.
    Contains,
    NotEndsWith,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Compare {
        column: Column,
        op: Operator,
        value: String,
    },
    /// Logical OR of the inner predicates.
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn compare(column: Column, op: Operator, value: impl Into<String>) -> Self {
        Self::Compare {
            column,
            op,
            value: value.into(),
        }
    }

    fn render(&self, sql: &mut String, binds: &mut Vec<String>) {
        match self {
            Self::Compare { column, op, value } => {
                let col = column.sql();
                match op {
                    Operator::Eq => {
                        sql.push_str(&format!("{col} = ?"));
                        binds.push(value.clone());
                    }
                    Operator::Gt => {
                        sql.push_str(&format!("{col} > ?"));
                        binds.push(value.clone());
                    }
                    Operator::Lt => {
                        sql.push_str(&format!("{col} < ?"));
                        binds.push(value.clone());
                    }
                    Operator::Contains => {
                        sql.push_str(&format!(r"LOWER({col}) LIKE LOWER(?) ESCAPE '\'"));
                        binds.push(format!("%{}%", escape_like(value)));
                    }
                    Operator::NotEndsWith => {
                        sql.push_str(&format!(r"{col} NOT LIKE ? ESCAPE '\'"));
                        binds.push(format!("%{}", escape_like(value)));
                    }
                }
            }
            Self::Any(inner) if inner.is_empty() => sql.push_str("0"),
            Self::Any(inner) => {
                sql.push('(');
                for (i, p) in inner.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(" OR ");
                    }
                    p.render(sql, binds);
                }
                sql.push(')');
            }
        }
    }
}

/// Predicates combined with AND. An empty set matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredicateSet {
    predicates: Vec<Predicate>,
}

impl PredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, predicate: Predicate) -> &mut Self {
        self.predicates.push(predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Render as ` WHERE ...` (leading space) plus the values to bind in order.
    /// Returns an empty clause when there is nothing to filter on.
    pub fn where_clause(&self) -> (String, Vec<String>) {
        let mut sql = String::new();
        let mut binds = Vec::new();
        for (i, p) in self.predicates.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            p.render(&mut sql, &mut binds);
        }
        (sql, binds)
    }
}

pub(crate) fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse a caller-supplied time bound: RFC 3339 (normalized to UTC) or the
/// store's own `YYYY-MM-DD HH:MM:SS` layout.
pub fn parse_time_bound(field: &'static str, raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc).naive_utc());
    }
    parse_store_timestamp(raw).map_err(|_| {
        Error::validation(
            field,
            format!("{raw:?} is not an RFC 3339 or YYYY-MM-DD HH:MM:SS timestamp"),
        )
    })
}

/// Filters for message listings. Every populated field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFilter {
    pub after: Option<NaiveDateTime>,
    pub before: Option<NaiveDateTime>,
    pub sender_jid: Option<String>,
    pub chat_jid: Option<String>,
    pub content: Option<String>,
}

impl MessageFilter {
    pub fn from_params(params: &ListMessagesParams) -> Result<Self> {
        let after = non_empty(params.after.as_deref())
            .map(|raw| parse_time_bound("after", raw))
            .transpose()?;
        let before = non_empty(params.before.as_deref())
            .map(|raw| parse_time_bound("before", raw))
            .transpose()?;

        Ok(Self {
            after,
            before,
            sender_jid: non_empty(params.sender_phone_number.as_deref())
                .map(|phone| identity::phone_to_jid(phone.trim())),
            chat_jid: non_empty(params.chat_jid.as_deref()).map(|s| s.trim().to_string()),
            content: non_empty(params.query.as_deref()).map(str::to_string),
        })
    }

    pub fn predicates(&self) -> PredicateSet {
        let mut set = PredicateSet::new();
        if let Some(after) = &self.after {
            set.push(Predicate::compare(
                Column::MessageTimestamp,
                Operator::Gt,
                format_store_timestamp(after),
            ));
        }
        if let Some(before) = &self.before {
            set.push(Predicate::compare(
                Column::MessageTimestamp,
                Operator::Lt,
                format_store_timestamp(before),
            ));
        }
        if let Some(sender) = &self.sender_jid {
            set.push(Predicate::compare(Column::MessageSender, Operator::Eq, sender));
        }
        if let Some(chat) = &self.chat_jid {
            set.push(Predicate::compare(Column::MessageChatJid, Operator::Eq, chat));
        }
        if let Some(content) = &self.content {
            set.push(Predicate::compare(
                Column::MessageContent,
                Operator::Contains,
                content,
            ));
        }
        set
    }
}

/// Filter for chat listings: the query matches the JID or the name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatFilter {
    pub query: Option<String>,
}

impl ChatFilter {
    pub fn new(query: Option<&str>) -> Self {
        Self {
            query: non_empty(query).map(str::to_string),
        }
    }

    pub fn predicates(&self) -> PredicateSet {
        let mut set = PredicateSet::new();
        if let Some(query) = &self.query {
            set.push(jid_or_name_contains(query));
        }
        set
    }
}

/// Contact search: JID-or-name substring, groups excluded. `query` must
/// already be trimmed and non-empty.
pub(crate) fn contact_predicates(query: &str) -> PredicateSet {
    let mut set = PredicateSet::new();
    set.push(jid_or_name_contains(query)).push(Predicate::compare(
        Column::ChatJid,
        Operator::NotEndsWith,
        identity::GROUP_SERVER,
    ));
    set
}

/// Direct-chat lookup by phone: JID substring, groups excluded.
pub(crate) fn direct_chat_predicates(phone: &str) -> PredicateSet {
    let mut set = PredicateSet::new();
    set.push(Predicate::compare(Column::ChatJid, Operator::Contains, phone))
        .push(Predicate::compare(
            Column::ChatJid,
            Operator::NotEndsWith,
            identity::GROUP_SERVER,
        ));
    set
}

fn jid_or_name_contains(query: &str) -> Predicate {
    Predicate::Any(vec![
        Predicate::compare(Column::ChatJid, Operator::Contains, query),
        Predicate::compare(Column::ChatName, Operator::Contains, query),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_renders_nothing() {
        let (sql, binds) = MessageFilter::default().predicates().where_clause();
        assert_eq!(sql, "");
        assert!(binds.is_empty());
    }

    #[test]
    fn filters_are_joined_with_and_in_field_order() {
        let params = ListMessagesParams {
            after: Some("2024-01-01T00:00:00Z".to_string()),
            sender_phone_number: Some("15551234567".to_string()),
            query: Some("Lunch".to_string()),
            ..Default::default()
        };
        let filter = MessageFilter::from_params(&params).unwrap();
        let (sql, binds) = filter.predicates().where_clause();
        assert_eq!(
            sql,
            r" WHERE m.timestamp > ? AND m.sender = ? AND LOWER(m.content) LIKE LOWER(?) ESCAPE '\'"
        );
        assert_eq!(
            binds,
            vec![
                "2024-01-01 00:00:00".to_string(),
                "15551234567@s.whatsapp.net".to_string(),
                "%Lunch%".to_string(),
            ]
        );
    }

    #[test]
    fn values_never_reach_sql_text() {
        let params = ListMessagesParams {
            chat_jid: Some("x'; DROP TABLE messages; --".to_string()),
            query: Some("' OR 1=1 --".to_string()),
            ..Default::default()
        };
        let (sql, binds) = MessageFilter::from_params(&params)
            .unwrap()
            .predicates()
            .where_clause();
        assert!(!sql.contains("DROP"));
        assert!(!sql.contains("1=1"));
        assert_eq!(binds.len(), 2);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), r"50\%\_off\\");
    }

    #[test]
    fn rfc3339_bounds_are_normalized_to_utc() {
        let ts = parse_time_bound("after", "2024-05-01T12:00:00+02:00").unwrap();
        assert_eq!(format_store_timestamp(&ts), "2024-05-01 10:00:00");
    }

    #[test]
    fn store_format_bounds_are_accepted() {
        let ts = parse_time_bound("before", "2024-05-01 10:00:00").unwrap();
        assert_eq!(format_store_timestamp(&ts), "2024-05-01 10:00:00");
    }

    #[test]
    fn malformed_bound_is_a_validation_error() {
        let params = ListMessagesParams {
            before: Some("yesterday".to_string()),
            ..Default::default()
        };
        let err = MessageFilter::from_params(&params).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "before", .. }));
    }

    #[test]
    fn blank_values_are_treated_as_absent() {
        let params = ListMessagesParams {
            after: Some(String::new()),
            chat_jid: Some("   ".to_string()),
            query: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            MessageFilter::from_params(&params).unwrap(),
            MessageFilter::default()
        );
    }

    #[test]
    fn chat_query_matches_jid_or_name() {
        let (sql, binds) = ChatFilter::new(Some("fam")).predicates().where_clause();
        assert_eq!(
            sql,
            r" WHERE (LOWER(c.jid) LIKE LOWER(?) ESCAPE '\' OR LOWER(c.name) LIKE LOWER(?) ESCAPE '\')"
        );
        assert_eq!(binds, vec!["%fam%", "%fam%"]);
    }

    #[test]
    fn direct_chat_lookup_matches_jid_substring_outside_groups() {
        let (sql, binds) = direct_chat_predicates("5550001").where_clause();
        assert_eq!(
            sql,
            r" WHERE LOWER(c.jid) LIKE LOWER(?) ESCAPE '\' AND c.jid NOT LIKE ? ESCAPE '\'"
        );
        assert_eq!(binds, vec!["%5550001%", "%@g.us"]);
    }

    #[test]
    fn contact_search_excludes_groups() {
        let (sql, binds) = contact_predicates("555").where_clause();
        assert!(sql.ends_with(r"AND c.jid NOT LIKE ? ESCAPE '\'"));
        assert_eq!(binds.last().map(String::as_str), Some("%@g.us"));
    }
}
