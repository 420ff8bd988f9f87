//! Request parameters as callers send them, with the defaults of the
//! assistant-facing tool surface.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchContactsParams {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMessagesParams {
    /// RFC 3339 or `YYYY-MM-DD HH:MM:SS`; exclusive lower bound
    #[serde(default)]
    pub after: Option<String>,
    /// Exclusive upper bound, same formats as `after`
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub sender_phone_number: Option<String>,
    #[serde(default)]
    pub chat_jid: Option<String>,
    /// Case-insensitive substring of the message content
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_true")]
    pub include_context: bool,
    #[serde(default = "default_listing_context")]
    pub context_before: i64,
    #[serde(default = "default_listing_context")]
    pub context_after: i64,
}

impl Default for ListMessagesParams {
    fn default() -> Self {
        Self {
            after: None,
            before: None,
            sender_phone_number: None,
            chat_jid: None,
            query: None,
            limit: default_limit(),
            page: 0,
            include_context: true,
            context_before: default_listing_context(),
            context_after: default_listing_context(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListChatsParams {
    /// Case-insensitive substring of the chat name or JID
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_true")]
    pub include_last_message: bool,
    /// `last_active` (default) or `name`
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
}

impl Default for ListChatsParams {
    fn default() -> Self {
        Self {
            query: None,
            limit: default_limit(),
            page: 0,
            include_last_message: true,
            sort_by: default_sort_by(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContextParams {
    pub message_id: String,
    /// Narrows the anchor lookup when message ids repeat across chats.
    #[serde(default)]
    pub chat_jid: Option<String>,
    #[serde(default = "default_window")]
    pub before: i64,
    #[serde(default = "default_window")]
    pub after: i64,
}

impl MessageContextParams {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            chat_jid: None,
            before: default_window(),
            after: default_window(),
        }
    }
}

pub(crate) fn default_limit() -> i64 {
    20
}

pub(crate) fn default_listing_context() -> i64 {
    1
}

pub(crate) fn default_window() -> i64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_sort_by() -> String {
    "last_active".to_string()
}
