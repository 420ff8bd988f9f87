use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::identity;

/// Textual timestamp layout used by the store. Lexicographic order of values
/// in this format equals chronological order.
pub const STORE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn parse_store_timestamp(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, STORE_TIMESTAMP_FORMAT)
}

pub fn format_store_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(STORE_TIMESTAMP_FORMAT).to_string()
}

/// Relative location of a downloaded attachment: `store/<chat>/<filename>`,
/// with `:` in the chat JID replaced by `_`.
pub fn media_path(chat_jid: &str, filename: Option<&str>) -> Option<String> {
    match filename {
        Some(name) if !name.is_empty() => Some(format!(
            "store/{}/{}",
            chat_jid.replace(':', "_"),
            name
        )),
        _ => None,
    }
}

// === Message models ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_jid: String,
    /// Display name of the owning chat, from the chats join.
    pub chat_name: Option<String>,
    pub sender: String,
    pub content: String,
    #[serde(with = "store_time")]
    pub timestamp: NaiveDateTime,
    pub is_from_me: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_path: Option<String>,
    /// `timestamp` exactly as stored. Neighbour queries compare against this
    /// text, not a re-rendering of the decoded value.
    #[serde(skip)]
    pub(crate) stored_timestamp: String,
}

impl Message {
    /// The text neighbours are compared against: the stored form when the
    /// message came from the store, the canonical rendering otherwise.
    pub(crate) fn timestamp_key(&self) -> String {
        if self.stored_timestamp.is_empty() {
            format_store_timestamp(&self.timestamp)
        } else {
            self.stored_timestamp.clone()
        }
    }
}

/// Messages on either side of an anchor, each side in ascending time order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextItems {
    pub before: Vec<Message>,
    pub after: Vec<Message>,
}

/// A context window: the anchor plus its neighbours in the same chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageContext {
    pub message: Message,
    pub before: Vec<Message>,
    pub after: Vec<Message>,
}

impl MessageContext {
    pub fn new(message: Message, items: ContextItems) -> Self {
        Self {
            message,
            before: items.before,
            after: items.after,
        }
    }

    /// The window flattened into chronological order.
    pub fn into_messages(self) -> Vec<Message> {
        let mut all = self.before;
        all.push(self.message);
        all.extend(self.after);
        all
    }
}

/// One row of a message listing, optionally carrying its surrounding context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedMessage {
    #[serde(flatten)]
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextItems>,
}

// === Chat models ===

/// The message a chat's `last_message_time` points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub id: String,
    pub sender: String,
    pub content: String,
    #[serde(with = "store_time")]
    pub timestamp: NaiveDateTime,
    pub is_from_me: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub jid: String,
    pub name: Option<String>,
    #[serde(with = "store_time_opt")]
    pub last_message_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessage>,
}

impl Chat {
    pub fn is_group(&self) -> bool {
        identity::is_group_jid(&self.jid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub jid: String,
    pub name: Option<String>,
    pub phone_number: String,
}

impl Contact {
    pub fn from_chat_row(jid: String, name: Option<String>) -> Self {
        let phone_number = identity::user_part(&jid).to_string();
        Self {
            jid,
            name,
            phone_number,
        }
    }
}

mod store_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_store_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_store_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

mod store_time_opt {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.serialize_some(&super::format_store_timestamp(ts)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|raw| super::parse_store_timestamp(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}
