//! Plain-text rendering of messages, one line each.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::models::{Message, format_store_timestamp};
use crate::repository::ChatRepository;

pub const EMPTY_LISTING: &str = "No messages to display.";

/// Render one message given an already-resolved sender name.
///
/// `[2024-01-01 10:00:00] Chat: Family From: Alice: [image - Message ID: 3EB0 - Chat JID: ...] caption`
pub fn render_message(message: &Message, sender_name: &str, show_chat_info: bool) -> String {
    let mut line = format!("[{}] ", format_store_timestamp(&message.timestamp));

    if show_chat_info {
        if let Some(chat_name) = message.chat_name.as_deref().filter(|n| !n.is_empty()) {
            line.push_str(&format!("Chat: {chat_name} "));
        }
    }

    let sender = if message.is_from_me { "Me" } else { sender_name };
    line.push_str(&format!("From: {sender}: "));

    if let Some(media_type) = &message.media_type {
        line.push_str(&format!(
            "[{media_type} - Message ID: {} - Chat JID: {}] ",
            message.id, message.chat_jid
        ));
    }
    line.push_str(&message.content);
    line
}

/// Formats messages against a repository, caching resolved sender names for
/// the lifetime of the formatter.
pub struct MessageFormatter<'a> {
    repo: &'a ChatRepository,
    names: HashMap<String, String>,
}

impl<'a> MessageFormatter<'a> {
    pub fn new(repo: &'a ChatRepository) -> Self {
        Self {
            repo,
            names: HashMap::new(),
        }
    }

    pub async fn format_message(
        &mut self,
        message: &Message,
        show_chat_info: bool,
        cancel: &CancellationToken,
    ) -> String {
        let sender = if message.is_from_me {
            String::new()
        } else {
            self.sender_name(&message.sender, cancel).await
        };
        render_message(message, &sender, show_chat_info)
    }

    pub async fn format_messages(
        &mut self,
        messages: &[Message],
        show_chat_info: bool,
        cancel: &CancellationToken,
    ) -> String {
        if messages.is_empty() {
            return EMPTY_LISTING.to_string();
        }

        let mut lines = Vec::with_capacity(messages.len());
        for message in messages {
            lines.push(self.format_message(message, show_chat_info, cancel).await);
        }
        lines.join("\n")
    }

    async fn sender_name(&mut self, sender: &str, cancel: &CancellationToken) -> String {
        if let Some(name) = self.names.get(sender) {
            return name.clone();
        }
        let name = self.repo.resolve_sender_name(sender, cancel).await;
        self.names.insert(sender.to_string(), name.clone());
        name
    }
}
