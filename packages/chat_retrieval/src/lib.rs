//! # Chat Retrieval
//!
//! Read-side access to the SQLite message store written by a WhatsApp bridge.
//!
//! ## Overview
//!
//! The bridge persists two tables, `chats` and `messages`. This library never
//! writes to them; it provides:
//! - Filtered, paginated message listings with optional surrounding context
//! - Context windows around a single anchor message
//! - Chat listings enriched with each chat's last message
//! - Contact search and sender-name resolution
//! - One-line text rendering of messages
//!
//! ## Store layout
//!
//! ```text
//! chats(jid PRIMARY KEY, name, last_message_time)
//! messages(id, chat_jid -> chats.jid, sender, content, timestamp,
//!          is_from_me, media_type, filename, PRIMARY KEY (id, chat_jid))
//! ```
//!
//! Timestamps are stored as `YYYY-MM-DD HH:MM:SS` text and compared as text.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chat_retrieval::{Database, ListMessagesParams, RetrievalConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = RetrievalConfig::load(None)?;
//! let db = Database::open(&config.store).await?;
//! let repo = db.repository();
//! let cancel = CancellationToken::new();
//!
//! let params = ListMessagesParams {
//!     query: Some("lunch".to_string()),
//!     ..Default::default()
//! };
//! for listed in repo.list_messages(&params, &cancel).await? {
//!     println!("{}: {}", listed.message.sender, listed.message.content);
//! }
//!
//! let chats = repo.list_chats(&Default::default(), &cancel).await?;
//! for warning in &chats.warnings {
//!     eprintln!("{warning}");
//! }
//!
//! db.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Partial results
//!
//! Chat operations return [`Enriched`]: the rows themselves plus any
//! [`EnrichmentWarning`]s for rows whose last message could not be attached.
//! Those rows are still returned with their base fields.

pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod format;
pub mod identity;
pub mod models;
pub mod pagination;
pub mod params;
pub mod repository;

pub use config::{RetrievalConfig, StoreConfig};
pub use db::Database;
pub use error::{Enriched, EnrichmentFailure, EnrichmentWarning, Error, Result};
pub use filter::{ChatFilter, MessageFilter};
pub use format::MessageFormatter;
pub use identity::{is_group_jid, jid_to_phone, phone_to_jid};
pub use models::{Chat, Contact, ContextItems, LastMessage, ListedMessage, Message, MessageContext};
pub use pagination::{ChatSort, Pagination};
pub use params::{ListChatsParams, ListMessagesParams, MessageContextParams, SearchContactsParams};
pub use repository::ChatRepository;
