use std::path::PathBuf;

use anyhow::{Context, Result};
use chat_retrieval::models::format_store_timestamp;
use chat_retrieval::{
    Chat, ChatRepository, Contact, Database, Enriched, ListChatsParams, ListMessagesParams,
    MessageContextParams, MessageFormatter, Pagination, RetrievalConfig, SearchContactsParams,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "chat-cli")]
#[command(version)]
#[command(about = "Query a local WhatsApp bridge message store")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    /// Data directory holding config.toml (default: ~/.chat-retrieval)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Message database path, overriding the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Search contacts by phone number or name
    Contacts {
        query: String,
    },

    /// List messages, newest first
    Messages {
        /// Only messages after this time (RFC 3339 or "YYYY-MM-DD HH:MM:SS")
        #[arg(long)]
        after: Option<String>,

        /// Only messages before this time
        #[arg(long)]
        before: Option<String>,

        /// Sender phone number
        #[arg(long)]
        sender: Option<String>,

        /// Chat JID
        #[arg(long)]
        chat: Option<String>,

        /// Case-insensitive content substring
        #[arg(short, long)]
        query: Option<String>,

        #[arg(long)]
        limit: Option<i64>,

        #[arg(long, default_value = "0")]
        page: i64,

        /// Skip surrounding messages
        #[arg(long)]
        no_context: bool,

        #[arg(long)]
        context_before: Option<i64>,

        #[arg(long)]
        context_after: Option<i64>,
    },

    /// List chats
    Chats {
        /// Match against chat JID or name
        #[arg(short, long)]
        query: Option<String>,

        #[arg(long)]
        limit: Option<i64>,

        #[arg(long, default_value = "0")]
        page: i64,

        /// Don't look up each chat's last message
        #[arg(long)]
        no_last_message: bool,

        /// "last_active" or "name"
        #[arg(long, default_value = "last_active")]
        sort: String,
    },

    /// Show one chat
    Chat {
        jid: String,

        #[arg(long)]
        no_last_message: bool,
    },

    /// Show the messages around one message
    Context {
        message_id: String,

        /// Chat JID, when the id repeats across chats
        #[arg(long)]
        chat: Option<String>,

        #[arg(long)]
        before: Option<i64>,

        #[arg(long)]
        after: Option<i64>,
    },

    /// Show the direct chat with a phone number
    DirectChat {
        phone_number: String,
    },

    /// List every chat a contact takes part in
    ContactChats {
        jid: String,

        #[arg(long)]
        limit: Option<i64>,

        #[arg(long, default_value = "0")]
        page: i64,
    },

    /// Show the most recent message exchanged with a contact
    LastInteraction {
        jid: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = RetrievalConfig::load(cli.data_dir.clone())?;
    if let Some(db) = &cli.db {
        config.store.db_path = db.clone();
    }

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            ctrl_c.cancel();
        }
    });

    let db = Database::open(&config.store)
        .await
        .with_context(|| format!("Failed to open {}", config.store.db_path.display()))?;
    let repo = db.repository();

    let result = run(&cli, &config, &repo, &cancel).await;
    db.close().await;
    result
}

async fn run(
    cli: &Cli,
    config: &RetrievalConfig,
    repo: &ChatRepository,
    cancel: &CancellationToken,
) -> Result<()> {
    let defaults = &config.defaults;
    let format = cli.format;

    match &cli.command {
        Commands::Contacts { query } => {
            let params = SearchContactsParams {
                query: query.clone(),
            };
            let contacts = repo
                .search_contacts(&params.query, cancel)
                .await
                .context("Contact search failed")?;
            match format {
                OutputFormat::Json => print_json(&contacts)?,
                OutputFormat::Text => print_contacts(&contacts),
            }
        }
        Commands::Messages {
            after,
            before,
            sender,
            chat,
            query,
            limit,
            page,
            no_context,
            context_before,
            context_after,
        } => {
            let params = ListMessagesParams {
                after: after.clone(),
                before: before.clone(),
                sender_phone_number: sender.clone(),
                chat_jid: chat.clone(),
                query: query.clone(),
                limit: limit.unwrap_or(defaults.limit),
                page: *page,
                include_context: !no_context,
                context_before: context_before.unwrap_or(defaults.listing_context),
                context_after: context_after.unwrap_or(defaults.listing_context),
            };
            let listed = repo
                .list_messages(&params, cancel)
                .await
                .context("Message listing failed")?;

            match format {
                OutputFormat::Json => print_json(&listed)?,
                OutputFormat::Text => {
                    let mut formatter = MessageFormatter::new(repo);
                    if listed.is_empty() {
                        println!("{}", formatter.format_messages(&[], true, cancel).await);
                    }
                    for (i, item) in listed.iter().enumerate() {
                        if i > 0 && item.context.is_some() {
                            println!("---");
                        }
                        let mut window = Vec::new();
                        if let Some(ctx) = &item.context {
                            window.extend(ctx.before.iter().cloned());
                        }
                        window.push(item.message.clone());
                        if let Some(ctx) = &item.context {
                            window.extend(ctx.after.iter().cloned());
                        }
                        println!("{}", formatter.format_messages(&window, true, cancel).await);
                    }
                }
            }
        }
        Commands::Chats {
            query,
            limit,
            page,
            no_last_message,
            sort,
        } => {
            let params = ListChatsParams {
                query: query.clone(),
                limit: limit.unwrap_or(defaults.limit),
                page: *page,
                include_last_message: !no_last_message,
                sort_by: sort.clone(),
            };
            let chats = repo
                .list_chats(&params, cancel)
                .await
                .context("Chat listing failed")?;
            print_chats(format, &chats)?;
        }
        Commands::Chat {
            jid,
            no_last_message,
        } => {
            let chat = repo
                .get_chat(jid, !no_last_message, cancel)
                .await
                .with_context(|| format!("Failed to load chat {jid}"))?;
            print_chat(format, &chat)?;
        }
        Commands::Context {
            message_id,
            chat,
            before,
            after,
        } => {
            let params = MessageContextParams {
                chat_jid: chat.clone(),
                before: before.unwrap_or(defaults.context_window),
                after: after.unwrap_or(defaults.context_window),
                ..MessageContextParams::new(message_id.clone())
            };
            let context = repo
                .get_message_context(&params, cancel)
                .await
                .with_context(|| format!("Failed to load context for {message_id}"))?;
            match format {
                OutputFormat::Json => print_json(&context)?,
                OutputFormat::Text => {
                    let messages = context.into_messages();
                    let text = MessageFormatter::new(repo)
                        .format_messages(&messages, true, cancel)
                        .await;
                    println!("{text}");
                }
            }
        }
        Commands::DirectChat { phone_number } => {
            let chat = repo
                .get_direct_chat_by_contact(phone_number, cancel)
                .await
                .with_context(|| format!("Failed to load direct chat with {phone_number}"))?;
            print_chat(format, &chat)?;
        }
        Commands::ContactChats { jid, limit, page } => {
            let pagination = Pagination::new(limit.unwrap_or(defaults.limit), *page)?;
            let chats = repo
                .get_contact_chats(jid, pagination, cancel)
                .await
                .with_context(|| format!("Failed to list chats for {jid}"))?;
            print_chats(format, &chats)?;
        }
        Commands::LastInteraction { jid } => {
            let message = repo
                .get_last_interaction(jid, cancel)
                .await
                .with_context(|| format!("Failed to load last interaction with {jid}"))?;
            match format {
                OutputFormat::Json => print_json(&message)?,
                OutputFormat::Text => {
                    let line = MessageFormatter::new(repo)
                        .format_message(&message, true, cancel)
                        .await;
                    println!("{line}");
                }
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_contacts(contacts: &[Contact]) {
    if contacts.is_empty() {
        println!("No contacts found.");
        return;
    }
    for contact in contacts {
        println!(
            "{:<20} {:<40} {}",
            contact.phone_number,
            contact.name.as_deref().unwrap_or("-"),
            contact.jid
        );
    }
}

fn print_chats(format: OutputFormat, chats: &Enriched<Vec<Chat>>) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(chats);
    }
    if chats.value.is_empty() {
        println!("No chats found.");
    }
    for chat in &chats.value {
        println!("{}", chat_line(chat));
    }
    print_warnings(chats);
    Ok(())
}

fn print_chat(format: OutputFormat, chat: &Enriched<Chat>) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(chat);
    }
    println!("{}", chat_line(&chat.value));
    print_warnings(chat);
    Ok(())
}

fn chat_line(chat: &Chat) -> String {
    let kind = if chat.is_group() { "group" } else { "direct" };
    let mut line = format!(
        "{} [{kind}] {}",
        chat.name.as_deref().unwrap_or("(unnamed)"),
        chat.jid
    );
    if let Some(ts) = &chat.last_message_time {
        line.push_str(&format!("  last active {}", format_store_timestamp(ts)));
    }
    if let Some(last) = &chat.last_message {
        let who = if last.is_from_me { "Me" } else { last.sender.as_str() };
        line.push_str(&format!("\n    {who}: {}", last.content));
        if let Some(media) = &last.media_type {
            line.push_str(&format!(" [{media}]"));
        }
    }
    line
}

fn print_warnings<T>(enriched: &Enriched<T>) {
    for warning in &enriched.warnings {
        eprintln!("warning: {warning}");
    }
}
