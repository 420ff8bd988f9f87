use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Same tables the bridge creates; the retrieval layer never migrates.
pub async fn create_schema(pool: &SqlitePool) {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chats (
            jid TEXT PRIMARY KEY,
            name TEXT,
            last_message_time TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .expect("Failed to create chats table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id TEXT,
            chat_jid TEXT,
            sender TEXT,
            content TEXT,
            timestamp TEXT,
            is_from_me BOOLEAN,
            media_type TEXT,
            filename TEXT,
            PRIMARY KEY (id, chat_jid),
            FOREIGN KEY (chat_jid) REFERENCES chats(jid)
        )
        "#,
    )
    .execute(pool)
    .await
    .expect("Failed to create messages table");
}

/// Create a fresh ChatRepository backed by an in-memory SQLite database.
pub async fn test_repository() -> super::ChatRepository {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    create_schema(&pool).await;

    super::ChatRepository::new(pool)
}

pub async fn insert_chat(
    repo: &super::ChatRepository,
    jid: &str,
    name: Option<&str>,
    last_message_time: Option<&str>,
) {
    sqlx::query("INSERT INTO chats (jid, name, last_message_time) VALUES (?, ?, ?)")
        .bind(jid)
        .bind(name)
        .bind(last_message_time)
        .execute(&repo.pool)
        .await
        .expect("Failed to insert chat");
}

/// Fixture message row. Fields default to an incoming text message.
pub struct MessageRow<'a> {
    pub id: &'a str,
    pub chat_jid: &'a str,
    pub sender: &'a str,
    pub content: &'a str,
    pub timestamp: &'a str,
    pub is_from_me: bool,
    pub media_type: Option<&'a str>,
    pub filename: Option<&'a str>,
}

impl<'a> MessageRow<'a> {
    pub fn text(id: &'a str, chat_jid: &'a str, timestamp: &'a str, content: &'a str) -> Self {
        Self {
            id,
            chat_jid,
            sender: chat_jid,
            content,
            timestamp,
            is_from_me: false,
            media_type: None,
            filename: None,
        }
    }

    pub fn from_sender(mut self, sender: &'a str) -> Self {
        self.sender = sender;
        self
    }

    pub fn from_me(mut self) -> Self {
        self.is_from_me = true;
        self
    }

    pub fn with_media(mut self, media_type: &'a str, filename: &'a str) -> Self {
        self.media_type = Some(media_type);
        self.filename = Some(filename);
        self
    }
}

pub async fn insert_message(repo: &super::ChatRepository, row: MessageRow<'_>) {
    sqlx::query(
        r#"
        INSERT INTO messages (id, chat_jid, sender, content, timestamp, is_from_me, media_type, filename)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(row.id)
    .bind(row.chat_jid)
    .bind(row.sender)
    .bind(row.content)
    .bind(row.timestamp)
    .bind(row.is_from_me)
    .bind(row.media_type)
    .bind(row.filename)
    .execute(&repo.pool)
    .await
    .expect("Failed to insert message");
}

/// Insert a chat with `count` messages one minute apart starting at 10:00,
/// ids `<prefix>1..=<prefix>count`, and the chat's last_message_time set to
/// the final one.
pub async fn seed_chat_timeline(
    repo: &super::ChatRepository,
    jid: &str,
    name: &str,
    prefix: &str,
    count: u32,
) {
    let ts = |i: u32| format!("2024-01-01 10:{:02}:00", i);
    insert_chat(repo, jid, Some(name), Some(&ts(count))).await;
    for i in 1..=count {
        let id = format!("{prefix}{i}");
        let content = format!("message {i}");
        let stamp = ts(i);
        insert_message(repo, MessageRow::text(&id, jid, &stamp, &content)).await;
    }
}
