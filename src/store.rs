use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    ConnectOptions, Row, SqlitePool,
};
use std::{path::Path, str::FromStr};
use uuid::Uuid;

use crate::calendar::{DateNightEvent, NewDateNight};
use crate::chat::ChatMessage;

/// The document store behind the single shared conversation and the
/// date-night calendar. Messages are append-only: the store assigns
/// the id and the authoritative ordering timestamp at the moment the
/// write is durably applied.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Create a new Store instance.
    /// This will automatically create the database file if it doesn't exist.
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
        }

        let db_url = format!("sqlite://{}", db_path.to_string_lossy());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .log_statements(tracing::log::LevelFilter::Trace);

        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        Ok(Self { pool })
    }

    /// An in-memory store for tests. Pinned to a single connection so
    /// every query sees the same database.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;
        Ok(Self { pool })
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                avatar TEXT NOT NULL,
                name TEXT NOT NULL,
                timestamp DATETIME NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chat_messages_timestamp ON chat_messages(timestamp);

            CREATE TABLE IF NOT EXISTS date_nights (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                date DATE NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to initialize database schema")?;

        Ok(())
    }

    /// Durably append a locally composed message, assigning its id and
    /// the authoritative timestamp now (not at composition time, so
    /// network delay cannot corrupt ordering). Returns the acknowledged
    /// copy.
    pub async fn append(&self, pending: &ChatMessage) -> Result<ChatMessage> {
        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, text, sender_id, avatar, name, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&pending.text)
        .bind(&pending.sender_id)
        .bind(&pending.avatar)
        .bind(&pending.name)
        .bind(timestamp)
        .execute(&self.pool)
        .await
        .context("Failed to append message")?;

        Ok(ChatMessage {
            id: Some(id),
            timestamp: Some(timestamp),
            ..pending.clone()
        })
    }

    /// The complete conversation, ordered by timestamp ascending.
    /// Ties keep arrival order (rowid).
    pub async fn snapshot(&self) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, text, sender_id, avatar, name, timestamp
            FROM chat_messages
            ORDER BY timestamp ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch messages")?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            messages.push(ChatMessage {
                id: Some(row.try_get("id")?),
                text: row.try_get("text")?,
                sender_id: row.try_get("sender_id")?,
                avatar: row.try_get("avatar")?,
                name: row.try_get("name")?,
                timestamp: Some(row.try_get("timestamp")?),
            });
        }

        Ok(messages)
    }

    pub async fn add_date_night(&self, new: &NewDateNight) -> Result<DateNightEvent> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO date_nights (id, title, description, date)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.date)
        .execute(&self.pool)
        .await
        .context("Failed to save date night")?;

        Ok(DateNightEvent {
            id,
            title: new.title.clone(),
            description: new.description.clone(),
            date: new.date,
        })
    }

    pub async fn date_nights(&self) -> Result<Vec<DateNightEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, date
            FROM date_nights
            ORDER BY date ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch date nights")?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            events.push(DateNightEvent {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                description: row.try_get("description")?,
                date: row.try_get("date")?,
            });
        }

        Ok(events)
    }
}
