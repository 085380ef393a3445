//! Local SQLite history store.
//!
//! Used when no hosted document store is configured but `HISTORY_DB_PATH`
//! is set, and by tests as an in-memory store.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{Connection, params};
use tracing::info;

use crate::upstream::store::{
    format_timestamp, parse_timestamp, ArtifactKind, ArtifactRecord, ChatTurn, HistoryStore, Speaker,
    StoreError,
};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    /// Open (or create) a database file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self::with_connection(conn)?;
        info!("Opened history database at {:?}", path);
        Ok(store)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                sender TEXT NOT NULL,
                text TEXT NOT NULL,
                language TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS artifacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                completed INTEGER,
                unlocked INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_turns_user ON turns(user_id, sender, timestamp);
            CREATE INDEX IF NOT EXISTS idx_artifacts_user ON artifacts(user_id, kind);
        "#,
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    /// All stored artifacts of one kind for a user, oldest first.
    pub fn artifacts(&self, user_id: &str, kind: ArtifactKind) -> Result<Vec<ArtifactRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT kind, title, description, timestamp FROM artifacts
             WHERE user_id = ?1 AND kind = ?2 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id, kind.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (kind, title, description, timestamp) = row?;
            let kind: ArtifactKind = kind.parse()?;
            records.push(ArtifactRecord { kind, title, description, timestamp: parse_timestamp(&timestamp)? });
        }
        Ok(records)
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    async fn append_turn(&self, user_id: &str, turn: &ChatTurn) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO turns (user_id, sender, text, language, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                turn.speaker.label(),
                turn.text,
                turn.language,
                format_timestamp(&turn.timestamp)
            ],
        )?;
        Ok(())
    }

    async fn recent_user_turns(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT sender, text, language, timestamp FROM turns
             WHERE user_id = ?1 AND sender = ?2
             ORDER BY timestamp DESC, id DESC LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![user_id, Speaker::User.label(), limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut turns = Vec::new();
        for row in rows {
            let (sender, text, language, timestamp) = row?;
            turns.push(ChatTurn {
                speaker: Speaker::from_label(&sender),
                text,
                language,
                timestamp: parse_timestamp(&timestamp)?,
            });
        }
        Ok(turns)
    }

    async fn save_artifact(&self, user_id: &str, record: &ArtifactRecord) -> Result<(), StoreError> {
        let (completed, unlocked) = match record.kind {
            ArtifactKind::Task => (Some(false), None),
            ArtifactKind::Achievement => (None, Some(true)),
        };
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO artifacts (user_id, kind, title, description, timestamp, completed, unlocked)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user_id,
                record.kind.as_str(),
                record.title,
                record.description,
                format_timestamp(&record.timestamp),
                completed,
                unlocked
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn turn(speaker: Speaker, text: &str, minutes_ago: i64) -> ChatTurn {
        ChatTurn {
            speaker,
            text: text.to_string(),
            language: "en".to_string(),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn test_recent_user_turns_newest_first() {
        let store = SqliteStore::in_memory().unwrap();
        store.append_turn("u1", &turn(Speaker::User, "oldest", 30)).await.unwrap();
        store.append_turn("u1", &turn(Speaker::Assistant, "reply", 29)).await.unwrap();
        store.append_turn("u1", &turn(Speaker::User, "newer", 20)).await.unwrap();
        store.append_turn("u1", &turn(Speaker::User, "newest", 10)).await.unwrap();
        store.append_turn("u2", &turn(Speaker::User, "someone else", 5)).await.unwrap();

        let turns = store.recent_user_turns("u1", 2).await.unwrap();
        let texts: Vec<_> = turns.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["newest", "newer"]);
        assert!(turns.iter().all(|t| t.speaker == Speaker::User));
    }

    #[tokio::test]
    async fn test_unknown_user_has_no_turns() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.recent_user_turns("nobody", 6).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_artifacts_by_kind() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .save_artifact("u1", &ArtifactRecord::new(ArtifactKind::Task, "Stare", "Stare at a wall."))
            .await
            .unwrap();
        store
            .save_artifact("u1", &ArtifactRecord::new(ArtifactKind::Achievement, "Late", "Was late."))
            .await
            .unwrap();

        let tasks = store.artifacts("u1", ArtifactKind::Task).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Stare");
        let achievements = store.artifacts("u1", ArtifactKind::Achievement).unwrap();
        assert_eq!(achievements[0].description, "Was late.");
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.append_turn("u1", &turn(Speaker::User, "remember me", 1)).await.unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let turns = store.recent_user_turns("u1", 6).await.unwrap();
        assert_eq!(turns[0].text, "remember me");
    }
}
