//! Conversation history and artifact records.
//!
//! Persistence is best effort: callers log a [`StoreError`] and carry on.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

/// Who wrote a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    /// Label used in stored documents.
    pub fn label(self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "brocodeAI",
        }
    }

    pub fn from_label(label: &str) -> Self {
        if label == "user" { Speaker::User } else { Speaker::Assistant }
    }
}

/// One message in a conversation. Written once, never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
    /// Language code as sent by the frontend, e.g. `hinglish`.
    pub language: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(speaker: Speaker, text: impl Into<String>, language: impl Into<String>) -> Self {
        Self { speaker, text: text.into(), language: language.into(), timestamp: Utc::now() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Task,
    Achievement,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Task => "task",
            ArtifactKind::Achievement => "achievement",
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task" => Ok(ArtifactKind::Task),
            "achievement" => Ok(ArtifactKind::Achievement),
            other => Err(StoreError::Parse(format!("unknown artifact kind '{other}'"))),
        }
    }
}

/// A generated task or achievement kept for the user.
///
/// Tasks start uncompleted; achievements are stored already unlocked.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRecord {
    pub kind: ArtifactKind,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl ArtifactRecord {
    pub fn new(kind: ArtifactKind, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { kind, title: title.into(), description: description.into(), timestamp: Utc::now() }
    }
}

#[derive(Debug)]
pub enum StoreError {
    Http(String),
    Api { status: u16, message: String },
    Parse(String),
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "store request failed: {e}"),
            Self::Api { status, message } => write!(f, "store error {status}: {message}"),
            Self::Parse(e) => write!(f, "store returned unreadable data: {e}"),
            Self::Database(e) => write!(f, "database error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Where turns, tasks and achievements go.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append_turn(&self, user_id: &str, turn: &ChatTurn) -> Result<(), StoreError>;

    /// Most recent user-authored turns, newest first.
    async fn recent_user_turns(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>, StoreError>;

    async fn save_artifact(&self, user_id: &str, record: &ArtifactRecord) -> Result<(), StoreError>;
}

/// RFC 3339 with fixed precision, so stored strings sort chronologically.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Parse(format!("bad timestamp '{s}': {e}")))
}
