//! Firestore REST client for conversation history.
//!
//! Documents live under `artifacts/{app_id}/users/{user_id}/`:
//! `chatHistory` for turns, `assignedTasks` and `achievements` for artifacts.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::markdown::preview;
use crate::upstream::store::{
    format_timestamp, parse_timestamp, ArtifactKind, ArtifactRecord, ChatTurn, HistoryStore, Speaker,
    StoreError,
};

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

const CHAT_HISTORY: &str = "chatHistory";

pub struct FirestoreStore {
    /// `{base}/projects/{project}/databases/(default)/documents`
    documents_url: String,
    app_id: String,
    api_key: Option<String>,
    access_token: Option<String>,
    client: reqwest::Client,
}

/// Connection settings for [`FirestoreStore`].
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub base_url: String,
    pub project_id: String,
    pub app_id: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub timeout: Duration,
}

#[derive(Deserialize)]
struct QueryResult {
    document: Option<Document>,
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                config.base_url.trim_end_matches('/'),
                config.project_id
            ),
            app_id: config.app_id,
            api_key: config.api_key,
            access_token: config.access_token,
            client,
        })
    }

    /// Document path of a user, relative to the database root.
    fn user_path(&self, user_id: &str) -> String {
        format!(
            "artifacts/{}/users/{}",
            urlencoding::encode(&self.app_id),
            urlencoding::encode(user_id)
        )
    }

    fn request(&self, url: String) -> reqwest::RequestBuilder {
        let mut request = self.client.post(url);
        if let Some(ref key) = self.api_key {
            request = request.query(&[("key", key)]);
        }
        if let Some(ref token) = self.access_token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn send(&self, url: String, body: Value) -> Result<Value, StoreError> {
        let response = self
            .request(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status: status.as_u16(), message: preview(&body, 200) });
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.without_url().to_string()))
    }

    async fn create_document(&self, user_id: &str, collection: &str, fields: Value) -> Result<(), StoreError> {
        let url = format!("{}/{}/{}", self.documents_url, self.user_path(user_id), collection);
        self.send(url, json!({ "fields": fields })).await?;
        debug!("Stored document in {collection} for user '{user_id}'");
        Ok(())
    }
}

fn collection_for(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Task => "assignedTasks",
        ArtifactKind::Achievement => "achievements",
    }
}

fn turn_fields(turn: &ChatTurn) -> Value {
    json!({
        "text": { "stringValue": turn.text },
        "sender": { "stringValue": turn.speaker.label() },
        "language": { "stringValue": turn.language },
        "timestamp": { "timestampValue": format_timestamp(&turn.timestamp) },
    })
}

fn artifact_fields(record: &ArtifactRecord) -> Value {
    let mut fields = json!({
        "title": { "stringValue": record.title },
        "description": { "stringValue": record.description },
        "timestamp": { "timestampValue": format_timestamp(&record.timestamp) },
    });
    let flag = match record.kind {
        ArtifactKind::Task => ("completed", false),
        ArtifactKind::Achievement => ("unlocked", true),
    };
    fields[flag.0] = json!({ "booleanValue": flag.1 });
    fields
}

fn recent_user_turns_query(limit: usize) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": CHAT_HISTORY }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": "sender" },
                    "op": "EQUAL",
                    "value": { "stringValue": Speaker::User.label() }
                }
            },
            "orderBy": [{ "field": { "fieldPath": "timestamp" }, "direction": "DESCENDING" }],
            "limit": limit
        }
    })
}

fn string_field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    fields.get(name)?.get("stringValue")?.as_str()
}

/// Turn a `:runQuery` response into chat turns, skipping malformed documents.
fn parse_query_results(body: Value) -> Result<Vec<ChatTurn>, StoreError> {
    let results: Vec<QueryResult> =
        serde_json::from_value(body).map_err(|e| StoreError::Parse(e.to_string()))?;

    let mut turns = Vec::new();
    for doc in results.into_iter().filter_map(|r| r.document) {
        let fields = doc.fields;
        let (Some(text), Some(timestamp)) = (
            string_field(&fields, "text"),
            fields.get("timestamp").and_then(|v| v.get("timestampValue")).and_then(Value::as_str),
        ) else {
            continue;
        };
        let timestamp = match parse_timestamp(timestamp) {
            Ok(timestamp) => timestamp,
            Err(e) => {
                warn!("Skipping chat history document: {e}");
                continue;
            }
        };
        turns.push(ChatTurn {
            speaker: Speaker::from_label(string_field(&fields, "sender").unwrap_or_default()),
            text: text.to_string(),
            language: string_field(&fields, "language").unwrap_or("en").to_string(),
            timestamp,
        });
    }
    Ok(turns)
}

#[async_trait]
impl HistoryStore for FirestoreStore {
    async fn append_turn(&self, user_id: &str, turn: &ChatTurn) -> Result<(), StoreError> {
        self.create_document(user_id, CHAT_HISTORY, turn_fields(turn)).await
    }

    async fn recent_user_turns(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>, StoreError> {
        let url = format!("{}/{}:runQuery", self.documents_url, self.user_path(user_id));
        let body = self.send(url, recent_user_turns_query(limit)).await?;
        parse_query_results(body)
    }

    async fn save_artifact(&self, user_id: &str, record: &ArtifactRecord) -> Result<(), StoreError> {
        self.create_document(user_id, collection_for(record.kind), artifact_fields(record))
            .await
    }
}
