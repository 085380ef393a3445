//! Request and response bodies, field names as the frontend sends them.
//!
//! Every request field is optional at the serde level so that a missing
//! field becomes a descriptive 400 instead of a generic rejection.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    pub text: Option<String>,
    pub language: Option<String>,
    pub voice_style: Option<String>,
    pub persona_mode: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// A prior turn the frontend already shows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryEntry {
    pub sender: Option<String>,
    pub text: Option<String>,
}

/// Body of the one-shot generation endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguageRequest {
    pub language: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeakRequest {
    pub text: Option<String>,
    pub language: Option<String>,
    pub voice_style: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageSearchRequest {
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
    pub audio: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HumorKind {
    Joke,
    Meme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumorItem {
    #[serde(rename = "type")]
    pub kind: HumorKind,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemeResponse {
    pub caption: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoastResponse {
    pub roast: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceResponse {
    pub advice: String,
}

/// Shape shared by tasks and achievements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitledArtifact {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakResponse {
    pub audio: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResponse {
    pub image_url: String,
}
