//! Text-to-speech using Sarvam AI.
//!
//! Sends `{text, target_language_code}` and gets base64 audio back. The
//! audio is handed to the frontend as-is; nothing is decoded to disk.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::markdown::preview;

pub const DEFAULT_ENDPOINT: &str = "https://api.sarvam.ai/text-to-speech";

/// Decoded audio shorter than this is treated as no audio at all.
const MIN_AUDIO_BYTES: usize = 100;

#[derive(Debug)]
pub enum SpeechError {
    /// Transport failure or timeout.
    Http(String),
    /// Non-2xx status from the TTS API.
    Api { status: u16, message: String },
    /// Body was not JSON.
    Parse(String),
}

impl fmt::Display for SpeechError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "TTS request failed: {e}"),
            Self::Api { status, message } => write!(f, "TTS error {status}: {message}"),
            Self::Parse(e) => write!(f, "TTS returned unparseable JSON: {e}"),
        }
    }
}

impl std::error::Error for SpeechError {}

/// Speech synthesis backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and return base64 audio.
    ///
    /// `Ok(None)` means the call succeeded but carried no usable audio.
    async fn synthesize(
        &self,
        text: &str,
        target_language_code: &str,
    ) -> Result<Option<String>, SpeechError>;
}

/// TTS client for the Sarvam AI API.
pub struct SarvamClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl SarvamClient {
    pub fn new(endpoint: String, api_key: String, timeout: Duration) -> Result<Self, SpeechError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpeechError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { endpoint, api_key, client })
    }
}

#[async_trait]
impl SpeechSynthesizer for SarvamClient {
    async fn synthesize(
        &self,
        text: &str,
        target_language_code: &str,
    ) -> Result<Option<String>, SpeechError> {
        info!("TTS [{target_language_code}]: \"{}\"", preview(text, 50));

        let response = self
            .client
            .post(&self.endpoint)
            .header("api-subscription-key", &self.api_key)
            .json(&serde_json::json!({
                "text": text,
                "target_language_code": target_language_code,
            }))
            .send()
            .await
            .map_err(|e| SpeechError::Http(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Api { status: status.as_u16(), message: preview(&body, 200) });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SpeechError::Parse(e.without_url().to_string()))?;

        let audio = extract_audio(&body);
        match &audio {
            Some(audio) => debug!("Got {} chars of base64 audio", audio.len()),
            None => warn!("TTS response carried no usable audio for \"{}\"", preview(text, 50)),
        }
        Ok(audio)
    }
}

/// Known places a TTS response may carry base64 audio, tried in order.
const AUDIO_SHAPES: &[&[AudioPath]] = &[
    &[AudioPath::Key("audios"), AudioPath::Index(0)],
    &[AudioPath::Key("audio")],
    &[AudioPath::Key("audio_content")],
    &[AudioPath::Key("audioContent")],
    &[AudioPath::Key("data"), AudioPath::Key("audios"), AudioPath::Index(0)],
];

#[derive(Debug, Clone, Copy)]
enum AudioPath {
    Key(&'static str),
    Index(usize),
}

/// Normalize a TTS response body to a base64 audio string.
///
/// Tries each shape in [`AUDIO_SHAPES`]; the first non-empty string that
/// decodes to real audio wins. A `data:audio/...;base64,` prefix is stripped.
pub fn extract_audio(body: &Value) -> Option<String> {
    AUDIO_SHAPES.iter().find_map(|shape| {
        let raw = shape
            .iter()
            .try_fold(body, |value, step| match step {
                AudioPath::Key(key) => value.get(*key),
                AudioPath::Index(i) => value.get(*i),
            })?
            .as_str()?;
        validate_audio(raw)
    })
}

fn validate_audio(raw: &str) -> Option<String> {
    let payload = match raw.strip_prefix("data:") {
        Some(rest) => rest.split_once(',')?.1,
        None => raw,
    }
    .trim();

    let bytes = base64::engine::general_purpose::STANDARD.decode(payload).ok()?;
    if bytes.len() <= MIN_AUDIO_BYTES {
        return None;
    }
    Some(payload.to_string())
}
