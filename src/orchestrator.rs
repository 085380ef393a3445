//! Request orchestration: validate, prompt, generate, speak, persist, shape.
//!
//! Each endpoint makes at most one generation call and at most one speech
//! call. Nothing is retried. Speech and persistence are optional extras and
//! never fail a request that already has its text.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::api::types::{
    AdviceResponse, ChatRequest, ChatResponse, HumorItem, ImageResponse, ImageSearchRequest,
    LanguageRequest, MemeResponse, RoastResponse, SpeakRequest, SpeakResponse, TitledArtifact,
};
use crate::error::ApiError;
use crate::language::{voice_code, Language, Persona, VoiceStyle};
use crate::markdown::{self, preview};
use crate::prompts::{self, Artifact};
use crate::upstream::images::meme_placeholder_url;
use crate::upstream::{
    ArtifactKind, ArtifactRecord, ChatTurn, GenerationRequest, HistoryStore, ImageSearch, Speaker,
    SpeechSynthesizer, TextGenerator, Turn,
};

/// User id used when the frontend doesn't send one.
pub const ANONYMOUS_USER: &str = "anonymous-user";

/// Stored user turns fetched for callback humor.
const PAST_TURNS_FETCHED: usize = 6;
/// Past turns actually shown to the model.
const PAST_TURNS_SHOWN: usize = 5;

/// Characters of user input included in log lines.
const LOG_PREVIEW_CHARS: usize = 50;

const GENERATOR_MISSING: &str = "Gemini model not initialized. Cannot process request.";
const SPEECH_MISSING: &str = "Speech synthesis is not configured.";

pub struct Orchestrator {
    generator: Option<Arc<dyn TextGenerator>>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    store: Option<Arc<dyn HistoryStore>>,
    images: ImageSearch,
}

#[derive(Deserialize)]
struct MemeDraft {
    caption: String,
    #[serde(default)]
    image_description: String,
}

fn required_text(value: Option<&str>, message: &str) -> Result<String, ApiError> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ApiError::ClientInput(message.to_string())),
    }
}

/// Endpoint tag plus a truncated preview of the request input.
fn log_context(endpoint: &str, input: &str) -> String {
    format!("[{endpoint}] input \"{}\"", preview(input, LOG_PREVIEW_CHARS))
}

fn user_id_or_anonymous(user_id: Option<&str>) -> &str {
    match user_id.map(str::trim) {
        Some(id) if !id.is_empty() => id,
        _ => ANONYMOUS_USER,
    }
}

impl Orchestrator {
    pub fn new(images: ImageSearch) -> Self {
        Self { generator: None, speech: None, store: None, images }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    fn generator(&self, endpoint: &str) -> Result<&Arc<dyn TextGenerator>, ApiError> {
        self.generator.as_ref().ok_or_else(|| {
            error!("[{endpoint}] generation client not configured");
            ApiError::DependencyUnavailable(GENERATOR_MISSING)
        })
    }

    /// The single generation call of a request. `input` is what the caller
    /// asked for, previewed in the failure log.
    async fn generate(
        &self,
        endpoint: &str,
        input: &str,
        request: GenerationRequest,
    ) -> Result<String, ApiError> {
        let generator = self.generator(endpoint)?;
        generator.generate(request).await.map_err(|e| {
            error!("{} generation failed: {e}", log_context(endpoint, input));
            ApiError::Upstream(format!("A generation service error occurred: {e}"))
        })
    }

    /// Free-text artifact with the empty-text fallback applied, cleaned.
    async fn generate_text(&self, artifact: Artifact, language: Language) -> Result<String, ApiError> {
        let prompt = prompts::artifact_prompt(artifact, language);
        let text = self
            .generate(artifact.name(), language.code(), GenerationRequest::prompt(prompt))
            .await?;
        if text.trim().is_empty() {
            warn!("[{}] empty generation, using fallback", artifact.name());
            return Ok(markdown::clean(artifact.fallback_text()));
        }
        Ok(markdown::clean(&text))
    }

    /// Structured artifact; malformed JSON is an error, never a default.
    async fn generate_json<T: DeserializeOwned>(
        &self,
        artifact: Artifact,
        language: Language,
    ) -> Result<T, ApiError> {
        let request = GenerationRequest::prompt(prompts::artifact_prompt(artifact, language))
            .with_schema(artifact.response_schema());
        let raw = self.generate(artifact.name(), language.code(), request).await?;
        serde_json::from_str(&raw).map_err(|e| {
            error!(
                "[{}] could not parse model JSON: {e}. Raw response: {}",
                artifact.name(),
                preview(&raw, 200)
            );
            ApiError::Decode(format!("Could not parse {} response from AI.", artifact.name()))
        })
    }

    /// Speech for already-cleaned text; any failure becomes `None`.
    async fn speak_best_effort(&self, text: &str, language: Language, style: VoiceStyle) -> Option<String> {
        let speech = self.speech.as_ref()?;
        match speech.synthesize(text, voice_code(language, style)).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Speech synthesis failed, returning text only: {e}");
                None
            }
        }
    }

    async fn persist_turn(&self, user_id: &str, turn: ChatTurn) {
        let Some(ref store) = self.store else { return };
        if let Err(e) = store.append_turn(user_id, &turn).await {
            warn!("Failed to save {} turn for user '{user_id}': {e}", turn.speaker.label());
        }
    }

    async fn persist_artifact(&self, user_id: &str, record: ArtifactRecord) {
        let Some(ref store) = self.store else { return };
        if let Err(e) = store.save_artifact(user_id, &record).await {
            warn!("Failed to save {} for user '{user_id}': {e}", record.kind.as_str());
        }
    }

    /// Earlier user messages rendered for the prompt. Never fails.
    async fn past_context(&self, user_id: &str, current_text: &str) -> String {
        let Some(ref store) = self.store else { return String::new() };
        match store.recent_user_turns(user_id, PAST_TURNS_FETCHED).await {
            Ok(turns) => {
                let past: Vec<String> = turns
                    .into_iter()
                    .filter(|turn| turn.text != current_text)
                    .take(PAST_TURNS_SHOWN)
                    .map(|turn| turn.text)
                    .collect();
                prompts::past_submissions_block(&past)
            }
            Err(e) => {
                warn!("Failed to read past submissions for user '{user_id}': {e}");
                prompts::MEMORY_FAILURE_NOTE.to_string()
            }
        }
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ApiError> {
        let text = required_text(req.text.as_deref(), "No text input provided.")?;
        let language = Language::resolve(req.language.as_deref(), Language::English);
        let style = VoiceStyle::resolve(req.voice_style.as_deref());
        let persona = Persona::resolve(req.persona_mode.as_deref());
        let user_id = user_id_or_anonymous(req.user_id.as_deref());

        info!(
            "[chat] user '{user_id}' ({}, {}): \"{}\"",
            language.code(),
            persona.mode_name(),
            preview(&text, LOG_PREVIEW_CHARS)
        );

        self.generator("chat")?;

        self.persist_turn(user_id, ChatTurn::new(Speaker::User, &text, language.code()))
            .await;
        let past = self.past_context(user_id, &text).await;

        let mut contents: Vec<Turn> = req
            .history
            .iter()
            .filter_map(|entry| {
                let text = entry.text.as_deref().filter(|t| !t.trim().is_empty())?;
                Some(match entry.sender.as_deref() {
                    Some("user") => Turn::user(text),
                    _ => Turn::model(text),
                })
            })
            .collect();
        contents.push(Turn::user(prompts::chat_prompt(persona, language, &text, &past)));

        let reply = self
            .generate("chat", &text, GenerationRequest { contents, schema: None })
            .await?;
        let reply = if reply.trim().is_empty() {
            warn!("[chat] empty generation, using fallback");
            markdown::clean(prompts::CHAT_FALLBACK)
        } else {
            markdown::clean(&reply)
        };

        let audio = self.speak_best_effort(&reply, language, style).await;
        if audio.is_none() {
            info!("[chat] returning reply without audio");
        }

        self.persist_turn(user_id, ChatTurn::new(Speaker::Assistant, &reply, language.code()))
            .await;

        Ok(ChatResponse { text: reply, audio })
    }

    pub async fn humor(&self, req: LanguageRequest) -> Result<Vec<HumorItem>, ApiError> {
        let language = Language::resolve(req.language.as_deref(), Artifact::Humor.default_language());
        info!("[humor] language {}", language.code());

        let items: Vec<HumorItem> = self.generate_json(Artifact::Humor, language).await?;
        Ok(items
            .into_iter()
            .map(|item| HumorItem { content: markdown::clean(&item.content), ..item })
            .collect())
    }

    pub async fn meme(&self, req: LanguageRequest) -> Result<MemeResponse, ApiError> {
        let language = Language::resolve(req.language.as_deref(), Artifact::Meme.default_language());
        info!("[meme] language {}", language.code());

        let draft: MemeDraft = self.generate_json(Artifact::Meme, language).await?;
        let caption = markdown::clean(&draft.caption);
        let image_url = meme_placeholder_url(&draft.image_description, &caption);
        Ok(MemeResponse { caption, image_url })
    }

    pub async fn roast(&self, req: LanguageRequest) -> Result<RoastResponse, ApiError> {
        let language = Language::resolve(req.language.as_deref(), Artifact::Roast.default_language());
        info!("[roast] language {}", language.code());

        let roast = self.generate_text(Artifact::Roast, language).await?;
        Ok(RoastResponse { roast })
    }

    pub async fn advice(&self, req: LanguageRequest) -> Result<AdviceResponse, ApiError> {
        let language = Language::resolve(req.language.as_deref(), Artifact::Advice.default_language());
        info!("[advice] language {}", language.code());

        let advice = self.generate_text(Artifact::Advice, language).await?;
        Ok(AdviceResponse { advice })
    }

    pub async fn assign_task(&self, req: LanguageRequest) -> Result<TitledArtifact, ApiError> {
        self.titled_artifact(Artifact::Task, ArtifactKind::Task, req).await
    }

    pub async fn unlock_achievement(&self, req: LanguageRequest) -> Result<TitledArtifact, ApiError> {
        self.titled_artifact(Artifact::Achievement, ArtifactKind::Achievement, req)
            .await
    }

    async fn titled_artifact(
        &self,
        artifact: Artifact,
        kind: ArtifactKind,
        req: LanguageRequest,
    ) -> Result<TitledArtifact, ApiError> {
        let language = Language::resolve(req.language.as_deref(), artifact.default_language());
        let user_id = user_id_or_anonymous(req.user_id.as_deref());
        info!("[{}] user '{user_id}', language {}", artifact.name(), language.code());

        let draft: TitledArtifact = self.generate_json(artifact, language).await?;
        let result = TitledArtifact {
            title: markdown::clean(&draft.title),
            description: markdown::clean(&draft.description),
        };

        self.persist_artifact(user_id, ArtifactRecord::new(kind, &result.title, &result.description))
            .await;
        Ok(result)
    }

    pub async fn speak_text(&self, req: SpeakRequest) -> Result<SpeakResponse, ApiError> {
        let text = required_text(req.text.as_deref(), "No text provided for speech synthesis.")?;
        let language = Language::resolve(req.language.as_deref(), Language::English);
        let style = VoiceStyle::resolve(req.voice_style.as_deref());

        let speech = self.speech.as_ref().ok_or_else(|| {
            error!("[speak_text] speech client not configured");
            ApiError::DependencyUnavailable(SPEECH_MISSING)
        })?;

        let cleaned = markdown::clean(&text);
        if cleaned.is_empty() {
            return Err(ApiError::ClientInput("No text provided for speech synthesis.".to_string()));
        }

        let code = voice_code(language, style);
        info!("[speak_text] {code}: \"{}\"", preview(&cleaned, LOG_PREVIEW_CHARS));

        match speech.synthesize(&cleaned, code).await {
            Ok(Some(audio)) => Ok(SpeakResponse { audio }),
            Ok(None) => {
                error!("[speak_text] speech service returned no audio");
                Err(ApiError::Upstream("Speech service did not return audio content.".to_string()))
            }
            Err(e) => {
                error!("[speak_text] speech synthesis failed: {e}");
                Err(ApiError::Upstream(format!("Speech synthesis failed: {e}")))
            }
        }
    }

    pub async fn search_image(&self, req: ImageSearchRequest) -> Result<ImageResponse, ApiError> {
        let query = required_text(req.query.as_deref(), "No query provided.")?;
        info!("[search_image] \"{}\"", preview(&query, LOG_PREVIEW_CHARS));
        let image_url = self.images.find(&query).await;
        Ok(ImageResponse { image_url })
    }
}
