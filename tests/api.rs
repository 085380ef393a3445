//! Router-level tests with mocked upstream services.
//!
//! Run with: cargo test --test api

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use brocode::upstream::{
    ArtifactKind, ArtifactRecord, ChatTurn, GeminiClient, GenerationError, GenerationRequest,
    HistoryStore, ImageSearch, ImageSearchKeys, SarvamClient, SpeechError, SpeechSynthesizer,
    SqliteStore, StoreError, TextGenerator,
};
use brocode::{create_router, AppState, Orchestrator};

/// Replays one canned reply and records every request.
struct MockGenerator {
    reply: Result<String, String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self { reply: Ok(reply.to_string()), calls: AtomicUsize::new(0), requests: Mutex::new(Vec::new()) })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self { reply: Err(message.to_string()), calls: AtomicUsize::new(0), requests: Mutex::new(Vec::new()) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> GenerationRequest {
        self.requests.lock().unwrap().last().cloned().expect("no generation request recorded")
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.reply
            .clone()
            .map_err(|message| GenerationError::Api { status: Some(503), message })
    }
}

enum SpeechOutcome {
    Audio(&'static str),
    NoAudio,
    Fail,
}

struct MockSpeech {
    outcome: SpeechOutcome,
    calls: AtomicUsize,
    codes: Mutex<Vec<String>>,
    texts: Mutex<Vec<String>>,
}

impl MockSpeech {
    fn new(outcome: SpeechOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
            codes: Mutex::new(Vec::new()),
            texts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeech {
    async fn synthesize(&self, text: &str, target_language_code: &str) -> Result<Option<String>, SpeechError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.codes.lock().unwrap().push(target_language_code.to_string());
        self.texts.lock().unwrap().push(text.to_string());
        match self.outcome {
            SpeechOutcome::Audio(audio) => Ok(Some(audio.to_string())),
            SpeechOutcome::NoAudio => Ok(None),
            SpeechOutcome::Fail => Err(SpeechError::Api { status: 500, message: "boom".to_string() }),
        }
    }
}

/// A store whose every call fails.
struct BrokenStore;

#[async_trait]
impl HistoryStore for BrokenStore {
    async fn append_turn(&self, _user_id: &str, _turn: &ChatTurn) -> Result<(), StoreError> {
        Err(StoreError::Database("disk on fire".to_string()))
    }

    async fn recent_user_turns(&self, _user_id: &str, _limit: usize) -> Result<Vec<ChatTurn>, StoreError> {
        Err(StoreError::Database("disk on fire".to_string()))
    }

    async fn save_artifact(&self, _user_id: &str, _record: &ArtifactRecord) -> Result<(), StoreError> {
        Err(StoreError::Database("disk on fire".to_string()))
    }
}

fn orchestrator() -> Orchestrator {
    let images = ImageSearch::new(ImageSearchKeys::default(), Duration::from_secs(1)).unwrap();
    Orchestrator::new(images)
}

fn router(orchestrator: Orchestrator) -> Router {
    create_router(AppState::new(orchestrator), &["http://localhost:3000".to_string()])
}

async fn post(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = router(orchestrator());
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_chat_returns_cleaned_text_and_audio() {
    let generator = MockGenerator::replying("**Bro**, seriously?\n\n- touch grass");
    let speech = MockSpeech::new(SpeechOutcome::Audio("UklGRg=="));
    let app = router(orchestrator().with_generator(generator.clone()).with_speech(speech.clone()));

    let (status, body) = post(
        &app,
        "/chat",
        json!({ "text": "should I learn rust", "language": "hi", "voice_style": "sarcastic" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Bro, seriously?\ntouch grass");
    assert_eq!(body["audio"], "UklGRg==");
    assert_eq!(generator.calls(), 1);
    assert_eq!(speech.calls(), 1);
    assert_eq!(speech.codes.lock().unwrap()[0], "hi-IN");
    assert_eq!(speech.texts.lock().unwrap()[0], "Bro, seriously?\ntouch grass");

    let request = generator.last_request();
    let prompt = &request.contents.last().unwrap().text;
    assert!(prompt.contains("should I learn rust"));
    assert!(request.schema.is_none());
}

#[tokio::test]
async fn test_chat_forwards_history_in_order() {
    let generator = MockGenerator::replying("fine");
    let app = router(orchestrator().with_generator(generator.clone()));

    let (status, _) = post(
        &app,
        "/chat",
        json!({
            "text": "and now?",
            "history": [
                { "sender": "user", "text": "hello" },
                { "sender": "brocodeAI", "text": "what" },
                { "sender": "user", "text": "   " }
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let contents = generator.last_request().contents;
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[0].text, "hello");
    assert_eq!(contents[0].role.as_str(), "user");
    assert_eq!(contents[1].text, "what");
    assert_eq!(contents[1].role.as_str(), "model");
    assert_eq!(contents[2].role.as_str(), "user");
}

#[tokio::test]
async fn test_chat_without_text_makes_no_upstream_calls() {
    let generator = MockGenerator::replying("never");
    let speech = MockSpeech::new(SpeechOutcome::Audio("never"));
    let app = router(orchestrator().with_generator(generator.clone()).with_speech(speech.clone()));

    for body in [json!({}), json!({ "text": "" }), json!({ "text": "   " })] {
        let (status, response) = post(&app, "/chat", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "No text input provided.");
    }
    assert_eq!(generator.calls(), 0);
    assert_eq!(speech.calls(), 0);
}

#[tokio::test]
async fn test_chat_speech_failure_returns_null_audio() {
    let generator = MockGenerator::replying("obviously");
    for outcome in [SpeechOutcome::Fail, SpeechOutcome::NoAudio] {
        let speech = MockSpeech::new(outcome);
        let app = router(orchestrator().with_generator(generator.clone()).with_speech(speech));
        let (status, body) = post(&app, "/chat", json!({ "text": "hi" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "text": "obviously", "audio": null }));
    }
}

#[tokio::test]
async fn test_chat_without_speech_client_returns_null_audio() {
    let app = router(orchestrator().with_generator(MockGenerator::replying("ok")));
    let (status, body) = post(&app, "/chat", json!({ "text": "hi" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["audio"].is_null());
}

#[tokio::test]
async fn test_chat_empty_generation_uses_fallback() {
    let app = router(orchestrator().with_generator(MockGenerator::replying("  ")));
    let (status, body) = post(&app, "/chat", json!({ "text": "hi" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["text"].as_str().unwrap().starts_with("Even AI needs a moment"));
}

#[tokio::test]
async fn test_chat_generation_failure_is_500() {
    let app = router(orchestrator().with_generator(MockGenerator::failing("overloaded")));
    let (status, body) = post(&app, "/chat", json!({ "text": "hi" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("overloaded"));
}

#[tokio::test]
async fn test_missing_generator_is_500() {
    let app = router(orchestrator());
    for path in ["/chat", "/get_humor", "/roast_me", "/assign_task"] {
        let (status, body) = post(&app, path, json!({ "text": "hi" })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{path}");
        assert_eq!(body["error"], "Gemini model not initialized. Cannot process request.");
    }
}

#[tokio::test]
async fn test_store_failure_does_not_change_response() {
    let generator = MockGenerator::replying("still here");
    let app = router(orchestrator().with_generator(generator.clone()).with_store(Arc::new(BrokenStore)));

    let (status, body) = post(&app, "/chat", json!({ "text": "remember me", "user_id": "u1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "text": "still here", "audio": null }));
    assert_eq!(generator.calls(), 1);

    let prompt = generator.last_request().contents.last().unwrap().text.clone();
    assert!(prompt.contains("Internal memory unavailable"));

    let app = router(
        orchestrator()
            .with_generator(MockGenerator::replying(r#"{"title":"Hydrate","description":"Drink water."}"#))
            .with_store(Arc::new(BrokenStore)),
    );
    let (status, body) = post(&app, "/assign_task", json!({ "user_id": "u1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Hydrate");
}

#[tokio::test]
async fn test_chat_recalls_past_submissions() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let generator = MockGenerator::replying("noted");
    let app = router(
        orchestrator()
            .with_generator(generator.clone())
            .with_store(store.clone() as Arc<dyn HistoryStore>),
    );

    post(&app, "/chat", json!({ "text": "I love pineapple pizza", "user_id": "u7" })).await;
    let (status, _) = post(&app, "/chat", json!({ "text": "what do I like?", "user_id": "u7" })).await;
    assert_eq!(status, StatusCode::OK);

    let prompt = generator.last_request().contents.last().unwrap().text.clone();
    assert!(prompt.contains("Past 1: 'I love pineapple pizza'"));
    assert!(!prompt.contains("Past 2"));

    let turns = store.recent_user_turns("u7", 10).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].text, "what do I like?");
}

#[tokio::test]
async fn test_humor_returns_cleaned_items() {
    let generator = MockGenerator::replying(
        r#"[{"type":"joke","content":"**Why** did the dev quit?"},{"type":"meme","content":"When the build passes"}]"#,
    );
    let app = router(orchestrator().with_generator(generator.clone()));

    let (status, body) = post(&app, "/get_humor", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "type": "joke", "content": "Why did the dev quit?" },
            { "type": "meme", "content": "When the build passes" }
        ])
    );
    assert!(generator.last_request().schema.is_some());
}

#[tokio::test]
async fn test_humor_malformed_json_is_500() {
    let app = router(orchestrator().with_generator(MockGenerator::replying("here are some jokes: ha")));
    let (status, body) = post(&app, "/get_humor", json!({ "language": "en" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Could not parse humor response from AI.");

    let app = router(orchestrator().with_generator(MockGenerator::replying(
        r#"[{"type":"pun","content":"x"}]"#,
    )));
    let (status, _) = post(&app, "/get_humor", json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_meme_builds_placeholder_url() {
    let app = router(orchestrator().with_generator(MockGenerator::replying(
        r#"{"caption":"*Monday* again","image_description":"tired cat"}"#,
    )));
    let (status, body) = post(&app, "/generate_brocode_meme", json!({ "language": "hinglish" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["caption"], "Monday again");
    assert_eq!(body["image_url"], "https://placehold.co/500x400/1A202C/A0AEC0?text=tired+cat");
}

#[tokio::test]
async fn test_roast_and_advice_fallbacks() {
    let app = router(orchestrator().with_generator(MockGenerator::replying("")));

    let (status, body) = post(&app, "/roast_me", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["roast"].as_str().unwrap().contains("coherent roast"));

    let (status, body) = post(&app, "/unsolicited_advice", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["advice"].as_str().unwrap().contains("offer advice"));
}

#[tokio::test]
async fn test_roast_is_cleaned() {
    let app = router(orchestrator().with_generator(MockGenerator::replying("# Verdict\n_You_ code like a toaster.")));
    let (status, body) = post(&app, "/roast_me", json!({ "language": "english" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "roast": "Verdict\nYou code like a toaster." }));
}

#[tokio::test]
async fn test_task_and_achievement_are_persisted() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let generator = MockGenerator::replying(r#"{"title":"**Touch Grass**","description":"Go outside for 10 minutes."}"#);
    let app = router(
        orchestrator()
            .with_generator(generator)
            .with_store(store.clone() as Arc<dyn HistoryStore>),
    );

    let (status, body) = post(&app, "/assign_task", json!({ "user_id": "u9" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "title": "Touch Grass", "description": "Go outside for 10 minutes." }));

    let (status, _) = post(&app, "/unlock_achievement", json!({ "user_id": "u9" })).await;
    assert_eq!(status, StatusCode::OK);

    let tasks = store.artifacts("u9", ArtifactKind::Task).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Touch Grass");
    assert_eq!(store.artifacts("u9", ArtifactKind::Achievement).unwrap().len(), 1);
    assert!(store.artifacts("anonymous-user", ArtifactKind::Task).unwrap().is_empty());
}

#[tokio::test]
async fn test_task_missing_field_is_decode_error() {
    let app = router(orchestrator().with_generator(MockGenerator::replying(r#"{"title":"only a title"}"#)));
    let (status, body) = post(&app, "/assign_task", json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Could not parse task response from AI.");
}

#[tokio::test]
async fn test_speak_text() {
    let speech = MockSpeech::new(SpeechOutcome::Audio("AUDIO"));
    let app = router(orchestrator().with_speech(speech.clone()));

    let (status, body) = post(
        &app,
        "/speak_text",
        json!({ "text": "**hello** there", "language": "ta", "voice_style": "hot_female" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "audio": "AUDIO" }));
    assert_eq!(speech.texts.lock().unwrap()[0], "hello there");
    assert_eq!(speech.codes.lock().unwrap()[0], "ta-IN");
}

#[tokio::test]
async fn test_speak_text_errors() {
    let speech = MockSpeech::new(SpeechOutcome::Audio("AUDIO"));
    let app = router(orchestrator().with_speech(speech.clone()));
    let (status, body) = post(&app, "/speak_text", json!({ "text": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No text provided for speech synthesis.");
    assert_eq!(speech.calls(), 0);

    let app = router(orchestrator());
    let (status, body) = post(&app, "/speak_text", json!({ "text": "hi" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Speech synthesis is not configured.");

    for outcome in [SpeechOutcome::NoAudio, SpeechOutcome::Fail] {
        let app = router(orchestrator().with_speech(MockSpeech::new(outcome)));
        let (status, body) = post(&app, "/speak_text", json!({ "text": "hi" })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_search_image() {
    let app = router(orchestrator());

    let (status, body) = post(&app, "/search_image", json!({ "query": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No query provided.");

    let (status, body) = post(&app, "/search_image", json!({ "query": "chai" })).await;
    assert_eq!(status, StatusCode::OK);
    let url = body["image_url"].as_str().unwrap();
    assert!(url.starts_with("https://source.unsplash.com/600x400/?chai"));
}

#[tokio::test]
async fn test_invalid_json_body_is_400() {
    let generator = MockGenerator::replying("never");
    let app = router(orchestrator().with_generator(generator.clone()));

    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = post(&app, "/chat", json!({ "text": 42 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = router(orchestrator());
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/chat")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(response.headers().get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "86400");
}

const GEMINI_KEY: &str = "SECRET-KEY-123";

/// A server that accepts connections and never answers.
async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

fn gemini_at(base_url: &str) -> Arc<GeminiClient> {
    Arc::new(
        GeminiClient::new(
            GEMINI_KEY.to_string(),
            "gemini-1.5-flash".to_string(),
            base_url.to_string(),
            Duration::from_secs(1),
        )
        .unwrap(),
    )
}

#[tokio::test]
async fn test_generation_error_does_not_leak_api_key() {
    let unreachable = router(orchestrator().with_generator(gemini_at("http://127.0.0.1:1")));
    let silent = router(orchestrator().with_generator(gemini_at(&silent_server().await)));

    for app in [unreachable, silent] {
        let (status, body) = post(&app, "/chat", json!({ "text": "hi" })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = body["error"].as_str().unwrap();
        assert!(error.starts_with("A generation service error occurred"));
        assert!(!error.contains(GEMINI_KEY), "key leaked: {error}");
    }
}

#[tokio::test]
async fn test_generation_timeout_is_bounded() {
    let client = gemini_at(&silent_server().await);
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        client.generate(GenerationRequest::prompt("hi")),
    )
    .await
    .expect("generation should give up on its own timeout");
    assert!(matches!(result, Err(GenerationError::Http(_))));

    let app = router(orchestrator().with_generator(client));
    let (status, body) = tokio::time::timeout(
        Duration::from_secs(5),
        post(&app, "/roast_me", json!({})),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_speech_timeout_returns_text_without_audio() {
    let speech = SarvamClient::new(silent_server().await, "s-key".to_string(), Duration::from_secs(1)).unwrap();
    let app = router(
        orchestrator()
            .with_generator(MockGenerator::replying("still talking"))
            .with_speech(Arc::new(speech)),
    );

    let (status, body) = tokio::time::timeout(
        Duration::from_secs(5),
        post(&app, "/chat", json!({ "text": "hi" })),
    )
    .await
    .expect("speech should give up on its own timeout");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "text": "still talking", "audio": null }));
}
