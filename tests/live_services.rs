//! Integration tests against the real hosted services.
//!
//! These tests require:
//! 1. GEMINI_API_KEY for generation
//! 2. SARVAM_AI_API_KEY for speech (skipped when unset)
//!
//! Run with: cargo test --features integ_test --test live_services

#[cfg(feature = "integ_test")]
mod tests {
    use std::time::Duration;

    use brocode::upstream::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
    use brocode::upstream::tts::DEFAULT_ENDPOINT;
    use brocode::upstream::{GeminiClient, GenerationRequest, SarvamClient, SpeechSynthesizer, TextGenerator};

    fn env_key(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }

    /// A plain prompt yields some text.
    #[tokio::test]
    async fn test_gemini_generates_text() {
        let Some(key) = env_key("GEMINI_API_KEY") else {
            eprintln!("Skipping test: GEMINI_API_KEY not set");
            return;
        };

        let client = GeminiClient::new(
            key,
            DEFAULT_MODEL.to_string(),
            DEFAULT_BASE_URL.to_string(),
            Duration::from_secs(30),
        )
        .expect("client should build");
        let text = client
            .generate(GenerationRequest::prompt("Reply with the single word: pong"))
            .await
            .expect("generation should succeed");
        assert!(!text.trim().is_empty(), "expected some text back");
    }

    /// Speech for a short English line decodes to real audio.
    #[tokio::test]
    async fn test_sarvam_returns_audio() {
        let Some(key) = env_key("SARVAM_AI_API_KEY") else {
            eprintln!("Skipping test: SARVAM_AI_API_KEY not set");
            return;
        };

        let client = SarvamClient::new(DEFAULT_ENDPOINT.to_string(), key, Duration::from_secs(30))
            .expect("client should build");
        let audio = client
            .synthesize("Hello bro, this is a test.", "en-IN")
            .await
            .expect("synthesis should succeed");
        assert!(audio.is_some(), "expected audio content");
    }
}
