//! Clients for the hosted services the relay forwards to.

pub mod database;
pub mod firestore;
pub mod gemini;
pub mod images;
pub mod store;
pub mod tts;

pub use database::SqliteStore;
pub use firestore::{FirestoreConfig, FirestoreStore};
pub use gemini::{GeminiClient, GenerationError, GenerationRequest, TextGenerator, Turn};
pub use images::{ImageError, ImageSearch, ImageSearchKeys};
pub use store::{ArtifactKind, ArtifactRecord, ChatTurn, HistoryStore, Speaker, StoreError};
pub use tts::{SarvamClient, SpeechError, SpeechSynthesizer};
