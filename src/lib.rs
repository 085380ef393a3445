//! brocodeAI relay: persona chat, humor and speech over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod language;
pub mod markdown;
pub mod orchestrator;
pub mod prompts;
pub mod upstream;

pub use api::{create_router, AppState};
pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use orchestrator::Orchestrator;
