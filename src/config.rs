use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::upstream::{firestore, gemini, tts, FirestoreConfig, ImageSearchKeys};

const DEFAULT_APP_ID: &str = "default-app-id";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5002;
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:3001"];

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

/// Raw settings, shared by the JSON file and the environment.
#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    gemini_api_key: String,
    gemini_model: Option<String>,
    gemini_base_url: Option<String>,
    /// Speech is disabled without a key.
    sarvam_api_key: Option<String>,
    sarvam_tts_endpoint: Option<String>,
    /// Firestore history is disabled without a project.
    firestore_project_id: Option<String>,
    firestore_api_key: Option<String>,
    firestore_access_token: Option<String>,
    firestore_base_url: Option<String>,
    /// SQLite file used when Firestore isn't configured.
    history_db_path: Option<String>,
    app_id: Option<String>,
    pexels_api_key: Option<String>,
    bing_image_search_key: Option<String>,
    cors_origins: Option<Vec<String>>,
    host: Option<String>,
    port: Option<u16>,
    http_timeout_secs: Option<u64>,
    /// Directory for state files (logs). Defaults to current directory.
    data_dir: Option<String>,
}

pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub sarvam_api_key: Option<String>,
    pub sarvam_tts_endpoint: String,
    pub firestore_project_id: Option<String>,
    pub firestore_api_key: Option<String>,
    pub firestore_access_token: Option<String>,
    pub firestore_base_url: String,
    pub history_db_path: Option<PathBuf>,
    pub app_id: String,
    pub pexels_api_key: Option<String>,
    pub bing_image_search_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub host: String,
    pub port: u16,
    /// Applied to every outbound HTTP call.
    pub http_timeout: Duration,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
}

/// Blank values count as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Validation(format!("{key} must be a number, got '{raw}'"))),
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;
        Self::from_file(file)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cors_origins = non_empty(lookup("CORS_ORIGINS")).map(|raw| {
            raw.split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect()
        });

        let file = ConfigFile {
            gemini_api_key: lookup("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: lookup("GEMINI_MODEL"),
            gemini_base_url: lookup("GEMINI_BASE_URL"),
            sarvam_api_key: lookup("SARVAM_AI_API_KEY"),
            sarvam_tts_endpoint: lookup("SARVAM_AI_TTS_ENDPOINT"),
            firestore_project_id: lookup("FIRESTORE_PROJECT_ID"),
            firestore_api_key: lookup("FIRESTORE_API_KEY"),
            firestore_access_token: lookup("FIRESTORE_ACCESS_TOKEN"),
            firestore_base_url: lookup("FIRESTORE_BASE_URL"),
            history_db_path: lookup("HISTORY_DB_PATH"),
            app_id: lookup("APP_ID"),
            pexels_api_key: lookup("PEXELS_API_KEY"),
            bing_image_search_key: lookup("BING_IMAGE_SEARCH_KEY"),
            cors_origins,
            host: lookup("BROCODE_HOST"),
            port: parse_number("BROCODE_PORT", lookup("BROCODE_PORT"))?,
            http_timeout_secs: parse_number("HTTP_TIMEOUT_SECS", lookup("HTTP_TIMEOUT_SECS"))?,
            data_dir: lookup("BROCODE_DATA_DIR"),
        };
        Self::from_file(file)
    }

    fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let gemini_api_key = file.gemini_api_key.trim().to_string();
        if gemini_api_key.is_empty() {
            return Err(ConfigError::Validation(
                "GEMINI_API_KEY is required; the relay cannot generate anything without it".into(),
            ));
        }

        let timeout_secs = file.http_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Validation("http_timeout_secs must be greater than zero".into()));
        }

        let cors_origins = match file.cors_origins {
            Some(origins) if !origins.is_empty() => origins,
            _ => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Ok(Self {
            gemini_api_key,
            gemini_model: non_empty(file.gemini_model).unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string()),
            gemini_base_url: non_empty(file.gemini_base_url)
                .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_string()),
            sarvam_api_key: non_empty(file.sarvam_api_key),
            sarvam_tts_endpoint: non_empty(file.sarvam_tts_endpoint)
                .unwrap_or_else(|| tts::DEFAULT_ENDPOINT.to_string()),
            firestore_project_id: non_empty(file.firestore_project_id),
            firestore_api_key: non_empty(file.firestore_api_key),
            firestore_access_token: non_empty(file.firestore_access_token),
            firestore_base_url: non_empty(file.firestore_base_url)
                .unwrap_or_else(|| firestore::DEFAULT_BASE_URL.to_string()),
            history_db_path: non_empty(file.history_db_path).map(PathBuf::from),
            app_id: non_empty(file.app_id).unwrap_or_else(|| DEFAULT_APP_ID.to_string()),
            pexels_api_key: non_empty(file.pexels_api_key),
            bing_image_search_key: non_empty(file.bing_image_search_key),
            cors_origins,
            host: non_empty(file.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: file.port.unwrap_or(DEFAULT_PORT),
            http_timeout: Duration::from_secs(timeout_secs),
            data_dir: non_empty(file.data_dir)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }

    /// Firestore settings, when a project is configured.
    pub fn firestore(&self) -> Option<FirestoreConfig> {
        let project_id = self.firestore_project_id.clone()?;
        Some(FirestoreConfig {
            base_url: self.firestore_base_url.clone(),
            project_id,
            app_id: self.app_id.clone(),
            api_key: self.firestore_api_key.clone(),
            access_token: self.firestore_access_token.clone(),
            timeout: self.http_timeout,
        })
    }

    pub fn image_keys(&self) -> ImageSearchKeys {
        ImageSearchKeys {
            pexels: self.pexels_api_key.clone(),
            bing: self.bing_image_search_key.clone(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
