//! Image lookup for memes.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::markdown::preview;

const PEXELS_SEARCH_URL: &str = "https://api.pexels.com/v1/search";
const BING_SEARCH_URL: &str = "https://api.bing.microsoft.com/v7.0/images/search";

/// Keys for the optional search providers.
#[derive(Debug, Clone, Default)]
pub struct ImageSearchKeys {
    pub pexels: Option<String>,
    pub bing: Option<String>,
}

#[derive(Debug)]
pub enum ImageError {
    /// Transport failure or timeout.
    Http(String),
    /// Non-2xx status from the search API.
    Api { status: u16, message: String },
    /// Body did not match the provider's schema.
    Parse(String),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "image search request failed: {e}"),
            Self::Api { status, message } => write!(f, "image search error {status}: {message}"),
            Self::Parse(e) => write!(f, "image search returned unreadable data: {e}"),
        }
    }
}

impl std::error::Error for ImageError {}

/// Finds a picture for a query: Pexels, then Bing, then a keyword Unsplash URL.
pub struct ImageSearch {
    keys: ImageSearchKeys,
    pexels_url: String,
    bing_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct PexelsResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Deserialize)]
struct PexelsPhoto {
    src: PexelsSrc,
}

#[derive(Deserialize)]
struct PexelsSrc {
    large: String,
}

#[derive(Deserialize)]
struct BingResponse {
    #[serde(default)]
    value: Vec<BingImage>,
}

#[derive(Deserialize)]
struct BingImage {
    #[serde(rename = "contentUrl")]
    content_url: String,
}

impl ImageSearch {
    pub fn new(keys: ImageSearchKeys, timeout: Duration) -> Result<Self, ImageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImageError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            keys,
            pexels_url: PEXELS_SEARCH_URL.to_string(),
            bing_url: BING_SEARCH_URL.to_string(),
            client,
        })
    }

    /// Point the providers somewhere else, e.g. a local stand-in.
    pub fn with_endpoints(mut self, pexels_url: impl Into<String>, bing_url: impl Into<String>) -> Self {
        self.pexels_url = pexels_url.into();
        self.bing_url = bing_url.into();
        self
    }

    /// Always yields a URL; provider failures fall through to the next one.
    pub async fn find(&self, query: &str) -> String {
        if let Some(ref key) = self.keys.pexels {
            match self.search_pexels(key, query).await {
                Ok(Some(url)) => return url,
                Ok(None) => debug!("Pexels had no results for '{query}'"),
                Err(e) => warn!("Pexels image search failed: {e}"),
            }
        }

        if let Some(ref key) = self.keys.bing {
            match self.search_bing(key, query).await {
                Ok(Some(url)) => return url,
                Ok(None) => debug!("Bing had no results for '{query}'"),
                Err(e) => warn!("Bing image search failed: {e}"),
            }
        }

        unsplash_url(query)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, ImageError> {
        let response = request
            .send()
            .await
            .map_err(|e| ImageError::Http(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageError::Api { status: status.as_u16(), message: preview(&body, 200) });
        }

        response
            .json()
            .await
            .map_err(|e| ImageError::Parse(e.without_url().to_string()))
    }

    async fn search_pexels(&self, key: &str, query: &str) -> Result<Option<String>, ImageError> {
        let request = self
            .client
            .get(&self.pexels_url)
            .header("Authorization", key)
            .query(&[("query", query), ("per_page", "1"), ("orientation", "landscape")]);
        let body: PexelsResponse = self.get_json(request).await?;
        Ok(body.photos.into_iter().next().map(|photo| photo.src.large))
    }

    async fn search_bing(&self, key: &str, query: &str) -> Result<Option<String>, ImageError> {
        let request = self
            .client
            .get(&self.bing_url)
            .header("Ocp-Apim-Subscription-Key", key)
            .query(&[("q", query), ("count", "1"), ("safeSearch", "Strict")]);
        let body: BingResponse = self.get_json(request).await?;
        Ok(body.value.into_iter().next().map(|image| image.content_url))
    }
}

/// Keyword-based Unsplash URL; needs no key.
pub fn unsplash_url(query: &str) -> String {
    let keywords = format!("{query}, meme, bollywood, funny");
    format!("https://source.unsplash.com/600x400/?{}", urlencoding::encode(&keywords))
}

/// Placeholder picture for a generated meme, labelled with its description.
pub fn meme_placeholder_url(image_description: &str, caption: &str) -> String {
    let source = if image_description.trim().is_empty() { caption } else { image_description };
    let label: String = source.trim().chars().take(30).collect();
    let label = if label.trim().is_empty() { "Brocode Meme".to_string() } else { label };
    format!(
        "https://placehold.co/500x400/1A202C/A0AEC0?text={}",
        urlencoding::encode(&label).replace("%20", "+")
    )
}
