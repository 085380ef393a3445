//! Errors returned to HTTP callers.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Every failure a route can report. Rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or empty required field. No upstream call was made.
    ClientInput(String),
    /// A required upstream client was never configured.
    DependencyUnavailable(&'static str),
    /// The generation or speech API failed.
    Upstream(String),
    /// Structured JSON from the generation API did not parse.
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ClientInput(_) => StatusCode::BAD_REQUEST,
            Self::DependencyUnavailable(_) | Self::Upstream(_) | Self::Decode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientInput(msg) => write!(f, "{msg}"),
            Self::DependencyUnavailable(msg) => write!(f, "{msg}"),
            Self::Upstream(msg) => write!(f, "{msg}"),
            Self::Decode(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::ClientInput("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::DependencyUnavailable("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::Upstream("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::Decode("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_display_is_the_message() {
        let err = ApiError::ClientInput("No text input provided.".into());
        assert_eq!(err.to_string(), "No text input provided.");
    }
}
