//! Route handlers. Each one unwraps the JSON body and hands it to the
//! orchestrator.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use crate::api::types::{
    AdviceResponse, ChatRequest, ChatResponse, HumorItem, ImageResponse, ImageSearchRequest,
    LanguageRequest, MemeResponse, RoastResponse, SpeakRequest, SpeakResponse, TitledArtifact,
};
use crate::api::AppState;
use crate::error::ApiError;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Turn a body rejection into the usual `{error}` 400.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        let message = match rejection {
            JsonRejection::JsonDataError(e) => format!("Invalid JSON data: {e}"),
            JsonRejection::JsonSyntaxError(e) => format!("JSON syntax error: {e}"),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing Content-Type: application/json header".to_string()
            }
            other => format!("Failed to parse JSON: {other}"),
        };
        warn!("Rejected request body: {message}");
        ApiError::ClientInput(message)
    })
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatResponse> {
    Ok(Json(state.orchestrator.chat(body(payload)?).await?))
}

pub async fn get_humor(
    State(state): State<AppState>,
    payload: Result<Json<LanguageRequest>, JsonRejection>,
) -> ApiResult<Vec<HumorItem>> {
    Ok(Json(state.orchestrator.humor(body(payload)?).await?))
}

pub async fn generate_brocode_meme(
    State(state): State<AppState>,
    payload: Result<Json<LanguageRequest>, JsonRejection>,
) -> ApiResult<MemeResponse> {
    Ok(Json(state.orchestrator.meme(body(payload)?).await?))
}

pub async fn roast_me(
    State(state): State<AppState>,
    payload: Result<Json<LanguageRequest>, JsonRejection>,
) -> ApiResult<RoastResponse> {
    Ok(Json(state.orchestrator.roast(body(payload)?).await?))
}

pub async fn unsolicited_advice(
    State(state): State<AppState>,
    payload: Result<Json<LanguageRequest>, JsonRejection>,
) -> ApiResult<AdviceResponse> {
    Ok(Json(state.orchestrator.advice(body(payload)?).await?))
}

pub async fn assign_task(
    State(state): State<AppState>,
    payload: Result<Json<LanguageRequest>, JsonRejection>,
) -> ApiResult<TitledArtifact> {
    Ok(Json(state.orchestrator.assign_task(body(payload)?).await?))
}

pub async fn unlock_achievement(
    State(state): State<AppState>,
    payload: Result<Json<LanguageRequest>, JsonRejection>,
) -> ApiResult<TitledArtifact> {
    Ok(Json(state.orchestrator.unlock_achievement(body(payload)?).await?))
}

pub async fn speak_text(
    State(state): State<AppState>,
    payload: Result<Json<SpeakRequest>, JsonRejection>,
) -> ApiResult<SpeakResponse> {
    Ok(Json(state.orchestrator.speak_text(body(payload)?).await?))
}

pub async fn search_image(
    State(state): State<AppState>,
    payload: Result<Json<ImageSearchRequest>, JsonRejection>,
) -> ApiResult<ImageResponse> {
    Ok(Json(state.orchestrator.search_image(body(payload)?).await?))
}
