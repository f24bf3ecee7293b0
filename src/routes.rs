use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::pronunciation::{PlayError, PlayedClip};
use crate::state::AppState;
use crate::tts::SpeechError;

#[derive(Debug, Deserialize)]
pub struct SpeakPayload {
    pub text: String,
    #[serde(default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct SpeakReply {
    success: bool,
    message: &'static str,
    client_id: String,
    #[serde(flatten)]
    played: PlayedClip,
}

pub fn create_routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/speak", post(speak))
        .route("/api/audio/:id", get(get_audio).delete(release_audio));

    // The collector front end, when this process also serves it
    match state.config.system_config.static_path() {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "speech_configured": state.pronunciation.is_some(),
        "clips_held": state.clips.len(),
    }))
}

fn play_error_status(err: &PlayError) -> StatusCode {
    match err {
        PlayError::Speech(SpeechError::EmptyText) => StatusCode::BAD_REQUEST,
        PlayError::Superseded => StatusCode::CONFLICT,
        PlayError::Speech(_) | PlayError::Audio(_) => StatusCode::BAD_GATEWAY,
        PlayError::TaskFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(status: StatusCode, message: impl Into<String>, error: impl Into<String>) -> Response {
    let body = Json(json!({
        "success": false,
        "message": message.into(),
        "error": error.into(),
    }));
    (status, body).into_response()
}

async fn speak(
    State(state): State<AppState>,
    payload: Result<Json<SpeakPayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            return failure(
                StatusCode::BAD_REQUEST,
                "Invalid playback request",
                rejection.body_text(),
            )
        }
    };

    let Some(service) = state.pronunciation.clone() else {
        return failure(
            StatusCode::SERVICE_UNAVAILABLE,
            "Pronunciation playback is not configured",
            "no speech API key",
        );
    };

    let client_id = payload
        .client_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| state.generate_client_uid());

    match service.play_logged(&client_id, &payload.text).await {
        Ok(played) => Json(SpeakReply {
            success: true,
            message: "ok",
            client_id,
            played,
        })
        .into_response(),
        Err(err) => failure(play_error_status(&err), err.user_message(), err.to_string()),
    }
}

async fn get_audio(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.clips.get(&id) {
        Some(wav) => (
            [
                (header::CONTENT_TYPE, "audio/wav"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            wav,
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Audio clip not found or already released"})),
        )
            .into_response(),
    }
}

async fn release_audio(State(state): State<AppState>, Path(id): Path<Uuid>) -> Json<Value> {
    Json(json!({ "released": state.clips.release(&id) }))
}
