//! HTTP endpoints.
//!
//! Both callable endpoints take a JSON body and answer with either the success
//! payload or `{"success": false, "code", "message"}`.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Instrument;
use ulid::Ulid;

use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::types::{GenerateTriviaPayload, GenerateTriviaResponse, RoomAccess, ValidateRoomPayload};

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/generateTrivia", post(generate_trivia))
        .route("/validateMultiplayerRoom", post(validate_multiplayer_room))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Unreadable bodies are reported like any other bad input. Callers check
/// authentication first.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|e| ApiError::invalid_argument(format!("Invalid request body: {}", e.body_text())))
}

/// Generate a trivia set for a premium user.
///
/// POST /generateTrivia
pub async fn generate_trivia(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    payload: Result<Json<GenerateTriviaPayload>, JsonRejection>,
) -> ApiResult<Json<GenerateTriviaResponse>> {
    let span = tracing::info_span!(
        "generate_trivia",
        request_id = %Ulid::new(),
        user_id = caller.user_id().unwrap_or("-"),
    );

    async move {
        let user_id = caller.user_id().ok_or(ApiError::Unauthenticated)?;
        let payload = body(payload)?;
        state
            .generate_trivia(Some(user_id), &payload)
            .await
            .map(Json)
    }
    .instrument(span)
    .await
}

/// Check whether the caller may perform an operation on a room.
///
/// POST /validateMultiplayerRoom
pub async fn validate_multiplayer_room(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    payload: Result<Json<ValidateRoomPayload>, JsonRejection>,
) -> ApiResult<Json<RoomAccess>> {
    let span = tracing::info_span!(
        "validate_multiplayer_room",
        request_id = %Ulid::new(),
        user_id = caller.user_id().unwrap_or("-"),
    );

    async move {
        let user_id = caller.user_id().ok_or(ApiError::Unauthenticated)?;
        let payload = body(payload)?;
        state
            .validate_room(Some(user_id), &payload)
            .await
            .map(Json)
    }
    .instrument(span)
    .await
}

/// Liveness check.
///
/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "providers": state.provider_names(),
    }))
}
