use super::*;
use crate::error::{ApiError, ApiResult};
use crate::moderation;
use crate::types::{GenerateTriviaPayload, GenerateTriviaResponse, GenerationRequest};
use serde_json::Value;

const MIN_TOPIC_CHARS: usize = 2;
const MAX_TOPIC_CHARS: usize = 100;
const MIN_COUNT: i64 = 1;
const MAX_COUNT: i64 = 100;

pub const GENERATION_UNAVAILABLE: &str =
    "AI generation temporarily unavailable. Please try again later or use template-based generation.";

/// Integral JSON numbers, including float encodings such as `5.0`
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Check the raw request body field by field. Nothing is read or written
/// before this passes.
pub fn validate_generation_payload(payload: &GenerateTriviaPayload) -> ApiResult<GenerationRequest> {
    let topic = payload
        .topic
        .as_str()
        .filter(|topic| !topic.is_empty())
        .ok_or_else(|| ApiError::invalid_argument("Topic must be a non-empty string"))?
        .trim();

    let topic_chars = topic.chars().count();
    if topic_chars < MIN_TOPIC_CHARS {
        return Err(ApiError::invalid_argument(
            "Topic must be at least 2 characters",
        ));
    }
    if topic_chars > MAX_TOPIC_CHARS {
        return Err(ApiError::invalid_argument(
            "Topic must be 100 characters or less",
        ));
    }

    let count = as_integer(&payload.count)
        .ok_or_else(|| ApiError::invalid_argument("Count must be an integer"))?;
    if !(MIN_COUNT..=MAX_COUNT).contains(&count) {
        return Err(ApiError::invalid_argument(
            "Count must be between 1 and 100",
        ));
    }

    let is_youth_edition = payload
        .is_youth_edition
        .as_bool()
        .ok_or_else(|| ApiError::invalid_argument("isYouthEdition must be a boolean"))?;

    Ok(GenerationRequest {
        topic: topic.to_string(),
        is_youth_edition,
        // Range checked above
        count: count as u32,
    })
}

impl AppState {
    /// Produce trivia for a premium caller: serve from cache when possible,
    /// otherwise try each backend in order. Quota is consumed only when a
    /// result is returned.
    pub async fn generate_trivia(
        &self,
        caller: Option<&str>,
        payload: &GenerateTriviaPayload,
    ) -> ApiResult<GenerateTriviaResponse> {
        let user_id = caller.ok_or(ApiError::Unauthenticated)?;
        self.require_premium(user_id).await?;

        let request = validate_generation_payload(payload)?;
        let topic = request.topic.as_str();
        let count = request.count;
        let is_youth = request.is_youth_edition;

        let reservation = self
            .limiter
            .check_and_reserve(user_id, self.clock.now())
            .await?;
        if !reservation.allowed {
            tracing::warn!(
                user_id,
                count = reservation.current_count,
                "Daily generation limit reached"
            );
            return Err(ApiError::ResourceExhausted(format!(
                "Daily limit of {} AI generations reached. Please try again tomorrow.",
                self.limiter.daily_limit()
            )));
        }

        if let Err(violation) = moderation::check(topic, is_youth) {
            tracing::warn!(user_id, topic, ?violation, "Blocked topic");
            return Err(ApiError::permission_denied(violation.message()));
        }

        tracing::info!(user_id, topic, count, is_youth, "AI generation request");

        if let Some(entry) = self
            .cache
            .get(topic, count, is_youth, self.clock.now())
            .await?
        {
            tracing::info!(topic, provider = %entry.provider, "Cache hit");
            self.limiter.commit(&reservation, self.clock.now()).await?;
            return Ok(GenerateTriviaResponse {
                success: true,
                trivia: entry.items,
                provider: entry.provider,
                cached: Some(true),
            });
        }

        for adapter in self.adapters.iter() {
            match adapter.generate(topic, is_youth, count).await {
                Ok(items) => {
                    let now = self.clock.now();
                    self.cache
                        .put(topic, count, is_youth, &items, adapter.tag(), now)
                        .await?;
                    let used = self.limiter.commit(&reservation, now).await?;

                    tracing::info!(
                        user_id,
                        provider = %adapter.tag(),
                        items = items.len(),
                        used,
                        "Trivia generated"
                    );
                    return Ok(GenerateTriviaResponse {
                        success: true,
                        trivia: items,
                        provider: adapter.tag(),
                        cached: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(provider = %adapter.tag(), error = %e, "Generation attempt failed");
                }
            }
        }

        tracing::error!(topic, providers = self.adapters.len(), "All AI providers failed");
        Err(ApiError::Unavailable(GENERATION_UNAVAILABLE.to_string()))
    }
}
