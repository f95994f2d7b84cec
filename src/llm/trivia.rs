//! Trivia generation on top of a raw text provider
//!
//! Every backend gets the same prompt and its output goes through the same
//! parsing and filtering, so callers only see `TriviaItem`s or an `LlmError`.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::time::{Duration, Instant};

use super::{GenerateRequest, LlmError, LlmProvider, LlmResult, DEFAULT_MAX_TOKENS};
use crate::moderation;
use crate::types::{ProviderTag, TriviaItem};

const CATEGORY_LEAD: &str = "these are ";
const DEFAULT_CATEGORY: &str = "Trivia";
const TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str = "You are an educational trivia content generator. \
    Create accurate, engaging, and educational trivia questions.";

const YOUTH_SYSTEM_PROMPT: &str = "You are an educational content generator for children. \
    Always create age-appropriate, positive, and educational content.";

/// Build the generation prompt shared by all providers
pub fn build_prompt(topic: &str, is_youth: bool, count: u32) -> String {
    let youth_note = if is_youth {
        " This is for a youth/children's edition, so keep all content age-appropriate, educational, and positive."
    } else {
        ""
    };

    format!(
        r#"Generate {count} trivia questions about "{topic}".{youth_note}

For each trivia question, provide:
1. A category pattern (e.g., "These are [category]")
2. A list of 10-15 correct answers
3. A list of 15-20 distractor answers (wrong answers that are plausible but clearly incorrect)

Format your response as a JSON array where each item has:
- "categoryPattern": "These are [category related to {topic}]"
- "correctPool": ["answer1", "answer2", ...]
- "distractorPool": ["wrong1", "wrong2", ...]

Make sure:
- Correct answers are all valid examples of the category
- Distractors are related but clearly wrong (different category, wrong type, etc.)
- Content is educational and appropriate
- Categories are diverse and interesting

Return ONLY valid JSON, no markdown, no code blocks, just the JSON array."#
    )
}

pub fn system_prompt(is_youth: bool) -> &'static str {
    if is_youth {
        YOUTH_SYSTEM_PROMPT
    } else {
        SYSTEM_PROMPT
    }
}

/// One item as the backend emits it. Missing or null fields fall back to
/// defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawTriviaItem {
    #[serde(default)]
    pub category_pattern: Option<String>,
    #[serde(default)]
    pub correct_pool: Option<Vec<String>>,
    #[serde(default)]
    pub distractor_pool: Option<Vec<String>>,
}

/// Remove a leading ```json / ``` fence and a trailing ``` fence
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    }
    if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Parse backend output into raw items. Empty output is an empty list;
/// anything else that is not a JSON array of item objects is a `ParseError`.
pub fn parse_response(text: &str) -> LlmResult<Vec<RawTriviaItem>> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(body).map_err(|e| LlmError::ParseError(e.to_string()))
}

/// Drop a leading "These are " (any case) from a category pattern
pub fn strip_category_lead(pattern: &str) -> &str {
    match pattern.get(..CATEGORY_LEAD.len()) {
        Some(head) if head.eq_ignore_ascii_case(CATEGORY_LEAD) => &pattern[CATEGORY_LEAD.len()..],
        _ => pattern,
    }
}

/// Turn raw items into final items: skip items without correct answers,
/// shuffle the answer pools together, drop categories that fail moderation,
/// keep at most `count`.
pub fn build_items<R: Rng + ?Sized>(
    raw: Vec<RawTriviaItem>,
    count: u32,
    is_youth: bool,
    rng: &mut R,
) -> Vec<TriviaItem> {
    let mut items = Vec::new();

    for raw_item in raw {
        let correct_pool = raw_item.correct_pool.unwrap_or_default();
        if correct_pool.is_empty() {
            continue;
        }

        let pattern = raw_item
            .category_pattern
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        if moderation::check(&pattern, is_youth).is_err() {
            tracing::debug!(category = %pattern, "Dropping moderated category");
            continue;
        }

        let mut words = correct_pool.clone();
        words.extend(raw_item.distractor_pool.unwrap_or_default());
        words.shuffle(rng);

        items.push(TriviaItem {
            category: strip_category_lead(&pattern).to_string(),
            words,
            correct_answers: correct_pool,
        });
    }

    items.truncate(count as usize);
    items
}

/// Produces trivia through one backend under a hard timeout
pub struct TriviaAdapter {
    provider: Box<dyn LlmProvider>,
    tag: ProviderTag,
    timeout: Duration,
    max_tokens: u32,
}

impl TriviaAdapter {
    pub fn new(provider: Box<dyn LlmProvider>, tag: ProviderTag, timeout: Duration) -> Self {
        Self {
            provider,
            tag,
            timeout,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn tag(&self) -> ProviderTag {
        self.tag
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    /// Generate up to `count` items. Timeouts, backend errors, unparseable
    /// output and empty results are all errors.
    pub async fn generate(
        &self,
        topic: &str,
        is_youth: bool,
        count: u32,
    ) -> LlmResult<Vec<TriviaItem>> {
        let start = Instant::now();
        let request = GenerateRequest {
            prompt: build_prompt(topic, is_youth, count),
            system: Some(system_prompt(is_youth).to_string()),
            max_tokens: Some(self.max_tokens),
            temperature: Some(TEMPERATURE),
        };

        let response = tokio::time::timeout(self.timeout, self.provider.generate(request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))??;

        let raw = parse_response(&response.text)?;
        let raw_count = raw.len();
        let items = build_items(raw, count, is_youth, &mut rand::rng());

        if items.is_empty() {
            return Err(LlmError::EmptyResult);
        }

        tracing::info!(
            provider = %self.tag,
            model = %response.metadata.model,
            raw_items = raw_count,
            items = items.len(),
            provider_latency_ms = response.metadata.latency_ms,
            tokens_used = response.metadata.tokens_used,
            latency_ms = start.elapsed().as_millis() as u64,
            "Generated trivia"
        );

        Ok(items)
    }
}
