use serde::{Deserialize, Deserializer, Serialize};

/// Opaque ID types for type safety
pub type UserId = String;

/// Room capacity when the room document does not carry one
pub const DEFAULT_MAX_PLAYERS: usize = 4;

// ========== Trivia Generation ==========

/// A validated generation request. Only constructed after every field passed
/// input validation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Trimmed topic, 2-100 characters
    pub topic: String,
    pub is_youth_edition: bool,
    /// Number of items requested, 1-100
    pub count: u32,
}

/// Raw request body for `generateTrivia`.
///
/// Fields are kept as loose JSON so type errors surface as
/// `invalid-argument` with a precise message instead of a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTriviaPayload {
    #[serde(default)]
    pub topic: serde_json::Value,
    #[serde(default)]
    pub is_youth_edition: serde_json::Value,
    #[serde(default)]
    pub count: serde_json::Value,
}

/// A single generated trivia item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriviaItem {
    /// Category label with the "These are" lead-in stripped
    pub category: String,
    /// Correct and distractor answers, shuffled
    pub words: Vec<String>,
    pub correct_answers: Vec<String>,
}

/// Which backend produced a result set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    Gemini,
    Anthropic,
    Cached,
}

impl ProviderTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderTag::Gemini => "gemini",
            ProviderTag::Anthropic => "anthropic",
            ProviderTag::Cached => "cached",
        }
    }
}

impl std::fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful `generateTrivia` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTriviaResponse {
    pub success: bool,
    pub trivia: Vec<TriviaItem>,
    pub provider: ProviderTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

// ========== Users ==========

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Premium,
    #[serde(other)]
    Other,
}

/// Profile document from the `users` collection (read-only here)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub subscription_tier: SubscriptionTier,
}

// ========== Multiplayer Rooms ==========

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Entry of a room's player list. Entries without a user id never match a
/// caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPlayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Room document from the `game_rooms` collection (read-only here)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRoom {
    #[serde(default)]
    pub host_id: Option<UserId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub players: Vec<RoomPlayer>,
    /// "waiting", "active", "ended", ...
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub max_players: Option<usize>,
}

impl GameRoom {
    pub fn has_player(&self, user_id: &str) -> bool {
        self.players
            .iter()
            .any(|p| p.user_id.as_deref() == Some(user_id))
    }

    pub fn is_waiting(&self) -> bool {
        self.status.as_deref() == Some("waiting")
    }

    /// Stored capacity, falling back to the default when unset or zero
    pub fn capacity(&self) -> usize {
        self.max_players
            .filter(|&max| max > 0)
            .unwrap_or(DEFAULT_MAX_PLAYERS)
    }
}

/// Raw request body for `validateMultiplayerRoom`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRoomPayload {
    #[serde(default)]
    pub room_id: serde_json::Value,
    #[serde(default)]
    pub operation: serde_json::Value,
}

/// Successful `validateMultiplayerRoom` response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomAccess {
    pub success: bool,
    pub is_host: bool,
    pub is_player: bool,
    pub room_status: Option<String>,
}
