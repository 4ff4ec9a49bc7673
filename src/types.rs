//! Core types for Kindred
//!
//! Domain entities shared by the state store, the backend client, and the
//! language-model wrapper. Wire format is camelCase JSON to match the
//! hosted backend's column naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Maximum conversation snippets retained in profile memory
pub const CONVERSATION_MEMORY_CAP: usize = 50;

/// Maximum personality traits on a profile
pub const MAX_TRAITS: usize = 5;

/// Maximum interests on a profile
pub const MAX_INTERESTS: usize = 5;

/// Maximum goals on a profile
pub const MAX_GOALS: usize = 3;

/// Window size for mood trend computation (entries)
pub const MOOD_TREND_WINDOW: usize = 7;

/// Mood intensity bounds (inclusive)
pub const MIN_INTENSITY: u8 = 1;
pub const MAX_INTENSITY: u8 = 10;

/// Clamp a raw intensity reading into the valid [1, 10] range
pub fn clamp_intensity(raw: i64) -> u8 {
    raw.clamp(MIN_INTENSITY as i64, MAX_INTENSITY as i64) as u8
}

/// Message author role. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// One chat message. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One ordered, titled conversation thread.
///
/// Messages are append-only within a session; `updated_at >= created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(user_id: impl Into<String>, title: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            title: title.unwrap_or_else(|| format!("Chat {}", now.format("%Y-%m-%d"))),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }
}

/// One timestamped self-reported emotional data point. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub timestamp: DateTime<Utc>,
    pub mood: String,
    /// Intensity in [1, 10]
    pub intensity: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl MoodEntry {
    pub fn new(mood: impl Into<String>, intensity: u8, context: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            mood: mood.into(),
            intensity: clamp_intensity(intensity as i64),
            context,
        }
    }
}

/// Coarse classification of recent vs. prior average mood intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "up"),
            TrendDirection::Down => write!(f, "down"),
            TrendDirection::Stable => write!(f, "stable"),
        }
    }
}

/// Mood trend summary returned by the store's derived read
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoodTrend {
    pub average: f64,
    pub trend: TrendDirection,
}

/// Mood classification produced by the language model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodReading {
    pub mood: String,
    pub intensity: u8,
}

impl Default for MoodReading {
    fn default() -> Self {
        Self {
            mood: "neutral".to_string(),
            intensity: 5,
        }
    }
}

/// Personality configuration for the digital twin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Personality {
    pub traits: Vec<String>,
    pub communication_style: String,
    pub interests: Vec<String>,
    pub goals: Vec<String>,
}

/// Conversation memory carried by the twin: capped snippet ring,
/// free-form preferences, and a mirror of the mood history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwinMemory {
    #[serde(default)]
    pub conversations: Vec<String>,
    #[serde(default)]
    pub preferences: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub mood_history: Vec<MoodEntry>,
}

impl TwinMemory {
    /// Append a conversation snippet, silently dropping the oldest entries
    /// beyond [`CONVERSATION_MEMORY_CAP`].
    pub fn remember(&mut self, snippet: String) {
        self.conversations.push(snippet);
        if self.conversations.len() > CONVERSATION_MEMORY_CAP {
            let excess = self.conversations.len() - CONVERSATION_MEMORY_CAP;
            self.conversations.drain(..excess);
        }
    }
}

/// Preferred assistant response length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseLength {
    Short,
    Medium,
    Long,
}

impl std::fmt::Display for ResponseLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseLength::Short => write!(f, "short"),
            ResponseLength::Medium => write!(f, "medium"),
            ResponseLength::Long => write!(f, "long"),
        }
    }
}

/// Preferred assistant formality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    Casual,
    Formal,
}

impl std::fmt::Display for Formality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Formality::Casual => write!(f, "casual"),
            Formality::Formal => write!(f, "formal"),
        }
    }
}

/// Response-shaping settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwinSettings {
    pub response_length: ResponseLength,
    pub formality: Formality,
    pub topics: Vec<String>,
}

/// The user's configured AI-companion personality/settings/memory bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitalTwinProfile {
    pub id: Uuid,
    pub user_id: String,
    pub personality: Personality,
    pub memory: TwinMemory,
    pub settings: TwinSettings,
}

impl DigitalTwinProfile {
    /// Default bundle installed on first initialization
    pub fn with_defaults(user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            personality: Personality {
                traits: vec![
                    "curious".to_string(),
                    "empathetic".to_string(),
                    "analytical".to_string(),
                ],
                communication_style: "friendly".to_string(),
                interests: vec![
                    "technology".to_string(),
                    "personal growth".to_string(),
                    "creativity".to_string(),
                ],
                goals: vec![
                    "help users achieve their goals".to_string(),
                    "provide meaningful insights".to_string(),
                ],
            },
            memory: TwinMemory::default(),
            settings: TwinSettings {
                response_length: ResponseLength::Medium,
                formality: Formality::Casual,
                topics: vec![
                    "general".to_string(),
                    "personal".to_string(),
                    "professional".to_string(),
                ],
            },
        }
    }
}

/// Partial profile update, shallow-merged into an existing profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traits: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_length: Option<ResponseLength>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formality: Option<Formality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
}

/// Loading state surfaced to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Authenticated user identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Auth session: token pair plus expiry.
///
/// The access token is non-empty while authenticated; `expires_at`
/// advances monotonically on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: AuthUser,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Backend row for the `users` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_clamped_into_range() {
        assert_eq!(clamp_intensity(0), 1);
        assert_eq!(clamp_intensity(-5), 1);
        assert_eq!(clamp_intensity(11), 10);
        assert_eq!(clamp_intensity(255), 10);
        assert_eq!(clamp_intensity(7), 7);
    }

    #[test]
    fn memory_cap_retains_most_recent() {
        let mut memory = TwinMemory::default();
        for i in 0..60 {
            memory.remember(format!("user: message {i}"));
        }
        assert_eq!(memory.conversations.len(), CONVERSATION_MEMORY_CAP);
        assert_eq!(memory.conversations[0], "user: message 10");
        assert_eq!(memory.conversations[49], "user: message 59");
    }

    #[test]
    fn session_updated_at_advances() {
        let mut session = ChatSession::new("u1", None);
        let created = session.created_at;
        session.push_message(ChatMessage::user("hello"));
        assert!(session.updated_at >= created);
        assert_eq!(session.messages.len(), 1);
    }

    #[test]
    fn default_session_title_is_dated() {
        let session = ChatSession::new("u1", None);
        assert!(session.title.starts_with("Chat "));

        let titled = ChatSession::new("u1", Some("Morning check-in".to_string()));
        assert_eq!(titled.title, "Morning check-in");
    }

    #[test]
    fn profile_serde_round_trip_uses_camel_case() {
        let profile = DigitalTwinProfile::with_defaults("u1");
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json["personality"].get("communicationStyle").is_some());
        assert!(json["settings"].get("responseLength").is_some());
    }
}
