//! Digital-twin state store
//!
//! Single authoritative in-memory record of the user's profile, active
//! session, session history, and mood history. Mutations never throw at
//! callers: failures are recorded in the `error`/`loading_state` fields.
//! Persistence is an explicit mirror (`snapshot`/`persist`/`load`), not a
//! hidden side effect of each mutation.

mod trend;

pub use trend::mood_trend;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{KeyValueStore, STORE_SNAPSHOT_KEY};
use crate::types::{
    ChatMessage, ChatSession, DigitalTwinProfile, LoadingState, MoodEntry, MoodTrend,
    ProfileUpdate, clamp_intensity, MAX_GOALS, MAX_INTERESTS, MAX_TRAITS,
};

/// Threshold above which the user counts as an active communicator
const ACTIVE_COMMUNICATOR_MESSAGES: usize = 50;

/// Mood entries required before trend-based insights are offered
const MOOD_INSIGHT_MINIMUM: usize = 10;

/// The state store. Exclusive owner of all entities in memory.
pub struct TwinStore {
    user_id: String,
    profile: Option<DigitalTwinProfile>,
    current_session: Option<ChatSession>,
    chat_history: Vec<ChatSession>,
    mood_history: Vec<MoodEntry>,
    loading_state: LoadingState,
    error: Option<String>,
}

/// Persisted slice of the store. The active session and transient
/// loading/error fields are deliberately not mirrored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub profile: Option<DigitalTwinProfile>,
    #[serde(default)]
    pub chat_history: Vec<ChatSession>,
    #[serde(default)]
    pub mood_history: Vec<MoodEntry>,
}

impl TwinStore {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            profile: None,
            current_session: None,
            chat_history: Vec::new(),
            mood_history: Vec::new(),
            loading_state: LoadingState::Idle,
            error: None,
        }
    }

    // --- read accessors ---

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn profile(&self) -> Option<&DigitalTwinProfile> {
        self.profile.as_ref()
    }

    pub fn current_session(&self) -> Option<&ChatSession> {
        self.current_session.as_ref()
    }

    pub fn chat_history(&self) -> &[ChatSession] {
        &self.chat_history
    }

    pub fn mood_history(&self) -> &[MoodEntry] {
        &self.mood_history
    }

    pub fn loading_state(&self) -> LoadingState {
        self.loading_state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // --- mutating actions ---

    /// Install the default profile bundle if none exists
    pub fn initialize_profile(&mut self) {
        self.loading_state = LoadingState::Loading;

        if self.profile.is_none() {
            self.profile = Some(DigitalTwinProfile::with_defaults(self.user_id.clone()));
            tracing::info!(user_id = %self.user_id, "Digital twin profile initialized");
        }
        self.loading_state = LoadingState::Success;
    }

    /// Shallow-merge a partial update into the profile. No-op without one.
    /// Capped lists are truncated to their limits.
    pub fn update_profile(&mut self, updates: ProfileUpdate) {
        let Some(profile) = self.profile.as_mut() else {
            return;
        };

        if let Some(mut traits) = updates.traits {
            traits.truncate(MAX_TRAITS);
            profile.personality.traits = traits;
        }
        if let Some(style) = updates.communication_style {
            profile.personality.communication_style = style;
        }
        if let Some(mut interests) = updates.interests {
            interests.truncate(MAX_INTERESTS);
            profile.personality.interests = interests;
        }
        if let Some(mut goals) = updates.goals {
            goals.truncate(MAX_GOALS);
            profile.personality.goals = goals;
        }
        if let Some(length) = updates.response_length {
            profile.settings.response_length = length;
        }
        if let Some(formality) = updates.formality {
            profile.settings.formality = formality;
        }
        if let Some(topics) = updates.topics {
            profile.settings.topics = topics;
        }
    }

    /// Append a message to the active session, creating one first when
    /// none exists. The triggering message is appended after creation
    /// rather than dropped. Also records a `"role: content"` snippet in
    /// the profile's capped conversation memory.
    pub fn add_chat_message(&mut self, message: ChatMessage) {
        if self.current_session.is_none() {
            self.create_new_session(None);
        }

        let snippet = format!("{}: {}", message.role, message.content);
        if let Some(session) = self.current_session.as_mut() {
            session.push_message(message);
        }
        if let Some(profile) = self.profile.as_mut() {
            profile.memory.remember(snippet);
        }
    }

    /// Install a fresh empty session. The current session moves to
    /// history iff it has at least one message; an empty current session
    /// is discarded without archiving.
    pub fn create_new_session(&mut self, title: Option<String>) {
        let fresh = ChatSession::new(self.user_id.clone(), title);

        if let Some(previous) = self.current_session.take() {
            if !previous.messages.is_empty() {
                self.chat_history.push(previous);
            }
        }
        self.current_session = Some(fresh);
    }

    /// Record a mood entry in both the standalone history and the
    /// profile's memory mirror. Intensity is clamped to [1, 10].
    pub fn update_mood(&mut self, mood: impl Into<String>, intensity: i64, context: Option<String>) {
        let entry = MoodEntry::new(mood, clamp_intensity(intensity), context);

        self.mood_history.push(entry.clone());
        if let Some(profile) = self.profile.as_mut() {
            profile.memory.mood_history.push(entry);
        }
    }

    // --- derived reads ---

    pub fn mood_trend(&self) -> MoodTrend {
        trend::mood_trend(&self.mood_history)
    }

    /// Threshold-derived, human-readable insight strings. Purely derived;
    /// nothing is stored.
    pub fn personality_insights(&self) -> Vec<String> {
        let mut insights = Vec::new();
        let Some(profile) = self.profile.as_ref() else {
            return insights;
        };

        let total_messages: usize = self
            .chat_history
            .iter()
            .map(|session| session.messages.len())
            .sum();
        if total_messages > ACTIVE_COMMUNICATOR_MESSAGES {
            insights.push("Active communicator with consistent engagement".to_string());
        }

        if self.mood_history.len() > MOOD_INSIGHT_MINIMUM {
            match self.mood_trend().trend {
                crate::types::TrendDirection::Up => {
                    insights.push("Showing positive mood progression".to_string());
                }
                crate::types::TrendDirection::Down => {
                    insights.push("May need support or encouragement".to_string());
                }
                crate::types::TrendDirection::Stable => {}
            }
        }

        if !profile.personality.interests.is_empty() {
            insights.push(format!(
                "Interested in: {}",
                profile.personality.interests.join(", ")
            ));
        }

        insights
    }

    // --- error handling ---

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Clear profile, sessions, and mood history. Idempotent.
    pub fn reset(&mut self) {
        self.profile = None;
        self.current_session = None;
        self.chat_history.clear();
        self.mood_history.clear();
        self.error = None;
        self.loading_state = LoadingState::Idle;
    }

    // --- persistence mirror ---

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            profile: self.profile.clone(),
            chat_history: self.chat_history.clone(),
            mood_history: self.mood_history.clone(),
        }
    }

    /// Serialize the snapshot to the key-value store
    pub async fn persist(&self, kv: &dyn KeyValueStore) -> Result<()> {
        let serialized = serde_json::to_string(&self.snapshot())?;
        kv.set(STORE_SNAPSHOT_KEY, &serialized).await
    }

    /// Build a store from the persisted snapshot. A corrupt or missing
    /// snapshot yields a fresh store; corruption is recorded in `error`.
    pub async fn load(kv: &dyn KeyValueStore, user_id: impl Into<String>) -> Self {
        let mut store = Self::new(user_id);

        match kv.get(STORE_SNAPSHOT_KEY).await {
            Ok(Some(serialized)) => match serde_json::from_str::<StoreSnapshot>(&serialized) {
                Ok(snapshot) => {
                    store.profile = snapshot.profile;
                    store.chat_history = snapshot.chat_history;
                    store.mood_history = snapshot.mood_history;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Persisted store snapshot is corrupt");
                    store.error = Some(format!("Failed to restore saved state: {}", e));
                    store.loading_state = LoadingState::Error;
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "Failed to read persisted store snapshot");
                store.error = Some(e.to_string());
                store.loading_state = LoadingState::Error;
            }
        }

        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::types::{TrendDirection, CONVERSATION_MEMORY_CAP};
    use pretty_assertions::assert_eq;

    fn store_with_profile() -> TwinStore {
        let mut store = TwinStore::new("u1");
        store.initialize_profile();
        store
    }

    #[test]
    fn initialize_is_idempotent() {
        let mut store = store_with_profile();
        let first_id = store.profile().unwrap().id;

        store.initialize_profile();
        assert_eq!(store.profile().unwrap().id, first_id);
        assert_eq!(store.loading_state(), LoadingState::Success);
    }

    #[test]
    fn update_profile_without_profile_is_noop() {
        let mut store = TwinStore::new("u1");
        store.update_profile(ProfileUpdate {
            communication_style: Some("direct".into()),
            ..ProfileUpdate::default()
        });
        assert!(store.profile().is_none());
    }

    #[test]
    fn update_profile_merges_and_caps() {
        let mut store = store_with_profile();
        store.update_profile(ProfileUpdate {
            traits: Some(vec![
                "a".into(),
                "b".into(),
                "c".into(),
                "d".into(),
                "e".into(),
                "f".into(),
            ]),
            goals: Some(vec!["1".into(), "2".into(), "3".into(), "4".into()]),
            ..ProfileUpdate::default()
        });

        let profile = store.profile().unwrap();
        assert_eq!(profile.personality.traits.len(), MAX_TRAITS);
        assert_eq!(profile.personality.goals.len(), MAX_GOALS);
        // untouched fields survive the merge
        assert_eq!(profile.personality.communication_style, "friendly");
    }

    #[test]
    fn first_message_creates_session_and_is_kept() {
        let mut store = store_with_profile();
        assert!(store.current_session().is_none());

        store.add_chat_message(ChatMessage::user("hello twin"));

        let session = store.current_session().unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].content, "hello twin");
        // memory snippet recorded as "role: content"
        assert_eq!(
            store.profile().unwrap().memory.conversations.last().unwrap(),
            "user: hello twin"
        );
    }

    #[test]
    fn conversation_memory_never_exceeds_cap() {
        let mut store = store_with_profile();
        for i in 0..60 {
            store.add_chat_message(ChatMessage::user(format!("message {i}")));
        }

        let conversations = &store.profile().unwrap().memory.conversations;
        assert_eq!(conversations.len(), CONVERSATION_MEMORY_CAP);
        assert_eq!(conversations.last().unwrap(), "user: message 59");
        assert_eq!(conversations.first().unwrap(), "user: message 10");
    }

    #[test]
    fn new_session_archives_non_empty_current() {
        let mut store = store_with_profile();
        store.add_chat_message(ChatMessage::user("first"));
        let old_id = store.current_session().unwrap().id;

        store.create_new_session(Some("fresh".into()));

        assert_eq!(store.chat_history().len(), 1);
        assert_eq!(store.chat_history()[0].id, old_id);
        assert_eq!(store.chat_history()[0].messages.len(), 1);
        assert!(store.current_session().unwrap().messages.is_empty());
    }

    #[test]
    fn new_session_discards_empty_current() {
        let mut store = store_with_profile();
        store.create_new_session(None);
        store.create_new_session(None);

        assert!(store.chat_history().is_empty());
        assert!(store.current_session().is_some());
    }

    #[test]
    fn mood_recorded_in_both_histories_and_clamped() {
        let mut store = store_with_profile();
        store.update_mood("elated", 42, Some("good news".into()));

        assert_eq!(store.mood_history().len(), 1);
        assert_eq!(store.mood_history()[0].intensity, 10);
        assert_eq!(store.profile().unwrap().memory.mood_history.len(), 1);
    }

    #[test]
    fn insights_reflect_thresholds() {
        let mut store = store_with_profile();

        // below thresholds: only the interests line
        let insights = store.personality_insights();
        assert_eq!(insights.len(), 1);
        assert!(insights[0].starts_with("Interested in:"));

        // push mood history over the insight minimum, trending down
        for _ in 0..7 {
            store.update_mood("calm", 9, None);
        }
        for _ in 0..7 {
            store.update_mood("down", 2, None);
        }
        let insights = store.personality_insights();
        assert!(insights.contains(&"May need support or encouragement".to_string()));
        assert_eq!(store.mood_trend().trend, TrendDirection::Down);
    }

    #[test]
    fn insights_count_archived_messages_only() {
        // message totals follow archived history, as in the original app
        let mut store = store_with_profile();
        for i in 0..60 {
            store.add_chat_message(ChatMessage::user(format!("m{i}")));
        }
        // all 60 still in the current session
        assert!(!store
            .personality_insights()
            .contains(&"Active communicator with consistent engagement".to_string()));

        store.create_new_session(None);
        assert!(store
            .personality_insights()
            .contains(&"Active communicator with consistent engagement".to_string()));
    }

    #[test]
    fn reset_is_idempotent() {
        let mut store = store_with_profile();
        store.add_chat_message(ChatMessage::user("hello"));
        store.update_mood("fine", 6, None);

        store.reset();
        let after_first = (
            store.profile().is_none(),
            store.current_session().is_none(),
            store.chat_history().len(),
            store.mood_history().len(),
            store.loading_state(),
        );

        store.reset();
        let after_second = (
            store.profile().is_none(),
            store.current_session().is_none(),
            store.chat_history().len(),
            store.mood_history().len(),
            store.loading_state(),
        );

        assert_eq!(after_first, after_second);
        assert_eq!(after_first, (true, true, 0, 0, LoadingState::Idle));
    }

    #[tokio::test]
    async fn persist_and_load_round_trip() {
        let kv = MemoryStore::new();

        let mut store = store_with_profile();
        store.add_chat_message(ChatMessage::user("remember me"));
        store.create_new_session(None); // archive so it lands in the snapshot
        store.update_mood("content", 7, None);
        store.persist(&kv).await.unwrap();

        let restored = TwinStore::load(&kv, "u1").await;
        assert_eq!(restored.chat_history().len(), 1);
        assert_eq!(restored.mood_history().len(), 1);
        assert!(restored.profile().is_some());
        // the active session is not part of the persisted slice
        assert!(restored.current_session().is_none());
    }

    #[tokio::test]
    async fn corrupt_snapshot_recorded_as_error() {
        let kv = MemoryStore::new();
        kv.set(STORE_SNAPSHOT_KEY, "{not json").await.unwrap();

        let store = TwinStore::load(&kv, "u1").await;
        assert_eq!(store.loading_state(), LoadingState::Error);
        assert!(store.error().is_some());
        assert!(store.profile().is_none());
    }
}
