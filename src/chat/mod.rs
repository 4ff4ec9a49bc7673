//! Chat orchestration
//!
//! Ties the state store, the language model, the backend, and the event
//! bus together for the send-message flow. The user's outgoing message is
//! committed to the store before any network work, so a failed completion
//! never loses it: the twin answers with a fixed fallback line and the
//! error is returned for the caller's alert dialog.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::BackendService;
use crate::error::{KindredError, Result};
use crate::llm::{GenerateOptions, LanguageModel};
use crate::realtime::{EventBus, MessageEvent};
use crate::storage::KeyValueStore;
use crate::store::TwinStore;
use crate::types::{ChatMessage, DigitalTwinProfile, MoodReading};
use uuid::Uuid;

/// Assistant line shown when response generation fails
pub const FALLBACK_RESPONSE: &str =
    "I'm having trouble connecting right now. Please try again in a moment.";

/// Conversation turns sent to the model as context
const RECENT_CONTEXT: usize = 10;

/// Completion budget for chat turns
const CHAT_MAX_TOKENS: u32 = 500;

pub struct ChatService {
    store: Arc<Mutex<TwinStore>>,
    llm: Arc<dyn LanguageModel>,
    kv: Arc<dyn KeyValueStore>,
    bus: EventBus,
    backend: Option<Arc<BackendService>>,
}

impl ChatService {
    pub fn new(
        store: Arc<Mutex<TwinStore>>,
        llm: Arc<dyn LanguageModel>,
        kv: Arc<dyn KeyValueStore>,
        bus: EventBus,
    ) -> Self {
        Self {
            store,
            llm,
            kv,
            bus,
            backend: None,
        }
    }

    /// Mirror messages into the hosted backend. Its event bus takes over
    /// publishing for inserted messages.
    pub fn with_backend(mut self, backend: Arc<BackendService>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn store(&self) -> &Arc<Mutex<TwinStore>> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    /// Send a user message and obtain the twin's reply.
    ///
    /// On generation failure the fallback assistant message is appended
    /// and the original error returned.
    pub async fn send_message(&self, text: &str) -> Result<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(KindredError::Unknown("Cannot send an empty message".into()));
        }

        let user_message = ChatMessage::user(text);

        // commit the outgoing message first
        let (session_id, recent, profile) = {
            let mut store = self.store.lock();
            store.add_chat_message(user_message.clone());
            let session = match store.current_session() {
                Some(session) => session,
                None => return Err(KindredError::Unknown("No active session".into())),
            };
            let start = session.messages.len().saturating_sub(RECENT_CONTEXT);
            (
                session.id,
                session.messages[start..].to_vec(),
                store.profile().cloned(),
            )
        };
        self.fan_out(session_id, &user_message).await;

        // mood analysis is tolerant: any failure reads as neutral
        let reading = match self.llm.analyze_mood(text).await {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!(error = %e, "Mood analysis failed");
                MoodReading::default()
            }
        };
        {
            let mut store = self.store.lock();
            store.update_mood(
                reading.mood,
                reading.intensity as i64,
                Some(text.to_string()),
            );
        }

        let options = GenerateOptions {
            max_tokens: CHAT_MAX_TOKENS,
            ..GenerateOptions::default()
        };
        match self
            .generate(&recent, profile.as_ref(), &options)
            .await
        {
            Ok(reply) => {
                let assistant = ChatMessage::assistant(reply);
                self.store.lock().add_chat_message(assistant.clone());
                self.fan_out(session_id, &assistant).await;
                self.persist().await;
                Ok(assistant)
            }
            Err(e) => {
                tracing::error!(error = %e, "Response generation failed, appending fallback");
                let fallback = ChatMessage::assistant(FALLBACK_RESPONSE);
                self.store.lock().add_chat_message(fallback.clone());
                self.fan_out(session_id, &fallback).await;
                self.persist().await;
                Err(e)
            }
        }
    }

    async fn generate(
        &self,
        recent: &[ChatMessage],
        profile: Option<&DigitalTwinProfile>,
        options: &GenerateOptions,
    ) -> Result<String> {
        self.llm.generate_response(recent, profile, options).await
    }

    /// Mirror a message to the backend (which publishes it) or publish
    /// locally when running without one. Mirror failures are logged, not
    /// surfaced: the in-memory transition already happened.
    async fn fan_out(&self, session_id: Uuid, message: &ChatMessage) {
        match &self.backend {
            Some(backend) => {
                if let Err(e) = backend.insert_message(session_id, message).await {
                    tracing::warn!(error = %e, "Failed to mirror message to backend");
                }
            }
            None => {
                self.bus
                    .publish(MessageEvent::inserted(session_id, message.clone()));
            }
        }
    }

    async fn persist(&self) {
        let snapshot_result = {
            let store = self.store.lock();
            serde_json::to_string(&store.snapshot())
        };
        match snapshot_result {
            Ok(serialized) => {
                if let Err(e) = self
                    .kv
                    .set(crate::storage::STORE_SNAPSHOT_KEY, &serialized)
                    .await
                {
                    tracing::warn!(error = %e, "Failed to persist store snapshot");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize store snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::OfflineTwin;
    use crate::storage::{MemoryStore, STORE_SNAPSHOT_KEY, KeyValueStore};
    use async_trait::async_trait;

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        async fn generate_response(
            &self,
            _messages: &[ChatMessage],
            _profile: Option<&DigitalTwinProfile>,
            _options: &GenerateOptions,
        ) -> Result<String> {
            Err(KindredError::Network("connection refused".into()))
        }

        async fn analyze_mood(&self, _text: &str) -> Result<MoodReading> {
            Err(KindredError::Network("connection refused".into()))
        }

        async fn personality_insights(
            &self,
            _profile: &DigitalTwinProfile,
        ) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn service(llm: Arc<dyn LanguageModel>) -> ChatService {
        let mut store = TwinStore::new("u1");
        store.initialize_profile();
        ChatService::new(
            Arc::new(Mutex::new(store)),
            llm,
            Arc::new(MemoryStore::new()),
            EventBus::new(),
        )
    }

    #[tokio::test]
    async fn send_message_appends_user_and_assistant() {
        let chat = service(Arc::new(OfflineTwin::new()));

        let reply = chat.send_message("hello").await.unwrap();
        assert!(!reply.content.is_empty());

        let store = chat.store().lock();
        let session = store.current_session().unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].content, "hello");
        assert_eq!(session.messages[1].id, reply.id);
        // a mood entry was recorded along the way
        assert_eq!(store.mood_history().len(), 1);
    }

    #[tokio::test]
    async fn failed_generation_keeps_user_message_and_adds_fallback() {
        let chat = service(Arc::new(FailingModel));

        let err = chat.send_message("are you there?").await.unwrap_err();
        assert!(err.is_retryable());

        let store = chat.store().lock();
        let session = store.current_session().unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].content, "are you there?");
        assert_eq!(session.messages[1].content, FALLBACK_RESPONSE);
        // mood analysis failure degraded to neutral rather than aborting
        assert_eq!(store.mood_history()[0].intensity, 5);
    }

    #[tokio::test]
    async fn empty_message_rejected_without_mutation() {
        let chat = service(Arc::new(OfflineTwin::new()));

        assert!(chat.send_message("   ").await.is_err());
        assert!(chat.store().lock().current_session().is_none());
    }

    #[tokio::test]
    async fn snapshot_persisted_after_send() {
        let kv = Arc::new(MemoryStore::new());
        let mut store = TwinStore::new("u1");
        store.initialize_profile();
        let chat = ChatService::new(
            Arc::new(Mutex::new(store)),
            Arc::new(OfflineTwin::new()),
            kv.clone(),
            EventBus::new(),
        );

        chat.send_message("persist me").await.unwrap();
        assert!(kv.get(STORE_SNAPSHOT_KEY).await.unwrap().is_some());
    }
}
