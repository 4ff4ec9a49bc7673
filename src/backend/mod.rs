//! Backend-as-a-service client
//!
//! CRUD over the four hosted tables (`users`, `digital_twins`,
//! `chat_sessions`, `chat_messages`) through the REST surface at
//! `{backend_url}/rest/v1/{table}`. Every call carries the anonymous key
//! as an `apikey` header; user identity rides on the bearer token the
//! request pipeline injects. Message inserts are published on the local
//! event bus so subscribers see them without polling.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use uuid::Uuid;

use crate::api::ApiClient;
use crate::error::{KindredError, Result};
use crate::realtime::{EventBus, MessageEvent};
use crate::types::{ChatMessage, ChatSession, DigitalTwinProfile, ProfileUpdate, UserProfile};

/// Client for the hosted backend
pub struct BackendService {
    api: Arc<ApiClient>,
    anon_key: String,
    bus: EventBus,
}

impl BackendService {
    /// `api` must be rooted at the backend URL; `anon_key` is the
    /// project's anonymous key.
    pub fn new(api: Arc<ApiClient>, anon_key: impl Into<String>, bus: EventBus) -> Result<Self> {
        let anon_key = anon_key.into();
        if anon_key.is_empty() {
            return Err(KindredError::Config(
                "Backend anonymous key must not be empty".to_string(),
            ));
        }
        Ok(Self { api, anon_key, bus })
    }

    /// Event bus carrying message-insert events
    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    // --- users ---

    pub async fn create_user(&self, user: &UserProfile) -> Result<UserProfile> {
        self.insert("users", serde_json::to_value(user)?).await
    }

    pub async fn user_by_id(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.select_one("users", &format!("id=eq.{}", user_id)).await
    }

    pub async fn update_user(
        &self,
        user_id: &str,
        updates: serde_json::Value,
    ) -> Result<UserProfile> {
        self.update("users", &format!("id=eq.{}", user_id), updates)
            .await
    }

    // --- digital_twins ---

    pub async fn create_twin(&self, twin: &DigitalTwinProfile) -> Result<DigitalTwinProfile> {
        self.insert("digital_twins", serde_json::to_value(twin)?)
            .await
    }

    pub async fn twin_by_user(&self, user_id: &str) -> Result<Option<DigitalTwinProfile>> {
        self.select_one("digital_twins", &format!("userId=eq.{}", user_id))
            .await
    }

    pub async fn update_twin(
        &self,
        twin_id: Uuid,
        updates: &ProfileUpdate,
    ) -> Result<DigitalTwinProfile> {
        self.update(
            "digital_twins",
            &format!("id=eq.{}", twin_id),
            serde_json::to_value(updates)?,
        )
        .await
    }

    // --- chat_sessions ---

    pub async fn create_session(&self, session: &ChatSession) -> Result<ChatSession> {
        self.insert("chat_sessions", serde_json::to_value(session)?)
            .await
    }

    /// Sessions for a user, most recently updated first
    pub async fn sessions_by_user(&self, user_id: &str) -> Result<Vec<ChatSession>> {
        self.select(
            "chat_sessions",
            &format!("userId=eq.{}&order=updatedAt.desc", user_id),
        )
        .await
    }

    // --- chat_messages ---

    /// Insert a message and publish it on the event bus
    pub async fn insert_message(
        &self,
        session_id: Uuid,
        message: &ChatMessage,
    ) -> Result<ChatMessage> {
        let mut row = serde_json::to_value(message)?;
        row["sessionId"] = serde_json::Value::String(session_id.to_string());

        let stored: ChatMessage = self.insert("chat_messages", row).await?;
        self.bus
            .publish(MessageEvent::inserted(session_id, stored.clone()));
        Ok(stored)
    }

    /// Messages for a session, oldest first
    pub async fn messages_by_session(&self, session_id: Uuid) -> Result<Vec<ChatMessage>> {
        self.select(
            "chat_messages",
            &format!("sessionId=eq.{}&order=timestamp.asc", session_id),
        )
        .await
    }

    // --- REST plumbing ---

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("apikey"),
            HeaderValue::from_str(&self.anon_key)
                .map_err(|_| KindredError::Config("Backend anon key is not valid ASCII".into()))?,
        );
        // ask the backend to echo affected rows back
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("return=representation"),
        );
        Ok(headers)
    }

    async fn insert<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        row: serde_json::Value,
    ) -> Result<T> {
        let rows: Vec<T> = self
            .api
            .request(
                Method::POST,
                &format!("/rest/v1/{}", table),
                Some(row),
                Some(self.headers()?),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| KindredError::Unknown(format!("Insert into {} returned no row", table)))
    }

    async fn select<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Vec<T>> {
        self.api
            .request(
                Method::GET,
                &format!("/rest/v1/{}?{}", table, query),
                None,
                Some(self.headers()?),
            )
            .await
    }

    async fn select_one<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Option<T>> {
        let mut rows: Vec<T> = self.select(table, query).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    async fn update<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
        updates: serde_json::Value,
    ) -> Result<T> {
        let rows: Vec<T> = self
            .api
            .request(
                Method::PATCH,
                &format!("/rest/v1/{}?{}", table, query),
                Some(updates),
                Some(self.headers()?),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| KindredError::Unknown(format!("Update on {} matched no row", table)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn empty_anon_key_rejected() {
        let api = Arc::new(
            ApiClient::new("https://backend.example.com", Arc::new(MemoryStore::new())).unwrap(),
        );
        let result = BackendService::new(api, "", EventBus::new());
        assert!(matches!(result, Err(KindredError::Config(_))));
    }
}
