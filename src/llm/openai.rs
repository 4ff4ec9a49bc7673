//! OpenAI-compatible chat completion client
//!
//! Requests route through the shared request pipeline, so completion
//! calls get the same retry/backoff treatment as app API calls. The
//! model key overrides the stored bearer token per request.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::{KindredError, Result};
use crate::llm::prompt::{build_system_message, insights_prompt, mood_analysis_prompt};
use crate::llm::{extract_json, GenerateOptions, LanguageModel};
use crate::storage::KeyValueStore;
use crate::types::{clamp_intensity, ChatMessage, DigitalTwinProfile, MoodReading, Role};

pub struct OpenAiChat {
    api: ApiClient,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl OpenAiChat {
    /// `base_url` is the completion API base; `app_api_base` hosts the
    /// token refresh endpoint (refreshes never go to the model provider).
    pub fn new(
        api_key: String,
        base_url: &str,
        app_api_base: &str,
        tokens: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(KindredError::Config(
                "OpenAI API key not configured".to_string(),
            ));
        }
        let api = ApiClient::new(base_url, tokens).map(|c| {
            c.with_refresh_url(format!(
                "{}/auth/refresh",
                app_api_base.trim_end_matches('/')
            ))
        })?;
        Ok(Self { api, api_key })
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        profile: Option<&DigitalTwinProfile>,
        options: &GenerateOptions,
    ) -> Result<String> {
        let system = build_system_message(profile);
        let mut wire: Vec<WireMessage<'_>> = Vec::with_capacity(messages.len() + 1);
        wire.push(WireMessage {
            role: "system",
            content: &system.content,
        });
        for message in messages {
            wire.push(WireMessage {
                role: match message.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                },
                content: &message.content,
            });
        }

        let body = serde_json::json!({
            "model": options.model,
            "messages": wire,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|_| KindredError::Config("API key is not valid ASCII".into()))?,
        );

        let response: CompletionResponse = self
            .api
            .request(Method::POST, "/chat/completions", Some(body), Some(headers))
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| KindredError::Llm("Completion response had no choices".to_string()))
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn generate_response(
        &self,
        messages: &[ChatMessage],
        profile: Option<&DigitalTwinProfile>,
        options: &GenerateOptions,
    ) -> Result<String> {
        self.complete(messages, profile, options).await
    }

    async fn analyze_mood(&self, text: &str) -> Result<MoodReading> {
        let prompt = ChatMessage::user(mood_analysis_prompt(text));
        let options = GenerateOptions {
            temperature: 0.3,
            max_tokens: 100,
            ..GenerateOptions::default()
        };

        let raw = match self.complete(&[prompt], None, &options).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Mood analysis failed, using neutral default");
                return Ok(MoodReading::default());
            }
        };

        Ok(match extract_json(&raw) {
            Some(value) => MoodReading {
                mood: value["mood"]
                    .as_str()
                    .unwrap_or("neutral")
                    .to_string(),
                intensity: clamp_intensity(value["intensity"].as_i64().unwrap_or(5)),
            },
            None => MoodReading::default(),
        })
    }

    async fn personality_insights(&self, profile: &DigitalTwinProfile) -> Result<Vec<String>> {
        let prompt = ChatMessage::user(insights_prompt(profile));
        let options = GenerateOptions {
            temperature: 0.5,
            max_tokens: 300,
            ..GenerateOptions::default()
        };

        let raw = match self.complete(&[prompt], None, &options).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Insight generation failed");
                return Ok(Vec::new());
            }
        };

        Ok(extract_json(&raw)
            .and_then(|value| {
                value.as_array().map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect()
                })
            })
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "openai-chat"
    }
}
