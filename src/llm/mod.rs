//! Language-model wrapper
//!
//! Supports two backends, chosen once at construction:
//! - OpenAI-compatible chat completions - requires an API key
//! - Offline deterministic stub - no external dependencies
//!
//! The trait is the seam: the chat layer only sees `dyn LanguageModel`.

mod offline;
mod openai;
mod prompt;

pub use offline::OfflineTwin;
pub use openai::OpenAiChat;
pub use prompt::build_system_message;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Result;
use crate::storage::KeyValueStore;
use crate::types::{ChatMessage, DigitalTwinProfile, MoodReading};

/// Response-generation options
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub model: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
            model: "gpt-4".to_string(),
        }
    }
}

/// Trait for language-model backends
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate an assistant reply for the conversation, shaped by the
    /// profile when one exists
    async fn generate_response(
        &self,
        messages: &[ChatMessage],
        profile: Option<&DigitalTwinProfile>,
        options: &GenerateOptions,
    ) -> Result<String>;

    /// Classify the emotional tone of a text. Never fails hard: parse
    /// problems yield the neutral default.
    async fn analyze_mood(&self, text: &str) -> Result<MoodReading>;

    /// Derive a short list of personality insights from the profile.
    /// Parse problems yield an empty list.
    async fn personality_insights(&self, profile: &DigitalTwinProfile) -> Result<Vec<String>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Select a backend from configuration: the real client when an API key
/// is present, the offline stub otherwise.
pub fn create_language_model(
    config: &Config,
    tokens: Arc<dyn KeyValueStore>,
) -> Result<Arc<dyn LanguageModel>> {
    match &config.openai_api_key {
        Some(api_key) => {
            tracing::info!(base_url = %config.openai_base_url, "Using OpenAI-compatible language model");
            Ok(Arc::new(OpenAiChat::new(
                api_key.clone(),
                &config.openai_base_url,
                &config.api_base_url,
                tokens,
            )?))
        }
        None => {
            tracing::info!("No language-model API key configured, using offline twin");
            Ok(Arc::new(OfflineTwin::new()))
        }
    }
}

/// Extract a JSON value from raw model output, tolerating a fenced
/// ```json block around it
pub(crate) fn extract_json(raw: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str(raw.trim()) {
        return Some(value);
    }
    let start = raw.find("```json")? + 7;
    let end = raw[start..].find("```")?;
    serde_json::from_str(raw[start..start + end].trim()).ok()
}
