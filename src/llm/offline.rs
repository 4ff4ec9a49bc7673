//! Offline deterministic language model
//!
//! Keyword-driven responder used when no API key is configured. The same
//! input always produces the same output, which keeps demos and tests
//! reproducible.

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::{GenerateOptions, LanguageModel};
use crate::types::{ChatMessage, DigitalTwinProfile, MoodReading, Role};

#[derive(Debug, Default)]
pub struct OfflineTwin;

impl OfflineTwin {
    pub fn new() -> Self {
        Self
    }

    fn respond(input: &str, profile: Option<&DigitalTwinProfile>) -> String {
        let lower = input.to_lowercase();

        if ["hello", "hi ", "hi!", "hey"].iter().any(|k| lower.starts_with(k) || lower == "hi") {
            return match profile {
                Some(p) => format!(
                    "Hey! Good to hear from you. I've been thinking about {} lately - what's on your mind?",
                    p.personality.interests.first().map(String::as_str).unwrap_or("our last chat")
                ),
                None => "Hey! Good to hear from you. What's on your mind?".to_string(),
            };
        }

        if ["sad", "down", "anxious", "stressed", "worried", "tired"]
            .iter()
            .any(|k| lower.contains(k))
        {
            return "That sounds heavy. I'm here with you - do you want to talk through \
                    what's weighing on you, or would a distraction help more right now?"
                .to_string();
        }

        if ["goal", "plan", "help me", "how do i", "how can i"]
            .iter()
            .any(|k| lower.contains(k))
        {
            return "Let's break that down together. What would the smallest useful first \
                    step look like? Once we have that, the rest tends to follow."
                .to_string();
        }

        if lower.contains("thank") {
            return "Anytime - that's what I'm here for.".to_string();
        }

        format!(
            "I hear you: \"{}\". Tell me more about what led you there?",
            input.trim()
        )
    }
}

#[async_trait]
impl LanguageModel for OfflineTwin {
    async fn generate_response(
        &self,
        messages: &[ChatMessage],
        profile: Option<&DigitalTwinProfile>,
        _options: &GenerateOptions,
    ) -> Result<String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        Ok(Self::respond(last_user, profile))
    }

    async fn analyze_mood(&self, text: &str) -> Result<MoodReading> {
        let lower = text.to_lowercase();
        let (mood, intensity) = if ["great", "happy", "excited", "awesome", "love"]
            .iter()
            .any(|k| lower.contains(k))
        {
            ("happy", 8)
        } else if ["sad", "down", "depressed", "cry"].iter().any(|k| lower.contains(k)) {
            ("sad", 3)
        } else if ["anxious", "worried", "nervous", "stressed"]
            .iter()
            .any(|k| lower.contains(k))
        {
            ("anxious", 4)
        } else if ["angry", "furious", "annoyed", "frustrated"]
            .iter()
            .any(|k| lower.contains(k))
        {
            ("frustrated", 4)
        } else {
            ("neutral", 5)
        };

        Ok(MoodReading {
            mood: mood.to_string(),
            intensity,
        })
    }

    async fn personality_insights(&self, profile: &DigitalTwinProfile) -> Result<Vec<String>> {
        let mut insights = Vec::new();
        if !profile.personality.traits.is_empty() {
            insights.push(format!(
                "Your twin leans {} in conversation",
                profile.personality.traits.join(", ")
            ));
        }
        if !profile.personality.interests.is_empty() {
            insights.push(format!(
                "Conversations keep returning to {}",
                profile.personality.interests.join(" and ")
            ));
        }
        if profile.memory.conversations.len() >= 20 {
            insights.push("You check in regularly - the twin has plenty of context".to_string());
        }
        Ok(insights)
    }

    fn name(&self) -> &str {
        "offline-twin"
    }
}
