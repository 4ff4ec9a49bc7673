//! Prompt construction for the language model

use crate::types::{ChatMessage, DigitalTwinProfile, Role};

const GENERIC_SYSTEM: &str =
    "You are a helpful AI assistant. Be friendly, empathetic, and provide thoughtful responses.";

/// Render the system message from the digital twin profile, or the
/// generic assistant prompt when no profile exists.
pub fn build_system_message(profile: Option<&DigitalTwinProfile>) -> ChatMessage {
    let content = match profile {
        None => GENERIC_SYSTEM.to_string(),
        Some(profile) => {
            let p = &profile.personality;
            let s = &profile.settings;
            format!(
                "You are a digital twin AI assistant with the following characteristics:\n\n\
                 Personality Traits: {}\n\
                 Communication Style: {}\n\
                 Interests: {}\n\
                 Goals: {}\n\n\
                 Response Settings:\n\
                 - Length: {}\n\
                 - Formality: {}\n\
                 - Preferred Topics: {}\n\n\
                 Remember previous conversations and adapt your responses based on the user's \
                 communication patterns and preferences. Be consistent with your personality \
                 while remaining helpful and engaging.",
                p.traits.join(", "),
                p.communication_style,
                p.interests.join(", "),
                p.goals.join(", "),
                s.response_length,
                s.formality,
                s.topics.join(", "),
            )
        }
    };
    ChatMessage::new(Role::System, content)
}

/// Prompt asking the model to classify emotional tone as JSON
pub fn mood_analysis_prompt(text: &str) -> String {
    format!(
        "Analyze the emotional tone of this text and respond with a JSON object containing:\n\
         - mood: a single word describing the primary emotion (e.g., \"happy\", \"sad\", \"anxious\", \"excited\")\n\
         - intensity: a number from 1-10 indicating the intensity of the emotion\n\n\
         Text: \"{}\"\n\n\
         Respond only with valid JSON.",
        text
    )
}

/// Prompt asking the model for personality insights as a JSON string array
pub fn insights_prompt(profile: &DigitalTwinProfile) -> String {
    let recent_conversations = profile
        .memory
        .conversations
        .iter()
        .rev()
        .take(10)
        .rev()
        .cloned()
        .collect::<Vec<_>>()
        .join(" | ");
    let recent_moods = profile
        .memory
        .mood_history
        .iter()
        .rev()
        .take(5)
        .rev()
        .map(|m| format!("{}({})", m.mood, m.intensity))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Based on this digital twin profile, provide 3-5 insights about the user's \
         personality and behavior patterns:\n\n\
         Personality: {}\n\
         Communication Style: {}\n\
         Interests: {}\n\
         Goals: {}\n\
         Recent Conversations: {}\n\
         Mood History: {}\n\n\
         Provide insights as a JSON array of strings.",
        profile.personality.traits.join(", "),
        profile.personality.communication_style,
        profile.personality.interests.join(", "),
        profile.personality.goals.join(", "),
        recent_conversations,
        recent_moods,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_system_message_without_profile() {
        let msg = build_system_message(None);
        assert_eq!(msg.role, Role::System);
        assert!(msg.content.contains("helpful AI assistant"));
    }

    #[test]
    fn profile_system_message_carries_settings() {
        let profile = DigitalTwinProfile::with_defaults("u1");
        let msg = build_system_message(Some(&profile));
        assert!(msg.content.contains("curious, empathetic, analytical"));
        assert!(msg.content.contains("Length: medium"));
        assert!(msg.content.contains("Formality: casual"));
    }
}
