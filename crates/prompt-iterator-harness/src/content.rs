/// Author of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Message content as sent by the browser client.
///
/// Plain strings are the common case; multimodal messages (image uploads,
/// parsed documents) arrive as an array of OpenAI-style content parts and are
/// forwarded upstream untouched.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content.
    Text(String),
    /// Provider-shaped content parts.
    Parts(Vec<serde_json::Value>),
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One entry of the conversation history.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Body of a chat proxy request.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Named decorator preset, see [`crate::decorators::preset`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorators: Option<crate::decorators::DecoratorConfig>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_text_and_part_contents() {
        let messages: Vec<ChatMessage> = serde_json::from_value(serde_json::json!([
            {"role": "user", "content": "hi"},
            {"role": "user", "content": [{"type": "text", "text": "look"}]}
        ]))
        .expect("messages");
        assert_eq!(messages[0], ChatMessage::user("hi"));
        assert!(matches!(messages[1].content, MessageContent::Parts(ref parts) if parts.len() == 1));
    }

    #[test]
    fn rejects_unknown_role() {
        let result: Result<ChatMessage, _> =
            serde_json::from_value(serde_json::json!({"role": "robot", "content": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn chat_request_uses_camel_case_fields() {
        let request: ChatRequest = serde_json::from_value(serde_json::json!({
            "messages": [{"role": "user", "content": "hi"}],
            "systemPrompt": "be brief",
            "preset": "coding"
        }))
        .expect("request");
        assert_eq!(request.system_prompt.as_deref(), Some("be brief"));
        assert_eq!(request.preset.as_deref(), Some("coding"));
        assert!(request.model.is_none());
    }
}
