use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

/// Name of the backend serving a run: `openai` for any OpenAI-compatible
/// endpoint, `demo` for the offline canned reply.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ProviderId(Cow<'static, str>);

impl ProviderId {
    pub const OPENAI: Self = Self(Cow::Borrowed("openai"));
    pub const DEMO: Self = Self(Cow::Borrowed("demo"));

    pub fn new(value: impl Into<String>) -> Self {
        Self(Cow::Owned(value.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Upstream model a chat request is routed to.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelRef {
    pub provider: ProviderId,
    /// Model name as the upstream knows it (`gpt-4-turbo`, `deepseek-chat`).
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: impl Into<ProviderId>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    pub fn is_demo(&self) -> bool {
        self.provider == ProviderId::DEMO
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Per-run knobs shared by every provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Deadline for the whole upstream HTTP exchange, body included.
    pub timeout: Option<Duration>,
    /// Events buffered between the upstream reader and the consumer.
    pub stream_buffer_capacity: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            stream_buffer_capacity: 128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_ref_displays_provider_and_model() {
        let model = ModelRef::new(ProviderId::OPENAI, "gpt-4-turbo");
        assert_eq!(model.to_string(), "openai/gpt-4-turbo");
        assert!(!model.is_demo());
        assert!(ModelRef::new("demo", "any").is_demo());
    }

    #[test]
    fn provider_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ProviderId::DEMO).expect("serialize");
        assert_eq!(json, "\"demo\"");
        assert_eq!(RunOptions::default().stream_buffer_capacity, 128);
    }
}
