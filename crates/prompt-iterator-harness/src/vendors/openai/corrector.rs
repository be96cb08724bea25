use crate::corrector::{CorrectionAttempt, FormatCorrector, correction_prompt, parse_corrected_json};
use crate::errors::HarnessError;

use super::config::OpenAiClientConfig;

/// Model used for argument repair unless the caller picks another.
pub const DEFAULT_CORRECTION_MODEL: &str = "grok-beta-fast";

/// Repairs tool-call arguments with a single non-streaming chat completion.
pub struct OpenAiCorrector {
    client: reqwest::Client,
    config: OpenAiClientConfig,
    model: String,
}

impl OpenAiCorrector {
    pub fn new(
        client: reqwest::Client,
        config: OpenAiClientConfig,
        model: impl Into<String>,
    ) -> Result<Self, HarnessError> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(HarnessError::Config("correction model must not be empty".into()));
        }
        Ok(Self {
            client,
            config,
            model,
        })
    }

    async fn request_repair(
        &self,
        tool_name: &str,
        invalid_args: &serde_json::Value,
    ) -> Result<serde_json::Value, String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": correction_prompt(tool_name, invalid_args) }
            ],
            "temperature": 0,
        });
        let response = self
            .client
            .post(self.config.chat_completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("correction request failed: {e}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("correction request failed with status {status}"));
        }
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("correction response is not JSON: {e}"))?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        parse_corrected_json(content)
    }
}

#[async_trait::async_trait]
impl FormatCorrector for OpenAiCorrector {
    async fn correct(
        &self,
        tool_name: &str,
        invalid_args: &serde_json::Value,
        attempt_index: usize,
    ) -> CorrectionAttempt {
        tracing::debug!(tool_name, attempt = attempt_index, model = %self.model, "requesting argument repair");
        match self.request_repair(tool_name, invalid_args).await {
            Ok(corrected) => CorrectionAttempt::succeeded(attempt_index, corrected),
            Err(error) => CorrectionAttempt::failed(attempt_index, error),
        }
    }
}
