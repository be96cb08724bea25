//! Consumer side of the wire protocol: folds frames into an assistant
//! message and drives a streaming request against the proxy.

use futures::StreamExt;
use serde_json::Value;

use crate::content::ChatRequest;
use crate::wire::{CorrectionStatus, ToolCallFrame, WireDecoder, WireError, WireFrame};

/// A tool call with its result, once one arrives.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocation {
    pub call: ToolCallFrame,
    pub result: Option<Value>,
}

/// The assistant turn reconstructed from a frame stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssistantMessage {
    pub content: String,
    pub tool_invocations: Vec<ToolInvocation>,
    pub corrections: Vec<CorrectionStatus>,
}

impl AssistantMessage {
    /// Most recent correction status, if any was reported.
    pub fn last_correction(&self) -> Option<CorrectionStatus> {
        self.corrections.last().copied()
    }
}

#[derive(Debug, Default)]
pub struct MessageAccumulator {
    message: AssistantMessage,
}

impl MessageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: WireFrame) {
        match frame {
            WireFrame::Text(text) => self.message.content.push_str(&text),
            WireFrame::ToolCall(call) => self
                .message
                .tool_invocations
                .push(ToolInvocation { call, result: None }),
            WireFrame::ToolResult(result) => {
                // Results for unknown call ids are dropped.
                if let Some(invocation) = self
                    .message
                    .tool_invocations
                    .iter_mut()
                    .rev()
                    .find(|inv| inv.call.tool_call_id == result.tool_call_id)
                {
                    invocation.result = Some(result.result);
                }
            }
            WireFrame::Correction(status) => self.message.corrections.push(status),
        }
    }

    pub fn message(&self) -> &AssistantMessage {
        &self.message
    }

    pub fn finish(self) -> AssistantMessage {
        self.message
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("proxy returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("request failed")]
    Stream,
}

/// Streaming client for the chat proxy route.
#[derive(Clone, Debug)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    base_url: Option<String>,
    correction_model: Option<String>,
}

impl ChatClient {
    /// `proxy_url` is the proxy origin; requests go to `{proxy_url}/api/chat`.
    pub fn new(proxy_url: &str, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), proxy_url, api_key)
    }

    pub fn with_client(
        http: reqwest::Client,
        proxy_url: &str,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint: format!("{}/api/chat", proxy_url.trim_end_matches('/')),
            api_key: api_key.into(),
            base_url: None,
            correction_model: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn correction_model(mut self, model: impl Into<String>) -> Self {
        self.correction_model = Some(model.into());
        self
    }

    /// Sends `request` and feeds every decoded frame to `on_frame` as it
    /// arrives. Returns the fully accumulated message.
    pub async fn send<F>(
        &self,
        request: &ChatRequest,
        mut on_frame: F,
    ) -> Result<AssistantMessage, ClientError>
    where
        F: FnMut(&WireFrame),
    {
        let mut builder = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(request);
        if let Some(base_url) = &self.base_url {
            builder = builder.header("x-base-url", base_url);
        }
        if let Some(model) = &self.correction_model {
            builder = builder.header("x-correction-model", model);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut decoder = WireDecoder::default();
        let mut accumulator = MessageAccumulator::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|err| {
                tracing::warn!(error = %err, "chat stream interrupted");
                ClientError::Stream
            })?;
            for frame in decoder.push_chunk(&chunk)? {
                on_frame(&frame);
                accumulator.push(frame);
            }
        }
        if let Some(frame) = decoder.finish()? {
            on_frame(&frame);
            accumulator.push(frame);
        }

        Ok(accumulator.finish())
    }
}
