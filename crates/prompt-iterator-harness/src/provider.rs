use std::pin::Pin;

use crate::content::ChatMessage;
use crate::errors::ProviderError;
use crate::model::{ModelRef, ProviderId, RunOptions};
use crate::tools::ToolSpec;

/// Normalized request handed to a provider adapter.
#[derive(Clone, Debug)]
pub struct ProviderRequest {
    pub run_id: uuid::Uuid,
    pub model: ModelRef,
    pub system_prompt: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub options: RunOptions,
}

/// Raw events produced by a provider adapter, in upstream arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderEvent {
    /// Incremental assistant text.
    TextDelta { text: String },
    /// A fully assembled tool invocation.
    ToolCall {
        id: String,
        name: String,
        args: serde_json::Value,
    },
    /// Upstream finished the response.
    Completed { finish_reason: Option<String> },
}

pub type ProviderEventStream =
    Pin<Box<dyn futures::Stream<Item = Result<ProviderEvent, ProviderError>> + Send + 'static>>;

/// A started provider stream.
pub struct ProviderStreamHandle {
    pub stream: ProviderEventStream,
}

/// Contract implemented by each upstream integration.
///
/// `start_stream` must fail (rather than yield an error event) when the
/// upstream rejects the request outright, so callers can answer with a
/// categorized HTTP status before any frame is written.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn id(&self) -> ProviderId;

    async fn start_stream(&self, req: ProviderRequest)
    -> Result<ProviderStreamHandle, ProviderError>;
}
