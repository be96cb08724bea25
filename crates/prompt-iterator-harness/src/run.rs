use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::StreamExt as _;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::content::ChatMessage;
use crate::errors::{HarnessError, RunFailure};
use crate::model::{ModelRef, RunOptions};
use crate::provider::{ProviderAdapter, ProviderEvent, ProviderRequest};
use crate::stream::StreamEvent;
use crate::tools::ToolSpec;

/// Handle used to request cancellation of a running stream.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// Cancellation is best-effort and becomes visible as a terminal
    /// `StreamEvent::Error` with `RunFailure::Cancelled`.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Builder for configuring and starting a single chat completion run.
pub struct RunBuilder {
    provider: Arc<dyn ProviderAdapter>,
    model: ModelRef,
    system_prompt: Option<String>,
    messages: Vec<ChatMessage>,
    tools: Vec<ToolSpec>,
    options: RunOptions,
}

impl RunBuilder {
    pub fn new(provider: Arc<dyn ProviderAdapter>, model: impl Into<String>) -> Self {
        let model = ModelRef::new(provider.id(), model);
        Self {
            provider,
            model,
            system_prompt: None,
            messages: Vec::new(),
            tools: Vec::new(),
            options: RunOptions::default(),
        }
    }

    /// Sets the system prompt for the run.
    pub fn system_prompt(mut self, text: impl Into<String>) -> Self {
        self.system_prompt = Some(text.into());
        self
    }

    /// Appends one message to the conversation.
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Replaces the conversation history.
    pub fn messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Sets the tools offered to the model.
    pub fn tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    /// Sets an optional timeout for the upstream HTTP call.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Sets the bounded stream buffer size used between the runtime task and
    /// the consumer.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.options.stream_buffer_capacity = capacity;
        self
    }

    /// Validates the builder state, opens the upstream stream, and spawns the
    /// task that forwards its events.
    ///
    /// Upstream rejections surface here as `HarnessError::Provider`; failures
    /// after the stream is open arrive as a terminal `StreamEvent::Error`.
    pub async fn start_stream(self) -> Result<RunStream, HarnessError> {
        let provider = self.provider.clone();
        let request = self.validate_and_build_request()?;
        let run_id = request.run_id;
        let capacity = request.options.stream_buffer_capacity;
        let tools = request.tools.clone();

        debug!(run_id = %run_id, provider = %request.model.provider, model = %request.model.model, messages = request.messages.len(), "starting run");
        let handle = provider.start_stream(request).await?;

        let (tx, rx) = mpsc::channel(capacity);
        let (abort_tx, abort_rx) = watch::channel(false);
        tokio::spawn(run_task(run_id, handle.stream, tools, tx, abort_rx));

        Ok(RunStream {
            run_id,
            rx,
            abort_handle: AbortHandle { tx: abort_tx },
        })
    }

    fn validate_and_build_request(self) -> Result<ProviderRequest, HarnessError> {
        if self.model.model.trim().is_empty() {
            return Err(HarnessError::Validation("model must not be empty".into()));
        }
        if self.options.stream_buffer_capacity == 0 {
            return Err(HarnessError::Validation(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        // The demo reply is canned and ignores the conversation.
        if self.messages.is_empty() && !self.model.is_demo() {
            return Err(HarnessError::Validation(
                "at least one message is required".into(),
            ));
        }

        Ok(ProviderRequest {
            run_id: uuid::Uuid::new_v4(),
            model: self.model,
            system_prompt: self.system_prompt.filter(|s| !s.trim().is_empty()),
            messages: self.messages,
            tools: self.tools,
            options: self.options,
        })
    }
}

/// Streaming handle returned by `RunBuilder::start_stream`.
///
/// Yields normalized events in upstream order and ends after a terminal
/// `Completed` or `Error`. Dropping it stops the run.
pub struct RunStream {
    run_id: uuid::Uuid,
    rx: mpsc::Receiver<StreamEvent>,
    abort_handle: AbortHandle,
}

impl RunStream {
    /// Returns the run id for this stream.
    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    /// Returns a handle that can cancel the run.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for and returns the next normalized stream event.
    ///
    /// Returns `None` after the stream channel is closed.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }
}

impl futures::Stream for RunStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        self.rx.poll_recv(cx)
    }
}

async fn run_task(
    run_id: uuid::Uuid,
    mut upstream: crate::provider::ProviderEventStream,
    tools: Vec<ToolSpec>,
    tx: mpsc::Sender<StreamEvent>,
    mut abort_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tx.closed() => {
                debug!(run_id = %run_id, "run stream receiver dropped, stopping upstream read");
                return;
            }
            changed = abort_rx.changed() => {
                match changed {
                    Ok(_) if *abort_rx.borrow() => {
                        let _ = send_event(&tx, StreamEvent::Error { error: RunFailure::Cancelled }).await;
                        return;
                    }
                    Ok(_) => {}
                    Err(_) => return,
                }
            }
            next = upstream.next() => {
                match next {
                    Some(Ok(ProviderEvent::TextDelta { text })) => {
                        if text.is_empty() {
                            continue;
                        }
                        if !send_event(&tx, StreamEvent::Text { content: text }).await {
                            return;
                        }
                    }
                    Some(Ok(ProviderEvent::ToolCall { id, name, args })) => {
                        debug!(run_id = %run_id, tool_call_id = %id, tool_name = %name, "provider tool call");
                        let result = tools
                            .iter()
                            .find(|tool| tool.name == name)
                            .and_then(|tool| tool.result.clone());
                        let call = StreamEvent::ToolCall { id: id.clone(), name: name.clone(), args };
                        if !send_event(&tx, call).await {
                            return;
                        }
                        if let Some(result) = result
                            && !send_event(&tx, StreamEvent::ToolResult { id, name, result: serde_json::Value::String(result) }).await
                        {
                            return;
                        }
                    }
                    Some(Ok(ProviderEvent::Completed { finish_reason })) => {
                        let _ = send_event(&tx, StreamEvent::Completed { finish_reason }).await;
                        return;
                    }
                    Some(Err(err)) => {
                        let _ = send_event(&tx, StreamEvent::Error { error: RunFailure::from(&err) }).await;
                        return;
                    }
                    None => {
                        let _ = send_event(&tx, StreamEvent::Completed { finish_reason: None }).await;
                        return;
                    }
                }
            }
        }
    }
}

async fn send_event(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> bool {
    tx.send(event).await.is_ok()
}
