//! Streaming core of the prompt iterator chat proxy.
//!
//! Upstream chat completions are normalized into [`StreamEvent`]s by a
//! [`RunBuilder`], then re-framed into the line-based wire protocol by a
//! [`Reframer`], which validates tool-call arguments and repairs malformed
//! ones through a [`FormatCorrector`] before they reach the client.
//!
//! Vendor-specific APIs are namespaced under `vendors::*`.
//!
//! # Streaming the demo provider
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use prompt_iterator_harness::prelude::*;
//! use prompt_iterator_harness::vendors::demo::DemoProvider;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), HarnessError> {
//! let run = RunBuilder::new(Arc::new(DemoProvider::default()), "demo")
//!     .message(ChatMessage::user("Help me write a prompt"))
//!     .tools(builtin_tools())
//!     .start_stream()
//!     .await?;
//!
//! let corrector: Arc<dyn FormatCorrector> = Arc::new(NoopCorrector);
//! let mut frames = Reframer::new(corrector).spawn(run, ReframeOptions::default());
//! while let Some(Ok(frame)) = frames.next().await {
//!     print!("{}", frame.encode());
//! }
//! # Ok(())
//! # }
//! # struct NoopCorrector;
//! # #[async_trait::async_trait]
//! # impl FormatCorrector for NoopCorrector {
//! #     async fn correct(&self, _: &str, _: &serde_json::Value, i: usize) -> CorrectionAttempt {
//! #         CorrectionAttempt::failed(i, "disabled")
//! #     }
//! # }
//! ```

/// Proxy client: frame accumulation and the streaming request helper.
pub mod client;
/// Chat messages and the proxy request body.
pub mod content;
/// Tool-argument repair loop and its oracle contract.
pub mod corrector;
/// Prompt decorators and preset modes.
pub mod decorators;
/// Public error types used by the harness API.
pub mod errors;
/// Model and provider identifiers plus generic run options.
pub mod model;
/// Common imports for typical usage.
pub mod prelude;
/// Provider adapter contracts used by vendor integrations.
pub mod provider;
/// Event stream to wire frame conversion.
pub mod reframer;
/// Run builder, streaming handle, and cancellation handle.
pub mod run;
/// Normalized public stream events.
pub mod stream;
/// Built-in tool definitions and typed arguments.
pub mod tools;
/// Tool-argument schema checks.
pub mod validator;
/// Vendor-specific integrations.
pub mod vendors;
/// Wire frame codec.
pub mod wire;

pub use client::{AssistantMessage, ChatClient, ClientError, MessageAccumulator, ToolInvocation};
pub use content::{ChatMessage, ChatRequest, MessageContent, Role};
pub use corrector::{
    CorrectionAttempt, CorrectionOutcome, FormatCorrector, MAX_CORRECTION_ATTEMPTS,
    correct_with_retries,
};
pub use decorators::{DecoratorConfig, PresetMode};
pub use errors::{HarnessError, ProviderError, RunFailure};
pub use model::{ModelRef, ProviderId, RunOptions};
pub use provider::{ProviderAdapter, ProviderEvent, ProviderRequest, ProviderStreamHandle};
pub use reframer::{FrameStream, ReframeError, ReframeOptions, ReframeSummary, Reframer};
pub use run::{AbortHandle, RunBuilder, RunStream};
pub use stream::StreamEvent;
pub use tools::{ToolArgs, ToolSpec, builtin_tools};
pub use validator::{ValidationResult, validate};
pub use wire::{CorrectionStatus, WireDecoder, WireError, WireFrame};
