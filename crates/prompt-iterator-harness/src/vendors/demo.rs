//! Offline provider used when the client sends the `demo` API key.

use std::time::Duration;

use futures::StreamExt as _;
use futures::stream;

use crate::corrector::{CorrectionAttempt, FormatCorrector};
use crate::errors::ProviderError;
use crate::model::ProviderId;
use crate::provider::{ProviderAdapter, ProviderEvent, ProviderRequest, ProviderStreamHandle};

/// API key value that selects the demo provider.
pub const DEMO_API_KEY: &str = "demo";

/// Canned reply streamed in demo mode.
pub const DEMO_TEXT: &str = "[Demo mode]\n\n\
This is a simulated reply. In live mode I would call tools to build a structured prompt. \
No real API key is configured, so only the text streaming effect is shown.\n\n\
Enter an OpenAI or DeepSeek key in Settings to try the full experience.";

/// Streams `DEMO_TEXT` one character per event without any network I/O.
#[derive(Clone, Debug)]
pub struct DemoProvider {
    delay: Duration,
}

impl DemoProvider {
    /// Creates a provider that pauses `delay` between characters.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for DemoProvider {
    fn default() -> Self {
        Self::new(Duration::from_millis(20))
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for DemoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::DEMO
    }

    async fn start_stream(
        &self,
        req: ProviderRequest,
    ) -> Result<ProviderStreamHandle, ProviderError> {
        tracing::debug!(run_id = %req.run_id, "serving demo response");
        let delay = self.delay;
        let chars = stream::iter(DEMO_TEXT.chars()).then(move |c| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, ProviderError>(ProviderEvent::TextDelta {
                text: c.to_string(),
            })
        });
        let done = stream::once(async {
            Ok::<_, ProviderError>(ProviderEvent::Completed {
                finish_reason: Some("stop".into()),
            })
        });
        Ok(ProviderStreamHandle {
            stream: Box::pin(chars.chain(done)),
        })
    }
}

/// Corrector for demo runs, which have no model to repair with.
#[derive(Clone, Copy, Debug, Default)]
pub struct DemoCorrector;

#[async_trait::async_trait]
impl FormatCorrector for DemoCorrector {
    async fn correct(
        &self,
        _tool_name: &str,
        _invalid_args: &serde_json::Value,
        attempt_index: usize,
    ) -> CorrectionAttempt {
        CorrectionAttempt::failed(attempt_index, "demo mode has no correction model")
    }
}
