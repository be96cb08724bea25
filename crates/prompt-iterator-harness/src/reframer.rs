//! Re-encodes normalized run events into wire frames, repairing malformed
//! tool-call arguments on the way through.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::mpsc;
use tracing::{Instrument as _, debug, info, warn};

use crate::corrector::{FormatCorrector, correct_with_retries};
use crate::errors::RunFailure;
use crate::stream::StreamEvent;
use crate::validator::validate;
use crate::wire::{CorrectionStatus, ToolCallFrame, ToolResultFrame, WireFrame};

/// Item type of the re-framed output: a frame, or the error that ends it.
pub type FrameResult = Result<WireFrame, RunFailure>;

/// Counters describing one re-framed stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReframeSummary {
    pub text_frames: usize,
    pub tool_calls: usize,
    pub tool_results: usize,
    pub corrections_attempted: usize,
    pub corrections_succeeded: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ReframeError {
    /// Upstream failed mid-stream.
    #[error(transparent)]
    Upstream(RunFailure),
    /// The consumer went away (client disconnected).
    #[error("frame receiver dropped")]
    ReceiverDropped,
}

/// Options for `Reframer::spawn`.
#[derive(Clone, Debug)]
pub struct ReframeOptions {
    pub buffer_capacity: usize,
    /// Wall-clock budget for the whole stream, corrections included.
    pub budget: Option<Duration>,
}

impl Default for ReframeOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: 128,
            budget: Some(Duration::from_secs(30)),
        }
    }
}

/// Stream re-framer with a bounded argument-repair loop.
///
/// Holds no per-event state: each event is translated and emitted before the
/// next one is read.
#[derive(Clone)]
pub struct Reframer {
    corrector: Arc<dyn FormatCorrector>,
}

impl Reframer {
    pub fn new(corrector: Arc<dyn FormatCorrector>) -> Self {
        Self { corrector }
    }

    /// Consumes `events` in order, sending frames to `sink` as they are
    /// produced.
    ///
    /// Returns when upstream completes or ends. An upstream error is
    /// returned without emitting anything for the failing event.
    pub async fn reframe<S>(
        &self,
        mut events: S,
        sink: &mpsc::Sender<FrameResult>,
    ) -> Result<ReframeSummary, ReframeError>
    where
        S: futures::Stream<Item = StreamEvent> + Unpin,
    {
        let mut summary = ReframeSummary::default();
        while let Some(event) = events.next().await {
            match event {
                StreamEvent::Text { content } => {
                    emit(sink, WireFrame::Text(content)).await?;
                    summary.text_frames += 1;
                }
                StreamEvent::ToolCall { id, name, args } => {
                    let args = self.checked_args(&name, args, sink, &mut summary).await?;
                    let frame = WireFrame::ToolCall(ToolCallFrame {
                        tool_call_id: id,
                        tool_name: name,
                        args,
                    });
                    emit(sink, frame).await?;
                    summary.tool_calls += 1;
                }
                StreamEvent::ToolResult { id, name, result } => {
                    let frame = WireFrame::ToolResult(ToolResultFrame {
                        tool_call_id: id,
                        tool_name: name,
                        result,
                    });
                    emit(sink, frame).await?;
                    summary.tool_results += 1;
                }
                StreamEvent::Completed { finish_reason } => {
                    debug!(finish_reason = finish_reason.as_deref().unwrap_or("none"), "upstream completed");
                    break;
                }
                StreamEvent::Error { error } => return Err(ReframeError::Upstream(error)),
            }
        }
        Ok(summary)
    }

    /// Returns the arguments to forward for one tool call, running the
    /// repair loop (and its status frames) when validation fails.
    async fn checked_args(
        &self,
        tool_name: &str,
        args: serde_json::Value,
        sink: &mpsc::Sender<FrameResult>,
        summary: &mut ReframeSummary,
    ) -> Result<serde_json::Value, ReframeError> {
        let validation = validate(tool_name, &args);
        if validation.valid {
            return Ok(args);
        }
        warn!(
            tool_name,
            error = validation.error.as_deref().unwrap_or("unknown"),
            "tool call arguments failed validation, correcting"
        );
        emit(sink, WireFrame::Correction(CorrectionStatus::Correcting)).await?;
        let outcome = correct_with_retries(self.corrector.as_ref(), tool_name, &args).await;
        summary.corrections_attempted += outcome.attempts.len();
        if outcome.corrected {
            summary.corrections_succeeded += 1;
            emit(sink, WireFrame::Correction(CorrectionStatus::Success)).await?;
        } else {
            warn!(tool_name, attempts = outcome.attempts.len(), "tool call repair failed, forwarding original arguments");
            emit(sink, WireFrame::Correction(CorrectionStatus::Failed)).await?;
        }
        Ok(outcome.args)
    }

    /// Re-frames `events` on a background task and returns the frame stream.
    ///
    /// The task ends when upstream completes, fails, exceeds the budget, or
    /// the returned stream is dropped. Failures are delivered as a final
    /// `Err` item.
    pub fn spawn<S>(self, events: S, options: ReframeOptions) -> FrameStream
    where
        S: futures::Stream<Item = StreamEvent> + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(options.buffer_capacity.max(1));
        let task = async move {
            let bounded = async {
                match options.budget {
                    Some(budget) => {
                        match tokio::time::timeout(budget, self.reframe(events, &tx)).await {
                            Ok(result) => result,
                            Err(_) => Err(ReframeError::Upstream(RunFailure::TimedOut {
                                seconds: budget.as_secs(),
                            })),
                        }
                    }
                    None => self.reframe(events, &tx).await,
                }
            };
            // A stalled upstream must not outlive the client.
            let result = tokio::select! {
                result = bounded => result,
                _ = tx.closed() => Err(ReframeError::ReceiverDropped),
            };
            match result {
                Ok(summary) => info!(
                    text_frames = summary.text_frames,
                    tool_calls = summary.tool_calls,
                    tool_results = summary.tool_results,
                    corrections_attempted = summary.corrections_attempted,
                    corrections_succeeded = summary.corrections_succeeded,
                    "stream finished"
                ),
                Err(ReframeError::ReceiverDropped) => {
                    debug!("client went away, stream torn down");
                }
                Err(ReframeError::Upstream(failure)) => {
                    warn!(error = %failure, "stream ended with error");
                    let _ = tx.send(Err(failure)).await;
                }
            }
        };
        tokio::spawn(task.instrument(tracing::Span::current()));
        FrameStream { rx }
    }
}

async fn emit(sink: &mpsc::Sender<FrameResult>, frame: WireFrame) -> Result<(), ReframeError> {
    sink.send(Ok(frame))
        .await
        .map_err(|_| ReframeError::ReceiverDropped)
}

/// Output of `Reframer::spawn`.
pub struct FrameStream {
    rx: mpsc::Receiver<FrameResult>,
}

impl futures::Stream for FrameStream {
    type Item = FrameResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<FrameResult>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corrector::{CorrectionAttempt, MAX_CORRECTION_ATTEMPTS};
    use crate::tools::{PROPOSE_PROMPT, SUGGEST_ENHANCEMENTS};
    use futures::stream;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Sets its flag when the upstream stream holding it is dropped.
    struct ReleaseFlag(Arc<AtomicBool>);

    impl Drop for ReleaseFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Corrector that returns `fix` on the attempt index `succeed_on`, or
    /// always fails when `succeed_on` is `None`.
    struct FakeCorrector {
        succeed_on: Option<usize>,
        fix: serde_json::Value,
        calls: AtomicUsize,
    }

    impl FakeCorrector {
        fn failing() -> Arc<Self> {
            Arc::new(Self {
                succeed_on: None,
                fix: json!(null),
                calls: AtomicUsize::new(0),
            })
        }

        fn fixing_on(attempt: usize, fix: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                succeed_on: Some(attempt),
                fix,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl FormatCorrector for FakeCorrector {
        async fn correct(
            &self,
            _tool_name: &str,
            _invalid_args: &serde_json::Value,
            attempt_index: usize,
        ) -> CorrectionAttempt {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed_on == Some(attempt_index) {
                CorrectionAttempt::succeeded(attempt_index, self.fix.clone())
            } else {
                CorrectionAttempt::failed(attempt_index, "oracle unreachable")
            }
        }
    }

    fn valid_proposal() -> serde_json::Value {
        json!({
            "title": "Essay", "role": "editor", "objective": "improve",
            "constraints": ["concise"], "finalPrompt": "You are an editor."
        })
    }

    fn tool_call(id: &str, name: &str, args: serde_json::Value) -> StreamEvent {
        StreamEvent::ToolCall {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    async fn run(corrector: Arc<dyn FormatCorrector>, events: Vec<StreamEvent>) -> Vec<FrameResult> {
        Reframer::new(corrector)
            .spawn(stream::iter(events), ReframeOptions::default())
            .collect()
            .await
    }

    fn frames(results: Vec<FrameResult>) -> Vec<WireFrame> {
        results
            .into_iter()
            .map(|r| r.expect("no stream error"))
            .collect()
    }

    #[tokio::test]
    async fn text_is_forwarded_verbatim_without_coalescing() {
        let out = frames(
            run(
                FakeCorrector::failing(),
                vec![
                    StreamEvent::Text { content: "Hello".into() },
                    StreamEvent::Text { content: " world".into() },
                    StreamEvent::Completed { finish_reason: None },
                ],
            )
            .await,
        );
        assert_eq!(
            out,
            vec![WireFrame::Text("Hello".into()), WireFrame::Text(" world".into())]
        );
    }

    #[tokio::test]
    async fn valid_tool_call_has_no_status_frames_and_identical_args() {
        let corrector = FakeCorrector::failing();
        let out = frames(
            run(
                corrector.clone(),
                vec![
                    tool_call("c1", PROPOSE_PROMPT, valid_proposal()),
                    StreamEvent::ToolResult {
                        id: "c1".into(),
                        name: PROPOSE_PROMPT.into(),
                        result: json!("Prompt proposal generated"),
                    },
                ],
            )
            .await,
        );
        assert_eq!(out.len(), 2);
        let WireFrame::ToolCall(call) = &out[0] else {
            panic!("expected tool call frame, got {:?}", out[0]);
        };
        assert_eq!(
            serde_json::to_string(&call.args).expect("args"),
            serde_json::to_string(&valid_proposal()).expect("original")
        );
        assert!(matches!(&out[1], WireFrame::ToolResult(r) if r.tool_call_id == "c1"));
        assert_eq!(corrector.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_corrections_forward_original_args_after_failed_status() {
        let corrector = FakeCorrector::failing();
        let broken = json!("{\"dimensions\": [");
        let out = frames(
            run(
                corrector.clone(),
                vec![tool_call("c1", SUGGEST_ENHANCEMENTS, broken.clone())],
            )
            .await,
        );
        assert_eq!(
            out,
            vec![
                WireFrame::Correction(CorrectionStatus::Correcting),
                WireFrame::Correction(CorrectionStatus::Failed),
                WireFrame::ToolCall(ToolCallFrame {
                    tool_call_id: "c1".into(),
                    tool_name: SUGGEST_ENHANCEMENTS.into(),
                    args: broken,
                }),
            ]
        );
        assert_eq!(
            corrector.calls.load(Ordering::SeqCst),
            MAX_CORRECTION_ATTEMPTS
        );
    }

    #[tokio::test]
    async fn successful_correction_replaces_args_and_stops_retrying() {
        let corrector = FakeCorrector::fixing_on(1, valid_proposal());
        let out = frames(
            run(
                corrector.clone(),
                vec![tool_call("c9", PROPOSE_PROMPT, json!({"title": "Essay"}))],
            )
            .await,
        );
        assert_eq!(
            out,
            vec![
                WireFrame::Correction(CorrectionStatus::Correcting),
                WireFrame::Correction(CorrectionStatus::Success),
                WireFrame::ToolCall(ToolCallFrame {
                    tool_call_id: "c9".into(),
                    tool_name: PROPOSE_PROMPT.into(),
                    args: valid_proposal(),
                }),
            ]
        );
        assert_eq!(corrector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn every_tool_call_yields_exactly_one_call_frame() {
        let events = vec![
            StreamEvent::Text { content: "a".into() },
            tool_call("1", PROPOSE_PROMPT, valid_proposal()),
            tool_call("2", PROPOSE_PROMPT, json!([])),
            tool_call("3", "unknown_tool", json!("whatever")),
            tool_call("4", SUGGEST_ENHANCEMENTS, json!({"dimensions": []})),
            StreamEvent::Completed { finish_reason: Some("tool_calls".into()) },
        ];
        let out = frames(run(FakeCorrector::failing(), events).await);
        let ids: Vec<_> = out
            .iter()
            .filter_map(|f| match f {
                WireFrame::ToolCall(call) => Some(call.tool_call_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
        let statuses = out
            .iter()
            .filter(|f| matches!(f, WireFrame::Correction(_)))
            .count();
        assert_eq!(statuses, 2);
    }

    #[tokio::test]
    async fn upstream_error_ends_stream_with_error_after_prior_frames() {
        let out = run(
            FakeCorrector::failing(),
            vec![
                StreamEvent::Text { content: "partial".into() },
                StreamEvent::Error {
                    error: RunFailure::Transport {
                        provider: "openai".into(),
                        message: "reset".into(),
                    },
                },
                StreamEvent::Text { content: "never".into() },
            ],
        )
        .await;
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], Ok(WireFrame::Text(t)) if t == "partial"));
        assert!(matches!(&out[1], Err(RunFailure::Transport { .. })));
    }

    #[tokio::test]
    async fn events_after_completion_are_ignored() {
        let out = frames(
            run(
                FakeCorrector::failing(),
                vec![
                    StreamEvent::Completed { finish_reason: None },
                    StreamEvent::Text { content: "late".into() },
                ],
            )
            .await,
        );
        assert!(out.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn budget_expiry_ends_stream_with_timeout() {
        let events = stream::iter(vec![StreamEvent::Text { content: "a".into() }])
            .chain(stream::pending());
        let out: Vec<FrameResult> = Reframer::new(FakeCorrector::failing())
            .spawn(
                Box::pin(events),
                ReframeOptions {
                    buffer_capacity: 8,
                    budget: Some(Duration::from_secs(30)),
                },
            )
            .collect()
            .await;
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[1], Err(RunFailure::TimedOut { seconds: 30 })));
    }

    #[tokio::test]
    async fn dropping_the_frame_stream_releases_a_stalled_upstream() {
        let released = Arc::new(AtomicBool::new(false));
        let guard = ReleaseFlag(released.clone());
        let events = stream::iter(vec![StreamEvent::Text { content: "a".into() }])
            .chain(stream::pending())
            .map(move |event| {
                let _ = &guard;
                event
            });
        let mut frames = Reframer::new(FakeCorrector::failing()).spawn(
            Box::pin(events),
            ReframeOptions {
                buffer_capacity: 8,
                budget: None,
            },
        );
        assert!(matches!(frames.next().await, Some(Ok(WireFrame::Text(_)))));
        drop(frames);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !released.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("upstream released after the client went away");
    }
}
