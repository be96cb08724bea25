//! Common imports for typical harness usage.
pub use crate::{
    AbortHandle, ChatMessage, ChatRequest, CorrectionAttempt, CorrectionStatus, FormatCorrector,
    HarnessError, ModelRef, ReframeOptions, Reframer, RunBuilder, RunStream, StreamEvent,
    WireFrame, builtin_tools,
};
