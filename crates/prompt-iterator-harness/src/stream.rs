use crate::errors::RunFailure;

/// Normalized stream events exposed by `RunStream`.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Incremental text output chunk.
    Text { content: String },
    /// Tool invocation with its (possibly malformed) arguments.
    ToolCall {
        id: String,
        name: String,
        args: serde_json::Value,
    },
    /// Result bound to an earlier tool invocation.
    ToolResult {
        id: String,
        name: String,
        result: serde_json::Value,
    },
    /// Terminal success event.
    Completed { finish_reason: Option<String> },
    /// Terminal failure event.
    Error { error: RunFailure },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completion_and_error_are_terminal() {
        assert!(!StreamEvent::Text { content: "x".into() }.is_terminal());
        assert!(StreamEvent::Completed { finish_reason: None }.is_terminal());
        assert!(StreamEvent::Error { error: RunFailure::Cancelled }.is_terminal());
    }
}
