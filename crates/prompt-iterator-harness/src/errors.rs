use crate::model::ProviderId;

/// Failure raised by a provider adapter, either while opening the upstream
/// stream or while reading it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Upstream answered, but with an error (non-2xx status or an in-stream
    /// `error` object).
    #[error("{provider} rejected the request: {message}")]
    Provider {
        provider: ProviderId,
        message: String,
        status_code: Option<u16>,
    },
    /// Upstream could not be reached or the connection dropped mid-body.
    #[error("{provider} unreachable: {message}")]
    Transport {
        provider: ProviderId,
        message: String,
    },
    /// Upstream sent bytes that are not a valid chat-completions stream.
    #[error("{provider} sent a malformed stream: {message}")]
    Protocol {
        provider: ProviderId,
        message: String,
    },
}

impl ProviderError {
    pub fn provider(
        provider: impl Into<ProviderId>,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status_code,
        }
    }

    pub fn transport(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn protocol(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Protocol {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn provider_id(&self) -> &ProviderId {
        let (Self::Provider { provider, .. }
        | Self::Transport { provider, .. }
        | Self::Protocol { provider, .. }) = self;
        provider
    }

    pub fn message(&self) -> &str {
        let (Self::Provider { message, .. }
        | Self::Transport { message, .. }
        | Self::Protocol { message, .. }) = self;
        message
    }

    /// HTTP status of a rejected request, if the upstream sent one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Provider { status_code, .. } => *status_code,
            Self::Transport { .. } | Self::Protocol { .. } => None,
        }
    }
}

/// Terminal in-stream failure. Once one is reported the stream ends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunFailure {
    #[error("upstream {provider} failed: {message}")]
    Provider { provider: String, message: String },
    #[error("upstream {provider} connection lost: {message}")]
    Transport { provider: String, message: String },
    #[error("malformed upstream stream: {message}")]
    Protocol { message: String },
    /// The response exceeded its wall-clock budget.
    #[error("response budget of {seconds}s exceeded")]
    TimedOut { seconds: u64 },
    #[error("run cancelled")]
    Cancelled,
}

impl From<&ProviderError> for RunFailure {
    fn from(err: &ProviderError) -> Self {
        let provider = err.provider_id().to_string();
        let message = err.message().to_string();
        match err {
            ProviderError::Provider { .. } => Self::Provider { provider, message },
            ProviderError::Transport { .. } => Self::Transport { provider, message },
            ProviderError::Protocol { .. } => Self::Protocol {
                message: format!("{provider}: {message}"),
            },
        }
    }
}

/// Errors returned before a run starts streaming.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    #[error("config error: {0}")]
    Config(String),
    /// The request itself is unusable (no messages, blank model).
    #[error("validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
