use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use prompt_iterator_harness::{HarnessError, ProviderError};

/// Request failures reported before the stream starts, as plain-text bodies.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid JSON in request body")]
    InvalidJson,
    #[error("Missing or invalid messages array")]
    InvalidMessages,
    #[error("{0}")]
    BadRequest(String),
    #[error("Configuration Error: Missing API Key. Please configure it in Settings.")]
    MissingApiKey,
    #[error("Configuration Error: {0}")]
    Config(String),
    #[error("Connection Failed: Could not reach {base_url}. Please check your Base URL settings.")]
    ConnectionFailed { base_url: String },
    #[error("Authentication Failed: Invalid API Key for {base_url}.")]
    AuthenticationFailed { base_url: String },
    #[error(
        "Model Not Found: The model '{model}' does not exist on this provider, or the Base URL path is incorrect."
    )]
    ModelNotFound { model: String },
    #[error("AI Error: {0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidJson | Self::InvalidMessages | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::MissingApiKey | Self::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
            Self::ConnectionFailed { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Config(_) | Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps a failure to start a run against `base_url`/`model`.
    pub fn from_harness(err: HarnessError, base_url: &str, model: &str) -> Self {
        match err {
            HarnessError::Validation(message) => Self::BadRequest(message),
            HarnessError::Config(message) => Self::Config(message),
            HarnessError::Provider(ProviderError::Transport { .. }) => Self::ConnectionFailed {
                base_url: base_url.to_string(),
            },
            HarnessError::Provider(err) => match err.status_code() {
                Some(401) => Self::AuthenticationFailed {
                    base_url: base_url.to_string(),
                },
                Some(404) => Self::ModelNotFound {
                    model: model.to_string(),
                },
                _ => Self::Upstream(err.message().to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

/// Failures of the server process itself.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
