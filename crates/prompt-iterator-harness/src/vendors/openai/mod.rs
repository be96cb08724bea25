//! OpenAI-compatible chat-completions integration.
//!
//! Covers any provider speaking the `/chat/completions` dialect (OpenAI,
//! DeepSeek, and similar), selected by base URL.
mod adapter;
mod config;
mod corrector;
pub(crate) mod transport;

pub use adapter::OpenAiProvider;
pub use config::{DEFAULT_BASE_URL, OpenAiClientConfig, normalize_base_url};
pub use corrector::{DEFAULT_CORRECTION_MODEL, OpenAiCorrector};
