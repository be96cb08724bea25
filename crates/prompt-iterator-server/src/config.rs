use std::path::Path;
use std::time::Duration;

use clap::Parser;
use prompt_iterator_harness::vendors::openai::{
    DEFAULT_BASE_URL, DEFAULT_CORRECTION_MODEL, normalize_base_url,
};

/// Loads `.env` from the crate directory, then from the working directory.
pub fn init() {
    let _ = dotenvy::from_path(Path::new(
        format!("{}/.env", env!("CARGO_MANIFEST_DIR")).as_str(),
    ));
    dotenvy::dotenv().ok();
}

/// Process-wide server settings. Credentials are per request and never live here.
#[derive(Parser, Debug, Clone)]
#[command(name = "prompt-iterator")]
#[command(author, version, about = "Streaming chat proxy with tool-call repair", long_about = None)]
pub struct ServerConfig {
    /// Interface to bind
    #[arg(long, env = "PROMPT_ITERATOR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PROMPT_ITERATOR_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Upstream base URL used when a request sends no `x-base-url`
    #[arg(long, env = "PROMPT_ITERATOR_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub default_base_url: String,

    /// Model used when a request names none
    #[arg(long, env = "PROMPT_ITERATOR_MODEL", default_value = "gpt-4-turbo")]
    pub default_model: String,

    /// Model used to repair malformed tool-call arguments
    #[arg(long, env = "PROMPT_ITERATOR_CORRECTION_MODEL", default_value = DEFAULT_CORRECTION_MODEL)]
    pub correction_model: String,

    /// Wall-clock budget for one streamed response, in seconds
    #[arg(long, env = "PROMPT_ITERATOR_BUDGET_SECS", default_value_t = 30)]
    pub budget_secs: u64,

    /// Pause between characters of the demo reply, in milliseconds
    #[arg(long, env = "PROMPT_ITERATOR_DEMO_DELAY_MS", default_value_t = 20)]
    pub demo_delay_ms: u64,

    /// Frames buffered between the re-framer and the response body
    #[arg(long, env = "PROMPT_ITERATOR_BUFFER_CAPACITY", default_value_t = 128)]
    pub buffer_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            default_base_url: DEFAULT_BASE_URL.into(),
            default_model: "gpt-4-turbo".into(),
            correction_model: DEFAULT_CORRECTION_MODEL.into(),
            budget_secs: 30,
            demo_delay_ms: 20,
            buffer_capacity: 128,
        }
    }
}

impl ServerConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_secs(self.budget_secs)
    }

    pub fn demo_delay(&self) -> Duration {
        Duration::from_millis(self.demo_delay_ms)
    }

    /// Resolves the upstream base URL for a request.
    pub fn resolve_base_url(&self, header: Option<&str>) -> String {
        match header.map(str::trim).filter(|h| !h.is_empty()) {
            Some(url) => normalize_base_url(url),
            None => normalize_base_url(&self.default_base_url),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults_without_arguments() {
        let config = ServerConfig::try_parse_from(["prompt-iterator"]).expect("config");
        assert_eq!(config.port, 3000);
        assert_eq!(config.default_model, "gpt-4-turbo");
        assert_eq!(config.budget(), Duration::from_secs(30));
    }

    #[test]
    fn base_url_header_wins_and_loses_trailing_slash() {
        let config = ServerConfig::default();
        assert_eq!(
            config.resolve_base_url(Some("https://api.deepseek.com/v1/")),
            "https://api.deepseek.com/v1"
        );
        assert_eq!(config.resolve_base_url(Some("  ")), DEFAULT_BASE_URL);
        assert_eq!(config.resolve_base_url(None), DEFAULT_BASE_URL);
    }
}
