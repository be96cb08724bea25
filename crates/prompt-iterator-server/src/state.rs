use std::time::Instant;

use crate::config::ServerConfig;
use crate::error::ServerError;

/// Shared by every request. The pooled HTTP client is the only state that
/// crosses requests.
pub struct AppState {
    pub config: ServerConfig,
    pub http: reqwest::Client,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            config,
            http,
            start_time: Instant::now(),
        })
    }
}
