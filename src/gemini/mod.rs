pub mod sse;
pub mod vision_client;

use crate::{
    config::GeminiConfig,
    error::{AnalystError, Result},
};
use reqwest::Client;

pub use vision_client::VisionClient;

#[derive(Clone)]
pub struct GeminiClient {
    vision_client: VisionClient,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AnalystError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            vision_client: VisionClient::new(http, &config),
            config,
        })
    }

    pub fn vision(&self) -> &VisionClient {
        &self.vision_client
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}
