use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_REVEAL_DELAY_MS: u64 = 50;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_base: String,
    pub model: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_base = non_empty_env("GEMINI_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base);
        let model = non_empty_env("GEMINI_MODEL").unwrap_or(defaults.model);
        let request_timeout = non_empty_env("GEMINI_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        GeminiConfig {
            api_base,
            model,
            request_timeout,
            connect_timeout: defaults.connect_timeout,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct AnalystConfig {
    pub api_key: Option<String>,
    pub gemini: GeminiConfig,
    pub reveal_delay: Duration,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        AnalystConfig {
            api_key: None,
            gemini: GeminiConfig::default(),
            reveal_delay: Duration::from_millis(DEFAULT_REVEAL_DELAY_MS),
        }
    }
}

impl AnalystConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `GEMINI_API_KEY` (falling back to `GOOGLE_API_KEY`) plus the
    /// Gemini endpoint settings. Call after `dotenv` so `.env` values apply.
    pub fn from_env() -> Self {
        let api_key = non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY"));

        AnalystConfig {
            api_key,
            gemini: GeminiConfig::from_env(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self
    }

    pub fn with_reveal_delay(mut self, delay: Duration) -> Self {
        self.reveal_delay = delay;
        self
    }

    pub fn without_typing(self) -> Self {
        self.with_reveal_delay(Duration::ZERO)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalystConfig::new();
        assert!(config.api_key.is_none());
        assert_eq!(config.gemini.model, DEFAULT_MODEL);
        assert_eq!(config.gemini.api_base, DEFAULT_API_BASE);
        assert_eq!(config.reveal_delay, Duration::from_millis(50));
    }

    #[test]
    fn test_builders() {
        let config = AnalystConfig::new()
            .with_api_key("secret")
            .with_gemini(
                GeminiConfig::new()
                    .with_model("gemini-2.5-flash")
                    .with_api_base("http://localhost:9000/")
                    .with_timeout(Duration::from_secs(5)),
            )
            .without_typing();

        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.gemini.api_base, "http://localhost:9000");
        assert_eq!(config.gemini.request_timeout, Duration::from_secs(5));
        assert_eq!(config.reveal_delay, Duration::ZERO);
    }
}
