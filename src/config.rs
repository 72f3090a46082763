use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{AltTextError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for the captioning client and remote fetches.
///
/// Use [`AltTextConfig::builder()`] or the chained setters, or load a TOML
/// file with [`AltTextConfig::from_file`].
#[derive(Debug, Clone)]
pub struct AltTextConfig {
    /// API base URL (e.g., "https://generativelanguage.googleapis.com")
    pub endpoint: String,
    /// Multimodal model name (e.g., "gemini-2.5-flash")
    pub model: String,
    /// API key sent with every captioning request
    pub api_key: String,
    /// Timeout applied to captioning calls and remote image fetches (default: 60s)
    pub timeout: Duration,
    /// Custom instruction (overrides the built-in alt text prompt)
    pub prompt: Option<String>,
}

impl Default for AltTextConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(60),
            prompt: None,
        }
    }
}

/// On-disk form. Every field is optional and falls back to the default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    endpoint: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    prompt: Option<String>,
}

impl AltTextConfig {
    pub fn builder() -> AltTextConfigBuilder {
        AltTextConfigBuilder::default()
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Parse a TOML document such as:
    ///
    /// ```toml
    /// api_key = "..."
    /// model = "gemini-2.5-flash"
    /// timeout_secs = 30
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| AltTextError::Config(e.to_string()))?;

        let mut config = Self::default();
        if let Some(endpoint) = file.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(model) = file.model {
            config.model = model;
        }
        if let Some(api_key) = file.api_key {
            config.api_key = api_key;
        }
        if let Some(secs) = file.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        config.prompt = file.prompt;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| AltTextError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Overlay values from the environment.
    ///
    /// `ALT_TEXT_API_KEY` (or `GEMINI_API_KEY`), `ALT_TEXT_ENDPOINT` and
    /// `ALT_TEXT_MODEL` replace the corresponding fields when set and non-empty.
    pub fn with_env(self) -> Self {
        self.with_vars(|name| std::env::var(name).ok())
    }

    fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("ALT_TEXT_API_KEY").or_else(|| get("GEMINI_API_KEY")) {
            self.api_key = key;
        }
        if let Some(endpoint) = get("ALT_TEXT_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(model) = get("ALT_TEXT_MODEL") {
            self.model = model;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(AltTextError::Config("API key is not set".to_string()));
        }
        if self.endpoint.trim().is_empty() {
            return Err(AltTextError::Config("endpoint is empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(AltTextError::Config("model is empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for [`AltTextConfig`].
#[derive(Default)]
pub struct AltTextConfigBuilder {
    config: AltTextConfig,
}

impl AltTextConfigBuilder {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = api_key.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    /// Build and validate.
    pub fn build(self) -> Result<AltTextConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
