use std::fmt;

/// Settings for the completion service client.
#[derive(Clone, PartialEq)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub vision_model: String,
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
    pub temperature: f32,
}

impl GatewayConfig {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key lookup. Unparseable numbers are ignored.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(endpoint) = lookup("FLOWROLL_ENDPOINT") {
            self.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("FLOWROLL_MODEL") {
            self.model = model;
        }
        if let Some(model) = lookup("FLOWROLL_VISION_MODEL") {
            self.vision_model = model;
        }
        if let Some(ms) = lookup("FLOWROLL_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.timeout_ms = ms;
        }
        if let Some(ms) = lookup("FLOWROLL_CONNECT_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.connect_timeout_ms = ms;
        }
        self
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            vision_model: Self::DEFAULT_MODEL.to_string(),
            timeout_ms: 60_000,
            connect_timeout_ms: 5_000,
            temperature: 1.0,
        }
    }
}

// Keeps the key out of logs and error output.
impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("vision_model", &self.vision_model)
            .field("timeout_ms", &self.timeout_ms)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Settings for the session engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Completion calls allowed per graph request when the reply fails the
    /// placeholder or starting-position check. 1 means no retry.
    pub max_attempts: u32,
    /// Frames sampled from a match video for analysis.
    pub frame_samples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            frame_samples: 3,
        }
    }
}
