// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::env;

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_backoff_base_secs() -> u64 {
    2
}
fn default_pacing_ms() -> u64 {
    1_000
}
fn default_timeout_secs() -> u64 {
    60
}

/// `[model]` table of `config/app.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// "gemini" | "openai" | "mock" | "disabled" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Provider model id; empty means the provider default.
    #[serde(default)]
    pub model: String,
    /// Literal key, or "ENV" to read GOOGLE_API_KEY / OPENAI_API_KEY by provider.
    #[serde(default)]
    pub api_key: String,
    /// Total attempts per call, including the first one.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    /// Courtesy delay between persona calls.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: String::new(),
            api_key: "ENV".to_string(),
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base_secs(),
            pacing_ms: default_pacing_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ModelConfig {
    /// Normalize provider, resolve "ENV" keys, clamp nonsense values.
    /// A missing env key is not an error here: the client factory then builds no
    /// client and the scheduler simply skips analysis.
    pub fn normalized(mut self) -> Self {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().is_empty() || self.api_key.trim().eq_ignore_ascii_case("env") {
            let var = match self.provider.as_str() {
                "gemini" => Some("GOOGLE_API_KEY"),
                "openai" => Some("OPENAI_API_KEY"),
                _ => None,
            };
            self.api_key = var.and_then(|v| env::var(v).ok()).unwrap_or_default();
        }

        if self.max_retries == 0 || self.max_retries > 10 {
            self.max_retries = default_max_retries();
        }
        if self.backoff_base_secs > 300 {
            self.backoff_base_secs = default_backoff_base_secs();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self
    }

    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn env_key_is_resolved_by_provider() {
        env::set_var("OPENAI_API_KEY", "sk-test");
        let cfg = ModelConfig {
            provider: " OpenAI ".into(),
            api_key: "ENV".into(),
            ..ModelConfig::default()
        }
        .normalized();
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.api_key, "sk-test");
        env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    fn out_of_range_values_fall_back_to_defaults() {
        let cfg = ModelConfig {
            provider: "mock".into(),
            max_retries: 0,
            backoff_base_secs: 10_000,
            timeout_secs: 0,
            ..ModelConfig::default()
        }
        .normalized();
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.backoff_base_secs, 2);
        assert_eq!(cfg.timeout_secs, 60);
    }
}
