// src/model/providers.rs
//! Concrete text-generation providers. Each does exactly one remote call per `complete`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ModelError, Provider};

const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

fn http_client(timeout: Duration) -> Result<reqwest::Client, ModelError> {
    reqwest::Client::builder()
        .user_agent("market-debate/0.1")
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()
        .map_err(transport)
}

/// Request URLs never reach error text or logs.
fn transport(e: reqwest::Error) -> ModelError {
    ModelError::Transport(e.without_url().to_string())
}

/// Map a non-2xx response to the error taxonomy. 429 and Google's
/// `RESOURCE_EXHAUSTED` status are the rate-limit signal.
pub fn classify_http_error(status: u16, body: &str) -> ModelError {
    let snippet: String = body.chars().take(300).collect();
    if status == 429 || body.contains("RESOURCE_EXHAUSTED") {
        ModelError::RateLimited(format!("{status} {snippet}"))
    } else {
        ModelError::Upstream(format!("{status} {snippet}"))
    }
}

async fn read_error(resp: reqwest::Response) -> ModelError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    classify_http_error(status, &body)
}

/// Google Generative Language API (`models/{model}:generateContent`).
///
/// The key travels in the `x-goog-api-key` header rather than the query string.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: &str, model: Option<&str>, timeout: Duration) -> Result<Self, ModelError> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key: api_key.to_string(),
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(GEMINI_DEFAULT_MODEL)
                .to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Point at a different API root, e.g. a regional endpoint or a local gateway.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Option<RespContent>,
        }
        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: String,
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(read_error(resp).await);
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| ModelError::Upstream(format!("bad response body: {}", e.without_url())))?;

        Ok(body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// OpenAI Chat Completions.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, model: Option<&str>, timeout: Duration) -> Result<Self, ModelError> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key: api_key.to_string(),
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(OPENAI_DEFAULT_MODEL)
                .to_string(),
        })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: 0.4,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(read_error(resp).await);
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| ModelError::Upstream(format!("bad response body: {}", e.without_url())))?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Returns the prompt unchanged. Used for `AI_TEST_MODE=mock` and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoProvider;

#[async_trait]
impl Provider for EchoProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        Ok(prompt.to_string())
    }
    fn name(&self) -> &'static str {
        "echo"
    }
}
