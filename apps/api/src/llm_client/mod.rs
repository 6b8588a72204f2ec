/// LLM Client: the single point of entry for all model calls in the service.
///
/// ARCHITECTURAL RULE: No other module may call the model API directly.
/// All LLM interactions MUST go through `LlmClient::complete`.
///
/// The client walks an ordered list of models. Any per-model failure (rate
/// limit, outage, timeout, rejection) moves on to the next model; callers
/// only ever see one aggregated `LlmError::Unavailable`.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::LlmSettings;

pub mod prompts;

pub use prompts::Prompt;

/// Failure of a single attempt against a single model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("rate limited")]
    RateLimited,

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("model returned empty content")]
    EmptyContent,
}

/// What callers of `LlmClient` can observe.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Language model unavailable after trying {attempts} model(s)")]
    Unavailable { attempts: usize },
}

/// One model call over some transport. The production implementation is
/// `ChatCompletionsEndpoint`; tests substitute scripted doubles.
#[async_trait]
pub trait ModelEndpoint: Send + Sync {
    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, ModelError>;
}

/// Model fallback chain over a `ModelEndpoint`.
#[derive(Clone)]
pub struct LlmClient {
    endpoint: Arc<dyn ModelEndpoint>,
    models: Vec<String>,
    attempt_timeout: Duration,
}

impl LlmClient {
    pub fn new(settings: &LlmSettings) -> anyhow::Result<Self> {
        let endpoint = ChatCompletionsEndpoint::new(settings)?;
        Ok(Self::with_endpoint(
            Arc::new(endpoint),
            settings.models.clone(),
            settings.timeout,
        ))
    }

    pub fn with_endpoint(
        endpoint: Arc<dyn ModelEndpoint>,
        models: Vec<String>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            endpoint,
            models,
            attempt_timeout,
        }
    }

    /// The configured chain, primary first.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Runs the prompt against the configured chain, primary model first.
    pub async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let chain: Vec<&str> = self.models.iter().map(String::as_str).collect();
        self.run_chain(&chain, prompt).await
    }

    /// Like `complete`, but tries `model` before the configured chain.
    pub async fn complete_with_model(&self, prompt: &Prompt, model: &str) -> Result<String, LlmError> {
        let mut chain = vec![model];
        chain.extend(self.models.iter().map(String::as_str).filter(|m| *m != model));
        self.run_chain(&chain, prompt).await
    }

    async fn run_chain(&self, chain: &[&str], prompt: &Prompt) -> Result<String, LlmError> {
        for (attempt, model) in chain.iter().enumerate() {
            let outcome =
                tokio::time::timeout(self.attempt_timeout, self.endpoint.generate(model, prompt))
                    .await
                    .unwrap_or(Err(ModelError::Timeout(self.attempt_timeout)));

            match outcome {
                Ok(text) => {
                    debug!("Model {model} answered on attempt {}", attempt + 1);
                    return Ok(text);
                }
                Err(e) => {
                    warn!("Model {model} failed (attempt {}/{}): {e}", attempt + 1, chain.len());
                }
            }
        }

        error!("All {} configured model(s) failed", chain.len());
        Err(LlmError::Unavailable {
            attempts: chain.len(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// OpenAI-compatible `/chat/completions` transport with bearer auth
/// (Hugging Face router, Groq, and friends).
pub struct ChatCompletionsEndpoint {
    client: Client,
    url: String,
    api_key: String,
    timeout: Duration,
}

impl ChatCompletionsEndpoint {
    pub fn new(settings: &LlmSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key: settings.api_key.clone(),
            timeout: settings.timeout,
        })
    }
}

#[async_trait]
impl ModelEndpoint for ChatCompletionsEndpoint {
    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, ModelError> {
        let request_body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(self.timeout)
                } else {
                    ModelError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();

        if status.as_u16() == 429 {
            return Err(ModelError::RateLimited);
        }

        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Unavailable(format!("status {status}: {body}")));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ModelError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;

        if let Some(usage) = &chat.usage {
            debug!(
                "Model {model} call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ModelError::EmptyContent)
    }
}
