use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_LLM_BASE_URL: &str = "https://router.huggingface.co/v1";
const DEFAULT_LLM_MODELS: &str = "openai/gpt-oss-safeguard-20b,openai/gpt-oss-20b";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub llm: LlmSettings,
    pub max_upload_bytes: usize,
    pub worker_concurrency: usize,
    /// In-progress rows untouched for this long are marked failed.
    pub stalled_job_after: Duration,
    pub port: u16,
    pub rust_log: String,
}

/// Everything the LLM client needs, passed in explicitly at construction.
#[derive(Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    /// Ordered fallback chain; the first entry is the primary model.
    pub models: Vec<String>,
    /// Wall-clock bound on a single model attempt.
    pub timeout: Duration,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let models = parse_model_list(&optional_env("LLM_MODELS", DEFAULT_LLM_MODELS))?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            s3_region: optional_env("S3_REGION", "us-east-1"),
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            llm: LlmSettings {
                api_key: require_env("LLM_API_KEY")?,
                base_url: optional_env("LLM_BASE_URL", DEFAULT_LLM_BASE_URL),
                models,
                timeout: Duration::from_secs(
                    optional_env("LLM_TIMEOUT_SECS", "60")
                        .parse::<u64>()
                        .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
                ),
            },
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES", &DEFAULT_MAX_UPLOAD_BYTES.to_string())
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
            worker_concurrency: optional_env("WORKER_CONCURRENCY", "2")
                .parse::<usize>()
                .context("WORKER_CONCURRENCY must be a positive integer")?
                .max(1),
            stalled_job_after: Duration::from_secs(
                optional_env("STALLED_JOB_SECS", "900")
                    .parse::<u64>()
                    .context("STALLED_JOB_SECS must be a whole number of seconds")?,
            ),
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Splits a comma-separated model list, dropping blanks and repeats.
fn parse_model_list(raw: &str) -> Result<Vec<String>> {
    let mut models: Vec<String> = Vec::new();
    for model in raw.split(',').map(str::trim).filter(|m| !m.is_empty()) {
        if !models.iter().any(|m| m == model) {
            models.push(model.to_string());
        }
    }
    if models.is_empty() {
        bail!("LLM_MODELS must name at least one model");
    }
    Ok(models)
}
