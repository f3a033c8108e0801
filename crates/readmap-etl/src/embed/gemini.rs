//! Google Generative Language `embedContent` client.
//!
//! Sends one text per request and returns the vectors listed in the
//! response. Error statuses, unparseable bodies, and transport failures all
//! surface as [`EmbedError`] so the backfill can log them per book.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{Config, DEFAULT_API_BASE};
use crate::embed::EmbeddingProvider;
use crate::error::{EmbedError, EmbedResult, PipelineError, PipelineResult};

const SOURCE_NAME: &str = "Gemini";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Wire types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// `embedContent` answers with a single `embedding`; the batch form lists
/// `embeddings`. Both are accepted.
#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    #[serde(default)]
    embedding: Option<ContentEmbedding>,
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

impl EmbedContentResponse {
    fn into_vectors(self) -> Vec<Vec<f32>> {
        self.embedding
            .into_iter()
            .chain(self.embeddings)
            .map(|e| e.values)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Pull the human-readable message out of a Google API error body, falling
/// back to the raw body.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(status) => format!("{status}: {}", parsed.error.message),
            None => parsed.error.message,
        },
        Err(_) => body.trim().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the Gemini embedding endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiClient {
    /// Create a client against the public endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> EmbedResult<Self> {
        Self::with_options(api_key, model, DEFAULT_API_BASE, DEFAULT_TIMEOUT)
    }

    /// Create a client with an explicit base URL and request timeout.
    pub fn with_options(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> EmbedResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("readmap/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            api_base: api_base.into(),
        })
    }

    /// Build a client from configuration.
    ///
    /// Fails with [`PipelineError::MissingCredential`] when no API key is
    /// configured.
    pub fn from_config(config: &Config) -> PipelineResult<Self> {
        let api_key = config.require_api_key()?;
        Self::with_options(
            api_key,
            config.embedding_model.as_str(),
            config.api_base.as_str(),
            Duration::from_secs(config.request_timeout_secs),
        )
        .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))
    }

    /// The model as an API resource name (`models/<name>`).
    fn model_resource(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:embedContent",
            self.api_base.trim_end_matches('/'),
            self.model_resource()
        )
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> EmbedResult<Vec<Vec<f32>>> {
        let model = self.model_resource();
        let request = EmbedContentRequest {
            model: &model,
            content: Content {
                parts: [Part { text }],
            },
        };

        log::debug!("Requesting {} embedding ({} chars)", self.model, text.len());

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Http {
                source_name: SOURCE_NAME.to_string(),
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let body: EmbedContentResponse = response.json().await.map_err(|e| EmbedError::Parse {
            source_name: SOURCE_NAME.to_string(),
            message: e.to_string(),
        })?;

        Ok(body.into_vectors())
    }
}
