//! Gemini `generateContent` provider.

use async_trait::async_trait;
use pipeline::{
    truncate_error_body, CompletionRequest, ConfigError, LanguageModel, ModelError, ResponseFormat,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::credentials::ApiKey;

/// Failure to construct a [`GeminiProvider`].
#[derive(Debug, Error)]
pub enum ProviderInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("HTTP client could not be built: {0}")]
    Client(String),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

fn build_request(request: &CompletionRequest) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![Part {
                text: &request.prompt,
            }],
        }],
        generation_config: match request.format {
            ResponseFormat::Json => Some(GenerationConfig {
                response_mime_type: "application/json",
            }),
            ResponseFormat::Text => None,
        },
    }
}

/// Decodes a successful `generateContent` body.
fn parse_response(body: &[u8]) -> Result<GenerateContentResponse, ModelError> {
    serde_json::from_slice(body).map_err(|e| ModelError::Decode {
        message: e.to_string(),
    })
}

/// Concatenates the text parts of the first candidate.
fn completion_text(response: GenerateContentResponse) -> Result<String, ModelError> {
    let block_reason = response.prompt_feedback.and_then(|f| f.block_reason);
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(ModelError::EmptyCompletion {
            detail: block_reason
                .map_or_else(|| "no candidates".to_string(), |r| format!("prompt blocked: {r}")),
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ModelError::EmptyCompletion {
            detail: format!(
                "finish reason {}",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        });
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// [`LanguageModel`] backed by the Gemini REST API.
///
/// Every call is an independent request; there is no retry, no back-off and no
/// client-side timeout beyond the HTTP client's defaults.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: ApiKey,
}

impl GeminiProvider {
    /// Public Gemini endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Creates a provider for the public endpoint.
    pub fn new(api_key: ApiKey) -> Result<Self, ProviderInitError> {
        let client = Client::builder()
            .user_agent(concat!("surveylens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderInitError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_key,
        })
    }

    /// Creates a provider with the key taken from the environment.
    ///
    /// Fails with [`ConfigError::MissingCredential`] before any network activity
    /// when no key is configured.
    pub fn from_env() -> Result<Self, ProviderInitError> {
        Self::new(ApiKey::from_env()?)
    }

    /// Overrides the API base URL (proxies, regional endpoints, test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, request: &CompletionRequest) -> String {
        format!("{}/models/{}:generateContent", self.base_url, request.model)
    }
}

#[async_trait]
impl LanguageModel for GeminiProvider {
    #[instrument(skip_all, fields(model = %request.model, prompt_chars = request.prompt.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError> {
        let response = self
            .client
            .post(self.endpoint(request))
            .header("x-goog-api-key", self.api_key.expose())
            .json(&build_request(request))
            .send()
            .await
            .map_err(|e| ModelError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = truncate_error_body(
                response
                    .text()
                    .await
                    .unwrap_or_else(|e| format!("<unreadable body: {e}>")),
            );
            warn!(status = status.as_u16(), "Model API returned an error status");
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(|e| ModelError::Transport {
            message: format!("response body could not be read: {e}"),
        })?;
        let text = completion_text(parse_response(&body)?)?;
        debug!(reply_chars = text.len(), "Model replied");
        Ok(text)
    }
}
