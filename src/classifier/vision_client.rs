//! HTTP client for the Gemini-style vision API
//!
//! Wire format:
//! - POST to the configured URL with an `X-goog-api-key` header
//! - Body: one `contents` entry whose parts are the instruction text and the
//!   base64 screenshot as `inline_data`, plus a small `generationConfig`
//! - Reply: the first candidate's first text part carries the verdict

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::parsing::parse_classification;
use super::{ClassificationResult, Classifier, ClassifierConfig, ClassifierError, ControlKind};

const IMAGE_MIME_TYPE: &str = "image/jpeg";
const MAX_OUTPUT_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.1;
/// Longest slice of an error body kept in a transport error
const ERROR_BODY_LIMIT: usize = 300;

/// Request body for the generate endpoint
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// A request part: either instruction text or inline image data
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    /// Base64-encoded image bytes
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// Reply from the generate endpoint; only the fields we read
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

impl GenerateRequest {
    pub fn new(instruction: &str, image: &[u8]) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: instruction.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: IMAGE_MIME_TYPE.to_string(),
                            data: BASE64.encode(image),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                temperature: TEMPERATURE,
            },
        }
    }
}

impl GenerateResponse {
    /// Text of the first part of the first candidate, if any
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

/// Vision API client
/// Holds one HTTP client (connection pool) for all requests
pub struct VisionClient {
    config: ClassifierConfig,
    http_client: Client,
}

impl VisionClient {
    /// Create a client; an unconfigured client answers every call with `NotConfigured`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: ClassifierConfig) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self { config, http_client })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Send one generate request and return the reply text
    async fn call_api(&self, request: &GenerateRequest) -> Result<String, ClassifierError> {
        let (endpoint, api_key) = match (self.config.endpoint(), self.config.api_key.as_deref()) {
            (Some(endpoint), Some(key)) => (endpoint, key),
            _ => return Err(ClassifierError::NotConfigured),
        };

        let response = self
            .http_client
            .post(&endpoint)
            .header("X-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let excerpt: String = response_text.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(ClassifierError::Transport(format!("HTTP {}: {}", status, excerpt)));
        }

        let reply: GenerateResponse = serde_json::from_str(&response_text)
            .map_err(|e| ClassifierError::Parse(format!("invalid response body: {}", e)))?;

        reply
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| ClassifierError::Parse("no content in response".to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> ClassifierError {
        if e.is_timeout() {
            ClassifierError::Timeout(self.config.timeout.as_secs())
        } else {
            ClassifierError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl Classifier for VisionClient {
    async fn classify(
        &self,
        image: &[u8],
        kind: ControlKind,
    ) -> Result<ClassificationResult, ClassifierError> {
        if !self.config.is_configured() {
            return Err(ClassifierError::NotConfigured);
        }

        let request = GenerateRequest::new(kind.instruction(), image);

        tracing::debug!(
            model = %self.config.model,
            kind = kind.as_str(),
            image_bytes = image.len(),
            "Sending screenshot to vision API"
        );

        let text = self.call_api(&request).await?;
        parse_classification(&text, kind)
    }
}
