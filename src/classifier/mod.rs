//! Evidence classification against an external vision model
//!
//! The [`Classifier`] trait is the seam between the compliance engine and the
//! AI service. [`VisionClient`] speaks the remote wire format, while
//! [`OfflineClassifier`] returns canned verdicts when no service is configured.

pub mod kind;
pub mod offline;
pub mod parsing;
pub mod vision_client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use kind::ControlKind;
pub use offline::OfflineClassifier;
pub use parsing::{parse_classification, recommendations_for};
pub use vision_client::VisionClient;

/// Judgment returned by a classifier for one screenshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    #[serde(default)]
    pub is_compliant: bool,
    /// Always within [0, 1]
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub detected_elements: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("AI service not configured. Set AI_API_URL and AI_API_KEY to enable it")]
    NotConfigured,

    #[error("AI service request failed: {0}")]
    Transport(String),

    #[error("AI service reply could not be interpreted: {0}")]
    Parse(String),

    #[error("AI service did not answer within {0} seconds")]
    Timeout(u64),
}

/// Something that can judge a screenshot against a control kind
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        image: &[u8],
        kind: ControlKind,
    ) -> Result<ClassificationResult, ClassifierError>;
}

/// Connection settings for the remote vision service
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl ClassifierConfig {
    pub const MIN_TIMEOUT_SECS: u64 = 60;
    pub const DEFAULT_MODEL: &'static str = "gemini-1.5-flash";

    /// Build a config; blank url/key count as absent and the timeout is
    /// raised to at least [`Self::MIN_TIMEOUT_SECS`]
    pub fn new(
        api_url: Option<String>,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Self {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        Self {
            api_url: non_blank(api_url),
            api_key: non_blank(api_key),
            model,
            timeout: timeout.max(Duration::from_secs(Self::MIN_TIMEOUT_SECS)),
        }
    }

    /// Config with no remote service
    pub fn unconfigured() -> Self {
        Self::new(
            None,
            None,
            Self::DEFAULT_MODEL.to_string(),
            Duration::from_secs(Self::MIN_TIMEOUT_SECS),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.api_url.is_some() && self.api_key.is_some()
    }

    /// Endpoint with any `{model}` placeholder filled in
    pub fn endpoint(&self) -> Option<String> {
        self.api_url
            .as_ref()
            .map(|url| url.replace("{model}", &self.model))
    }
}
