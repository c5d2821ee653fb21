//! Interpretation of vision model replies
//!
//! Replies are free text that usually embeds a JSON object. The outermost
//! `{...}` span is read first; when it is not a JSON object the text is scored by
//! keyword presence instead.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{ClassificationResult, ClassifierError, ControlKind};

static JSON_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{.*\}").expect("JSON span pattern is valid")
});

const MFA_REPLY_KEYWORDS: [&str; 6] = [
    "otp",
    "one-time password",
    "totp",
    "authenticator",
    "6-digit",
    "qr code",
];

const SSO_REPLY_KEYWORDS: [&str; 5] = [
    "microsoft",
    "azure",
    "office 365",
    "sign in with microsoft",
    "microsoft account",
];

const HEURISTIC_COMPLIANT_CONFIDENCE: f64 = 0.7;
const HEURISTIC_REJECTED_CONFIDENCE: f64 = 0.3;
const REASONING_EXCERPT_CHARS: usize = 200;

/// Turn reply text into a classification
///
/// # Errors
/// Returns [`ClassifierError::Parse`] when the reply carries no text at all
pub fn parse_classification(
    text: &str,
    kind: ControlKind,
) -> Result<ClassificationResult, ClassifierError> {
    if text.trim().is_empty() {
        return Err(ClassifierError::Parse("empty reply".to_string()));
    }

    Ok(parse_structured(text).unwrap_or_else(|| score_keywords(text, kind)))
}

/// Outermost braces read as a JSON object, each field taken leniently
///
/// Only a missing span or one that is not an object yields `None`. Fields of
/// the wrong type fall back to their defaults instead of discarding the verdict.
fn parse_structured(text: &str) -> Option<ClassificationResult> {
    let span = JSON_SPAN.find(text)?;
    let value: Value = serde_json::from_str(span.as_str()).ok()?;
    let object = value.as_object()?;

    let confidence = object
        .get("confidence")
        .and_then(|c| c.as_f64().or_else(|| c.as_str().and_then(|s| s.trim().parse::<f64>().ok())))
        .filter(|c| c.is_finite())
        .unwrap_or(0.0);

    let detected_elements = object
        .get("detected_elements")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    Some(ClassificationResult {
        is_compliant: object.get("is_compliant").and_then(Value::as_bool).unwrap_or(false),
        confidence: confidence.clamp(0.0, 1.0),
        detected_elements,
        reasoning: object
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Fallback scoring when the reply has no usable JSON
fn score_keywords(text: &str, kind: ControlKind) -> ClassificationResult {
    let lowered = text.to_lowercase();
    let keywords: &[&str] = match kind {
        ControlKind::Mfa => &MFA_REPLY_KEYWORDS,
        ControlKind::Sso => &SSO_REPLY_KEYWORDS,
    };

    let detected_elements: Vec<String> = keywords
        .iter()
        .filter(|kw| lowered.contains(*kw))
        .map(|kw| kw.to_string())
        .collect();
    let is_compliant = !detected_elements.is_empty();

    let excerpt: String = text.chars().take(REASONING_EXCERPT_CHARS).collect();

    ClassificationResult {
        is_compliant,
        confidence: if is_compliant {
            HEURISTIC_COMPLIANT_CONFIDENCE
        } else {
            HEURISTIC_REJECTED_CONFIDENCE
        },
        detected_elements,
        reasoning: format!("AI analysis: {}", excerpt),
    }
}

/// Remediation hints for a verdict; compliant screenshots get none
pub fn recommendations_for(is_compliant: bool, kind: ControlKind) -> Vec<String> {
    if is_compliant {
        return Vec::new();
    }

    let hints: [&str; 4] = match kind {
        ControlKind::Mfa => [
            "Ensure OTP input field is clearly visible",
            "Add clear labeling for 'One-Time Password' or 'OTP'",
            "Include instructions for using authenticator apps",
            "Consider adding QR code for easy setup",
        ],
        ControlKind::Sso => [
            "Add Microsoft branding and logos",
            "Include 'Sign in with Microsoft' button",
            "Ensure Azure AD integration is visible",
            "Add clear SSO login instructions",
        ],
    };

    hints.iter().map(|h| h.to_string()).collect()
}
