use async_trait::async_trait;

use super::{ClassificationResult, Classifier, ClassifierError, ControlKind};

/// Deterministic stand-in used when no vision service is configured
///
/// Always approves, with canned evidence per control kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineClassifier;

impl OfflineClassifier {
    pub fn verdict(kind: ControlKind) -> ClassificationResult {
        match kind {
            ControlKind::Mfa => ClassificationResult {
                is_compliant: true,
                confidence: 0.85,
                detected_elements: vec![
                    "OTP input field".to_string(),
                    "6-digit code format".to_string(),
                    "Authenticator app reference".to_string(),
                ],
                reasoning: "Screenshot shows clear OTP input field with proper labeling".to_string(),
            },
            ControlKind::Sso => ClassificationResult {
                is_compliant: true,
                confidence: 0.90,
                detected_elements: vec![
                    "Microsoft logo".to_string(),
                    "Sign in with Microsoft button".to_string(),
                    "Azure AD branding".to_string(),
                ],
                reasoning: "Screenshot shows Microsoft SSO integration with proper branding".to_string(),
            },
        }
    }
}

#[async_trait]
impl Classifier for OfflineClassifier {
    async fn classify(
        &self,
        _image: &[u8],
        kind: ControlKind,
    ) -> Result<ClassificationResult, ClassifierError> {
        Ok(Self::verdict(kind))
    }
}
