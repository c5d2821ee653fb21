use serde::{Deserialize, Serialize};

const MFA_NAME_KEYWORDS: [&str; 4] = ["mfa", "multi-factor", "otp", "authenticator"];
const SSO_NAME_KEYWORDS: [&str; 4] = ["sso", "single sign-on", "microsoft", "azure"];

/// Kind of control a screenshot is evaluated against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ControlKind {
    #[serde(rename = "MFA")]
    Mfa,
    #[serde(rename = "SSO")]
    Sso,
}

impl ControlKind {
    /// Classify a control by name. MFA keywords win over SSO ones; unknown names are MFA.
    pub fn from_control_name(name: &str) -> Self {
        let lowered = name.to_lowercase();

        if MFA_NAME_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            ControlKind::Mfa
        } else if SSO_NAME_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            ControlKind::Sso
        } else {
            ControlKind::Mfa
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlKind::Mfa => "MFA",
            ControlKind::Sso => "SSO",
        }
    }

    /// Instruction sent to the vision model with the screenshot
    pub fn instruction(&self) -> &'static str {
        match self {
            ControlKind::Mfa => {
                "Analyze this image for MFA (Multi-Factor Authentication) compliance. \
                 Look for: OTP, One-Time Password, TOTP, Authenticator, numeric input fields, \
                 QR codes, 6-digit codes, security keys. \
                 Return JSON: {\"is_compliant\": boolean, \"confidence\": float, \
                 \"detected_elements\": [list], \"reasoning\": \"explanation\"}"
            }
            ControlKind::Sso => {
                "Analyze this image for SSO (Single Sign-On) compliance with Microsoft. \
                 Look for: Microsoft branding, 'Sign in with Microsoft', 'Microsoft Account', \
                 'Azure AD', Office 365, Microsoft 365. \
                 Return JSON: {\"is_compliant\": boolean, \"confidence\": float, \
                 \"detected_elements\": [list], \"reasoning\": \"explanation\"}"
            }
        }
    }
}
