use serde::{Deserialize, Serialize};

use super::sql_text_enum;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ControlStatus {
    #[serde(rename = "implemented")]
    Implemented,
    #[serde(rename = "not_implemented")]
    NotImplemented,
}

impl ControlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlStatus::Implemented => "implemented",
            ControlStatus::NotImplemented => "not_implemented",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "implemented" => Some(ControlStatus::Implemented),
            "not_implemented" => Some(ControlStatus::NotImplemented),
            _ => None,
        }
    }
}

sql_text_enum!(ControlStatus);

/// A compliance requirement tracked by one company (e.g. "must use MFA")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Control {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub status: ControlStatus,
    pub is_deleted: bool,
    pub created_by: i64,
    pub created_at: String,
}

impl Control {
    pub fn is_implemented(&self) -> bool {
        self.status == ControlStatus::Implemented
    }
}

/// Names of the controls every company starts with
pub const DEFAULT_CONTROL_NAMES: [&str; 2] = [
    "MFA Control - OTP Authentication",
    "SSO Login Control - Microsoft Azure AD",
];
