use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::sql_text_enum;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "error")]
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pending => "pending",
            CheckStatus::Processing => "processing",
            CheckStatus::Approved => "approved",
            CheckStatus::Rejected => "rejected",
            CheckStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CheckStatus::Pending),
            "processing" => Some(CheckStatus::Processing),
            "approved" => Some(CheckStatus::Approved),
            "rejected" => Some(CheckStatus::Rejected),
            "error" => Some(CheckStatus::Error),
            _ => None,
        }
    }

    /// States an evaluation may start from
    pub fn is_claimable(&self) -> bool {
        matches!(self, CheckStatus::Pending | CheckStatus::Rejected | CheckStatus::Error)
    }
}

sql_text_enum!(CheckStatus);

/// Audit record of the compliance evaluation for one evidence item
///
/// There is at most one check per evidence item. Retries reuse the same row, so
/// `updated_at` tracks the most recent transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceCheck {
    pub id: i64,
    pub evidence_id: i64,
    /// Owning tenant, resolved through the evidence row
    pub company_id: i64,
    pub status: CheckStatus,
    /// Classifier payload, stored verbatim
    pub ai_analysis: Option<Value>,
    pub rejection_reason: String,
    pub recommendations: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ComplianceCheck {
    /// True when the check has sat in `processing` longer than `threshold`.
    ///
    /// A crash between claim and verdict leaves such rows behind; retry accepts
    /// them once they are stale. An unparseable timestamp counts as stale.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        if self.status != CheckStatus::Processing {
            return false;
        }

        match DateTime::parse_from_rfc3339(&self.updated_at) {
            Ok(updated) => now.signed_duration_since(updated.with_timezone(&Utc)) > threshold,
            Err(_) => true,
        }
    }
}

/// Row of the tenant-wide check listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceCheckSummary {
    #[serde(flatten)]
    pub check: ComplianceCheck,
    pub evidence_name: String,
    pub control_name: String,
}
