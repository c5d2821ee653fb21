use serde::{Deserialize, Serialize};

use super::sql_text_enum;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceStatus {
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "rejected")]
    Rejected,
}

impl EvidenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceStatus::Approved => "approved",
            EvidenceStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "approved" => Some(EvidenceStatus::Approved),
            "rejected" => Some(EvidenceStatus::Rejected),
            _ => None,
        }
    }
}

sql_text_enum!(EvidenceStatus);

/// An artifact (usually a screenshot) uploaded against a control
///
/// `company_id` duplicates `control.company_id` for tenant-scoped queries. It is
/// always copied from the control on insert; the schema rejects any write that
/// lets the two diverge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    pub id: i64,
    pub control_id: i64,
    pub company_id: i64,
    pub name: String,
    /// Path relative to the media root; empty when nothing was attached
    pub file: String,
    pub status: EvidenceStatus,
    pub is_deleted: bool,
    pub created_by: i64,
    pub created_at: String,
}

impl Evidence {
    pub fn has_file(&self) -> bool {
        !self.file.trim().is_empty()
    }
}
