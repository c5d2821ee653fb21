use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    #[serde(rename = "evidence_uploaded")]
    EvidenceUploaded,
    #[serde(rename = "evidence_deleted")]
    EvidenceDeleted,
    #[serde(rename = "compliance_evaluated")]
    ComplianceEvaluated,
    #[serde(rename = "compliance_retried")]
    ComplianceRetried,
    #[serde(rename = "external_verdict")]
    ExternalVerdict,
    #[serde(rename = "control_status_changed")]
    ControlStatusChanged,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::EvidenceUploaded => "evidence_uploaded",
            AuditEventType::EvidenceDeleted => "evidence_deleted",
            AuditEventType::ComplianceEvaluated => "compliance_evaluated",
            AuditEventType::ComplianceRetried => "compliance_retried",
            AuditEventType::ExternalVerdict => "external_verdict",
            AuditEventType::ControlStatusChanged => "control_status_changed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "evidence_uploaded" => Some(AuditEventType::EvidenceUploaded),
            "evidence_deleted" => Some(AuditEventType::EvidenceDeleted),
            "compliance_evaluated" => Some(AuditEventType::ComplianceEvaluated),
            "compliance_retried" => Some(AuditEventType::ComplianceRetried),
            "external_verdict" => Some(AuditEventType::ExternalVerdict),
            "control_status_changed" => Some(AuditEventType::ControlStatusChanged),
            _ => None,
        }
    }
}

/// Represents an audit trail event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
    pub id: i64,
    pub event_type: String,
    pub company_id: i64,
    pub evidence_id: Option<i64>,
    pub control_id: Option<i64>,
    pub description: String,
    pub metadata: Option<String>,
    pub created_at: String,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, company_id: i64, description: String) -> Self {
        Self {
            id: 0,
            event_type: event_type.as_str().to_string(),
            company_id,
            evidence_id: None,
            control_id: None,
            description,
            metadata: None,
            created_at: crate::utils::timestamp_now(),
        }
    }

    pub fn get_event_type(&self) -> Option<AuditEventType> {
        AuditEventType::from_str(&self.event_type)
    }

    pub fn with_evidence_id(mut self, evidence_id: i64) -> Self {
        self.evidence_id = Some(evidence_id);
        self
    }

    pub fn with_control_id(mut self, control_id: i64) -> Self {
        self.control_id = Some(control_id);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata.to_string());
        self
    }

    pub fn get_metadata(&self) -> Option<Value> {
        self.metadata
            .as_ref()
            .and_then(|m| serde_json::from_str(m).ok())
    }
}
