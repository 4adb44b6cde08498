use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::MediaBuyId;
use crate::domain::principal::PrincipalId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOperation {
    Validation,
    ApprovalRequested,
    Approved,
    Rejected,
    ReviewRequested,
}

impl AuditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "cem_validation",
            Self::ApprovalRequested => "cem_approval_requested",
            Self::Approved => "cem_approved",
            Self::Rejected => "cem_rejected",
            Self::ReviewRequested => "cem_review_requested",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "cem_validation" => Some(Self::Validation),
            "cem_approval_requested" => Some(Self::ApprovalRequested),
            "cem_approved" => Some(Self::Approved),
            "cem_rejected" => Some(Self::Rejected),
            "cem_review_requested" => Some(Self::ReviewRequested),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStatus {
    Success,
    Failed,
    Pending,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Pending => "pending",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "failed" => Self::Failed,
            "pending" => Self::Pending,
            _ => Self::Success,
        }
    }
}

/// One append-only audit row. Never mutated or deleted once written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub operation: AuditOperation,
    pub media_buy_id: MediaBuyId,
    pub principal_id: Option<PrincipalId>,
    pub tenant_id: Option<String>,
    pub tool_name: String,
    pub request_params: serde_json::Value,
    pub response_data: serde_json::Value,
    pub status: AuditStatus,
    pub performed_by: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(operation: AuditOperation, media_buy_id: MediaBuyId) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            operation,
            tool_name: format!("cem_workflow:{media_buy_id}"),
            media_buy_id,
            principal_id: None,
            tenant_id: None,
            request_params: serde_json::json!({}),
            response_data: serde_json::json!({}),
            status: AuditStatus::Success,
            performed_by: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_principal(mut self, principal_id: Option<PrincipalId>) -> Self {
        self.principal_id = principal_id;
        self
    }

    pub fn with_tenant(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn with_request(mut self, request_params: serde_json::Value) -> Self {
        self.request_params = request_params;
        self
    }

    pub fn with_response(mut self, response_data: serde_json::Value) -> Self {
        self.response_data = response_data;
        self
    }

    pub fn with_status(mut self, status: AuditStatus) -> Self {
        self.status = status;
        self
    }

    pub fn performed_by(mut self, actor: impl Into<String>) -> Self {
        self.performed_by = Some(actor.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::order::MediaBuyId;

    use super::{AuditEntry, AuditOperation, AuditStatus};

    #[test]
    fn builder_stamps_tool_name_and_defaults() {
        let entry = AuditEntry::new(
            AuditOperation::Approved,
            MediaBuyId("nike_running_gear_test".to_string()),
        )
        .performed_by("U123")
        .with_status(AuditStatus::Success);

        assert_eq!(entry.tool_name, "cem_workflow:nike_running_gear_test");
        assert_eq!(entry.operation.as_str(), "cem_approved");
        assert_eq!(entry.performed_by.as_deref(), Some("U123"));
        assert!(entry.principal_id.is_none());
    }

    #[test]
    fn operation_wire_names_round_trip() {
        for op in [
            AuditOperation::Validation,
            AuditOperation::ApprovalRequested,
            AuditOperation::Approved,
            AuditOperation::Rejected,
            AuditOperation::ReviewRequested,
        ] {
            assert_eq!(AuditOperation::parse(op.as_str()), Some(op));
        }
        assert_eq!(AuditOperation::parse("cem_unknown"), None);
    }
}
