use std::sync::Arc;

use tracing::warn;

use buyline_core::domain::audit::{AuditEntry, AuditOperation, AuditStatus};
use buyline_core::domain::order::MediaBuyId;
use buyline_core::domain::principal::PrincipalId;
use buyline_core::validation::OrderValidation;
use buyline_db::repositories::AuditLogRepository;

use crate::workflow::ActorContext;

/// Writes workflow events to the append-only audit trail.
///
/// Logging never blocks the workflow: a failed write is reported through the
/// `Option` return and a warning, and the caller proceeds.
pub struct AuditLogger {
    repository: Arc<dyn AuditLogRepository>,
}

impl AuditLogger {
    pub fn new(repository: Arc<dyn AuditLogRepository>) -> Self {
        Self { repository }
    }

    /// Append one entry, returning its id, or `None` when the sink is down.
    pub async fn log(&self, entry: AuditEntry) -> Option<String> {
        let operation = entry.operation.as_str();
        let media_buy_id = entry.media_buy_id.0.clone();

        match self.repository.append(entry).await {
            Ok(id) => Some(id),
            Err(error) => {
                warn!(operation, media_buy_id, %error, "audit write failed, continuing");
                None
            }
        }
    }

    pub async fn log_validation(
        &self,
        validation: &OrderValidation,
        principal_id: Option<PrincipalId>,
        tenant_id: Option<String>,
    ) -> Option<String> {
        let status =
            if validation.all_passed { AuditStatus::Success } else { AuditStatus::Failed };
        let entry = AuditEntry::new(AuditOperation::Validation, validation.media_buy_id.clone())
            .with_principal(principal_id)
            .with_tenant(tenant_id)
            .with_request(serde_json::json!({
                "media_buy_id": validation.media_buy_id.0,
            }))
            .with_response(serde_json::json!({
                "all_passed": validation.all_passed,
                "summary": validation.summary,
                "checks": validation.checks,
            }))
            .with_status(status);

        self.log(entry).await
    }

    pub async fn log_approval_requested(
        &self,
        media_buy_id: &MediaBuyId,
        summary: serde_json::Value,
        actor: &ActorContext,
    ) -> Option<String> {
        let entry = AuditEntry::new(AuditOperation::ApprovalRequested, media_buy_id.clone())
            .with_request(actor_params(actor))
            .with_response(summary)
            .performed_by(&actor.user_id);
        self.log(entry).await
    }

    pub async fn log_approved(
        &self,
        media_buy_id: &MediaBuyId,
        actor: &ActorContext,
    ) -> Option<String> {
        let entry = AuditEntry::new(AuditOperation::Approved, media_buy_id.clone())
            .with_request(actor_params(actor))
            .with_response(serde_json::json!({ "new_status": "active" }))
            .performed_by(&actor.user_id);
        self.log(entry).await
    }

    pub async fn log_rejected(
        &self,
        media_buy_id: &MediaBuyId,
        reason: &str,
        actor: &ActorContext,
    ) -> Option<String> {
        let entry = AuditEntry::new(AuditOperation::Rejected, media_buy_id.clone())
            .with_request(actor_params(actor))
            .with_response(serde_json::json!({ "new_status": "rejected", "reason": reason }))
            .performed_by(&actor.user_id);
        self.log(entry).await
    }

    pub async fn log_review_requested(
        &self,
        media_buy_id: &MediaBuyId,
        comments: &str,
        actor: &ActorContext,
    ) -> Option<String> {
        let entry = AuditEntry::new(AuditOperation::ReviewRequested, media_buy_id.clone())
            .with_request(actor_params(actor))
            .with_response(serde_json::json!({
                "new_status": "pending_changes",
                "comments": comments,
            }))
            .performed_by(&actor.user_id);
        self.log(entry).await
    }
}

/// Actor identity as recorded on the audit row, correlation id included.
fn actor_params(actor: &ActorContext) -> serde_json::Value {
    serde_json::json!({
        "actor": {
            "user_id": actor.user_id,
            "display_name": actor.display_name,
            "correlation_id": actor.correlation_id,
        }
    })
}
