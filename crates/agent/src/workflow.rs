use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use buyline_core::cem::CemSummary;
use buyline_core::domain::order::{MediaBuy, MediaBuyId, OrderStatus};
use buyline_core::errors::DomainError;
use buyline_core::validation::OrderValidation;
use buyline_db::repositories::{MediaBuyRepository, RepositoryError};

use crate::audit::AuditLogger;
use crate::cem::CemAgent;
use crate::validator::{OrderDetails, OrderValidator};

/// Who triggered a workflow step. Slack user ids in production, anything in
/// tests. The optional display name and correlation id travel into the audit
/// trail so a decision row can be tied back to the Slack envelope it came from.
#[derive(Clone, Debug)]
pub struct ActorContext {
    pub user_id: String,
    pub display_name: Option<String>,
    pub correlation_id: Option<String>,
}

impl ActorContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), display_name: None, correlation_id: None }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("media buy '{0}' not found")]
    NotFound(MediaBuyId),
    #[error("media buy '{media_buy_id}' is already {status:?}")]
    AlreadyResolved { media_buy_id: MediaBuyId, status: OrderStatus },
    #[error(transparent)]
    Transition(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Outbound notifications emitted by the workflow. The Slack adapter is the
/// production implementation; tests record, the CLI stays silent.
#[async_trait]
pub trait ApprovalNotifier: Send + Sync {
    async fn order_submitted(
        &self,
        media_buy: &MediaBuy,
        validation: &OrderValidation,
        summary: &CemSummary,
    );

    async fn decision_recorded(
        &self,
        media_buy: &MediaBuy,
        decision: &str,
        actor: &ActorContext,
        note: Option<&str>,
    );
}

pub struct NoopApprovalNotifier;

#[async_trait]
impl ApprovalNotifier for NoopApprovalNotifier {
    async fn order_submitted(
        &self,
        _media_buy: &MediaBuy,
        _validation: &OrderValidation,
        _summary: &CemSummary,
    ) {
    }

    async fn decision_recorded(
        &self,
        _media_buy: &MediaBuy,
        _decision: &str,
        _actor: &ActorContext,
        _note: Option<&str>,
    ) {
    }
}

#[derive(Clone, Debug)]
pub struct SubmissionOutcome {
    pub media_buy_id: MediaBuyId,
    pub validation: OrderValidation,
    pub summary: CemSummary,
    pub new_status: OrderStatus,
}

#[derive(Clone, Debug)]
pub struct DecisionOutcome {
    pub media_buy_id: MediaBuyId,
    pub new_status: OrderStatus,
    pub audit_entry_id: Option<String>,
}

/// The approve / reject / request-changes state machine.
///
/// Every step checks the order status transition table before writing
/// anything, so a second decision on a settled order fails fast and leaves
/// exactly one decision entry in the audit trail. The audit write lands
/// before the status update; if the process dies between the two, the trail
/// over-reports rather than under-reports.
pub struct ApprovalWorkflow {
    media_buys: Arc<dyn MediaBuyRepository>,
    validator: OrderValidator,
    cem: CemAgent,
    audit: AuditLogger,
    notifier: Arc<dyn ApprovalNotifier>,
}

impl ApprovalWorkflow {
    pub fn new(
        media_buys: Arc<dyn MediaBuyRepository>,
        validator: OrderValidator,
        cem: CemAgent,
        audit: AuditLogger,
        notifier: Arc<dyn ApprovalNotifier>,
    ) -> Self {
        Self { media_buys, validator, cem, audit, notifier }
    }

    /// Validate the order, produce its review packet, and park it in
    /// `pending_cem_approval` awaiting a human decision. Validation failures
    /// do not block submission; the reviewer sees them on the card.
    pub async fn submit_for_approval(
        &self,
        media_buy_id: &MediaBuyId,
        actor: &ActorContext,
    ) -> Result<SubmissionOutcome, WorkflowError> {
        let mut media_buy = self.load(media_buy_id).await?;

        let validation = self.validator.validate(media_buy_id).await;
        self.audit
            .log_validation(
                &validation,
                Some(media_buy.principal_id.clone()),
                Some(media_buy.tenant_id.clone()),
            )
            .await;

        let details = match self.validator.load_order_details(media_buy_id).await {
            Some(details) => details,
            None => OrderDetails {
                media_buy: media_buy.clone(),
                principal: None,
                packages: Vec::new(),
            },
        };
        let summary = self.cem.summarize(&details, &validation).await;

        media_buy.transition_to(OrderStatus::PendingCemApproval)?;
        self.media_buys.update_status(media_buy_id, OrderStatus::PendingCemApproval).await?;

        let summary_json = serde_json::to_value(&summary).unwrap_or_default();
        self.audit.log_approval_requested(media_buy_id, summary_json, actor).await;

        self.notifier.order_submitted(&media_buy, &validation, &summary).await;

        info!(
            media_buy_id = %media_buy_id,
            all_passed = validation.all_passed,
            "order submitted for approval"
        );

        Ok(SubmissionOutcome {
            media_buy_id: media_buy_id.clone(),
            validation,
            summary,
            new_status: OrderStatus::PendingCemApproval,
        })
    }

    pub async fn approve(
        &self,
        media_buy_id: &MediaBuyId,
        actor: &ActorContext,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let mut media_buy = self.guarded_load(media_buy_id).await?;
        media_buy.transition_to(OrderStatus::Active)?;

        let audit_entry_id = self.audit.log_approved(media_buy_id, actor).await;
        self.media_buys.update_status(media_buy_id, OrderStatus::Active).await?;

        self.notifier.decision_recorded(&media_buy, "approved", actor, None).await;
        info!(media_buy_id = %media_buy_id, approver = %actor.user_id, "order approved");

        Ok(DecisionOutcome {
            media_buy_id: media_buy_id.clone(),
            new_status: OrderStatus::Active,
            audit_entry_id,
        })
    }

    pub async fn reject(
        &self,
        media_buy_id: &MediaBuyId,
        reason: &str,
        actor: &ActorContext,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let mut media_buy = self.guarded_load(media_buy_id).await?;
        media_buy.transition_to(OrderStatus::Rejected)?;

        let audit_entry_id = self.audit.log_rejected(media_buy_id, reason, actor).await;
        self.media_buys.update_status(media_buy_id, OrderStatus::Rejected).await?;

        self.notifier.decision_recorded(&media_buy, "rejected", actor, Some(reason)).await;
        info!(media_buy_id = %media_buy_id, approver = %actor.user_id, "order rejected");

        Ok(DecisionOutcome {
            media_buy_id: media_buy_id.clone(),
            new_status: OrderStatus::Rejected,
            audit_entry_id,
        })
    }

    pub async fn request_changes(
        &self,
        media_buy_id: &MediaBuyId,
        comments: &str,
        actor: &ActorContext,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let mut media_buy = self.guarded_load(media_buy_id).await?;
        media_buy.transition_to(OrderStatus::PendingChanges)?;

        let audit_entry_id = self.audit.log_review_requested(media_buy_id, comments, actor).await;
        self.media_buys.update_status(media_buy_id, OrderStatus::PendingChanges).await?;

        self.notifier.decision_recorded(&media_buy, "changes_requested", actor, Some(comments)).await;
        info!(media_buy_id = %media_buy_id, approver = %actor.user_id, "changes requested");

        Ok(DecisionOutcome {
            media_buy_id: media_buy_id.clone(),
            new_status: OrderStatus::PendingChanges,
            audit_entry_id,
        })
    }

    async fn load(&self, media_buy_id: &MediaBuyId) -> Result<MediaBuy, WorkflowError> {
        self.media_buys
            .find_by_media_buy_id(media_buy_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(media_buy_id.clone()))
    }

    /// Load for a decision step, refusing settled orders up front.
    async fn guarded_load(&self, media_buy_id: &MediaBuyId) -> Result<MediaBuy, WorkflowError> {
        let media_buy = self.load(media_buy_id).await?;
        if media_buy.status.is_settled() {
            return Err(WorkflowError::AlreadyResolved {
                media_buy_id: media_buy_id.clone(),
                status: media_buy.status,
            });
        }
        Ok(media_buy)
    }
}
