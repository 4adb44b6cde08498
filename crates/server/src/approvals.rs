//! Glue between the Slack surface and the approval workflow.
//!
//! The workflow emits notifications through `ApprovalNotifier`; the Slack
//! handlers call back in through `ApprovalActionService` and
//! `CampaignCommandService`. Workflow rejections a reviewer can act on come
//! back as error cards instead of handler failures.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use buyline_agent::{ActorContext, ApprovalNotifier, ApprovalWorkflow, WorkflowError};
use buyline_core::cem::CemSummary;
use buyline_core::domain::order::{MediaBuy, MediaBuyId};
use buyline_core::validation::OrderValidation;
use buyline_db::repositories::{MediaBuyRepository, PackageRepository, ProductRepository};
use buyline_slack::blocks::{self, ApprovalCardPackage, MessageTemplate};
use buyline_slack::commands::{CampaignCommandService, CommandEnvelope, CommandRouteError};
use buyline_slack::events::{ApprovalActionService, EventContext, EventHandlerError};

/// Posts a rendered message to a channel. The production transport is the
/// Slack Web API; until one is wired the logging poster keeps the workflow
/// observable without a network dependency.
#[async_trait]
pub trait ChatPoster: Send + Sync {
    async fn post(&self, channel: &str, message: &MessageTemplate) -> anyhow::Result<()>;
}

pub struct LoggingChatPoster;

#[async_trait]
impl ChatPoster for LoggingChatPoster {
    async fn post(&self, channel: &str, message: &MessageTemplate) -> anyhow::Result<()> {
        info!(
            event_name = "egress.slack.message_posted",
            channel = %channel,
            fallback_text = %message.fallback_text,
            block_count = message.blocks.len(),
            "message rendered for review channel"
        );
        Ok(())
    }
}

/// Renders approval cards and decision confirmations into the review channel.
pub struct SlackApprovalNotifier {
    poster: Arc<dyn ChatPoster>,
    review_channel: String,
    packages: Arc<dyn PackageRepository>,
    products: Arc<dyn ProductRepository>,
}

impl SlackApprovalNotifier {
    pub fn new(
        poster: Arc<dyn ChatPoster>,
        review_channel: impl Into<String>,
        packages: Arc<dyn PackageRepository>,
        products: Arc<dyn ProductRepository>,
    ) -> Self {
        Self { poster, review_channel: review_channel.into(), packages, products }
    }

    async fn card_packages(&self, media_buy_id: &MediaBuyId) -> Vec<ApprovalCardPackage> {
        let packages = match self.packages.list_for_media_buy(media_buy_id).await {
            Ok(packages) => packages,
            Err(error) => {
                warn!(media_buy_id = %media_buy_id, %error, "card package lookup failed");
                return Vec::new();
            }
        };

        let mut card_packages = Vec::with_capacity(packages.len());
        for package in packages {
            let product = self.products.find_by_id(&package.product_id).await.ok().flatten();
            let product_name = product
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| package.product_id.0.clone());
            let estimated_impressions =
                product.map(|p| package.estimated_impressions(p.cpm)).unwrap_or(0);

            card_packages.push(ApprovalCardPackage {
                product_name,
                budget: package.budget,
                format_ids: package.format_ids,
                estimated_impressions,
            });
        }
        card_packages
    }
}

#[async_trait]
impl ApprovalNotifier for SlackApprovalNotifier {
    async fn order_submitted(
        &self,
        media_buy: &MediaBuy,
        validation: &OrderValidation,
        summary: &CemSummary,
    ) {
        let packages = self.card_packages(&media_buy.media_buy_id).await;
        let card = blocks::cem_approval_card(media_buy, &packages, validation, summary);
        if let Err(error) = self.poster.post(&self.review_channel, &card).await {
            warn!(
                media_buy_id = %media_buy.media_buy_id,
                channel = %self.review_channel,
                %error,
                "failed to post approval card"
            );
        }
    }

    async fn decision_recorded(
        &self,
        media_buy: &MediaBuy,
        decision: &str,
        actor: &ActorContext,
        note: Option<&str>,
    ) {
        let message =
            blocks::decision_message(&media_buy.media_buy_id.0, decision, &actor.user_id, note);
        if let Err(error) = self.poster.post(&self.review_channel, &message).await {
            warn!(
                media_buy_id = %media_buy.media_buy_id,
                channel = %self.review_channel,
                %error,
                "failed to post decision confirmation"
            );
        }
    }
}

/// Routes approval card buttons and modal submissions into the workflow.
#[derive(Clone)]
pub struct WorkflowApprovalService {
    workflow: Arc<ApprovalWorkflow>,
}

impl WorkflowApprovalService {
    pub fn new(workflow: Arc<ApprovalWorkflow>) -> Self {
        Self { workflow }
    }
}

fn decision_response(
    result: Result<buyline_agent::DecisionOutcome, WorkflowError>,
    media_buy_id: &str,
    decision: &str,
    user_id: &str,
    note: Option<&str>,
    correlation_id: &str,
) -> Result<MessageTemplate, EventHandlerError> {
    match result {
        Ok(_) => Ok(blocks::decision_message(media_buy_id, decision, user_id, note)),
        Err(error @ WorkflowError::NotFound(_))
        | Err(error @ WorkflowError::AlreadyResolved { .. })
        | Err(error @ WorkflowError::Transition(_)) => {
            Ok(blocks::error_message(&error.to_string(), correlation_id))
        }
        Err(error) => Err(EventHandlerError::ApprovalAction(error.to_string())),
    }
}

#[async_trait]
impl ApprovalActionService for WorkflowApprovalService {
    async fn approve(
        &self,
        media_buy_id: &str,
        user_id: &str,
        ctx: &EventContext,
    ) -> Result<MessageTemplate, EventHandlerError> {
        let result = self
            .workflow
            .approve(
                &MediaBuyId(media_buy_id.to_string()),
                &ActorContext::new(user_id).with_correlation_id(&ctx.correlation_id),
            )
            .await;
        decision_response(result, media_buy_id, "approved", user_id, None, &ctx.correlation_id)
    }

    async fn reject(
        &self,
        media_buy_id: &str,
        reason: &str,
        user_id: &str,
        ctx: &EventContext,
    ) -> Result<MessageTemplate, EventHandlerError> {
        let result = self
            .workflow
            .reject(
                &MediaBuyId(media_buy_id.to_string()),
                reason,
                &ActorContext::new(user_id).with_correlation_id(&ctx.correlation_id),
            )
            .await;
        decision_response(
            result,
            media_buy_id,
            "rejected",
            user_id,
            Some(reason),
            &ctx.correlation_id,
        )
    }

    async fn request_changes(
        &self,
        media_buy_id: &str,
        comments: &str,
        user_id: &str,
        ctx: &EventContext,
    ) -> Result<MessageTemplate, EventHandlerError> {
        let result = self
            .workflow
            .request_changes(
                &MediaBuyId(media_buy_id.to_string()),
                comments,
                &ActorContext::new(user_id).with_correlation_id(&ctx.correlation_id),
            )
            .await;
        decision_response(
            result,
            media_buy_id,
            "changes_requested",
            user_id,
            Some(comments),
            &ctx.correlation_id,
        )
    }
}

/// Backs the `/campaign` slash command.
pub struct CampaignService {
    workflow: Arc<ApprovalWorkflow>,
    media_buys: Arc<dyn MediaBuyRepository>,
}

impl CampaignService {
    pub fn new(workflow: Arc<ApprovalWorkflow>, media_buys: Arc<dyn MediaBuyRepository>) -> Self {
        Self { workflow, media_buys }
    }
}

#[async_trait]
impl CampaignCommandService for CampaignService {
    async fn submit_order(
        &self,
        media_buy_id: &str,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let result = self
            .workflow
            .submit_for_approval(
                &MediaBuyId(media_buy_id.to_string()),
                &ActorContext::new(&envelope.user_id).with_correlation_id(&envelope.request_id),
            )
            .await;

        match result {
            Ok(outcome) => Ok(blocks::campaign_status_message(
                media_buy_id,
                &format!(
                    "submitted for approval ({}), validation: {}",
                    outcome.new_status.as_str(),
                    outcome.validation.summary
                ),
            )),
            Err(error @ WorkflowError::NotFound(_))
            | Err(error @ WorkflowError::AlreadyResolved { .. })
            | Err(error @ WorkflowError::Transition(_)) => {
                Ok(blocks::error_message(&error.to_string(), &envelope.request_id))
            }
            Err(error) => Err(CommandRouteError::Service(error.to_string())),
        }
    }

    async fn order_status(
        &self,
        media_buy_id: &str,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let media_buy = self
            .media_buys
            .find_by_media_buy_id(&MediaBuyId(media_buy_id.to_string()))
            .await
            .map_err(|error| CommandRouteError::Service(error.to_string()))?;

        match media_buy {
            Some(media_buy) => Ok(blocks::campaign_status_message(
                media_buy_id,
                media_buy.status.as_str(),
            )),
            None => Ok(blocks::error_message(
                &format!("No order found with id `{media_buy_id}`."),
                &envelope.request_id,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use buyline_agent::{
        ApprovalWorkflow, AuditLogger, CemAgent, LlmClient, NoopApprovalNotifier, OrderValidator,
    };
    use buyline_core::domain::order::{MediaBuy, MediaBuyId, OrderStatus};
    use buyline_core::domain::principal::PrincipalId;
    use buyline_db::repositories::{
        InMemoryAuditLogRepository, InMemoryMediaBuyRepository, InMemoryPackageRepository,
        InMemoryPrincipalRepository, InMemoryProductRepository, MediaBuyRepository,
    };
    use buyline_slack::events::{ApprovalActionService, EventContext};

    use super::{CampaignService, WorkflowApprovalService};
    use buyline_slack::commands::{CampaignCommandService, CommandEnvelope};

    struct OfflineLlm;

    #[async_trait]
    impl LlmClient for OfflineLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(anyhow::anyhow!("offline"))
        }
    }

    struct Fixture {
        media_buys: Arc<InMemoryMediaBuyRepository>,
        workflow: Arc<ApprovalWorkflow>,
    }

    impl Fixture {
        fn new() -> Self {
            let media_buys = Arc::new(InMemoryMediaBuyRepository::default());
            let packages = Arc::new(InMemoryPackageRepository::default());
            let products = Arc::new(InMemoryProductRepository::default());
            let principals = Arc::new(InMemoryPrincipalRepository::default());
            let audit = Arc::new(InMemoryAuditLogRepository::default());

            let validator = OrderValidator::new(
                media_buys.clone(),
                packages.clone(),
                products.clone(),
                principals.clone(),
            );
            let workflow = Arc::new(ApprovalWorkflow::new(
                media_buys.clone(),
                validator,
                CemAgent::new(Arc::new(OfflineLlm)),
                AuditLogger::new(audit),
                Arc::new(NoopApprovalNotifier),
            ));

            Self { media_buys, workflow }
        }

        async fn seed_pending_approval(&self, media_buy_id: &str) {
            let now = chrono::Utc::now();
            self.media_buys
                .save(MediaBuy {
                    id: format!("row-{media_buy_id}"),
                    media_buy_id: MediaBuyId(media_buy_id.to_string()),
                    campaign_name: "Test Campaign".to_string(),
                    principal_id: PrincipalId("nike".to_string()),
                    tenant_id: "yahoo".to_string(),
                    total_budget: Decimal::new(50_000, 0),
                    currency: "USD".to_string(),
                    flight_start_date: (now + chrono::Duration::days(30)).date_naive(),
                    flight_end_date: (now + chrono::Duration::days(90)).date_naive(),
                    status: OrderStatus::PendingCemApproval,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .expect("save media buy");
        }
    }

    fn envelope(verb: &str) -> CommandEnvelope {
        CommandEnvelope {
            command: "campaign".to_owned(),
            verb: verb.to_owned(),
            media_buy_id: None,
            freeform_args: String::new(),
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
            trigger_ts: "1".to_owned(),
            request_id: format!("req-{verb}"),
        }
    }

    #[tokio::test]
    async fn approve_through_the_service_lands_a_decision_card() {
        let fixture = Fixture::new();
        fixture.seed_pending_approval("nike_running_q1").await;

        let service = WorkflowApprovalService::new(fixture.workflow.clone());
        let message = service
            .approve("nike_running_q1", "U-cem", &EventContext::default())
            .await
            .expect("approve");

        assert!(message.fallback_text.contains("approved"));
        let stored = fixture
            .media_buys
            .find_by_media_buy_id(&MediaBuyId("nike_running_q1".to_string()))
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(stored.status, OrderStatus::Active);
    }

    #[tokio::test]
    async fn double_decision_becomes_an_error_card_not_a_handler_failure() {
        let fixture = Fixture::new();
        fixture.seed_pending_approval("nike_running_q1").await;

        let service = WorkflowApprovalService::new(fixture.workflow.clone());
        service
            .approve("nike_running_q1", "U-cem", &EventContext::default())
            .await
            .expect("first approve");
        let second = service
            .reject("nike_running_q1", "late objection", "U-cem", &EventContext::default())
            .await
            .expect("second decision should still render");

        assert!(second.fallback_text.contains("already"));
    }

    #[tokio::test]
    async fn status_command_reports_unknown_orders_gracefully() {
        let fixture = Fixture::new();
        let service = CampaignService::new(fixture.workflow.clone(), fixture.media_buys.clone());

        let message =
            service.order_status("ghost_order", &envelope("status")).await.expect("status");
        assert!(message.fallback_text.contains("No order found"));
    }

    #[tokio::test]
    async fn status_command_reports_the_stored_state() {
        let fixture = Fixture::new();
        fixture.seed_pending_approval("nike_running_q1").await;
        let service = CampaignService::new(fixture.workflow.clone(), fixture.media_buys.clone());

        let message =
            service.order_status("nike_running_q1", &envelope("status")).await.expect("status");
        assert!(message.fallback_text.contains("pending_cem_approval"));
    }
}
