use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    blocks::{self, MessageTemplate, ModalView},
    commands::{
        normalize_campaign_command, CommandParseError, CommandRouteError, CommandRouter,
        NoopCampaignCommandService, CampaignCommandService, SlashCommandPayload,
    },
};

pub const APPROVE_ACTION_ID: &str = "cem.approve.v1";
pub const REJECT_ACTION_ID: &str = "cem.reject.v1";
pub const REVIEW_ACTION_ID: &str = "cem.review.v1";

pub const REJECT_REASON_CALLBACK_ID: &str = "cem.reject_reason.v1";
pub const REVIEW_COMMENTS_CALLBACK_ID: &str = "cem.review_comments.v1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    BlockAction(BlockActionEvent),
    ViewSubmission(ViewSubmissionEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::BlockAction(_) => SlackEventType::BlockAction,
            Self::ViewSubmission(_) => SlackEventType::ViewSubmission,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    BlockAction,
    ViewSubmission,
    Unsupported,
}

/// A button press on the approval card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockActionEvent {
    pub channel_id: String,
    pub message_ts: String,
    pub user_id: String,
    pub action_id: String,
    pub value: Option<String>,
    pub trigger_id: Option<String>,
    pub request_id: Option<String>,
}

/// A submitted modal. `media_buy_id` comes from the view's private metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewSubmissionEvent {
    pub callback_id: String,
    pub user_id: String,
    pub media_buy_id: String,
    pub values: HashMap<String, String>,
    pub request_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApprovalAction {
    Approve,
    Reject,
    RequestChanges,
}

impl ApprovalAction {
    pub fn from_action_id(action_id: &str) -> Option<Self> {
        match action_id {
            APPROVE_ACTION_ID => Some(Self::Approve),
            REJECT_ACTION_ID => Some(Self::Reject),
            REVIEW_ACTION_ID => Some(Self::RequestChanges),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(MessageTemplate),
    OpenModal(ModalView),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error("approval action handler failure: {0}")]
    ApprovalAction(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub fn default_dispatcher() -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(NoopCampaignCommandService));
    dispatcher.register(BlockActionHandler::new(NoopApprovalActionService));
    dispatcher.register(ViewSubmissionHandler::new(NoopApprovalActionService));
    dispatcher
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: CampaignCommandService,
{
    pub fn new(service: S) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: CampaignCommandService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let normalized = normalize_campaign_command(payload.clone())?;
        let message = self.router.route(normalized).await?;
        Ok(HandlerResult::Responded(message))
    }
}

/// Decision entry points implemented by the server against the workflow.
/// Reject and request-changes carry the note collected by the modal.
#[async_trait]
pub trait ApprovalActionService: Send + Sync {
    async fn approve(
        &self,
        media_buy_id: &str,
        user_id: &str,
        ctx: &EventContext,
    ) -> Result<MessageTemplate, EventHandlerError>;

    async fn reject(
        &self,
        media_buy_id: &str,
        reason: &str,
        user_id: &str,
        ctx: &EventContext,
    ) -> Result<MessageTemplate, EventHandlerError>;

    async fn request_changes(
        &self,
        media_buy_id: &str,
        comments: &str,
        user_id: &str,
        ctx: &EventContext,
    ) -> Result<MessageTemplate, EventHandlerError>;
}

#[derive(Default)]
pub struct NoopApprovalActionService;

#[async_trait]
impl ApprovalActionService for NoopApprovalActionService {
    async fn approve(
        &self,
        media_buy_id: &str,
        user_id: &str,
        _ctx: &EventContext,
    ) -> Result<MessageTemplate, EventHandlerError> {
        Ok(blocks::decision_message(media_buy_id, "approved", user_id, None))
    }

    async fn reject(
        &self,
        media_buy_id: &str,
        reason: &str,
        user_id: &str,
        _ctx: &EventContext,
    ) -> Result<MessageTemplate, EventHandlerError> {
        Ok(blocks::decision_message(media_buy_id, "rejected", user_id, Some(reason)))
    }

    async fn request_changes(
        &self,
        media_buy_id: &str,
        comments: &str,
        user_id: &str,
        _ctx: &EventContext,
    ) -> Result<MessageTemplate, EventHandlerError> {
        Ok(blocks::decision_message(media_buy_id, "changes_requested", user_id, Some(comments)))
    }
}

pub struct BlockActionHandler<S> {
    service: S,
}

impl<S> BlockActionHandler<S>
where
    S: ApprovalActionService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for BlockActionHandler<S>
where
    S: ApprovalActionService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::BlockAction
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::BlockAction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let Some(action) = ApprovalAction::from_action_id(&event.action_id) else {
            let request_id = event.request_id.as_deref().unwrap_or(&ctx.correlation_id);
            return Ok(HandlerResult::Responded(blocks::error_message(
                &format!("Unrecognized action `{}`.", event.action_id),
                request_id,
            )));
        };

        let Some(media_buy_id) = event.value.as_deref().filter(|value| !value.is_empty()) else {
            return Err(EventHandlerError::ApprovalAction(format!(
                "action `{}` arrived without a media buy id",
                event.action_id
            )));
        };

        // Approve resolves immediately; the destructive paths collect a
        // reason through a modal first and resolve on view submission.
        match action {
            ApprovalAction::Approve => {
                let message = self.service.approve(media_buy_id, &event.user_id, ctx).await?;
                Ok(HandlerResult::Responded(message))
            }
            ApprovalAction::Reject => {
                Ok(HandlerResult::OpenModal(blocks::reject_reason_modal(media_buy_id)))
            }
            ApprovalAction::RequestChanges => {
                Ok(HandlerResult::OpenModal(blocks::review_comments_modal(media_buy_id)))
            }
        }
    }
}

pub struct ViewSubmissionHandler<S> {
    service: S,
}

impl<S> ViewSubmissionHandler<S>
where
    S: ApprovalActionService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for ViewSubmissionHandler<S>
where
    S: ApprovalActionService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::ViewSubmission
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::ViewSubmission(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        match event.callback_id.as_str() {
            REJECT_REASON_CALLBACK_ID => {
                let reason = required_input(event, "reason")?;
                let message = self
                    .service
                    .reject(&event.media_buy_id, &reason, &event.user_id, ctx)
                    .await?;
                Ok(HandlerResult::Responded(message))
            }
            REVIEW_COMMENTS_CALLBACK_ID => {
                let comments = required_input(event, "comments")?;
                let message = self
                    .service
                    .request_changes(&event.media_buy_id, &comments, &event.user_id, ctx)
                    .await?;
                Ok(HandlerResult::Responded(message))
            }
            _ => Ok(HandlerResult::Processed),
        }
    }
}

fn required_input(
    event: &ViewSubmissionEvent,
    block_id: &str,
) -> Result<String, EventHandlerError> {
    event
        .values
        .get(block_id)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            EventHandlerError::ApprovalAction(format!(
                "view `{}` submitted without input `{block_id}`",
                event.callback_id
            ))
        })
}
