//! Slack surface for the order approval workflow.
//!
//! The approval card, decision confirmations, and modals are rendered as
//! typed Block Kit structures (`blocks`). Inbound traffic arrives as
//! envelopes over Socket Mode (`socket`), is classified (`events`), and is
//! dispatched to services implemented by the server binary. This crate holds
//! no storage; it renders and routes.

pub mod blocks;
pub mod commands;
pub mod events;
pub mod socket;

pub use blocks::{
    cem_approval_card, decision_message, error_message, help_message, ApprovalCardPackage,
    Block, ButtonElement, ButtonStyle, MessageBuilder, MessageTemplate, ModalView, TextObject,
};
pub use events::{
    default_dispatcher, ApprovalAction, ApprovalActionService, BlockActionEvent,
    EventContext, EventDispatcher, EventHandler, EventHandlerError, HandlerResult,
    NoopApprovalActionService, SlackEnvelope, SlackEvent, SlackEventType, ViewSubmissionEvent,
};
pub use socket::{NoopSocketTransport, ReconnectPolicy, SocketModeRunner, SocketTransport};
