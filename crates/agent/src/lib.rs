//! Order approval automation.
//!
//! This crate drives a media buy from submission to a human CEM decision:
//!
//! 1. **Validation** (`validator`) - six deterministic checks against the
//!    datastore, each isolated so one failure never hides another.
//! 2. **Audit** (`audit`) - append-only trail of every workflow event.
//! 3. **Summarization** (`cem`) - LLM-generated review packet with a
//!    deterministic fallback when the model is unavailable.
//! 4. **Workflow** (`workflow`) - the approve / reject / request-changes
//!    state machine, gated by the order status transition table.
//!
//! The LLM is strictly a summarizer. It never decides an order's fate; the
//! recommendation it produces is advisory and the validation verdict plus the
//! human decision are authoritative.

pub mod audit;
pub mod cem;
pub mod llm;
pub mod validator;
pub mod workflow;

pub use audit::AuditLogger;
pub use cem::CemAgent;
pub use llm::LlmClient;
pub use validator::{OrderDetails, OrderValidator, PackageDetail};
pub use workflow::{
    ActorContext, ApprovalNotifier, ApprovalWorkflow, DecisionOutcome, NoopApprovalNotifier,
    SubmissionOutcome, WorkflowError,
};
