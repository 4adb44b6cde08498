use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::order::MediaBuyId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CemAction {
    Approve,
    Review,
    Reject,
}

impl CemAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Review => "review",
            Self::Reject => "reject",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CemConfidence {
    High,
    Medium,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CemRiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CemRecommendation {
    pub action: CemAction,
    pub confidence: CemConfidence,
    pub reason: String,
    pub risk_level: CemRiskLevel,
}

/// Complete review packet for a human CEM, produced by the summarization
/// oracle. Ephemeral; its fields are persisted only through the audit log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CemSummary {
    pub media_buy_id: MediaBuyId,
    pub order_summary: String,
    pub validation_explanation: String,
    pub risk_flags: Vec<String>,
    pub recommendation: CemRecommendation,
    pub generated_at: DateTime<Utc>,
}

/// Recommendation policy the oracle is instructed to follow; restated here so
/// a rules-based oracle substitute stays behaviorally compatible.
pub fn policy_action(all_validations_passed: bool, risk_flag_count: usize) -> CemAction {
    if !all_validations_passed {
        CemAction::Reject
    } else if risk_flag_count > 0 {
        CemAction::Review
    } else {
        CemAction::Approve
    }
}
