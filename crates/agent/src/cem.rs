use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tracing::warn;

use buyline_core::cem::{
    CemAction, CemConfidence, CemRecommendation, CemRiskLevel, CemSummary,
};
use buyline_core::validation::OrderValidation;

use crate::llm::LlmClient;
use crate::validator::OrderDetails;

pub const FALLBACK_RISK_FLAG: &str = "AI summarization failed - manual review required";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Shape the model is instructed to reply with.
#[derive(Debug, Deserialize)]
struct LlmSummaryPayload {
    order_summary: String,
    validation_explanation: String,
    #[serde(default)]
    risk_flags: Vec<String>,
    recommendation: CemRecommendation,
}

/// Produces the review packet shown to the human CEM.
///
/// Summarization is best effort: any model failure (transport, timeout,
/// unparseable output) degrades to a deterministic summary that steers the
/// reviewer toward manual inspection. `summarize` therefore never fails.
pub struct CemAgent {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl CemAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm, timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn summarize(
        &self,
        details: &OrderDetails,
        validation: &OrderValidation,
    ) -> CemSummary {
        let prompt = build_prompt(details, validation);

        let response = match tokio::time::timeout(self.timeout, self.llm.complete(&prompt)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                warn!(media_buy_id = %validation.media_buy_id, %error, "summarization failed");
                return fallback_summary(details, validation);
            }
            Err(_) => {
                warn!(
                    media_buy_id = %validation.media_buy_id,
                    timeout_secs = self.timeout.as_secs(),
                    "summarization timed out"
                );
                return fallback_summary(details, validation);
            }
        };

        match parse_response(&response) {
            Some(payload) => CemSummary {
                media_buy_id: validation.media_buy_id.clone(),
                order_summary: payload.order_summary,
                validation_explanation: payload.validation_explanation,
                risk_flags: payload.risk_flags,
                recommendation: payload.recommendation,
                generated_at: Utc::now(),
            },
            None => {
                warn!(media_buy_id = %validation.media_buy_id, "unparseable model output");
                fallback_summary(details, validation)
            }
        }
    }
}

fn build_prompt(details: &OrderDetails, validation: &OrderValidation) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are summarizing an advertising order for a Campaign Enablement Manager who will \
         approve or reject it. Reply with a single JSON object with keys: order_summary, \
         validation_explanation, risk_flags (array of strings), recommendation (object with \
         action, confidence, reason, risk_level).\n\
         Recommendation policy: reject if any validation failed; review if all passed but risk \
         flags exist; approve only when all passed with no risk flags.\n\n",
    );

    let buy = &details.media_buy;
    prompt.push_str(&format!(
        "ORDER\ncampaign: {}\nadvertiser: {}\ntotal budget: {} {}\nflight: {} to {}\n",
        buy.campaign_name,
        details.principal.as_ref().map(|p| p.name.as_str()).unwrap_or(buy.principal_id.0.as_str()),
        buy.total_budget,
        buy.currency,
        buy.flight_start_date,
        buy.flight_end_date,
    ));

    prompt.push_str("\nPACKAGES\n");
    for detail in &details.packages {
        prompt.push_str(&format!(
            "- {} budget {} formats [{}] est. impressions {}\n",
            detail.product_name,
            detail.package.budget,
            detail.package.format_ids.join(", "),
            detail.estimated_impressions,
        ));
    }

    prompt.push_str("\nVALIDATION\n");
    prompt.push_str(&format!("{}\n", validation.summary));
    for check in &validation.checks {
        let mark = if check.passed { "PASS" } else { "FAIL" };
        prompt.push_str(&format!("- [{mark}] {}: {}\n", check.check_name, check.message));
    }

    prompt
}

/// Accepts raw JSON or JSON wrapped in markdown code fences.
fn parse_response(response: &str) -> Option<LlmSummaryPayload> {
    let trimmed = response.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.strip_suffix("```").unwrap_or(rest))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(body).ok()
}

fn fallback_summary(details: &OrderDetails, validation: &OrderValidation) -> CemSummary {
    let buy = &details.media_buy;
    let order_summary = format!(
        "Campaign '{}' for {} with total budget {} {}, flight {} to {}, {} package(s).",
        buy.campaign_name,
        details.principal.as_ref().map(|p| p.name.as_str()).unwrap_or(buy.principal_id.0.as_str()),
        buy.total_budget,
        buy.currency,
        buy.flight_start_date,
        buy.flight_end_date,
        details.packages.len(),
    );

    CemSummary {
        media_buy_id: validation.media_buy_id.clone(),
        order_summary,
        validation_explanation: validation.summary.clone(),
        risk_flags: vec![FALLBACK_RISK_FLAG.to_string()],
        recommendation: CemRecommendation {
            action: CemAction::Review,
            confidence: CemConfidence::Low,
            reason: "Automatic summarization was unavailable; review the order manually."
                .to_string(),
            risk_level: CemRiskLevel::Medium,
        },
        generated_at: Utc::now(),
    }
}
