use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::order::MediaBuyId;

/// Check identifiers, in the order the validator runs them.
pub const VALIDATION_CHECKS: [&str; 6] = [
    "media_buy_exists",
    "products_exist",
    "formats_exist",
    "principal_authorized",
    "budget_limits",
    "flight_dates",
];

/// Creative format allow-list (AdCP standard format ids).
pub const KNOWN_FORMAT_IDS: [&str; 9] = [
    "display_300x250",
    "display_728x90",
    "display_160x600",
    "display_320x50",
    "video_16x9_15s",
    "video_16x9_30s",
    "video_9x16_15s",
    "native_content_feed",
    "native_in_stream",
];

pub fn is_known_format(format_id: &str) -> bool {
    KNOWN_FORMAT_IDS.contains(&format_id)
}

/// Result of a single validation check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub check_name: String,
    pub passed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ValidationResult {
    pub fn pass(check_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { check_name: check_name.into(), passed: true, message: message.into(), details: None }
    }

    pub fn fail(check_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            check_name: check_name.into(),
            passed: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Aggregate verdict for one order, derived fresh from datastore state on every
/// run. No snapshot guarantee: a re-run after concurrent mutation may differ.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderValidation {
    pub media_buy_id: MediaBuyId,
    pub all_passed: bool,
    pub checks: Vec<ValidationResult>,
    pub summary: String,
    pub validated_at: DateTime<Utc>,
}

impl OrderValidation {
    pub fn from_checks(media_buy_id: MediaBuyId, checks: Vec<ValidationResult>) -> Self {
        let all_passed = checks.iter().all(|check| check.passed);
        let passed_count = checks.iter().filter(|check| check.passed).count();

        let summary = if all_passed {
            format!("✅ ALL VALIDATIONS PASSED ({passed_count}/{})", checks.len())
        } else {
            let failed = checks
                .iter()
                .filter(|check| !check.passed)
                .map(|check| check.check_name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("❌ VALIDATION FAILED: {failed}")
        };

        Self { media_buy_id, all_passed, checks, summary, validated_at: Utc::now() }
    }

    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|check| !check.passed)
            .map(|check| check.check_name.as_str())
            .collect()
    }
}
